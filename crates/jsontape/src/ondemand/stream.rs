//! Streaming over concatenated documents.
//!
//! The stream repeatedly runs stage 1 over a batch-sized window and yields
//! one on-demand document per top-level value. Batches slide forward only:
//! when a window ends inside a document, the next window starts at the last
//! fully-consumed document boundary and the tail is re-scanned there.
//!
//! End of input surfaces as `Ok(None)`; any real error is sticky and
//! repeats on every subsequent advance.

use crate::error::{Error, Result};
use crate::ondemand::OndemandDocument;
use crate::padded::PaddedBytes;
use crate::parser::Parser;
use crate::stage1::ScanMode;

/// Structural slot just past the document starting at `start`.
fn skip_document(window: &[u8], structurals: &[u32], n: usize, start: usize) -> usize {
    match window[structurals[start] as usize] {
        b'{' | b'[' => {
            let mut depth = 0usize;
            let mut k = start;
            while k < n {
                match window[structurals[k] as usize] {
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            return k + 1;
                        }
                    }
                    _ => {}
                }
                k += 1;
            }
            n
        }
        _ => start + 1,
    }
}

/// A forward-only iterator over the documents of a buffer.
///
/// Produced by [`Parser::iterate_many`]. Documents are yielded by
/// [`DocumentStream::next_document`]; each borrows the stream, so one
/// document must be dropped before the next is requested.
pub struct DocumentStream<'p, 'b> {
    parser: &'p mut Parser,
    input: &'b [u8],
    len: usize,
    batch_size: usize,
    batch_start: usize,
    /// Bytes of the current batch covered by complete documents.
    consumed: usize,
    /// Structural count of the current batch, sentinel excluded.
    n_in_batch: usize,
    /// Structural slot of the current document within the batch.
    doc_pos: usize,
    started: bool,
    finished: bool,
    error: Option<Error>,
}

impl<'p, 'b> DocumentStream<'p, 'b> {
    pub(crate) fn new(parser: &'p mut Parser, input: &'b PaddedBytes, batch_size: usize) -> Self {
        DocumentStream {
            parser,
            input: input.padded_slice(),
            len: input.len(),
            batch_size,
            batch_start: 0,
            consumed: 0,
            n_in_batch: 0,
            doc_pos: 0,
            started: false,
            finished: false,
            error: None,
        }
    }

    /// Total input length in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.len
    }

    /// Absolute byte offset of the current document.
    #[must_use]
    pub fn current_index(&self) -> usize {
        if self.started && self.doc_pos < self.n_in_batch {
            self.batch_start + self.parser.structural_indexes[self.doc_pos] as usize
        } else {
            self.batch_start
        }
    }

    fn fail(&mut self, e: Error) -> Error {
        self.error = Some(e);
        e
    }

    /// Scans batches forward until one holds at least one document.
    /// `Ok(false)` means clean end of input.
    fn load_batch(&mut self) -> Result<bool> {
        loop {
            if self.batch_start >= self.len {
                return Ok(false);
            }
            let remaining = self.len - self.batch_start;
            let window = &self.input[self.batch_start..];
            if remaining <= self.batch_size {
                // Final window: a full scan with the usual error surface.
                match self.parser.run_stage1(window, remaining, ScanMode::Full) {
                    Ok(summary) => {
                        self.consumed = summary.consumed;
                        self.n_in_batch = summary.n_structurals - 1;
                        return Ok(true);
                    }
                    // Trailing whitespace is a clean end, not an error.
                    Err(Error::Empty) => return Ok(false),
                    Err(e) => return Err(self.fail(e)),
                }
            } else {
                match self.parser.run_stage1(window, self.batch_size, ScanMode::Partial) {
                    Ok(summary) => {
                        let n = summary.n_structurals - 1;
                        if n == 0 {
                            if summary.consumed == 0 {
                                // One document larger than the whole batch.
                                return Err(self.fail(Error::Capacity));
                            }
                            // Whitespace-only window; slide past it.
                            self.batch_start += summary.consumed;
                            continue;
                        }
                        self.consumed = summary.consumed;
                        self.n_in_batch = n;
                        return Ok(true);
                    }
                    Err(e) => return Err(self.fail(e)),
                }
            }
        }
    }

    /// Yields the next document, `Ok(None)` once the input is exhausted.
    pub fn next_document(&mut self) -> Result<Option<OndemandDocument<'_, 'b>>> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.finished {
            return Ok(None);
        }

        if !self.started {
            self.started = true;
            if !self.load_batch()? {
                self.finished = true;
                return Ok(None);
            }
            self.doc_pos = 0;
        } else {
            // Walk past the current document regardless of how much of it
            // the caller actually read.
            let window = &self.input[self.batch_start..];
            let after = skip_document(
                window,
                &self.parser.structural_indexes,
                self.n_in_batch,
                self.doc_pos,
            );
            if after < self.n_in_batch {
                self.doc_pos = after;
            } else {
                self.batch_start += self.consumed;
                if !self.load_batch()? {
                    self.finished = true;
                    return Ok(None);
                }
                self.doc_pos = 0;
            }
        }

        let window = &self.input[self.batch_start..];
        self.parser.begin_ondemand(self.doc_pos);
        Ok(Some(self.parser.ondemand_document(window)))
    }
}
