//! The parser context: owned buffers, configured capacities, and the three
//! entry points (`parse`, `iterate`, `iterate_many`).
//!
//! A context is exclusive to one thread and reusable across parses; all
//! buffers are sized up front by [`Parser::allocate`] so a parse within
//! capacity performs no allocation. Results borrow the context: a
//! [`DomDocument`] is valid until the next parse, an on-demand document
//! until the iterator state is reused.

use crate::error::{Error, Result};
use crate::ondemand::stream::DocumentStream;
use crate::ondemand::{IterState, OndemandDocument};
use crate::options::{ParserOptions, MINIMAL_BATCH_SIZE};
use crate::padded::PaddedBytes;
use crate::simd::{active_implementation, Implementation};
use crate::stage1::ScanMode;
use crate::stage2::{RetState, TapeBuilder};
use crate::tape::DomDocument;

fn round_up_64(n: usize) -> usize {
    (n + 63) & !63
}

/// A reusable JSON parser context.
pub struct Parser {
    implementation: &'static Implementation,
    options: ParserOptions,

    pub(crate) structural_indexes: Vec<u32>,
    /// Entries in `structural_indexes` including the sentinel.
    pub(crate) n_structural_indexes: usize,
    pub(crate) tape: Vec<u64>,
    pub(crate) string_buf: Vec<u8>,
    containing_scope: Vec<u32>,
    ret_stack: Vec<RetState>,
    /// Cursor state shared by the on-demand document views.
    pub(crate) iter: IterState,

    byte_capacity: usize,
}

impl Parser {
    /// A context with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ParserOptions::default())
    }

    /// A context with explicit capacity limits.
    #[must_use]
    pub fn with_options(options: ParserOptions) -> Self {
        Parser {
            implementation: active_implementation(),
            options,
            structural_indexes: Vec::new(),
            n_structural_indexes: 0,
            tape: Vec::new(),
            string_buf: Vec::new(),
            containing_scope: Vec::new(),
            ret_stack: Vec::new(),
            iter: IterState::new(),
            byte_capacity: 0,
        }
    }

    /// Name of the backend selected at construction (`avx2`, `sse42`, or
    /// `fallback`).
    #[must_use]
    pub fn implementation_name(&self) -> &'static str {
        self.implementation.name
    }

    /// The configured options.
    #[must_use]
    pub fn options(&self) -> ParserOptions {
        self.options
    }

    /// Sizes every internal buffer for documents up to `capacity` bytes.
    ///
    /// Called implicitly by the parse entry points; calling it up front
    /// moves the allocation cost out of the first parse.
    pub fn allocate(&mut self, capacity: usize) -> Result<()> {
        if capacity > self.options.max_capacity {
            return Err(Error::Capacity);
        }
        let depth_slots = self.options.max_depth + 1;
        if self.containing_scope.len() != depth_slots {
            self.containing_scope.clear();
            self.containing_scope.resize(depth_slots, 0);
            self.ret_stack.clear();
            self.ret_stack.resize(depth_slots, RetState::Finish);
        }
        if capacity <= self.byte_capacity {
            return Ok(());
        }
        // Worst-case sizing, so the hot loops never reallocate:
        // one index per input byte plus sentinel and flattening overshoot;
        // tape cells for the adversarial all-scalars case; scratch for a
        // document of nothing but minimal strings.
        self.structural_indexes
            .reserve(round_up_64(capacity) + 2 + 7);
        self.tape.reserve(round_up_64(capacity + 2));
        self.string_buf.reserve(round_up_64(5 * capacity / 3 + 32));
        self.byte_capacity = capacity;
        Ok(())
    }

    /// Runs stage 1 over `window_len` bytes of `buf` (which must carry the
    /// usual padding) and records the index stream.
    pub(crate) fn run_stage1(
        &mut self,
        buf: &[u8],
        window_len: usize,
        mode: ScanMode,
    ) -> Result<crate::stage1::ScanSummary> {
        let summary = unsafe {
            (self.implementation.stage1)(buf, window_len, &mut self.structural_indexes, mode)
        }?;
        self.n_structural_indexes = summary.n_structurals;
        Ok(summary)
    }

    fn run_full(&mut self, buf: &[u8], len: usize) -> Result<()> {
        self.allocate(len)?;
        self.run_stage1(buf, len, ScanMode::Full)?;
        TapeBuilder::new(
            buf,
            len,
            &self.structural_indexes,
            self.n_structural_indexes,
            &mut self.tape,
            &mut self.string_buf,
            &mut self.containing_scope,
            &mut self.ret_stack,
            self.options.max_depth,
        )
        .run()
    }

    /// Parses one document into the tape and returns the DOM reader.
    pub fn parse(&mut self, input: &PaddedBytes) -> Result<DomDocument<'_>> {
        self.run_full(input.padded_slice(), input.len())?;
        Ok(DomDocument::new(&self.tape, &self.string_buf))
    }

    /// Parses from an unpadded slice by copying it into an internally
    /// allocated padded buffer first.
    pub fn parse_slice(&mut self, input: &[u8]) -> Result<DomDocument<'_>> {
        let padded = PaddedBytes::from_slice(input);
        self.run_full(padded.padded_slice(), padded.len())?;
        Ok(DomDocument::new(&self.tape, &self.string_buf))
    }

    /// Builds the on-demand document view over the current stage-1 output.
    pub(crate) fn ondemand_document<'p, 'b>(
        &'p mut self,
        buf: &'b [u8],
    ) -> OndemandDocument<'p, 'b> {
        OndemandDocument::over(
            buf,
            &self.structural_indexes,
            self.n_structural_indexes - 1,
            &mut self.iter,
            &mut self.string_buf,
        )
    }

    /// Prepares the iterator state for a fresh document rooted at
    /// structural slot `pos`.
    pub(crate) fn begin_ondemand(&mut self, pos: usize) {
        self.iter.pos = pos;
        self.iter.depth = 0;
        self.iter.generation = self.iter.generation.wrapping_add(1);
        self.string_buf.clear();
    }

    /// Runs stage 1 only and returns a lazy cursor over the document.
    pub fn iterate<'p, 'b>(&'p mut self, input: &'b PaddedBytes) -> Result<OndemandDocument<'p, 'b>> {
        self.allocate(input.len())?;
        self.run_stage1(input.padded_slice(), input.len(), ScanMode::Full)?;
        self.begin_ondemand(0);
        Ok(self.ondemand_document(input.padded_slice()))
    }

    /// Streams a buffer of whitespace-separated documents, scanning
    /// `batch_size`-byte windows at a time.
    pub fn iterate_many<'p, 'b>(
        &'p mut self,
        input: &'b PaddedBytes,
        batch_size: usize,
    ) -> Result<DocumentStream<'p, 'b>> {
        let batch_size = batch_size.max(MINIMAL_BATCH_SIZE);
        self.allocate(input.len().min(batch_size))?;
        Ok(DocumentStream::new(self, input, batch_size))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Parser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Parser")
            .field("implementation", &self.implementation.name)
            .field("byte_capacity", &self.byte_capacity)
            .field("max_depth", &self.options.max_depth)
            .finish()
    }
}
