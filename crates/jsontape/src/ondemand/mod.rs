//! On-demand parsing: a lazy cursor over the stage-1 index stream.
//!
//! No tape is built. Values materialize inside typed getters, which read
//! the token at the current structural index, dispatch to the scalar
//! parsers, and advance the cursor. Container iterators lend values that
//! borrow the shared cursor, so advancing a child advances the parent;
//! values left unread are skipped on the next sibling advance.
//!
//! Reads must follow input order. A container iterator whose underlying
//! cursor has moved behind its scope (or to another document of a stream)
//! fails with [`Error::OutOfOrderIteration`].

pub(crate) mod stream;

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::number::{parse_number, Number};
use crate::stage2::{is_valid_false_atom, is_valid_null_atom, is_valid_true_atom};
use crate::strings::parse_string;

/// Cursor state owned by the parser context so document streams can hand
/// out successive views over it.
#[derive(Debug)]
pub(crate) struct IterState {
    /// Next structural slot to consume.
    pub(crate) pos: usize,
    /// Open containers entered through the on-demand getters.
    pub(crate) depth: usize,
    /// Bumped whenever the cursor is rebound to a new document; stale
    /// container iterators notice through this.
    pub(crate) generation: u64,
}

impl IterState {
    pub(crate) fn new() -> Self {
        IterState {
            pos: 0,
            depth: 0,
            generation: 0,
        }
    }
}

/// The shared cursor: structural stream in, scalar values out.
#[derive(Debug)]
pub(crate) struct JsonIterator<'p, 'b> {
    pub(crate) buf: &'b [u8],
    pub(crate) structurals: &'p [u32],
    /// Structural count excluding the sentinel.
    pub(crate) n: usize,
    pub(crate) state: &'p mut IterState,
    pub(crate) strings: &'p mut Vec<u8>,
}

impl<'p, 'b> JsonIterator<'p, 'b> {
    #[inline]
    fn at_end(&self) -> bool {
        self.state.pos >= self.n
    }

    /// Byte offset and first byte of the current token.
    #[inline]
    fn current(&self) -> Result<(usize, u8)> {
        if self.at_end() {
            return Err(Error::TapeError);
        }
        let idx = self.structurals[self.state.pos] as usize;
        Ok((idx, self.buf[idx]))
    }

    #[inline]
    fn consume(&mut self) {
        self.state.pos += 1;
    }

    /// Walks forward until the container depth returns to `target`,
    /// consuming everything on the way.
    fn skip_to_depth(&mut self, target: usize) -> Result<()> {
        while self.state.depth > target {
            let (_, c) = self.current()?;
            self.consume();
            match c {
                b'{' | b'[' => self.state.depth += 1,
                b'}' | b']' => self.state.depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    /// Skips one whole value (scalar or container) at the cursor.
    fn skip_value(&mut self) -> Result<()> {
        let (_, c) = self.current()?;
        match c {
            b'{' | b'[' => {
                let target = self.state.depth;
                self.consume();
                self.state.depth += 1;
                self.skip_to_depth(target)
            }
            _ => {
                self.consume();
                Ok(())
            }
        }
    }

    fn get_i64(&mut self) -> Result<i64> {
        let (idx, c) = self.current()?;
        if !matches!(c, b'-' | b'0'..=b'9') {
            return Err(Error::IncorrectType);
        }
        match parse_number(self.buf, idx)? {
            Number::I64(v) => {
                self.consume();
                Ok(v)
            }
            Number::U64(_) => Err(Error::NumberOutOfRange),
            Number::F64(_) => Err(Error::IncorrectType),
        }
    }

    fn get_u64(&mut self) -> Result<u64> {
        let (idx, c) = self.current()?;
        if !matches!(c, b'-' | b'0'..=b'9') {
            return Err(Error::IncorrectType);
        }
        match parse_number(self.buf, idx)? {
            Number::U64(v) => {
                self.consume();
                Ok(v)
            }
            Number::I64(v) if v >= 0 => {
                self.consume();
                Ok(v as u64)
            }
            Number::I64(_) => Err(Error::NumberOutOfRange),
            Number::F64(_) => Err(Error::IncorrectType),
        }
    }

    fn get_f64(&mut self) -> Result<f64> {
        let (idx, c) = self.current()?;
        if !matches!(c, b'-' | b'0'..=b'9') {
            return Err(Error::IncorrectType);
        }
        let v = match parse_number(self.buf, idx)? {
            Number::I64(v) => v as f64,
            Number::U64(v) => v as f64,
            Number::F64(v) => v,
        };
        self.consume();
        Ok(v)
    }

    fn get_bool(&mut self) -> Result<bool> {
        let (idx, c) = self.current()?;
        match c {
            b't' if is_valid_true_atom(self.buf, idx) => {
                self.consume();
                Ok(true)
            }
            b't' => Err(Error::TrueAtomError),
            b'f' if is_valid_false_atom(self.buf, idx) => {
                self.consume();
                Ok(false)
            }
            b'f' => Err(Error::FalseAtomError),
            _ => Err(Error::IncorrectType),
        }
    }

    fn get_null(&mut self) -> Result<()> {
        let (idx, c) = self.current()?;
        match c {
            b'n' if is_valid_null_atom(self.buf, idx) => {
                self.consume();
                Ok(())
            }
            b'n' => Err(Error::NullAtomError),
            _ => Err(Error::IncorrectType),
        }
    }

    /// Unescapes the string at the cursor into the scratch and returns its
    /// body range there.
    fn read_string_range(&mut self) -> Result<(usize, usize)> {
        let (idx, c) = self.current()?;
        if c != b'"' {
            return Err(Error::IncorrectType);
        }
        let s = parse_string(self.buf, idx, self.strings)?;
        self.consume();
        Ok((s.begin, s.len))
    }
}

/// A lazily parsed document.
///
/// Getters consume the root value; container getters return lending
/// iterators. Type mismatches leave the cursor unchanged.
#[derive(Debug)]
pub struct OndemandDocument<'p, 'b> {
    iter: JsonIterator<'p, 'b>,
}

impl<'p, 'b> OndemandDocument<'p, 'b> {
    pub(crate) fn over(
        buf: &'b [u8],
        structurals: &'p [u32],
        n: usize,
        state: &'p mut IterState,
        strings: &'p mut Vec<u8>,
    ) -> Self {
        OndemandDocument {
            iter: JsonIterator {
                buf,
                structurals,
                n,
                state,
                strings,
            },
        }
    }

    /// True once every token of the document's batch has been consumed.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.iter.at_end()
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.iter.get_i64()
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.iter.get_u64()
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.iter.get_f64()
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        self.iter.get_bool()
    }

    pub fn get_null(&mut self) -> Result<()> {
        self.iter.get_null()
    }

    pub fn get_string(&mut self) -> Result<&str> {
        let (begin, len) = self.iter.read_string_range()?;
        core::str::from_utf8(&self.iter.strings[begin..begin + len])
            .map_err(|_| Error::StringError)
    }

    pub fn get_array(&mut self) -> Result<ArrayIter<'_, 'p, 'b>> {
        ArrayIter::begin(&mut self.iter)
    }

    pub fn get_object(&mut self) -> Result<ObjectIter<'_, 'p, 'b>> {
        ObjectIter::begin(&mut self.iter)
    }

    /// Skips the root value without materializing it.
    pub fn skip(&mut self) -> Result<()> {
        self.iter.skip_value()
    }
}

/// One value lent out by a container iterator (or nested getter).
#[derive(Debug)]
pub struct OndemandValue<'a, 'p, 'b> {
    iter: &'a mut JsonIterator<'p, 'b>,
}

impl<'a, 'p, 'b> OndemandValue<'a, 'p, 'b> {
    pub fn get_i64(&mut self) -> Result<i64> {
        self.iter.get_i64()
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.iter.get_u64()
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.iter.get_f64()
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        self.iter.get_bool()
    }

    pub fn get_null(&mut self) -> Result<()> {
        self.iter.get_null()
    }

    pub fn get_string(&mut self) -> Result<&str> {
        let (begin, len) = self.iter.read_string_range()?;
        core::str::from_utf8(&self.iter.strings[begin..begin + len])
            .map_err(|_| Error::StringError)
    }

    pub fn get_array(&mut self) -> Result<ArrayIter<'_, 'p, 'b>> {
        ArrayIter::begin(&mut *self.iter)
    }

    pub fn get_object(&mut self) -> Result<ObjectIter<'_, 'p, 'b>> {
        ObjectIter::begin(&mut *self.iter)
    }
}

/// Shared restore logic: bring the cursor back to this iterator's depth,
/// skipping whatever the caller left unread.
fn restore_cursor(
    iter: &mut JsonIterator<'_, '_>,
    depth: usize,
    generation: u64,
    last_yield: Option<usize>,
) -> Result<()> {
    if iter.state.generation != generation {
        return Err(Error::OutOfOrderIteration);
    }
    if iter.state.depth > depth {
        iter.skip_to_depth(depth)?;
    } else if iter.state.depth < depth {
        return Err(Error::OutOfOrderIteration);
    } else if let Some(p) = last_yield {
        if iter.state.pos == p {
            iter.skip_value()?;
        }
    }
    Ok(())
}

/// Lending iterator over array elements.
pub struct ArrayIter<'a, 'p, 'b> {
    iter: &'a mut JsonIterator<'p, 'b>,
    depth: usize,
    generation: u64,
    first: bool,
    done: bool,
    last_yield: Option<usize>,
}

impl<'a, 'p, 'b> ArrayIter<'a, 'p, 'b> {
    fn begin(iter: &'a mut JsonIterator<'p, 'b>) -> Result<Self> {
        let (_, c) = iter.current()?;
        if c != b'[' {
            return Err(Error::IncorrectType);
        }
        iter.consume();
        iter.state.depth += 1;
        let depth = iter.state.depth;
        let generation = iter.state.generation;
        Ok(ArrayIter {
            iter,
            depth,
            generation,
            first: true,
            done: false,
            last_yield: None,
        })
    }

    /// The next element, or `Ok(None)` at the closing bracket.
    pub fn next_element(&mut self) -> Result<Option<OndemandValue<'_, 'p, 'b>>> {
        if self.done {
            return Ok(None);
        }
        restore_cursor(self.iter, self.depth, self.generation, self.last_yield)?;
        let (_, c) = self.iter.current()?;
        if self.first {
            self.first = false;
            if c == b']' {
                self.iter.consume();
                self.iter.state.depth -= 1;
                self.done = true;
                return Ok(None);
            }
        } else {
            match c {
                b',' => self.iter.consume(),
                b']' => {
                    self.iter.consume();
                    self.iter.state.depth -= 1;
                    self.done = true;
                    return Ok(None);
                }
                _ => return Err(Error::TapeError),
            }
        }
        self.last_yield = Some(self.iter.state.pos);
        Ok(Some(OndemandValue {
            iter: &mut *self.iter,
        }))
    }
}

/// An object key, viewed raw in the input buffer and unescaped on demand.
#[derive(Clone, Copy)]
pub struct RawKey<'b> {
    bytes: &'b [u8],
    has_escapes: bool,
}

impl<'b> RawKey<'b> {
    fn at(buf: &'b [u8], idx: usize) -> Result<Self> {
        let mut i = idx + 1;
        let mut has_escapes = false;
        loop {
            match buf.get(i).copied() {
                None => return Err(Error::UnclosedString),
                Some(b'"') => break,
                Some(b'\\') => {
                    has_escapes = true;
                    i += 2;
                }
                Some(_) => i += 1,
            }
        }
        Ok(RawKey {
            bytes: &buf[idx + 1..i],
            has_escapes,
        })
    }

    /// The key bytes exactly as they appear in the input.
    #[must_use]
    pub fn raw_bytes(&self) -> &'b [u8] {
        self.bytes
    }

    /// Exact-match comparison; escape-free keys compare without copying.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if !self.has_escapes {
            return self.bytes == name.as_bytes();
        }
        self.unescaped().map(|s| s == name).unwrap_or(false)
    }

    /// The unescaped key text; borrows the input when no escapes occur.
    pub fn unescaped(&self) -> Result<Cow<'b, str>> {
        if !self.has_escapes {
            return core::str::from_utf8(self.bytes)
                .map(Cow::Borrowed)
                .map_err(|_| Error::StringError);
        }
        // Rebuild a quoted token and run it through the unescaper.
        let mut token = Vec::with_capacity(self.bytes.len() + 2);
        token.push(b'"');
        token.extend_from_slice(self.bytes);
        token.push(b'"');
        let mut scratch = Vec::with_capacity(self.bytes.len() + 8);
        let s = parse_string(&token, 0, &mut scratch)?;
        String::from_utf8(scratch[s.begin..s.begin + s.len].to_vec())
            .map(Cow::Owned)
            .map_err(|_| Error::StringError)
    }
}

/// Lending iterator over object fields.
pub struct ObjectIter<'a, 'p, 'b> {
    iter: &'a mut JsonIterator<'p, 'b>,
    depth: usize,
    generation: u64,
    first: bool,
    done: bool,
    last_yield: Option<usize>,
}

impl<'a, 'p, 'b> ObjectIter<'a, 'p, 'b> {
    fn begin(iter: &'a mut JsonIterator<'p, 'b>) -> Result<Self> {
        let (_, c) = iter.current()?;
        if c != b'{' {
            return Err(Error::IncorrectType);
        }
        iter.consume();
        iter.state.depth += 1;
        let depth = iter.state.depth;
        let generation = iter.state.generation;
        Ok(ObjectIter {
            iter,
            depth,
            generation,
            first: true,
            done: false,
            last_yield: None,
        })
    }

    /// The next key/value pair, or `Ok(None)` at the closing brace.
    pub fn next_field(&mut self) -> Result<Option<(RawKey<'b>, OndemandValue<'_, 'p, 'b>)>> {
        if self.done {
            return Ok(None);
        }
        restore_cursor(self.iter, self.depth, self.generation, self.last_yield)?;
        let (_, c) = self.iter.current()?;
        if self.first {
            self.first = false;
            if c == b'}' {
                self.iter.consume();
                self.iter.state.depth -= 1;
                self.done = true;
                return Ok(None);
            }
        } else {
            match c {
                b',' => self.iter.consume(),
                b'}' => {
                    self.iter.consume();
                    self.iter.state.depth -= 1;
                    self.done = true;
                    return Ok(None);
                }
                _ => return Err(Error::TapeError),
            }
        }
        let (idx, c) = self.iter.current()?;
        if c != b'"' {
            return Err(Error::TapeError);
        }
        let key = RawKey::at(self.iter.buf, idx)?;
        self.iter.consume();
        let (_, colon) = self.iter.current()?;
        if colon != b':' {
            return Err(Error::TapeError);
        }
        self.iter.consume();
        self.last_yield = Some(self.iter.state.pos);
        Ok(Some((
            key,
            OndemandValue {
                iter: &mut *self.iter,
            },
        )))
    }
}
