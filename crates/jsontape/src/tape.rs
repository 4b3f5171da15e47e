//! The tape: a flat, index-addressable encoding of a parsed document.
//!
//! Each cell is 64 bits: an 8-bit type tag in the top byte and a 56-bit
//! payload. Containers cross-link: an open cell's payload is the tape index
//! of its matching close, and vice versa, so sibling skips are O(1). The
//! two `r` cells bracket the document: cell 0 points at the final cell,
//! and the final cell points back to 0.
//!
//! Numeric cells are pairs: the tag cell is followed by one raw 64-bit cell
//! holding the value bits. String payloads are byte offsets into the string
//! scratch buffer, where a 4-byte little-endian length precedes the body.

use std::fmt;

use crate::error::{Error, Result};

pub(crate) const TAPE_TYPE_SHIFT: u32 = 56;
pub(crate) const TAPE_PAYLOAD_MASK: u64 = (1 << TAPE_TYPE_SHIFT) - 1;

#[inline]
pub(crate) fn encode(tag: u8, payload: u64) -> u64 {
    (u64::from(tag) << TAPE_TYPE_SHIFT) | (payload & TAPE_PAYLOAD_MASK)
}

#[inline]
pub(crate) fn tag_of(cell: u64) -> u8 {
    (cell >> TAPE_TYPE_SHIFT) as u8
}

#[inline]
pub(crate) fn payload_of(cell: u64) -> u64 {
    cell & TAPE_PAYLOAD_MASK
}

/// The type tag of a tape cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TapeType {
    Root = b'r',
    StartObject = b'{',
    EndObject = b'}',
    StartArray = b'[',
    EndArray = b']',
    String = b'"',
    Int64 = b'l',
    Uint64 = b'u',
    Double = b'd',
    True = b't',
    False = b'f',
    Null = b'n',
}

impl TapeType {
    pub(crate) fn from_tag(tag: u8) -> Option<TapeType> {
        Some(match tag {
            b'r' => TapeType::Root,
            b'{' => TapeType::StartObject,
            b'}' => TapeType::EndObject,
            b'[' => TapeType::StartArray,
            b']' => TapeType::EndArray,
            b'"' => TapeType::String,
            b'l' => TapeType::Int64,
            b'u' => TapeType::Uint64,
            b'd' => TapeType::Double,
            b't' => TapeType::True,
            b'f' => TapeType::False,
            b'n' => TapeType::Null,
            _ => return None,
        })
    }
}

/// A parsed document: the tape plus the string scratch it references.
///
/// Borrowed from the parser context; valid until the context parses again.
#[derive(Clone, Copy, Debug)]
pub struct DomDocument<'a> {
    tape: &'a [u64],
    strings: &'a [u8],
}

impl<'a> DomDocument<'a> {
    pub(crate) fn new(tape: &'a [u64], strings: &'a [u8]) -> Self {
        debug_assert!(tape.len() >= 2);
        debug_assert_eq!(tag_of(tape[0]), b'r');
        debug_assert_eq!(tag_of(tape[tape.len() - 1]), b'r');
        DomDocument { tape, strings }
    }

    /// Cursor positioned at the root value.
    #[must_use]
    pub fn root(&self) -> TapeCursor<'a> {
        TapeCursor {
            tape: self.tape,
            strings: self.strings,
            idx: 1,
            scopes: Vec::new(),
        }
    }

    /// Number of tape cells, including the two root markers.
    #[must_use]
    pub fn tape_len(&self) -> usize {
        self.tape.len()
    }

    pub(crate) fn cell(&self, idx: usize) -> u64 {
        self.tape[idx]
    }

    /// Renders the annotated raw tape, one cell per line. A debugging aid.
    #[must_use]
    pub fn dump_tape(&self) -> String {
        use fmt::Write;
        let mut out = String::new();
        let mut idx = 0;
        while idx < self.tape.len() {
            let cell = self.tape[idx];
            let payload = payload_of(cell);
            let _ = write!(out, "{idx} : ");
            match tag_of(cell) {
                b'r' => {
                    let _ = writeln!(out, "r // pointing to {payload}");
                }
                b'{' | b'[' => {
                    let tag = tag_of(cell) as char;
                    let _ = writeln!(out, "{tag} // pointing to {payload} (matching close)");
                }
                b'}' | b']' => {
                    let tag = tag_of(cell) as char;
                    let _ = writeln!(out, "{tag} // pointing to {payload} (matching open)");
                }
                b'"' => {
                    let s = read_scratch_string(self.strings, payload as usize)
                        .unwrap_or("<bad string>");
                    let _ = writeln!(out, "string \"{s}\"");
                }
                b'l' => {
                    let v = self.tape[idx + 1] as i64;
                    let _ = writeln!(out, "integer {v}");
                    idx += 1;
                }
                b'u' => {
                    let v = self.tape[idx + 1];
                    let _ = writeln!(out, "unsigned {v}");
                    idx += 1;
                }
                b'd' => {
                    let v = f64::from_bits(self.tape[idx + 1]);
                    let _ = writeln!(out, "double {v}");
                    idx += 1;
                }
                b't' => {
                    let _ = writeln!(out, "true");
                }
                b'f' => {
                    let _ = writeln!(out, "false");
                }
                b'n' => {
                    let _ = writeln!(out, "null");
                }
                other => {
                    let _ = writeln!(out, "unknown tag {other:#x}");
                }
            }
            idx += 1;
        }
        out
    }
}

fn read_scratch_string(strings: &[u8], payload: usize) -> Result<&str> {
    let len_bytes: [u8; 4] = strings
        .get(payload..payload + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or(Error::UnexpectedError)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let body = strings
        .get(payload + 4..payload + 4 + len)
        .ok_or(Error::UnexpectedError)?;
    core::str::from_utf8(body).map_err(|_| Error::UnexpectedError)
}

/// A navigating cursor over the tape.
///
/// Cheap to clone; a clone is an independent bookmark.
#[derive(Clone)]
pub struct TapeCursor<'a> {
    tape: &'a [u64],
    strings: &'a [u8],
    idx: usize,
    /// Tape indexes of the enclosing container opens, innermost last.
    scopes: Vec<usize>,
}

impl<'a> TapeCursor<'a> {
    /// The type tag at the cursor.
    #[must_use]
    pub fn tape_type(&self) -> TapeType {
        TapeType::from_tag(tag_of(self.tape[self.idx])).unwrap_or(TapeType::Root)
    }

    /// The cursor's tape index.
    #[must_use]
    pub fn tape_index(&self) -> usize {
        self.idx
    }

    #[inline]
    fn cell(&self) -> u64 {
        self.tape[self.idx]
    }

    /// Cells occupied by the value at `idx`, container contents included.
    fn span_at(&self, idx: usize) -> usize {
        match tag_of(self.tape[idx]) {
            b'{' | b'[' => payload_of(self.tape[idx]) as usize - idx + 1,
            b'l' | b'u' | b'd' => 2,
            _ => 1,
        }
    }

    /// Moves to the first child of the container at the cursor.
    ///
    /// Returns `false` (cursor unchanged) when the container is empty. Only
    /// meaningful at `{` or `[`.
    pub fn down(&mut self) -> bool {
        let tag = tag_of(self.cell());
        if tag != b'{' && tag != b'[' {
            return false;
        }
        let close = payload_of(self.cell()) as usize;
        if close == self.idx + 1 {
            return false;
        }
        self.scopes.push(self.idx);
        self.idx += 1;
        true
    }

    /// Moves to the enclosing container's open cell.
    ///
    /// Returns `false` at the root.
    pub fn up(&mut self) -> bool {
        match self.scopes.pop() {
            Some(open) => {
                self.idx = open;
                true
            }
            None => false,
        }
    }

    /// Moves to the next sibling; `false` (cursor unchanged) when there is
    /// none.
    pub fn next(&mut self) -> bool {
        let candidate = self.idx + self.span_at(self.idx);
        match tag_of(self.tape[candidate]) {
            b'}' | b']' | b'r' => false,
            _ => {
                self.idx = candidate;
                true
            }
        }
    }

    /// Moves to the previous sibling; `false` (cursor unchanged) at the
    /// first child. O(n) in the scope size.
    pub fn prev(&mut self) -> bool {
        let first = match self.scopes.last() {
            Some(&open) => open + 1,
            None => return false,
        };
        if self.idx == first {
            return false;
        }
        let mut p = first;
        loop {
            let n = p + self.span_at(p);
            if n == self.idx {
                self.idx = p;
                return true;
            }
            debug_assert!(n < self.idx, "sibling chain must land on the cursor");
            p = n;
        }
    }

    /// At `{`: moves to the value of `key`. On a miss the cursor is
    /// unchanged and the result is `false`. O(n) linear scan, exact match.
    pub fn move_to_key(&mut self, key: &str) -> bool {
        if tag_of(self.cell()) != b'{' {
            return false;
        }
        let close = payload_of(self.cell()) as usize;
        let mut k = self.idx + 1;
        while k < close {
            debug_assert_eq!(tag_of(self.tape[k]), b'"', "object keys are strings");
            let found = read_scratch_string(self.strings, payload_of(self.tape[k]) as usize)
                .map(|s| s == key)
                .unwrap_or(false);
            let value = k + 1;
            if found {
                self.scopes.push(self.idx);
                self.idx = value;
                return true;
            }
            k = value + self.span_at(value);
        }
        false
    }

    /// At `[`: moves to element `i`. On an out-of-range index the cursor is
    /// unchanged and the result is `false`. O(n) traversal.
    pub fn move_to_index(&mut self, i: usize) -> bool {
        if tag_of(self.cell()) != b'[' {
            return false;
        }
        let close = payload_of(self.cell()) as usize;
        let mut k = self.idx + 1;
        let mut remaining = i;
        while k < close {
            if remaining == 0 {
                self.scopes.push(self.idx);
                self.idx = k;
                return true;
            }
            remaining -= 1;
            k += self.span_at(k);
        }
        false
    }

    /// Like [`TapeCursor::move_to_key`], but returns a new cursor at the
    /// value and leaves this one untouched.
    pub fn at_key(&self, key: &str) -> Result<TapeCursor<'a>> {
        let mut cursor = self.clone();
        if cursor.move_to_key(key) {
            Ok(cursor)
        } else if tag_of(self.cell()) == b'{' {
            Err(Error::NoSuchField)
        } else {
            Err(Error::IncorrectType)
        }
    }

    /// Like [`TapeCursor::move_to_index`], but returns a new cursor at the
    /// element and leaves this one untouched.
    pub fn at_index(&self, i: usize) -> Result<TapeCursor<'a>> {
        let mut cursor = self.clone();
        if cursor.move_to_index(i) {
            Ok(cursor)
        } else if tag_of(self.cell()) == b'[' {
            Err(Error::IndexOutOfBounds)
        } else {
            Err(Error::IncorrectType)
        }
    }

    /// Signed integer at the cursor. An unsigned cell converts when it
    /// fits; otherwise [`Error::NumberOutOfRange`].
    pub fn get_integer(&self) -> Result<i64> {
        match tag_of(self.cell()) {
            b'l' => Ok(self.tape[self.idx + 1] as i64),
            b'u' => {
                let v = self.tape[self.idx + 1];
                i64::try_from(v).map_err(|_| Error::NumberOutOfRange)
            }
            _ => Err(Error::IncorrectType),
        }
    }

    /// Unsigned integer at the cursor. A non-negative signed cell converts;
    /// a negative one is [`Error::NumberOutOfRange`].
    pub fn get_unsigned(&self) -> Result<u64> {
        match tag_of(self.cell()) {
            b'u' => Ok(self.tape[self.idx + 1]),
            b'l' => {
                let v = self.tape[self.idx + 1] as i64;
                u64::try_from(v).map_err(|_| Error::NumberOutOfRange)
            }
            _ => Err(Error::IncorrectType),
        }
    }

    /// Double at the cursor; strict, integers do not convert.
    pub fn get_double(&self) -> Result<f64> {
        match tag_of(self.cell()) {
            b'd' => Ok(f64::from_bits(self.tape[self.idx + 1])),
            _ => Err(Error::IncorrectType),
        }
    }

    /// Unescaped string at the cursor; borrows the parser's scratch.
    pub fn get_string(&self) -> Result<&'a str> {
        match tag_of(self.cell()) {
            b'"' => read_scratch_string(self.strings, payload_of(self.cell()) as usize),
            _ => Err(Error::IncorrectType),
        }
    }

    /// Boolean at the cursor.
    pub fn get_bool(&self) -> Result<bool> {
        match tag_of(self.cell()) {
            b't' => Ok(true),
            b'f' => Ok(false),
            _ => Err(Error::IncorrectType),
        }
    }

    /// True iff the cursor is on a `null` cell.
    #[must_use]
    pub fn is_null(&self) -> bool {
        tag_of(self.cell()) == b'n'
    }
}

impl fmt::Debug for TapeCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapeCursor")
            .field("idx", &self.idx)
            .field("type", &self.tape_type())
            .finish()
    }
}

/// Writes `s` as a JSON string literal with the mandatory escapes.
fn write_json_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            '\u{c}' => f.write_str("\\f")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

fn write_double(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if !v.is_finite() {
        // JSON has no spelling for infinities; follow the common
        // serializer convention.
        return f.write_str("null");
    }
    if v == v.trunc() {
        // Exponent form keeps integral doubles typed as doubles when the
        // output is parsed again.
        write!(f, "{v:e}")
    } else {
        write!(f, "{v}")
    }
}

/// Re-serializes the document as compact JSON text.
impl fmt::Display for DomDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // (is_object, emitted item count) per open scope.
        let mut stack: Vec<(bool, usize)> = Vec::new();
        let end = self.tape.len() - 1;
        let mut idx = 1;
        while idx < end {
            let cell = self.tape[idx];
            let tag = tag_of(cell);
            // Separator before anything that is not a scope close.
            if tag != b'}' && tag != b']' {
                if let Some(&mut (object, ref mut count)) = stack.last_mut() {
                    if object {
                        match *count % 2 {
                            0 if *count > 0 => f.write_str(",")?,
                            1 => f.write_str(":")?,
                            _ => {}
                        }
                    } else if *count > 0 {
                        f.write_str(",")?;
                    }
                    *count += 1;
                }
            }
            match tag {
                b'{' => {
                    f.write_str("{")?;
                    stack.push((true, 0));
                    idx += 1;
                }
                b'[' => {
                    f.write_str("[")?;
                    stack.push((false, 0));
                    idx += 1;
                }
                b'}' => {
                    f.write_str("}")?;
                    stack.pop();
                    idx += 1;
                }
                b']' => {
                    f.write_str("]")?;
                    stack.pop();
                    idx += 1;
                }
                b'"' => {
                    let s = read_scratch_string(self.strings, payload_of(cell) as usize)
                        .map_err(|_| fmt::Error)?;
                    write_json_string(f, s)?;
                    idx += 1;
                }
                b'l' => {
                    write!(f, "{}", self.tape[idx + 1] as i64)?;
                    idx += 2;
                }
                b'u' => {
                    write!(f, "{}", self.tape[idx + 1])?;
                    idx += 2;
                }
                b'd' => {
                    write_double(f, f64::from_bits(self.tape[idx + 1]))?;
                    idx += 2;
                }
                b't' => {
                    f.write_str("true")?;
                    idx += 1;
                }
                b'f' => {
                    f.write_str("false")?;
                    idx += 1;
                }
                b'n' => {
                    f.write_str("null")?;
                    idx += 1;
                }
                _ => return Err(fmt::Error),
            }
        }
        Ok(())
    }
}
