//! String token unescaping into the parser's scratch buffer.
//!
//! Copies the bytes between an opening quote and its unescaped closing quote
//! into the scratch, resolving escapes on the way. The scratch layout per
//! string is a 4-byte little-endian length, the unescaped UTF-8 bytes, and a
//! NUL terminator; strings never overlap.
//!
//! The copy loop runs over 8-byte words, bailing to byte-wise handling at
//! the first quote, backslash, or control byte, so the common escape-free
//! case is a straight copy.

use crate::error::{Error, Result};

/// Where an unescaped string landed in the scratch buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StringIndex {
    /// Offset of the 4-byte length prefix; this is the tape payload.
    pub(crate) payload: usize,
    /// Offset of the first body byte.
    pub(crate) begin: usize,
    /// Body length in bytes.
    pub(crate) len: usize,
}

const ONES: u64 = 0x0101_0101_0101_0101;
const HIGHS: u64 = 0x8080_8080_8080_8080;

/// Per-byte mask of positions equal to `b`; exact up to and including the
/// first match.
#[inline]
fn has_byte(word: u64, b: u8) -> u64 {
    let diff = word ^ (ONES * u64::from(b));
    diff.wrapping_sub(ONES) & !diff & HIGHS
}

/// Per-byte mask of positions below 0x20; exact up to and including the
/// first hit.
#[inline]
fn has_control(word: u64) -> u64 {
    word.wrapping_sub(ONES * 0x20) & !word & HIGHS
}

#[inline]
fn hex_digit(b: u8) -> Result<u32> {
    match b {
        b'0'..=b'9' => Ok(u32::from(b - b'0')),
        b'a'..=b'f' => Ok(u32::from(b - b'a') + 10),
        b'A'..=b'F' => Ok(u32::from(b - b'A') + 10),
        _ => Err(Error::StringError),
    }
}

/// Reads four hex digits at `buf[i..i + 4]`.
fn parse_hex4(buf: &[u8], i: usize) -> Result<u32> {
    if i + 4 > buf.len() {
        return Err(Error::StringError);
    }
    Ok(hex_digit(buf[i])? << 12
        | hex_digit(buf[i + 1])? << 8
        | hex_digit(buf[i + 2])? << 4
        | hex_digit(buf[i + 3])?)
}

/// Unescapes the string whose opening quote sits at `buf[offset]` into
/// `scratch`.
pub(crate) fn parse_string(buf: &[u8], offset: usize, scratch: &mut Vec<u8>) -> Result<StringIndex> {
    debug_assert_eq!(buf[offset], b'"');
    let payload = scratch.len();
    scratch.extend_from_slice(&[0u8; 4]);
    let begin = scratch.len();

    let mut i = offset + 1;
    loop {
        // Word-at-a-time fast path: copy until the next quote, backslash,
        // or control byte.
        while i + 8 <= buf.len() {
            let word = u64::from_le_bytes(buf[i..i + 8].try_into().map_err(|_| Error::UnexpectedError)?);
            let special = has_byte(word, b'"') | has_byte(word, b'\\') | has_control(word);
            if special == 0 {
                scratch.extend_from_slice(&buf[i..i + 8]);
                i += 8;
                continue;
            }
            let first = special.trailing_zeros() as usize / 8;
            scratch.extend_from_slice(&buf[i..i + first]);
            i += first;
            break;
        }

        let c = *buf.get(i).ok_or(Error::UnclosedString)?;
        match c {
            b'"' => break,
            b'\\' => {
                let esc = *buf.get(i + 1).ok_or(Error::StringError)?;
                match esc {
                    b'"' => scratch.push(b'"'),
                    b'\\' => scratch.push(b'\\'),
                    b'/' => scratch.push(b'/'),
                    b'b' => scratch.push(0x08),
                    b'f' => scratch.push(0x0C),
                    b'n' => scratch.push(0x0A),
                    b'r' => scratch.push(0x0D),
                    b't' => scratch.push(0x09),
                    b'u' => {
                        i = unescape_unicode(buf, i, scratch)?;
                        continue;
                    }
                    _ => return Err(Error::StringError),
                }
                i += 2;
            }
            c if c < 0x20 => return Err(Error::StringError),
            c => {
                // Only reached near the end of the padded region where the
                // word loop cannot run.
                scratch.push(c);
                i += 1;
            }
        }
    }

    let len = scratch.len() - begin;
    let prefix = (len as u32).to_le_bytes();
    scratch[payload..payload + 4].copy_from_slice(&prefix);
    scratch.push(0);
    Ok(StringIndex {
        payload,
        begin,
        len,
    })
}

/// Handles `\uXXXX`, including surrogate pairs; `i` points at the
/// backslash. Returns the index just past the consumed escape(s).
fn unescape_unicode(buf: &[u8], i: usize, scratch: &mut Vec<u8>) -> Result<usize> {
    let high = parse_hex4(buf, i + 2)?;
    let mut next = i + 6;
    let code = if (0xD800..0xDC00).contains(&high) {
        if buf.get(next) != Some(&b'\\') || buf.get(next + 1) != Some(&b'u') {
            return Err(Error::StringError);
        }
        let low = parse_hex4(buf, next + 2)?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(Error::StringError);
        }
        next += 6;
        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
    } else if (0xDC00..0xE000).contains(&high) {
        // A lone low surrogate cannot start a pair.
        return Err(Error::StringError);
    } else {
        high
    };
    let ch = char::from_u32(code).ok_or(Error::StringError)?;
    let mut tmp = [0u8; 4];
    scratch.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
    Ok(next)
}
