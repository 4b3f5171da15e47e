//! JSON number token parsing.
//!
//! Given a byte offset into the padded input, parses one RFC 8259 number
//! token. Plain integers take a 64-bit accumulation path and surface as
//! signed or unsigned values; anything with a fraction, an exponent, or an
//! overflowing integer part converts to a correctly rounded double from the
//! grammar-validated token slice.
//!
//! The caller guarantees the token is terminated by a structural byte,
//! whitespace, or the buffer's NUL padding. At document boundaries stage 2
//! arranges this with a space-terminated copy.

use crate::error::{Error, Result};

/// True for the bytes that may legally follow a scalar token: the structural
/// set, JSON whitespace, and NUL (the padding terminator).
pub(crate) static STRUCTURAL_OR_WHITESPACE_OR_NULL: [bool; 256] = build_terminator_table();

const fn build_terminator_table() -> [bool; 256] {
    let mut table = [false; 256];
    let terminators = [
        0x00u8, b' ', b'\t', b'\n', b'\r', b'{', b'}', b'[', b']', b':', b',',
    ];
    let mut i = 0;
    while i < terminators.len() {
        table[terminators[i] as usize] = true;
        i += 1;
    }
    table
}

/// A parsed number, tagged the way it will land on the tape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    I64(i64),
    U64(u64),
    F64(f64),
}

/// Parses the number token starting at `buf[offset]`.
pub(crate) fn parse_number(buf: &[u8], offset: usize) -> Result<Number> {
    let mut i = offset;
    let negative = buf[i] == b'-';
    if negative {
        i += 1;
    }

    if !buf[i].is_ascii_digit() {
        return Err(Error::NumberError);
    }

    // Integer part. A leading zero must stand alone.
    let mut value = 0u64;
    let mut overflowed = false;
    if buf[i] == b'0' {
        i += 1;
        if buf[i].is_ascii_digit() {
            return Err(Error::NumberError);
        }
    } else {
        while buf[i].is_ascii_digit() {
            let digit = u64::from(buf[i] - b'0');
            let (shifted, mul_over) = value.overflowing_mul(10);
            let (next, add_over) = shifted.overflowing_add(digit);
            overflowed |= mul_over || add_over;
            value = next;
            i += 1;
        }
    }

    let mut is_float = false;

    if buf[i] == b'.' {
        is_float = true;
        i += 1;
        if !buf[i].is_ascii_digit() {
            return Err(Error::NumberError);
        }
        while buf[i].is_ascii_digit() {
            i += 1;
        }
    }

    if buf[i] == b'e' || buf[i] == b'E' {
        is_float = true;
        i += 1;
        if buf[i] == b'+' || buf[i] == b'-' {
            i += 1;
        }
        if !buf[i].is_ascii_digit() {
            return Err(Error::NumberError);
        }
        while buf[i].is_ascii_digit() {
            i += 1;
        }
    }

    if !STRUCTURAL_OR_WHITESPACE_OR_NULL[buf[i] as usize] {
        return Err(Error::NumberError);
    }

    if !is_float && !overflowed {
        if negative {
            // -0 keeps its sign by becoming a double.
            if value == 0 {
                return Ok(Number::F64(-0.0));
            }
            if value == i64::MAX as u64 + 1 {
                return Ok(Number::I64(i64::MIN));
            }
            if value <= i64::MAX as u64 {
                return Ok(Number::I64(-(value as i64)));
            }
            // Magnitude beyond i64: fall through to the double path.
        } else {
            if value <= i64::MAX as u64 {
                return Ok(Number::I64(value as i64));
            }
            return Ok(Number::U64(value));
        }
    }

    // The token passed the grammar above, so the slice is ASCII and within
    // Rust's float grammar; std's conversion is correctly rounded.
    let token = core::str::from_utf8(&buf[offset..i]).map_err(|_| Error::NumberError)?;
    token.parse::<f64>().map(Number::F64).map_err(|_| Error::NumberError)
}
