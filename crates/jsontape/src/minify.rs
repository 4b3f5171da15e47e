//! Whitespace-stripping minifier.
//!
//! Drops insignificant whitespace between tokens while passing string
//! bodies through untouched, using the same quote/backslash bookkeeping as
//! the structural scanner in scalar form. Grammar outside of strings is not
//! validated, but string trouble the copy loop can see is reported: an
//! unterminated string or an unknown escape fails the whole call.

use crate::error::{Error, Result};

/// Appends a minified copy of `input` to `out`.
///
/// On error `out` is restored to its original length.
pub fn minify(input: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let start = out.len();
    out.reserve(input.len());
    let mut in_string = false;
    let mut bytes = input.iter().copied();
    while let Some(b) = bytes.next() {
        if in_string {
            out.push(b);
            match b {
                b'\\' => {
                    let Some(esc) = bytes.next() else {
                        out.truncate(start);
                        return Err(Error::UnclosedString);
                    };
                    if !matches!(esc, b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' | b'u')
                    {
                        out.truncate(start);
                        return Err(Error::StringError);
                    }
                    out.push(esc);
                }
                b'"' => in_string = false,
                _ => {}
            }
        } else {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => {}
                b'"' => {
                    in_string = true;
                    out.push(b);
                }
                _ => out.push(b),
            }
        }
    }
    if in_string {
        out.truncate(start);
        return Err(Error::UnclosedString);
    }
    Ok(())
}

/// Convenience wrapper returning a fresh buffer.
pub fn minified(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    minify(input, &mut out)?;
    Ok(out)
}
