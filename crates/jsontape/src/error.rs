//! The unified error taxonomy.
//!
//! Errors are values, never panics: every fallible operation in the crate
//! returns [`crate::Result`]. The message strings are stable and intended for
//! direct display to users.

use thiserror::Error;

/// All the ways a parse or a read can fail.
///
/// Two variants are *non-sticky*: [`Error::IncorrectType`] and
/// [`Error::NoSuchField`] leave the reader cursor unchanged, so the caller may
/// retry with a different accessor. Every other error aborts the operation
/// that produced it; the parser context itself stays reusable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The document exceeds the parser's configured capacity.
    #[error("this parser can't support a document that big")]
    Capacity,

    /// A buffer allocation failed.
    #[error("error allocating memory, we're most likely out of memory")]
    Allocation,

    /// The document structure is invalid (missing or superfluous commas,
    /// braces, colons, values).
    #[error("the JSON document has an improper structure")]
    TapeError,

    /// Container nesting exceeds the configured maximum depth.
    #[error("the JSON document was too deep (too many nested objects and arrays)")]
    DepthError,

    /// A string token could not be unescaped.
    #[error("problem while parsing a string")]
    StringError,

    /// A token starting with 't' was not exactly `true`.
    #[error("problem while parsing an atom starting with the letter 't'")]
    TrueAtomError,

    /// A token starting with 'f' was not exactly `false`.
    #[error("problem while parsing an atom starting with the letter 'f'")]
    FalseAtomError,

    /// A token starting with 'n' was not exactly `null`.
    #[error("problem while parsing an atom starting with the letter 'n'")]
    NullAtomError,

    /// A number token violated the JSON number grammar.
    #[error("problem while parsing a number")]
    NumberError,

    /// The input is not valid UTF-8.
    #[error("the input is not valid UTF-8")]
    Utf8Error,

    /// A string contains a raw control character (below 0x20) that must be
    /// escaped.
    #[error("found unescaped characters in a string")]
    UnescapedChars,

    /// The document ends inside a string.
    #[error("missing quote at the end")]
    UnclosedString,

    /// No JSON structure was found in the input.
    #[error("no structural element found")]
    Empty,

    /// An internal invariant was violated. Seeing this is a bug.
    #[error("indicative of a bug in the parser")]
    UnexpectedError,

    /// The value or iterator was used before being initialized.
    #[error("uninitialized")]
    Uninitialized,

    /// A typed accessor was applied to a value of another type. Non-sticky.
    #[error("the JSON element does not have the requested type")]
    IncorrectType,

    /// The requested key is absent from the object. Non-sticky.
    #[error("the JSON field referenced does not exist in this object")]
    NoSuchField,

    /// The number is valid JSON but does not fit in the requested integer
    /// width.
    #[error("the JSON number is too large or too small to fit within the requested type")]
    NumberOutOfRange,

    /// The requested array index is past the end of the array.
    #[error("attempted to access an element of a JSON array that is beyond its length")]
    IndexOutOfBounds,

    /// The parser context is already driving another parse.
    #[error("parser is already in use")]
    ParserInUse,

    /// Values were read from a document or stream out of their input order.
    #[error("values must be consumed in the order they appear in the input")]
    OutOfOrderIteration,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
