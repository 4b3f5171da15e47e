//! A two-stage, data-parallel JSON parser.
//!
//! Parsing proceeds left to right through a fixed pipeline: a SIMD
//! structural scanner discovers every token boundary in 64-byte windows
//! (with UTF-8 validation on the side), then a stack-less state machine
//! consumes the discovered positions to validate the grammar and build a
//! flat, index-addressable *tape*. An alternative on-demand path skips the
//! tape entirely and materializes values lazily straight off the index
//! stream, which also powers streaming over concatenated documents.
//!
//! ```
//! use jsontape::{PaddedBytes, Parser};
//!
//! let input = PaddedBytes::from(r#"{"a":1,"b":[2,3.5,true]}"#);
//! let mut parser = Parser::new();
//! let doc = parser.parse(&input)?;
//! let mut cursor = doc.root();
//! assert!(cursor.move_to_key("a"));
//! assert_eq!(cursor.get_integer()?, 1);
//! # Ok::<(), jsontape::Error>(())
//! ```
//!
//! Errors are values throughout; see [`Error`] for the taxonomy. A
//! [`Parser`] context owns every buffer, is reusable across parses, and is
//! exclusive to one thread at a time; distinct contexts are independent.

mod error;
mod minify;
mod number;
mod ondemand;
mod options;
mod padded;
mod parser;
mod simd;
mod stage1;
mod stage2;
mod strings;
mod tape;

pub use error::{Error, Result};
pub use minify::{minified, minify};
pub use ondemand::stream::DocumentStream;
pub use ondemand::{ArrayIter, ObjectIter, OndemandDocument, OndemandValue, RawKey};
pub use options::{
    ParserOptions, DEFAULT_BATCH_SIZE, DEFAULT_MAX_DEPTH, MAX_CAPACITY, MINIMAL_BATCH_SIZE,
};
pub use padded::{PaddedBytes, PADDING};
pub use parser::Parser;
pub use tape::{DomDocument, TapeCursor, TapeType};

#[cfg(test)]
mod tests;
