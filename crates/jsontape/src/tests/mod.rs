//! Crate-level scenario and property tests. Unit tests for individual
//! stages live next to their modules.

mod dom;
mod ondemand;

use crate::{DomDocument, Error, PaddedBytes, Parser};

/// Parses `json` with a fresh context and hands the document to `f`.
pub(crate) fn with_doc<T>(json: &str, f: impl FnOnce(DomDocument<'_>) -> T) -> T {
    let mut parser = Parser::new();
    let input = PaddedBytes::from(json);
    let doc = parser.parse(&input).expect("document should parse");
    f(doc)
}

/// Parses `json` expecting failure and returns the error.
pub(crate) fn parse_err(json: &str) -> Error {
    let mut parser = Parser::new();
    let input = PaddedBytes::from(json);
    parser.parse(&input).map(|_| ()).expect_err("parse should fail")
}

/// Checks the §tape invariants: bracketed by `r` cells, every container
/// open/close pair mutually linked, numeric cells paired.
pub(crate) fn assert_tape_invariants(doc: &DomDocument<'_>) {
    use crate::tape::{payload_of, tag_of};

    let n = doc.tape_len();
    assert!(n >= 2);
    assert_eq!(tag_of(doc.cell(0)), b'r');
    assert_eq!(tag_of(doc.cell(n - 1)), b'r');
    assert_eq!(payload_of(doc.cell(0)) as usize, n - 1);
    assert_eq!(payload_of(doc.cell(n - 1)), 0);

    let mut idx = 1;
    while idx < n - 1 {
        let cell = doc.cell(idx);
        match tag_of(cell) {
            b'{' | b'[' => {
                let close = payload_of(cell) as usize;
                assert!(close > idx, "close must come after open");
                assert!(close < n - 1, "close inside the document");
                let close_tag = tag_of(doc.cell(close));
                let expected = if tag_of(cell) == b'{' { b'}' } else { b']' };
                assert_eq!(close_tag, expected, "open/close tags must match");
                assert_eq!(
                    payload_of(doc.cell(close)) as usize,
                    idx,
                    "close must point back at its open"
                );
                idx += 1;
            }
            b'l' | b'u' | b'd' => idx += 2,
            b'}' | b']' | b'"' | b't' | b'f' | b'n' => idx += 1,
            other => panic!("unexpected tape tag {other:#x}"),
        }
    }
}
