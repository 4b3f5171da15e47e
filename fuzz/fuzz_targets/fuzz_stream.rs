//! Streams arbitrary bytes with arbitrary batch sizes: the stream must
//! terminate, never panic, and keep its error sticky.
#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use jsontape::{PaddedBytes, Parser};

#[derive(Debug, Arbitrary)]
struct StreamCase {
    batch_size: u16,
    data: Vec<u8>,
}

fuzz_target!(|case: StreamCase| {
    let mut parser = Parser::new();
    let input = PaddedBytes::from_slice(&case.data);
    let Ok(mut stream) = parser.iterate_many(&input, usize::from(case.batch_size)) else {
        return;
    };
    // A stream over n bytes can never yield more than n documents.
    let mut budget = case.data.len() + 1;
    loop {
        match stream.next_document() {
            Ok(Some(mut doc)) => {
                let _ = doc.get_i64();
            }
            Ok(None) => break,
            Err(e) => {
                // Errors must be sticky.
                assert_eq!(stream.next_document().unwrap_err(), e);
                break;
            }
        }
        budget = budget.checked_sub(1).expect("stream yielded too many documents");
    }
});
