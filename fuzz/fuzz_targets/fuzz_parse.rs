//! Throws arbitrary bytes at the full DOM pipeline: must never panic,
//! must accept everything the reference parser accepts, and accepted
//! documents must re-serialize to JSON that a second parser agrees with.
#![no_main]

use libfuzzer_sys::fuzz_target;

use jsontape::Parser;

fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::new();
    let parsed = parser.parse_slice(data);

    // Acceptance oracle: anything serde_json takes (it is stricter on
    // depth and number range, never looser) we must take too.
    if serde_json::from_slice::<serde_json::Value>(data).is_ok() {
        assert!(
            parsed.is_ok(),
            "reference parser accepted input we rejected: {:?}",
            parsed.err()
        );
    }

    if let Ok(doc) = parsed {
        // Accepted input must survive re-serialization and the raw dump.
        let printed = doc.to_string();
        let _ = doc.dump_tape();
        // The reprint must itself be a document we accept.
        let mut second = Parser::new();
        second
            .parse_slice(printed.as_bytes())
            .expect("re-serialized output must parse");
    }
});
