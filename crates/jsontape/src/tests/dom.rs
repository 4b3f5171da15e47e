use super::{assert_tape_invariants, parse_err, with_doc};
use crate::{Error, PaddedBytes, Parser, ParserOptions, TapeType};

#[test]
fn object_with_mixed_values() {
    with_doc(r#"{"a":1,"b":[2,3.5,true]}"#, |doc| {
        assert_tape_invariants(&doc);

        let mut c = doc.root();
        assert_eq!(c.tape_type(), TapeType::StartObject);

        assert!(c.move_to_key("a"));
        assert_eq!(c.tape_type(), TapeType::Int64);
        assert_eq!(c.get_integer().unwrap(), 1);
        assert!(c.up());

        assert!(c.move_to_key("b"));
        assert_eq!(c.tape_type(), TapeType::StartArray);
        assert!(c.down());
        assert_eq!(c.get_integer().unwrap(), 2);
        assert!(c.next());
        assert_eq!(c.get_double().unwrap(), 3.5);
        assert!(c.next());
        assert!(c.get_bool().unwrap());
        assert!(!c.next(), "no fourth element");
    });
}

#[test]
fn bare_true_document() {
    with_doc("true", |doc| {
        assert_tape_invariants(&doc);
        assert_eq!(doc.tape_len(), 3);
        let c = doc.root();
        assert_eq!(c.tape_type(), TapeType::True);
        assert!(c.get_bool().unwrap());
    });
}

#[test]
fn cursor_navigation_contracts() {
    with_doc(r#"[10,[20,30],{"x":40}]"#, |doc| {
        let mut c = doc.root();
        assert!(c.down());
        assert_eq!(c.get_integer().unwrap(), 10);
        assert!(!c.prev(), "first child has no predecessor");
        assert!(c.next());
        assert_eq!(c.tape_type(), TapeType::StartArray);
        assert!(c.next());
        assert_eq!(c.tape_type(), TapeType::StartObject);
        assert!(!c.next(), "last child has no successor");
        assert!(c.prev());
        assert_eq!(c.tape_type(), TapeType::StartArray);
        assert!(c.down());
        assert_eq!(c.get_integer().unwrap(), 20);
        assert!(c.up());
        assert!(c.up());
        assert_eq!(c.tape_type(), TapeType::StartArray);
        assert!(!c.up(), "root has no parent");
    });
}

#[test]
fn empty_containers() {
    with_doc(r#"{"a":[],"b":{}}"#, |doc| {
        assert_tape_invariants(&doc);
        let mut c = doc.root();
        assert!(c.move_to_key("a"));
        assert!(!c.down(), "empty array has no children");
        assert!(c.up());
        assert!(c.move_to_key("b"));
        assert!(!c.down(), "empty object has no children");
    });
}

#[test]
fn key_lookup_misses_leave_the_cursor_alone() {
    with_doc(r#"{"a":1,"b":2}"#, |doc| {
        let mut c = doc.root();
        assert!(!c.move_to_key("missing"));
        assert_eq!(c.tape_type(), TapeType::StartObject);
        assert_eq!(c.at_key("missing").unwrap_err(), Error::NoSuchField);
        // Errors are non-sticky; the same cursor still works.
        assert_eq!(c.at_key("b").unwrap().get_integer().unwrap(), 2);
    });
}

#[test]
fn array_index_access() {
    with_doc(r#"[1,"two",3]"#, |doc| {
        let c = doc.root();
        assert_eq!(c.at_index(0).unwrap().get_integer().unwrap(), 1);
        assert_eq!(c.at_index(1).unwrap().get_string().unwrap(), "two");
        assert_eq!(c.at_index(2).unwrap().get_integer().unwrap(), 3);
        assert_eq!(c.at_index(3).unwrap_err(), Error::IndexOutOfBounds);
    });
}

#[test]
fn typed_accessor_mismatches_are_non_sticky() {
    with_doc(r#"["text"]"#, |doc| {
        let mut c = doc.root();
        assert!(c.down());
        assert_eq!(c.get_integer().unwrap_err(), Error::IncorrectType);
        assert_eq!(c.get_double().unwrap_err(), Error::IncorrectType);
        // Cursor unchanged; the right accessor still succeeds.
        assert_eq!(c.get_string().unwrap(), "text");
    });
}

#[test]
fn unsigned_and_signed_conversions() {
    with_doc(r#"[9223372036854775808,-1,1]"#, |doc| {
        let c = doc.root();
        let big = c.at_index(0).unwrap();
        assert_eq!(c.at_index(0).unwrap().get_unsigned().unwrap(), 1 << 63);
        assert_eq!(big.get_integer().unwrap_err(), Error::NumberOutOfRange);
        assert_eq!(
            c.at_index(1).unwrap().get_unsigned().unwrap_err(),
            Error::NumberOutOfRange
        );
        assert_eq!(c.at_index(2).unwrap().get_unsigned().unwrap(), 1);
    });
}

#[test]
fn structural_rejections() {
    assert_eq!(parse_err("["), Error::TapeError);
    assert_eq!(parse_err(r#"{"a":}"#), Error::TapeError);
    assert_eq!(parse_err("\"\u{1}\""), Error::UnescapedChars);
    assert_eq!(parse_err("{,}"), Error::TapeError);
    assert_eq!(parse_err("[1 2]"), Error::TapeError);
    assert_eq!(parse_err("nul"), Error::NullAtomError);
    assert_eq!(parse_err("truex"), Error::TrueAtomError);
    assert_eq!(parse_err("falsehood"), Error::FalseAtomError);
    assert_eq!(parse_err("{} {}"), Error::TapeError);
}

#[test]
fn adversarial_truncated_nesting_is_rejected() {
    let input = "[7,7,7,7,6,7,7,7,6,7,7,6,[7,7,7,7,6,7,7,7,6,7,7,6,7,7,7,7,7,7,6";
    assert_eq!(parse_err(input), Error::TapeError);
}

#[test]
fn depth_limit_is_enforced() {
    let mut parser = Parser::with_options(ParserOptions {
        max_depth: 512,
        ..Default::default()
    });
    let mut deep = String::new();
    for _ in 0..1023 {
        deep.push_str("{\"a\":");
    }
    deep.push_str("null");
    for _ in 0..1023 {
        deep.push('}');
    }
    let input = PaddedBytes::from(deep);
    assert_eq!(parser.parse(&input).unwrap_err(), Error::DepthError);
}

#[test]
fn deep_nesting_within_the_limit_parses() {
    let mut parser = Parser::with_options(ParserOptions {
        max_depth: 512,
        ..Default::default()
    });
    let depth = 500;
    let mut deep = String::new();
    for _ in 0..depth {
        deep.push('[');
    }
    for _ in 0..depth {
        deep.push(']');
    }
    let input = PaddedBytes::from(deep);
    let doc = parser.parse(&input).expect("within depth limit");
    assert_tape_invariants(&doc);
}

#[test]
fn parser_context_is_reusable_after_errors() {
    let mut parser = Parser::new();
    let bad = PaddedBytes::from("[1,");
    assert!(parser.parse(&bad).is_err());
    let good = PaddedBytes::from("[1,2]");
    let doc = parser.parse(&good).expect("context stays usable");
    assert_tape_invariants(&doc);
}

#[test]
fn display_reserializes_compact_json() {
    for json in [
        r#"{"a":1,"b":[2,3.5,true],"c":null}"#,
        r#"[[],{},["nested",{"k":false}]]"#,
        r#""just a string""#,
        "42",
        r#"{"esc":"a\"b\\c\nd"}"#,
    ] {
        with_doc(json, |doc| {
            let printed = doc.to_string();
            assert_eq!(
                printed.as_bytes(),
                crate::minified(json.as_bytes()).unwrap().as_slice(),
                "round trip for {json}"
            );
        });
    }
}

#[test]
fn capacity_limit_is_enforced() {
    let mut parser = Parser::with_options(ParserOptions {
        max_capacity: 16,
        ..Default::default()
    });
    let input = PaddedBytes::from(r#"{"too":"big","x":1}"#);
    assert_eq!(parser.parse(&input).unwrap_err(), Error::Capacity);
}

#[test]
fn tape_dump_is_stable() {
    with_doc("[1]", |doc| {
        insta::assert_snapshot!(doc.dump_tape(), @r"
        0 : r // pointing to 5
        1 : [ // pointing to 4 (matching close)
        2 : integer 1
        4 : ] // pointing to 1 (matching open)
        5 : r // pointing to 0
        ");
    });
}
