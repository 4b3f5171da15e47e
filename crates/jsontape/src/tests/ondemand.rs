use crate::{Error, PaddedBytes, Parser};

#[test]
fn root_scalar_getters() {
    let mut parser = Parser::new();

    let input = PaddedBytes::from("42");
    assert_eq!(parser.iterate(&input).unwrap().get_i64().unwrap(), 42);

    let input = PaddedBytes::from("-7");
    assert_eq!(parser.iterate(&input).unwrap().get_i64().unwrap(), -7);

    let input = PaddedBytes::from("3.5");
    assert_eq!(parser.iterate(&input).unwrap().get_f64().unwrap(), 3.5);

    let input = PaddedBytes::from("true");
    assert!(parser.iterate(&input).unwrap().get_bool().unwrap());

    let input = PaddedBytes::from("null");
    parser.iterate(&input).unwrap().get_null().unwrap();

    let input = PaddedBytes::from("\"hi\\nthere\"");
    let mut doc = parser.iterate(&input).unwrap();
    assert_eq!(doc.get_string().unwrap(), "hi\nthere");
    assert!(doc.at_end());
}

#[test]
fn type_mismatches_do_not_consume() {
    let mut parser = Parser::new();
    let input = PaddedBytes::from("\"text\"");
    let mut doc = parser.iterate(&input).unwrap();
    assert_eq!(doc.get_i64().unwrap_err(), Error::IncorrectType);
    assert_eq!(doc.get_bool().unwrap_err(), Error::IncorrectType);
    // Still readable with the right accessor.
    assert_eq!(doc.get_string().unwrap(), "text");
}

#[test]
fn array_iteration_in_order() {
    let mut parser = Parser::new();
    let input = PaddedBytes::from("[1,2,3]");
    let mut doc = parser.iterate(&input).unwrap();
    let mut arr = doc.get_array().unwrap();
    let mut got = Vec::new();
    while let Some(mut v) = arr.next_element().unwrap() {
        got.push(v.get_i64().unwrap());
    }
    assert_eq!(got, [1, 2, 3]);
    assert!(arr.next_element().unwrap().is_none(), "stays exhausted");
}

#[test]
fn empty_containers_yield_nothing() {
    let mut parser = Parser::new();
    let input = PaddedBytes::from("[]");
    let mut doc = parser.iterate(&input).unwrap();
    assert!(doc.get_array().unwrap().next_element().unwrap().is_none());

    let input = PaddedBytes::from("{}");
    let mut doc = parser.iterate(&input).unwrap();
    assert!(doc.get_object().unwrap().next_field().unwrap().is_none());
}

#[test]
fn object_fields_and_raw_keys() {
    let mut parser = Parser::new();
    let input = PaddedBytes::from("{\"alpha\":1,\"b\\u0065ta\":2}");
    let mut doc = parser.iterate(&input).unwrap();
    let mut obj = doc.get_object().unwrap();

    let (k, mut v) = obj.next_field().unwrap().unwrap();
    assert!(k.matches("alpha"));
    assert_eq!(k.raw_bytes(), b"alpha");
    assert_eq!(k.unescaped().unwrap(), "alpha");
    assert_eq!(v.get_i64().unwrap(), 1);

    let (k, mut v) = obj.next_field().unwrap().unwrap();
    // Escaped key: raw bytes differ, unescaped text matches.
    assert!(k.matches("beta"));
    assert_ne!(k.raw_bytes(), b"beta");
    assert_eq!(k.unescaped().unwrap(), "beta");
    assert_eq!(v.get_i64().unwrap(), 2);

    assert!(obj.next_field().unwrap().is_none());
}

#[test]
fn nested_containers_advance_the_shared_cursor() {
    let mut parser = Parser::new();
    let input = PaddedBytes::from(r#"{"a":[1,2],"b":{"c":[3]}}"#);
    let mut doc = parser.iterate(&input).unwrap();
    let mut obj = doc.get_object().unwrap();

    let (k, mut v) = obj.next_field().unwrap().unwrap();
    assert!(k.matches("a"));
    let mut inner = v.get_array().unwrap();
    assert_eq!(inner.next_element().unwrap().unwrap().get_i64().unwrap(), 1);
    assert_eq!(inner.next_element().unwrap().unwrap().get_i64().unwrap(), 2);
    assert!(inner.next_element().unwrap().is_none());

    let (k, mut v) = obj.next_field().unwrap().unwrap();
    assert!(k.matches("b"));
    let mut innerobj = v.get_object().unwrap();
    let (k, mut v) = innerobj.next_field().unwrap().unwrap();
    assert!(k.matches("c"));
    let mut arr = v.get_array().unwrap();
    assert_eq!(arr.next_element().unwrap().unwrap().get_i64().unwrap(), 3);
    assert!(arr.next_element().unwrap().is_none());
    assert!(innerobj.next_field().unwrap().is_none());
    assert!(obj.next_field().unwrap().is_none());
}

#[test]
fn unread_values_are_skipped_on_the_next_advance() {
    let mut parser = Parser::new();
    let input = PaddedBytes::from(r#"[{"deep":[1,2,3]},"after",42]"#);
    let mut doc = parser.iterate(&input).unwrap();
    let mut arr = doc.get_array().unwrap();

    // Never touch the first (container) element.
    let first = arr.next_element().unwrap();
    assert!(first.is_some());
    drop(first);

    let mut second = arr.next_element().unwrap().unwrap();
    assert_eq!(second.get_string().unwrap(), "after");

    let mut third = arr.next_element().unwrap().unwrap();
    assert_eq!(third.get_i64().unwrap(), 42);
    assert!(arr.next_element().unwrap().is_none());
}

#[test]
fn partially_read_nested_containers_are_completed_on_advance() {
    let mut parser = Parser::new();
    let input = PaddedBytes::from("[[1,2,3,4],5]");
    let mut doc = parser.iterate(&input).unwrap();
    let mut arr = doc.get_array().unwrap();

    {
        let mut v = arr.next_element().unwrap().unwrap();
        let mut inner = v.get_array().unwrap();
        // Read only one of four elements, then abandon the iterator.
        assert_eq!(inner.next_element().unwrap().unwrap().get_i64().unwrap(), 1);
    }

    let mut v = arr.next_element().unwrap().unwrap();
    assert_eq!(v.get_i64().unwrap(), 5);
    assert!(arr.next_element().unwrap().is_none());
}

#[test]
fn malformed_documents_fail_at_read_time() {
    let mut parser = Parser::new();
    // Stage 1 accepts this; the missing comma only surfaces on iteration.
    let input = PaddedBytes::from("[1 2]");
    let mut doc = parser.iterate(&input).unwrap();
    let mut arr = doc.get_array().unwrap();
    assert_eq!(arr.next_element().unwrap().unwrap().get_i64().unwrap(), 1);
    assert_eq!(arr.next_element().unwrap_err(), Error::TapeError);
}
