use std::collections::HashMap;

use serde::Deserialize;

use super::*;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Rooms {
    rooms: u32,
    bathrooms: u32,
}

#[test]
fn json_parse_decodes_string() {
    let value: Option<String> = json_parse("\"dark\"").expect("parse");
    assert_eq!(value.as_deref(), Some("dark"));
}

#[test]
fn json_parse_treats_null_as_none() {
    let value: Option<String> = json_parse("null").expect("parse");
    assert_eq!(value, None);
}

#[test]
fn json_parse_rejects_malformed_text() {
    let err = json_parse::<String>("not json").expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn json_parse_rejects_type_mismatch() {
    let err = json_parse::<Rooms>("\"dark\"").expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn json_stringify_is_compact() {
    let raw = json_stringify(&Rooms { rooms: 3, bathrooms: 2 }).expect("stringify");
    assert_eq!(raw, r#"{"rooms":3,"bathrooms":2}"#);
}

#[test]
fn json_stringify_rejects_non_string_map_keys() {
    let mut map = HashMap::new();
    map.insert((1, 2), "x");
    let err = json_stringify(&map).expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_swallows_parser_failure() {
    let parse: ParseFn<String> = Rc::new(|_: &str| -> Result<Option<String>, CodecError> {
        Err(CodecError::invalid("nope"))
    });
    assert_eq!(decode("\"ok\"", &parse, "k"), None);
}

#[test]
fn decode_passes_parsed_value_through() {
    let parse: ParseFn<Rooms> = Rc::new(json_parse::<Rooms>);
    assert_eq!(
        decode(r#"{"rooms":4,"bathrooms":2}"#, &parse, "k"),
        Some(Rooms { rooms: 4, bathrooms: 2 })
    );
}
