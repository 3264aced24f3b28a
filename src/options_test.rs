use super::*;

#[test]
fn default_options_use_json() {
    let options = StorageOptions::<Vec<u8>>::default();
    assert_eq!((options.parse)("[1,2]").expect("parse"), Some(vec![1, 2]));
    assert_eq!((options.stringify)(&vec![3]).expect("stringify"), "[3]");
    assert_eq!(options.default_value, None);
    assert_eq!(options.storage_sync, None);
}

#[test]
fn builder_sets_default_value_and_sync() {
    let options = StorageOptions::default()
        .default_value("light".to_owned())
        .storage_sync(false);
    assert_eq!(options.default_value.as_deref(), Some("light"));
    assert_eq!(options.storage_sync, Some(false));
}

#[test]
fn custom_parse_wraps_value() {
    let options = StorageOptions::<u32>::default().parse(|raw| {
        raw.trim()
            .parse::<u32>()
            .map_err(|err| CodecError::invalid(err.to_string()))
    });
    assert_eq!((options.parse)(" 42 ").expect("parse"), Some(42));
    assert!((options.parse)("x").is_err());
}

#[test]
fn parse_optional_can_yield_none() {
    let options = StorageOptions::<u32>::default().parse_optional(|raw| Ok(raw.parse::<u32>().ok()));
    assert_eq!((options.parse)("x").expect("parse"), None);
}

#[test]
fn with_codec_supports_non_serde_types() {
    #[derive(Clone, Debug, PartialEq)]
    struct Flag(bool);

    let options = StorageOptions::with_codec(
        |raw| match raw {
            "on" => Ok(Flag(true)),
            "off" => Ok(Flag(false)),
            other => Err(CodecError::invalid(other)),
        },
        |flag: &Flag| Ok(if flag.0 { "on" } else { "off" }.to_owned()),
    );
    assert_eq!((options.parse)("on").expect("parse"), Some(Flag(true)));
    assert_eq!((options.stringify)(&Flag(false)).expect("stringify"), "off");
    assert!(format!("{:?}", options.clone()).contains("StorageOptions"));
}
