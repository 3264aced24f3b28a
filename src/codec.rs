//! Serialization policy for stored values.
//!
//! Stored text is decoded with a failure-tolerant boundary: anything the
//! active parser rejects becomes `None` rather than an error for the caller.

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;

use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error produced by a parser or serializer.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not valid JSON for the target type, or the value could not
    /// be encoded as JSON.
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),
    /// A custom parser rejected the value.
    #[error("invalid stored value: {0}")]
    Invalid(String),
}

impl CodecError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }
}

/// Parser: raw text to value, `Ok(None)` meaning an explicit "no value".
pub type ParseFn<T> = Rc<dyn Fn(&str) -> Result<Option<T>, CodecError>>;

/// Serializer: value to raw text.
pub type StringifyFn<T> = Rc<dyn Fn(&T) -> Result<String, CodecError>>;

/// Decode JSON. A JSON `null` yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed text or a type mismatch.
pub fn json_parse<T: DeserializeOwned>(raw: &str) -> Result<Option<T>, CodecError> {
    Ok(serde_json::from_str::<Option<T>>(raw)?)
}

/// Encode as compact JSON.
///
/// # Errors
///
/// Returns [`CodecError::Json`] when the value cannot be represented as JSON
/// (e.g. a map with non-string keys).
pub fn json_stringify<T: Serialize>(value: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(value)?)
}

/// Apply `parse` to `raw`, turning every failure into `None`.
pub(crate) fn decode<T>(raw: &str, parse: &ParseFn<T>, key: &str) -> Option<T> {
    match parse(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(%key, error = %err, "stored value rejected; using none");
            None
        }
    }
}
