//! Per-handle configuration.

#[cfg(test)]
#[path = "options_test.rs"]
mod options_test;

use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{CodecError, ParseFn, StringifyFn, json_parse, json_stringify};

/// Options for one storage-backed handle.
///
/// `StorageOptions::default()` uses JSON for any serde type. Types without
/// serde support start from [`StorageOptions::with_codec`].
pub struct StorageOptions<T> {
    pub(crate) default_value: Option<T>,
    pub(crate) parse: ParseFn<T>,
    pub(crate) stringify: StringifyFn<T>,
    pub(crate) storage_sync: Option<bool>,
}

impl<T: Clone> Clone for StorageOptions<T> {
    fn clone(&self) -> Self {
        Self {
            default_value: self.default_value.clone(),
            parse: Rc::clone(&self.parse),
            stringify: Rc::clone(&self.stringify),
            storage_sync: self.storage_sync,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StorageOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageOptions")
            .field("default_value", &self.default_value)
            .field("storage_sync", &self.storage_sync)
            .finish_non_exhaustive()
    }
}

impl<T: Serialize + DeserializeOwned + 'static> Default for StorageOptions<T> {
    fn default() -> Self {
        Self {
            default_value: None,
            parse: Rc::new(json_parse::<T>),
            stringify: Rc::new(json_stringify::<T>),
            storage_sync: None,
        }
    }
}

impl<T: 'static> StorageOptions<T> {
    /// Options with a custom parser and serializer and no serde requirement.
    pub fn with_codec(
        parse: impl Fn(&str) -> Result<T, CodecError> + 'static,
        stringify: impl Fn(&T) -> Result<String, CodecError> + 'static,
    ) -> Self {
        Self {
            default_value: None,
            parse: Rc::new(move |raw: &str| parse(raw).map(Some)),
            stringify: Rc::new(stringify),
            storage_sync: None,
        }
    }

    /// Value used when nothing is stored at creation time.
    #[must_use]
    pub fn default_value(mut self, value: T) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Replace the parser. An `Err` makes the handle `None` for that input;
    /// this doubles as validation.
    #[must_use]
    pub fn parse(mut self, parse: impl Fn(&str) -> Result<T, CodecError> + 'static) -> Self {
        self.parse = Rc::new(move |raw: &str| parse(raw).map(Some));
        self
    }

    /// Replace the parser with one that may report an explicit "no value".
    #[must_use]
    pub fn parse_optional(mut self, parse: impl Fn(&str) -> Result<Option<T>, CodecError> + 'static) -> Self {
        self.parse = Rc::new(parse);
        self
    }

    /// Replace the serializer.
    #[must_use]
    pub fn stringify(mut self, stringify: impl Fn(&T) -> Result<String, CodecError> + 'static) -> Self {
        self.stringify = Rc::new(stringify);
        self
    }

    /// Listen (or not) for changes made by other windows. Unset means the
    /// context default.
    #[must_use]
    pub fn storage_sync(mut self, enabled: bool) -> Self {
        self.storage_sync = Some(enabled);
        self
    }
}
