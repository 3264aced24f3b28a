//! Persistent key-value storage capability.
//!
//! SYSTEM CONTEXT
//! ==============
//! The browser's `localStorage`/`sessionStorage` objects are ambient
//! singletons. Handles never touch them directly; they go through an injected
//! [`StorageBackend`] so tests can swap in the in-memory browser from
//! [`memory`].

pub mod memory;
#[cfg(feature = "hydrate")]
pub mod web;

use serde::{Deserialize, Serialize};

/// Which storage area a key lives in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// Shared by every window of the origin, survives restarts.
    #[default]
    Local,
    /// Private to one window.
    Session,
}

impl StorageArea {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Session => "session",
        }
    }
}

impl std::fmt::Display for StorageArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Handles must be bound to a non-empty key.
    #[error("storage key must not be empty")]
    EmptyKey,
    /// The requested storage area is not available in this context.
    #[error("{area} storage is unavailable")]
    Unavailable { area: StorageArea },
    /// The write would exceed the area's quota.
    #[error("storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },
    /// Any other failure reported by the underlying store.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Synchronous string-to-string store.
pub trait StorageBackend {
    /// Read the raw value at `key`, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the store rejects the write.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the store rejects the removal.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
