//! Storage-backed reactive handles.
//!
//! DESIGN
//! ======
//! Each handle is a `Signal<Option<T>>` plus up to three attachments:
//! - a persist reaction: after a local `set`/`update`/`clear`, serializes the
//!   value on the next flush and writes (or removes) the stored item, then
//!   publishes the raw text to the context's shared cell for the key;
//! - a shared-cell reaction: re-parses raw text published by sibling handles
//!   in the same context. Cells remember whether the text was persisted
//!   locally or came from the store, and handles with sync off only take the
//!   former;
//! - a `storage` event listener (unless sync is off): re-parses raw text
//!   written by other windows.
//!
//! Values arriving from storage never mark the handle as locally written, so
//! they are not echoed back to the store. Parse failures on any path leave the
//! handle at `None`.

#[cfg(test)]
#[path = "storage_signal_test.rs"]
mod storage_signal_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::codec::decode;
use crate::context::{RawOrigin, SharedRaw, StorageScope};
use crate::error::Error;
use crate::events::StorageEvent;
use crate::options::StorageOptions;
use crate::reactive::Signal;
use crate::storage::{StorageArea, StorageError};

/// Reactive handle to one stored key.
pub struct StorageSignal<T> {
    key: Rc<str>,
    area: StorageArea,
    value: Signal<Option<T>>,
    local_write: Rc<Cell<bool>>,
}

impl<T> Clone for StorageSignal<T> {
    fn clone(&self) -> Self {
        Self {
            key: Rc::clone(&self.key),
            area: self.area,
            value: self.value.clone(),
            local_write: Rc::clone(&self.local_write),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for StorageSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSignal")
            .field("key", &self.key)
            .field("area", &self.area)
            .field("value", &self.value)
            .finish()
    }
}

impl<T: 'static> StorageSignal<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    /// Current value, tracked when read inside a reaction.
    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value.get()
    }

    pub fn get_untracked(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value.get_untracked()
    }

    /// Borrow the current value, tracked like [`StorageSignal::get`].
    ///
    /// `f` may read this handle again but must not write it.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        self.value.with(|value| f(value.as_ref()))
    }

    /// Replace the value. Persisted on the next flush.
    pub fn set(&self, value: T) {
        self.local_write.set(true);
        self.value.set(Some(value));
    }

    /// Drop the value. The stored item is removed on the next flush.
    pub fn clear(&self) {
        self.local_write.set(true);
        self.value.set(None);
    }

    /// Mutate the value in place. Persisted on the next flush.
    ///
    /// The value is borrowed mutably while `f` runs, so `f` must neither read
    /// nor write this handle.
    pub fn update(&self, f: impl FnOnce(&mut Option<T>)) {
        self.local_write.set(true);
        self.value.update(f);
    }
}

/// Create a handle bound to `key` in `area`, owned by `scope`.
///
/// The initial value is parsed from the stored item, or `default_value` when
/// nothing is stored. Malformed or rejected items give `None`.
///
/// # Errors
///
/// Returns [`StorageError::EmptyKey`] for an empty key,
/// [`StorageError::Unavailable`] when the context has no backend for `area`,
/// and any error the backend reports while reading the initial value.
pub fn use_storage<T: Clone + 'static>(
    scope: &StorageScope,
    area: StorageArea,
    key: &str,
    options: StorageOptions<T>,
) -> Result<StorageSignal<T>, Error> {
    if key.is_empty() {
        return Err(StorageError::EmptyKey.into());
    }
    let cx = scope.context();
    let backend = cx.backend(area)?;
    let raw = backend.read(key)?;

    let StorageOptions { default_value, parse, stringify, storage_sync } = options;
    let sync = storage_sync.unwrap_or(cx.config().storage_sync);
    let key: Rc<str> = Rc::from(key);
    let initial = match raw.as_deref() {
        Some(raw) => decode(raw, &parse, &key),
        None => default_value,
    };

    let value = Signal::new(cx.runtime(), initial);
    let shared = cx.shared_raw(area, &key, raw.as_ref());
    let seen_raw = Rc::new(RefCell::new(raw));
    let local_write = Rc::new(Cell::new(false));

    scope.scope().effect({
        let key = Rc::clone(&key);
        let value = value.clone();
        let shared = shared.clone();
        let seen_raw = Rc::clone(&seen_raw);
        let local_write = Rc::clone(&local_write);
        let failures = cx.failure_sink();
        move || {
            let encoded = value.with(|current| {
                local_write
                    .replace(false)
                    .then(|| current.as_ref().map(|v| stringify(v)).transpose())
            });
            let Some(encoded) = encoded else {
                return;
            };
            let raw = match encoded {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(%key, error = %err, "failed to serialize value; not persisted");
                    return;
                }
            };
            let written = match raw.as_deref() {
                Some(raw) => backend.write(&key, raw),
                None => backend.remove(&key),
            };
            if let Err(err) = written {
                tracing::error!(%key, error = %err, "failed to persist value");
                failures.borrow_mut().push(err);
                return;
            }
            tracing::trace!(%key, removed = raw.is_none(), "persisted value");
            seen_raw.replace(raw.clone());
            shared.set_if_changed(SharedRaw::local(raw));
        }
    });

    scope.scope().effect({
        let key = Rc::clone(&key);
        let value = value.clone();
        let shared = shared.clone();
        let seen_raw = Rc::clone(&seen_raw);
        let parse = Rc::clone(&parse);
        move || {
            let SharedRaw { raw, origin } = shared.get();
            if !sync && origin == RawOrigin::Storage {
                return;
            }
            if *seen_raw.borrow() == raw {
                return;
            }
            seen_raw.replace(raw.clone());
            value.set(raw.as_deref().and_then(|raw| decode(raw, &parse, &key)));
        }
    });

    if sync {
        if let Some(events) = cx.events() {
            let listener = {
                let key = Rc::clone(&key);
                let value = value.clone();
                let local_write = Rc::clone(&local_write);
                move |event: &StorageEvent| {
                    if !event.affects(area, &key) {
                        return;
                    }
                    let raw = event.key.as_ref().and(event.new_value.clone());
                    tracing::debug!(%key, %area, cleared = raw.is_none(), "storage changed in another window");
                    local_write.set(false);
                    seen_raw.replace(raw.clone());
                    value.set(raw.as_deref().and_then(|raw| decode(raw, &parse, &key)));
                    shared.set_if_changed(SharedRaw::storage(raw));
                }
            };
            let subscription = events.subscribe(Rc::new(listener));
            scope.scope().on_cleanup(move || subscription.unsubscribe());
        } else {
            tracing::debug!(%key, "no storage event source; cross-window sync disabled");
        }
    }

    tracing::debug!(%key, %area, "storage handle created");
    Ok(StorageSignal { key, area, value, local_write })
}

/// [`use_storage`] for the local area.
///
/// # Errors
///
/// See [`use_storage`].
pub fn use_local_storage<T: Clone + 'static>(
    scope: &StorageScope,
    key: &str,
    options: StorageOptions<T>,
) -> Result<StorageSignal<T>, Error> {
    use_storage(scope, StorageArea::Local, key, options)
}

/// [`use_storage`] for the session area.
///
/// # Errors
///
/// See [`use_storage`].
pub fn use_session_storage<T: Clone + 'static>(
    scope: &StorageScope,
    key: &str,
    options: StorageOptions<T>,
) -> Result<StorageSignal<T>, Error> {
    use_storage(scope, StorageArea::Session, key, options)
}
