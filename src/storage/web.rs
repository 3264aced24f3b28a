//! Browser-backed storage and `storage` event listener (hydrate only).

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;

use super::{StorageArea, StorageBackend, StorageError};
use crate::events::{Listener, StorageEvent, StorageEvents, Subscription};

fn js_error(err: &JsValue) -> StorageError {
    StorageError::Backend(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn window() -> Result<web_sys::Window, StorageError> {
    web_sys::window().ok_or_else(|| StorageError::Backend("no global window".to_owned()))
}

fn area_storage(window: &web_sys::Window, area: StorageArea) -> Result<web_sys::Storage, StorageError> {
    let storage = match area {
        StorageArea::Local => window.local_storage(),
        StorageArea::Session => window.session_storage(),
    };
    storage
        .map_err(|err| js_error(&err))?
        .ok_or(StorageError::Unavailable { area })
}

/// `window.localStorage` or `window.sessionStorage`.
pub struct WebStorage {
    storage: web_sys::Storage,
}

impl WebStorage {
    /// Open the given area of the current window.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] when the browser denies access
    /// (e.g. storage disabled) and [`StorageError::Backend`] outside a window.
    pub fn open(area: StorageArea) -> Result<Self, StorageError> {
        let storage = area_storage(&window()?, area)?;
        Ok(Self { storage })
    }
}

impl StorageBackend for WebStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get_item(key).map_err(|err| js_error(&err))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set_item(key, value).map_err(|err| match js_error(&err) {
            StorageError::Backend(message) if message.contains("QuotaExceeded") => {
                StorageError::QuotaExceeded { key: key.to_owned() }
            }
            other => other,
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage.remove_item(key).map_err(|err| js_error(&err))
    }
}

/// The window's `storage` event, mapped to [`StorageEvent`].
pub struct WindowEvents {
    window: web_sys::Window,
}

impl WindowEvents {
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] outside a window.
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self { window: window()? })
    }

    fn area_of(&self, event: &web_sys::StorageEvent) -> Option<StorageArea> {
        let source: JsValue = event.storage_area()?.into();
        [StorageArea::Local, StorageArea::Session].into_iter().find(|area| {
            area_storage(&self.window, *area).map_or(false, |storage| JsValue::from(storage) == source)
        })
    }
}

impl StorageEvents for WindowEvents {
    fn subscribe(&self, listener: Listener) -> Subscription {
        let events = Rc::new(Self { window: self.window.clone() });
        let handler = {
            let events = Rc::clone(&events);
            Closure::<dyn Fn(web_sys::StorageEvent)>::new(move |event: web_sys::StorageEvent| {
                let Some(area) = events.area_of(&event) else {
                    return;
                };
                listener(&StorageEvent {
                    area,
                    key: event.key(),
                    old_value: event.old_value(),
                    new_value: event.new_value(),
                });
            })
        };

        if let Err(err) = self
            .window
            .add_event_listener_with_callback("storage", handler.as_ref().unchecked_ref())
        {
            tracing::warn!(error = ?err, "failed to add storage listener");
            return Subscription::detached();
        }

        let window = self.window.clone();
        Subscription::new(move || {
            if let Err(err) =
                window.remove_event_listener_with_callback("storage", handler.as_ref().unchecked_ref())
            {
                tracing::warn!(error = ?err, "failed to remove storage listener");
            }
        })
    }
}
