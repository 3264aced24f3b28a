//! Storage-change notifications.
//!
//! DESIGN
//! ======
//! Browsers raise a `storage` event in every *other* window of the origin when
//! a storage area changes. The listener is modelled as a capability that hands
//! back a [`Subscription`]; dropping the subscription (or calling
//! [`Subscription::unsubscribe`]) removes the listener, so teardown is tied to
//! an owner instead of a global registry.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::storage::StorageArea;

/// A change to one storage area, as delivered to listeners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    /// Area that changed.
    pub area: StorageArea,
    /// Changed key, `None` when the whole area was cleared.
    pub key: Option<String>,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change, `None` when the key was removed.
    pub new_value: Option<String>,
}

impl StorageEvent {
    /// Event for `key` being set to `new_value` (or removed, when `None`).
    pub fn new(area: StorageArea, key: impl Into<String>, new_value: Option<String>) -> Self {
        Self { area, key: Some(key.into()), old_value: None, new_value }
    }

    /// Event for the whole area being cleared.
    #[must_use]
    pub fn cleared(area: StorageArea) -> Self {
        Self { area, key: None, old_value: None, new_value: None }
    }

    #[must_use]
    pub fn with_old_value(mut self, old_value: Option<String>) -> Self {
        self.old_value = old_value;
        self
    }

    /// Whether a handle bound to (`area`, `key`) must react to this event.
    #[must_use]
    pub fn affects(&self, area: StorageArea, key: &str) -> bool {
        self.area == area && self.key.as_deref().map_or(true, |k| k == key)
    }
}

/// Callback invoked for each delivered event.
pub type Listener = Rc<dyn Fn(&StorageEvent)>;

/// Source of storage-change notifications.
pub trait StorageEvents {
    /// Register `listener` until the returned subscription is released.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

/// Keeps a listener registered. Released on drop.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self { teardown: Some(Box::new(teardown)) }
    }

    /// A subscription with nothing to release.
    pub fn detached() -> Self {
        Self { teardown: None }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
