//! In-memory browser storage with multi-window change notifications.
//!
//! A [`MemoryBrowser`] owns one shared local area and any number of
//! [`MemoryWindow`]s. Writing through a window's [`WindowStorage`] mirrors
//! browser behavior: every *other* window receives a [`StorageEvent`], the
//! writer does not, and rewriting an identical value raises nothing. Session
//! areas are per window and never notify.
//!
//! Every mutation through the backend API is recorded in an operation log so
//! tests can assert on what reached the store.

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use uuid::Uuid;

use super::{StorageArea, StorageBackend, StorageError};
use crate::events::{Listener, StorageEvent, StorageEvents, Subscription};

/// One recorded mutation of a [`MemoryStorage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageOp {
    Write { key: String, value: String },
    Remove { key: String },
    Clear,
}

impl StorageOp {
    pub fn write(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Write { key: key.into(), value: value.into() }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }
}

// =============================================================================
// STORAGE AREA
// =============================================================================

struct MemoryStorageInner {
    area: StorageArea,
    items: RefCell<BTreeMap<String, String>>,
    ops: RefCell<Vec<StorageOp>>,
    quota: Cell<Option<usize>>,
}

/// A single storage area held in memory. Clones share the same map.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Rc<MemoryStorageInner>,
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("area", &self.inner.area)
            .field("items", &self.inner.items.borrow())
            .finish()
    }
}

impl MemoryStorage {
    #[must_use]
    pub fn new(area: StorageArea) -> Self {
        Self {
            inner: Rc::new(MemoryStorageInner {
                area,
                items: RefCell::new(BTreeMap::new()),
                ops: RefCell::new(Vec::new()),
                quota: Cell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn area(&self) -> StorageArea {
        self.inner.area
    }

    /// Limit the total size (key plus value bytes) the area may hold.
    pub fn set_quota(&self, bytes: Option<usize>) {
        self.inner.quota.set(bytes);
    }

    /// Current raw value at `key`, read without going through the backend.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.items.borrow().get(key).cloned()
    }

    /// Place a value directly, bypassing quota, the op log and notifications.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.items.borrow_mut().insert(key.into(), value.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Mutations recorded so far, oldest first.
    #[must_use]
    pub fn ops(&self) -> Vec<StorageOp> {
        self.inner.ops.borrow().clone()
    }

    /// Values written to `key`, oldest first.
    #[must_use]
    pub fn writes_to(&self, key: &str) -> Vec<String> {
        self.inner
            .ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                StorageOp::Write { key: k, value } if k == key => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_ops(&self) {
        self.inner.ops.borrow_mut().clear();
    }

    /// Remove every item. Returns whether anything was removed.
    pub fn clear(&self) -> bool {
        self.inner.ops.borrow_mut().push(StorageOp::Clear);
        let mut items = self.inner.items.borrow_mut();
        let had_items = !items.is_empty();
        items.clear();
        had_items
    }

    fn fits(&self, key: &str, value: &str) -> bool {
        let Some(quota) = self.inner.quota.get() else {
            return true;
        };
        let used: usize = self
            .inner
            .items
            .borrow()
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        used + key.len() + value.len() <= quota
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.fits(key, value) {
            return Err(StorageError::QuotaExceeded { key: key.to_owned() });
        }
        self.inner.ops.borrow_mut().push(StorageOp::write(key, value));
        self.inner.items.borrow_mut().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.ops.borrow_mut().push(StorageOp::remove(key));
        self.inner.items.borrow_mut().remove(key);
        Ok(())
    }
}

// =============================================================================
// BROWSER
// =============================================================================

struct BrowserInner {
    local: MemoryStorage,
    listeners: RefCell<HashMap<Uuid, Vec<(u64, Listener)>>>,
    next_listener: Cell<u64>,
}

/// An origin: one shared local area plus the windows looking at it.
#[derive(Clone)]
pub struct MemoryBrowser {
    inner: Rc<BrowserInner>,
}

impl Default for MemoryBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBrowser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BrowserInner {
                local: MemoryStorage::new(StorageArea::Local),
                listeners: RefCell::new(HashMap::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// The shared local area, for seeding and inspection.
    #[must_use]
    pub fn local_storage(&self) -> MemoryStorage {
        self.inner.local.clone()
    }

    #[must_use]
    pub fn open_window(&self) -> MemoryWindow {
        let id = Uuid::new_v4();
        self.inner.listeners.borrow_mut().insert(id, Vec::new());
        MemoryWindow {
            id,
            browser: self.clone(),
            session: MemoryStorage::new(StorageArea::Session),
        }
    }

    /// Deliver `event` to every window except `origin`.
    fn broadcast(&self, origin: Uuid, event: &StorageEvent) {
        let targets: Vec<Uuid> = self
            .inner
            .listeners
            .borrow()
            .keys()
            .copied()
            .filter(|id| *id != origin)
            .collect();
        for window in targets {
            self.deliver(window, event);
        }
    }

    fn deliver(&self, window: Uuid, event: &StorageEvent) {
        // Listeners may subscribe or unsubscribe while running.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .get(&window)
            .map(|entries| entries.iter().map(|(_, l)| Rc::clone(l)).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(event);
        }
    }

    fn add_listener(&self, window: Uuid, listener: Listener) -> u64 {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .entry(window)
            .or_default()
            .push((id, listener));
        id
    }

    fn remove_listener(&self, window: Uuid, id: u64) {
        let removed = {
            let mut listeners = self.inner.listeners.borrow_mut();
            listeners.get_mut(&window).and_then(|entries| {
                let pos = entries.iter().position(|(l, _)| *l == id)?;
                Some(entries.remove(pos))
            })
        };
        drop(removed);
    }

    fn listener_count(&self, window: Uuid) -> usize {
        self.inner.listeners.borrow().get(&window).map_or(0, Vec::len)
    }
}

// =============================================================================
// WINDOW
// =============================================================================

/// One window (tab) of a [`MemoryBrowser`].
#[derive(Clone)]
pub struct MemoryWindow {
    id: Uuid,
    browser: MemoryBrowser,
    session: MemoryStorage,
}

impl std::fmt::Debug for MemoryWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryWindow").field("id", &self.id).finish()
    }
}

impl MemoryWindow {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn browser(&self) -> &MemoryBrowser {
        &self.browser
    }

    /// Backend for the shared local area, as seen from this window.
    #[must_use]
    pub fn local(&self) -> WindowStorage {
        WindowStorage { window: self.clone(), area: StorageArea::Local }
    }

    /// Backend for this window's private session area.
    #[must_use]
    pub fn session(&self) -> WindowStorage {
        WindowStorage { window: self.clone(), area: StorageArea::Session }
    }

    /// Deliver a synthetic event to this window's listeners only.
    pub fn dispatch(&self, event: &StorageEvent) {
        self.browser.deliver(self.id, event);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.browser.listener_count(self.id)
    }

    fn storage(&self, area: StorageArea) -> &MemoryStorage {
        match area {
            StorageArea::Local => &self.browser.inner.local,
            StorageArea::Session => &self.session,
        }
    }

    fn notify_others(&self, event: &StorageEvent) {
        if event.area == StorageArea::Local {
            self.browser.broadcast(self.id, event);
        }
    }
}

impl StorageEvents for MemoryWindow {
    fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.browser.add_listener(self.id, listener);
        let browser = self.browser.clone();
        let window = self.id;
        Subscription::new(move || browser.remove_listener(window, id))
    }
}

/// A storage area accessed through a specific window.
#[derive(Clone, Debug)]
pub struct WindowStorage {
    window: MemoryWindow,
    area: StorageArea,
}

impl WindowStorage {
    #[must_use]
    pub fn area(&self) -> StorageArea {
        self.area
    }

    /// The underlying area, for seeding and inspection.
    #[must_use]
    pub fn storage(&self) -> MemoryStorage {
        self.window.storage(self.area).clone()
    }

    /// Clear the area and notify other windows.
    pub fn clear(&self) {
        if self.window.storage(self.area).clear() {
            self.window.notify_others(&StorageEvent::cleared(self.area));
        }
    }
}

impl StorageBackend for WindowStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.window.storage(self.area).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = self.window.storage(self.area);
        let old_value = storage.get(key);
        storage.write(key, value)?;
        if old_value.as_deref() != Some(value) {
            let event = StorageEvent::new(self.area, key, Some(value.to_owned())).with_old_value(old_value);
            self.window.notify_others(&event);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let storage = self.window.storage(self.area);
        let old_value = storage.get(key);
        storage.remove(key)?;
        if old_value.is_some() {
            let event = StorageEvent::new(self.area, key, None).with_old_value(old_value);
            self.window.notify_others(&event);
        }
        Ok(())
    }
}
