//! Mutable reactive cell.

#[cfg(test)]
#[path = "signal_test.rs"]
mod signal_test;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use super::runtime::{EffectId, Runtime};

struct SignalInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<BTreeSet<EffectId>>,
    runtime: Runtime,
}

/// A value that queues its readers' reactions when written.
///
/// Reads through [`Signal::get`] or [`Signal::with`] inside a reaction
/// subscribe that reaction; the `_untracked` variants never do. Writes take
/// effect immediately for readers, and subscribed reactions run on the next
/// [`Runtime::flush`].
///
/// Closures passed to `with`/`update` must not write the same signal.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(BTreeSet::new()),
                runtime: runtime.clone(),
            }),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        self.with_untracked(f)
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.with_untracked(T::clone)
    }

    /// Replace the value and notify subscribers, even if it is unchanged.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Replace the value only when it differs. Returns whether it changed.
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        if *self.inner.value.borrow() == value {
            return false;
        }
        self.set(value);
        true
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.notify();
    }

    /// Number of live reactions currently subscribed.
    pub fn subscriber_count(&self) -> usize {
        let runtime = &self.inner.runtime;
        self.inner
            .subscribers
            .borrow()
            .iter()
            .filter(|id| runtime.is_live(**id))
            .count()
    }

    /// Number of live clones of this signal, including `self`.
    pub(crate) fn holder_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    fn track(&self) {
        if let Some(id) = self.inner.runtime.observer() {
            self.inner.subscribers.borrow_mut().insert(id);
        }
    }

    fn notify(&self) {
        let runtime = &self.inner.runtime;
        let subscribers: Vec<EffectId> = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            subscribers.retain(|id| runtime.is_live(*id));
            subscribers.iter().copied().collect()
        };
        for id in subscribers {
            runtime.schedule(id);
        }
    }
}
