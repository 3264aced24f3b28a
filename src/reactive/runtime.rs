//! Reaction scheduler with an explicit flush point.
//!
//! DESIGN
//! ======
//! Reactions (effects) never run inline with the write that triggered them.
//! `Signal::set` only queues the subscribed reactions; `Runtime::flush` drains
//! the queue until it is empty, so chains of reactions settle within a single
//! flush. Dependency tracking is dynamic: while a reaction runs, every tracked
//! signal read records the reaction as a subscriber.
//!
//! TRADE-OFFS
//! ==========
//! The runtime is single-threaded (`Rc`/`RefCell`), matching the browser event
//! loop it models. Subscriptions are never pruned on re-run, only when the
//! reaction is disposed, which is fine for the static dependency sets used by
//! storage handles.

#[cfg(test)]
#[path = "runtime_test.rs"]
mod runtime_test;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// Upper bound on reaction runs within one flush.
pub const DEFAULT_FLUSH_LIMIT: usize = 10_000;

/// Error returned by [`Runtime::flush`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// Reactions kept re-triggering each other past the configured limit.
    #[error("reaction flush did not settle within {limit} runs")]
    FlushLimit { limit: usize },
}

/// Identifier of a registered reaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

type EffectFn = Rc<RefCell<dyn FnMut()>>;

struct RuntimeInner {
    effects: RefCell<HashMap<EffectId, EffectFn>>,
    pending: RefCell<VecDeque<EffectId>>,
    queued: RefCell<HashSet<EffectId>>,
    observer: Cell<Option<EffectId>>,
    next_id: Cell<u64>,
    flushing: Cell<bool>,
    flush_limit: usize,
}

/// Shared handle to one reactive runtime. Cloning is cheap.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("effects", &self.inner.effects.borrow().len())
            .field("pending", &self.inner.pending.borrow().len())
            .field("flush_limit", &self.inner.flush_limit)
            .finish()
    }
}

impl Runtime {
    #[must_use]
    pub fn new() -> Self {
        Self::with_flush_limit(DEFAULT_FLUSH_LIMIT)
    }

    #[must_use]
    pub fn with_flush_limit(flush_limit: usize) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                effects: RefCell::new(HashMap::new()),
                pending: RefCell::new(VecDeque::new()),
                queued: RefCell::new(HashSet::new()),
                observer: Cell::new(None),
                next_id: Cell::new(0),
                flushing: Cell::new(false),
                flush_limit,
            }),
        }
    }

    /// Register a reaction. Its first run happens on the next flush.
    pub fn create_effect(&self, f: impl FnMut() + 'static) -> EffectId {
        let id = EffectId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        let effect: EffectFn = Rc::new(RefCell::new(f));
        self.inner.effects.borrow_mut().insert(id, effect);
        self.schedule(id);
        id
    }

    /// Drop a reaction. Pending runs of it are skipped.
    pub fn dispose_effect(&self, id: EffectId) {
        // Take the closure out before it is dropped so its captures can touch
        // the runtime again without a live borrow.
        let removed = self.inner.effects.borrow_mut().remove(&id);
        self.inner.queued.borrow_mut().remove(&id);
        drop(removed);
    }

    #[must_use]
    pub fn is_live(&self, id: EffectId) -> bool {
        self.inner.effects.borrow().contains_key(&id)
    }

    /// Number of reactions waiting for the next flush.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.queued.borrow().len()
    }

    /// Run `f` without recording signal reads as dependencies.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = self.inner.observer.replace(None);
        let out = f();
        self.inner.observer.set(previous);
        out
    }

    /// Run queued reactions until none are left.
    ///
    /// Returns the number of reaction runs. A nested call from inside a
    /// reaction is a no-op returning `Ok(0)`; the outer flush picks up
    /// whatever the reaction queued.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::FlushLimit`] when more than the configured
    /// number of runs were needed. The remaining queue is dropped.
    pub fn flush(&self) -> Result<usize, RuntimeError> {
        if self.inner.flushing.replace(true) {
            return Ok(0);
        }
        let _guard = FlushGuard(&self.inner.flushing);

        let mut ran = 0;
        loop {
            let next = self.inner.pending.borrow_mut().pop_front();
            let Some(id) = next else {
                return Ok(ran);
            };
            self.inner.queued.borrow_mut().remove(&id);

            let effect = self.inner.effects.borrow().get(&id).cloned();
            let Some(effect) = effect else {
                continue;
            };

            if ran >= self.inner.flush_limit {
                self.inner.pending.borrow_mut().clear();
                self.inner.queued.borrow_mut().clear();
                tracing::error!(limit = self.inner.flush_limit, "reaction flush did not settle");
                return Err(RuntimeError::FlushLimit { limit: self.inner.flush_limit });
            }

            let previous = self.inner.observer.replace(Some(id));
            {
                let mut run = effect.borrow_mut();
                (&mut *run)();
            }
            self.inner.observer.set(previous);
            ran += 1;
        }
    }

    pub(crate) fn observer(&self) -> Option<EffectId> {
        self.inner.observer.get()
    }

    pub(crate) fn schedule(&self, id: EffectId) {
        if !self.is_live(id) {
            return;
        }
        if self.inner.queued.borrow_mut().insert(id) {
            self.inner.pending.borrow_mut().push_back(id);
        }
    }
}

/// Clears the flushing flag even if a reaction unwinds.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
