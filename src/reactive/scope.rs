//! Owning scope for reactions and teardown callbacks.
//!
//! A scope plays the role of a component's lifetime: reactions created through
//! it are disposed, and cleanup callbacks run in reverse registration order,
//! when the scope is disposed or dropped.

#[cfg(test)]
#[path = "scope_test.rs"]
mod scope_test;

use std::cell::{Cell, RefCell};

use super::runtime::{EffectId, Runtime};

pub struct Scope {
    runtime: Runtime,
    effects: RefCell<Vec<EffectId>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    disposed: Cell<bool>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("effects", &self.effects.borrow().len())
            .field("cleanups", &self.cleanups.borrow().len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

impl Scope {
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            runtime: runtime.clone(),
            effects: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Register a reaction owned by this scope.
    ///
    /// On a disposed scope the reaction is registered and immediately
    /// disposed, so it never runs.
    pub fn effect(&self, f: impl FnMut() + 'static) -> EffectId {
        let id = self.runtime.create_effect(f);
        if self.disposed.get() {
            self.runtime.dispose_effect(id);
        } else {
            self.effects.borrow_mut().push(id);
        }
        id
    }

    /// Run `f` when the scope ends. Runs immediately on a disposed scope.
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
        if self.disposed.get() {
            f();
            return;
        }
        self.cleanups.borrow_mut().push(Box::new(f));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Dispose owned reactions and run cleanups. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let effects = std::mem::take(&mut *self.effects.borrow_mut());
        for id in effects {
            self.runtime.dispose_effect(id);
        }
        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}
