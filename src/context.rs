//! Injected collaborators and shared per-key state.
//!
//! SYSTEM CONTEXT
//! ==============
//! A [`StorageContext`] stands for one document: it owns the reactive runtime,
//! the storage backends, the storage-event source, and one raw-value cell per
//! (area, key). Handles created from the same context converge through those
//! cells, because a document never receives `storage` events for its own
//! writes. Separate contexts over the same store (other windows) converge
//! through the event source instead.
//!
//! A [`StorageScope`] is the owning lifetime handles are created in. Dropping
//! or disposing it tears down their reactions and listeners.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::ContextConfig;
use crate::error::Error;
use crate::events::StorageEvents;
use crate::options::StorageOptions;
use crate::reactive::{Runtime, Scope, Signal};
use crate::storage::memory::MemoryWindow;
use crate::storage::{StorageArea, StorageBackend, StorageError};
use crate::storage_signal::{StorageSignal, use_storage};

type FailureSink = Rc<RefCell<Vec<StorageError>>>;

/// Where a shared raw value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RawOrigin {
    /// Persisted by a handle of this context.
    Local,
    /// Read from the store or delivered by another window.
    Storage,
}

/// Latest raw text known for one (area, key) in a context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SharedRaw {
    pub(crate) raw: Option<String>,
    pub(crate) origin: RawOrigin,
}

impl SharedRaw {
    pub(crate) fn local(raw: Option<String>) -> Self {
        Self { raw, origin: RawOrigin::Local }
    }

    pub(crate) fn storage(raw: Option<String>) -> Self {
        Self { raw, origin: RawOrigin::Storage }
    }
}

struct ContextInner {
    runtime: Runtime,
    config: ContextConfig,
    local: Option<Rc<dyn StorageBackend>>,
    session: Option<Rc<dyn StorageBackend>>,
    events: Option<Rc<dyn StorageEvents>>,
    shared: RefCell<HashMap<(StorageArea, String), Signal<SharedRaw>>>,
    failures: FailureSink,
}

/// One document's storage collaborators. Cloning is cheap.
#[derive(Clone)]
pub struct StorageContext {
    inner: Rc<ContextInner>,
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("config", &self.inner.config)
            .field("local", &self.inner.local.is_some())
            .field("session", &self.inner.session.is_some())
            .field("events", &self.inner.events.is_some())
            .field("shared_keys", &self.inner.shared.borrow().len())
            .finish()
    }
}

impl StorageContext {
    #[must_use]
    pub fn builder() -> StorageContextBuilder {
        StorageContextBuilder::default()
    }

    /// Context over one window of an in-memory browser.
    #[must_use]
    pub fn memory(window: &MemoryWindow) -> Self {
        Self::builder()
            .local(window.local())
            .session(window.session())
            .events(window.clone())
            .build()
    }

    /// Context over the current browser window.
    ///
    /// A page has no process environment, so the config is passed in rather
    /// than read with [`ContextConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Fails when `localStorage` or the window itself is unavailable. A
    /// missing `sessionStorage` is tolerated.
    #[cfg(feature = "hydrate")]
    pub fn browser(config: ContextConfig) -> Result<Self, Error> {
        use crate::storage::web::{WebStorage, WindowEvents};

        let mut builder = Self::builder()
            .config(config)
            .local(WebStorage::open(StorageArea::Local)?)
            .events(WindowEvents::new()?);
        match WebStorage::open(StorageArea::Session) {
            Ok(session) => builder = builder.session(session),
            Err(err) => tracing::warn!(error = %err, "session storage unavailable"),
        }
        Ok(builder.build())
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    /// Open a new owning scope for handles.
    #[must_use]
    pub fn scope(&self) -> StorageScope {
        StorageScope { context: self.clone(), scope: Scope::new(&self.inner.runtime) }
    }

    /// Run pending reactions, including deferred persistence.
    ///
    /// Returns the number of reaction runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] when reactions do not settle, and
    /// [`Error::Storage`] when a backend rejected a write during this flush.
    /// Further write failures of the same flush, and every write failure of a
    /// flush that did not settle, are logged.
    pub fn flush(&self) -> Result<usize, Error> {
        let ran = self.inner.runtime.flush();
        let failures = std::mem::take(&mut *self.inner.failures.borrow_mut());
        let ran = match ran {
            Ok(ran) => ran,
            Err(err) => {
                for failure in failures {
                    tracing::warn!(error = %failure, "storage write failure in aborted flush");
                }
                return Err(err.into());
            }
        };
        let mut failures = failures.into_iter();
        if let Some(first) = failures.next() {
            for extra in failures {
                tracing::warn!(error = %extra, "additional storage write failure");
            }
            return Err(first.into());
        }
        Ok(ran)
    }

    pub(crate) fn backend(&self, area: StorageArea) -> Result<Rc<dyn StorageBackend>, StorageError> {
        let backend = match area {
            StorageArea::Local => self.inner.local.as_ref(),
            StorageArea::Session => self.inner.session.as_ref(),
        };
        backend.cloned().ok_or(StorageError::Unavailable { area })
    }

    pub(crate) fn events(&self) -> Option<Rc<dyn StorageEvents>> {
        self.inner.events.clone()
    }

    pub(crate) fn failure_sink(&self) -> FailureSink {
        Rc::clone(&self.inner.failures)
    }

    /// The shared raw-value cell for (`area`, `key`). An existing cell is
    /// refreshed to `raw`, which was just read from the store.
    pub(crate) fn shared_raw(&self, area: StorageArea, key: &str, raw: Option<&String>) -> Signal<SharedRaw> {
        let existing = self.inner.shared.borrow().get(&(area, key.to_owned())).cloned();
        if let Some(cell) = existing {
            if cell.with_untracked(|shared| shared.raw.as_ref() != raw) {
                cell.set(SharedRaw::storage(raw.cloned()));
            }
            return cell;
        }
        let cell = Signal::new(&self.inner.runtime, SharedRaw::storage(raw.cloned()));
        self.inner
            .shared
            .borrow_mut()
            .insert((area, key.to_owned()), cell.clone());
        cell
    }

    /// Forget shared cells no handle holds any more.
    pub(crate) fn prune_shared(&self) {
        let mut shared = self.inner.shared.borrow_mut();
        let before = shared.len();
        shared.retain(|_, cell| cell.holder_count() > 1);
        let pruned = before - shared.len();
        if pruned > 0 {
            tracing::trace!(pruned, "released shared storage cells");
        }
    }

    #[cfg(test)]
    pub(crate) fn shared_key_count(&self) -> usize {
        self.inner.shared.borrow().len()
    }
}

/// Builder for [`StorageContext`].
#[derive(Default)]
pub struct StorageContextBuilder {
    config: Option<ContextConfig>,
    runtime: Option<Runtime>,
    local: Option<Rc<dyn StorageBackend>>,
    session: Option<Rc<dyn StorageBackend>>,
    events: Option<Rc<dyn StorageEvents>>,
}

impl StorageContextBuilder {
    #[must_use]
    pub fn config(mut self, config: ContextConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing runtime instead of creating one from the config.
    #[must_use]
    pub fn runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    #[must_use]
    pub fn local(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.local = Some(Rc::new(backend));
        self
    }

    #[must_use]
    pub fn session(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.session = Some(Rc::new(backend));
        self
    }

    #[must_use]
    pub fn events(mut self, events: impl StorageEvents + 'static) -> Self {
        self.events = Some(Rc::new(events));
        self
    }

    #[must_use]
    pub fn build(self) -> StorageContext {
        let config = self.config.unwrap_or_default();
        let runtime = self
            .runtime
            .unwrap_or_else(|| Runtime::with_flush_limit(config.flush_limit));
        StorageContext {
            inner: Rc::new(ContextInner {
                runtime,
                config,
                local: self.local,
                session: self.session,
                events: self.events,
                shared: RefCell::new(HashMap::new()),
                failures: Rc::new(RefCell::new(Vec::new())),
            }),
        }
    }
}

/// Owning lifetime for storage handles.
pub struct StorageScope {
    context: StorageContext,
    scope: Scope,
}

impl std::fmt::Debug for StorageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageScope").field("scope", &self.scope).finish_non_exhaustive()
    }
}

impl StorageScope {
    pub fn context(&self) -> &StorageContext {
        &self.context
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Handle bound to `key` in local storage.
    ///
    /// # Errors
    ///
    /// See [`use_storage`].
    pub fn local_storage<T: Clone + 'static>(
        &self,
        key: &str,
        options: StorageOptions<T>,
    ) -> Result<StorageSignal<T>, Error> {
        use_storage(self, StorageArea::Local, key, options)
    }

    /// Handle bound to `key` in session storage.
    ///
    /// # Errors
    ///
    /// See [`use_storage`].
    pub fn session_storage<T: Clone + 'static>(
        &self,
        key: &str,
        options: StorageOptions<T>,
    ) -> Result<StorageSignal<T>, Error> {
        use_storage(self, StorageArea::Session, key, options)
    }

    /// End the scope now instead of on drop.
    pub fn dispose(&self) {
        self.scope.dispose();
        self.context.prune_shared();
    }
}

impl Drop for StorageScope {
    fn drop(&mut self) {
        self.dispose();
    }
}
