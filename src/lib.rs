//! Reactive values persisted in browser-style key-value storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! A [`StorageSignal`] reads its initial value from storage, writes local
//! changes back on the next [`StorageContext::flush`], and follows changes
//! made by sibling handles (same context) and by other windows (`storage`
//! events). Storage, events and the reactive runtime are injected, so the same
//! code runs against the in-memory browser in tests and against `web-sys`
//! under the `hydrate` feature.
//!
//! ```
//! use storage_signal::{MemoryBrowser, StorageContext, StorageOptions};
//!
//! let browser = MemoryBrowser::new();
//! let window = browser.open_window();
//! let cx = StorageContext::memory(&window);
//! let scope = cx.scope();
//!
//! let theme = scope.local_storage("theme", StorageOptions::default().default_value("light".to_owned()))?;
//! assert_eq!(theme.get().as_deref(), Some("light"));
//!
//! theme.set("dark".to_owned());
//! cx.flush()?;
//! assert_eq!(browser.local_storage().get("theme").as_deref(), Some("\"dark\""));
//! # Ok::<(), storage_signal::Error>(())
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod options;
pub mod reactive;
pub mod storage;
pub mod storage_signal;

pub use codec::CodecError;
pub use config::{ConfigError, ContextConfig};
pub use context::{StorageContext, StorageContextBuilder, StorageScope};
pub use error::Error;
pub use events::{Listener, StorageEvent, StorageEvents, Subscription};
pub use options::StorageOptions;
pub use reactive::{Runtime, RuntimeError, Scope, Signal};
pub use storage::memory::{MemoryBrowser, MemoryStorage, MemoryWindow, StorageOp, WindowStorage};
pub use storage::{StorageArea, StorageBackend, StorageError};
pub use storage_signal::{StorageSignal, use_local_storage, use_session_storage, use_storage};
