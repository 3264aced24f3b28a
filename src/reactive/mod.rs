//! Minimal single-threaded reactive runtime.
//!
//! SYSTEM CONTEXT
//! ==============
//! Storage handles need three things from a reactive framework: a mutable
//! cell, reactions that re-run when a cell they read changes, and an owning
//! lifetime. This module provides exactly those, with a manual
//! [`Runtime::flush`] so tests decide when deferred reactions run.

mod runtime;
mod scope;
mod signal;

pub use runtime::{DEFAULT_FLUSH_LIMIT, EffectId, Runtime, RuntimeError};
pub use scope::Scope;
pub use signal::Signal;
