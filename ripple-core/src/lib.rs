//! Ripple Core
//!
//! This crate provides a fine-grained reactive runtime. It implements:
//!
//! - Signals: mutable cells that know which computations read them
//! - Effects: computations that re-run when a signal they read changes
//! - A slot-indexed dependency graph with O(1) edge removal
//! - Batched, in-order scheduling of stale effects
//!
//! Writing a signal re-runs exactly the effects that read it during their
//! last run, and nothing else.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: arena of signal/computation edge lists and scheduler state
//! - `reactive`: signals, effects and the runtime that drives updates
//! - `config`: per-runtime configuration
//! - `error`: errors reported by the runtime
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{create_effect, create_signal, SignalRead, SignalWrite};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let (count, set_count) = create_signal(0);
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = log.clone();
//! create_effect(move |_| sink.borrow_mut().push(count.get()));
//!
//! set_count.set(1);
//! set_count.update(|n| n + 1);
//! assert_eq!(*log.borrow(), vec![0, 1, 2]);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use graph::{ComputationId, ComputationState, GraphSnapshot, SignalId};
pub use reactive::{ReadSignal, Runtime, Signal, SignalRead, SignalWrite, WriteSignal};

/// Create a signal in the calling thread's default runtime.
pub fn create_signal<T: 'static>(initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
    Runtime::current().create_signal(initial)
}

/// Create an effect in the calling thread's default runtime.
///
/// `f` receives the value it returned on its previous run, or `None` on
/// the first run.
pub fn create_effect<T, F>(f: F)
where
    T: 'static,
    F: FnMut(Option<T>) -> T + 'static,
{
    Runtime::current().create_effect(f)
}

/// Run `body` as one batch in the calling thread's default runtime.
pub fn batch<R>(body: impl FnOnce() -> R) -> R {
    Runtime::current().batch(body)
}

/// Run `f` without tracking reads in the calling thread's default runtime.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    Runtime::current().untrack(f)
}
