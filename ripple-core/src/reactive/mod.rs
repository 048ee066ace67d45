//! Reactive Primitives
//!
//! This module implements the user-facing half of the reactive system:
//! signals, effects, and the runtime that connects them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while an effect runs, the effect is registered as an observer. When a
//! different value is written, every observer is queued to re-run.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever a signal it
//! read during its last run changes. Effects are used to synchronize
//! reactive state with external systems.
//!
//! # Implementation Notes
//!
//! Each runtime keeps a listener: the effect currently running. Reading a
//! signal checks for a listener and, if there is one, records the edge in
//! the runtime's graph. Dependencies are rebuilt on every run, so an effect
//! that reads a signal conditionally only depends on it while it reads it.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod context;
mod effect;
mod runtime;
mod signal;

pub use runtime::Runtime;
pub use signal::{ReadSignal, Signal, SignalRead, SignalWrite, WriteSignal};
