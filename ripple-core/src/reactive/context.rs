//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the runtime registers the current computation as an observer.
//!
//! # Implementation
//!
//! The listener lives in the runtime's scheduler. Entering a context swaps
//! the new listener in and keeps the previous one in the guard. Dropping
//! the guard swaps it back, so the listener is restored on every exit path,
//! including a panicking effect body.

use super::runtime::Runtime;
use crate::graph::ComputationId;

/// Guard that restores the previous listener when dropped.
pub(crate) struct ReactiveContext<'a> {
    runtime: &'a Runtime,
    previous: Option<ComputationId>,
}

impl<'a> ReactiveContext<'a> {
    /// Make `computation` the listener of `runtime` until the guard drops.
    pub(crate) fn enter(runtime: &'a Runtime, computation: ComputationId) -> Self {
        Self::swap(runtime, Some(computation))
    }

    /// Suspend tracking on `runtime` until the guard drops.
    pub(crate) fn untracked(runtime: &'a Runtime) -> Self {
        Self::swap(runtime, None)
    }

    fn swap(runtime: &'a Runtime, listener: Option<ComputationId>) -> Self {
        let previous = runtime.scheduler_mut().replace_listener(listener);
        Self { runtime, previous }
    }
}

impl Drop for ReactiveContext<'_> {
    fn drop(&mut self) {
        self.runtime.scheduler_mut().replace_listener(self.previous);
    }
}
