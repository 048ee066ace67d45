//! Error types for the reactive runtime.
//!
//! Failures inside effect bodies never reach the caller of a write or of
//! `create_effect`. They are caught at the computation boundary, logged and
//! handed to the runtime's error handler as a [`ReactiveError`].

use thiserror::Error;

use crate::graph::{ComputationId, SignalId};

/// Errors reported by the reactive runtime.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// An effect body panicked. The effect keeps its edges from the failed
    /// run and its value is unset until the next successful run.
    #[error("computation {computation} panicked: {message}")]
    ComputationPanicked {
        computation: ComputationId,
        message: String,
    },

    /// A single flush reached the `max_flush_runs` bound.
    #[error("flush stopped after {limit} computation runs, {dropped} more dropped")]
    FlushLimitExceeded { limit: usize, dropped: usize },

    /// The symmetric slot invariant between a signal and a computation is broken.
    #[error("slot mismatch between {signal} and {computation}: {detail}")]
    SlotMismatch {
        signal: SignalId,
        computation: ComputationId,
        detail: String,
    },

    /// A computation's source list and source slot list differ in length.
    #[error("computation {computation} has {sources} sources but {slots} source slots")]
    SlotListLength {
        computation: ComputationId,
        sources: usize,
        slots: usize,
    },

    /// A runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias for fallible runtime operations.
pub type Result<T> = std::result::Result<T, ReactiveError>;
