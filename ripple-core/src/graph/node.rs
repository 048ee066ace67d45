//! Graph Nodes
//!
//! This module defines the records that live in the graph arena and the
//! integer handles used to refer to them.

use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;

/// Handle to a signal record in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SignalId(usize);

impl SignalId {
    /// Get the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for SignalId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Handle to a computation record in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComputationId(usize);

impl ComputationId {
    /// Get the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for ComputationId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Lifecycle state of a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ComputationState {
    /// Up to date, or not yet scheduled.
    #[default]
    Init,

    /// A dependency changed. The computation is queued and must re-run.
    Stale,

    /// Reserved for ancestor-first resolution of diamond graphs.
    /// Never assigned by the runtime.
    Pending,
}

/// Edge lists of one signal.
///
/// `observer_slots[j]` is the position, within the source list of
/// `observers[j]`, at which that computation recorded this signal.
#[derive(Debug, Default)]
pub struct SignalNode {
    pub(crate) observers: Vec<ComputationId>,
    pub(crate) observer_slots: Vec<usize>,
}

impl SignalNode {
    /// Computations currently observing the signal, in subscription order.
    pub fn observers(&self) -> &[ComputationId] {
        &self.observers
    }

    /// Cross-reference slots, parallel to [`observers`](Self::observers).
    pub fn observer_slots(&self) -> &[usize] {
        &self.observer_slots
    }
}

/// Edge lists and lifecycle state of one computation.
///
/// `source_slots[i]` is the position, within the observer list of
/// `sources[i]`, at which this computation was recorded.
#[derive(Debug, Default)]
pub struct ComputationNode {
    pub(crate) state: ComputationState,
    pub(crate) sources: SmallVec<[SignalId; 4]>,
    pub(crate) source_slots: SmallVec<[usize; 4]>,
}

impl ComputationNode {
    /// Current lifecycle state.
    pub fn state(&self) -> ComputationState {
        self.state
    }

    /// Signals read during the most recent run, in read order.
    pub fn sources(&self) -> &[SignalId] {
        &self.sources
    }

    /// Cross-reference slots, parallel to [`sources`](Self::sources).
    pub fn source_slots(&self) -> &[usize] {
        &self.source_slots
    }
}
