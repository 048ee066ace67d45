//! Dependency Graph
//!
//! This module implements the bidirectional graph between signals and the
//! computations that read them.
//!
//! # Overview
//!
//! Signals and computations live in two growable arenas and refer to each
//! other by integer handle, so the cyclic signal <-> computation references
//! never involve ownership. Records are never removed; a handle stays valid
//! for the lifetime of its runtime.
//!
//! Every edge is stored twice, once in the computation's `sources` and once
//! in the signal's `observers`, and each side remembers the position of the
//! other side (its "slot"). For every `i` with `sources[i] == s` and
//! `j = source_slots[i]`:
//!
//! ```text
//! signals[s].observers[j] == c  &&  signals[s].observer_slots[j] == i
//! ```
//!
//! This lets an edge be removed in O(1) with a swap-remove on both sides,
//! patching the moved element's cross reference.

mod node;
mod scheduler;

use serde::Serialize;
use tracing::{trace, warn};

use crate::error::{ReactiveError, Result};

pub use node::{ComputationId, ComputationNode, ComputationState, SignalId, SignalNode};
pub use scheduler::UpdateScheduler;

/// Arena of signal and computation records.
#[derive(Debug, Default)]
pub struct Graph {
    signals: Vec<SignalNode>,
    computations: Vec<ComputationNode>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a signal record with no observers.
    pub fn add_signal(&mut self) -> SignalId {
        self.signals.push(SignalNode::default());
        SignalId::from(self.signals.len() - 1)
    }

    /// Allocate a computation record in the `Init` state with no sources.
    pub fn add_computation(&mut self) -> ComputationId {
        self.computations.push(ComputationNode::default());
        ComputationId::from(self.computations.len() - 1)
    }

    /// Get a signal record, or `None` if `id` was not allocated by this graph.
    pub fn signal(&self, id: SignalId) -> Option<&SignalNode> {
        self.signals.get(id.index())
    }

    /// Get a computation record, or `None` if `id` was not allocated by this graph.
    pub fn computation(&self, id: ComputationId) -> Option<&ComputationNode> {
        self.computations.get(id.index())
    }

    /// Lifecycle state of a computation.
    pub fn state(&self, id: ComputationId) -> Option<ComputationState> {
        self.computation(id).map(ComputationNode::state)
    }

    /// Set the lifecycle state of a computation. Returns `false` for an
    /// unknown id.
    pub fn set_state(&mut self, id: ComputationId, state: ComputationState) -> bool {
        match self.computations.get_mut(id.index()) {
            Some(node) => {
                node.state = state;
                true
            }
            None => false,
        }
    }

    /// Number of signals allocated so far.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Number of computations allocated so far.
    pub fn computation_count(&self) -> usize {
        self.computations.len()
    }

    /// Record that `computation` read `signal` during its current run.
    ///
    /// A second read of the same signal within one run is ignored, so an
    /// observer list never holds the same computation twice. Ids this graph
    /// did not allocate are ignored as well.
    pub fn register_edge(&mut self, computation: ComputationId, signal: SignalId) {
        let (Some(target), Some(observers)) = (
            self.computations.get_mut(computation.index()),
            self.signals.get_mut(signal.index()),
        ) else {
            warn!(%computation, %signal, "edge between unknown nodes ignored");
            return;
        };
        if target.sources.contains(&signal) {
            return;
        }

        let signal_slot = observers.observers.len();

        target.sources.push(signal);
        target.source_slots.push(signal_slot);

        observers.observers.push(computation);
        observers.observer_slots.push(target.sources.len() - 1);

        trace!(%computation, %signal, signal_slot, "edge registered");
    }

    /// Detach every edge of `computation` and reset it to `Init`.
    ///
    /// Edges are popped from the end of the computation's source list. On
    /// the signal side the last observer is moved into the freed position
    /// and its own `source_slots` entry is patched to point at it.
    pub fn clean(&mut self, computation: ComputationId) {
        let Self {
            signals,
            computations,
        } = self;
        if computation.index() >= computations.len() {
            return;
        }

        loop {
            let node = &mut computations[computation.index()];
            let (Some(source), Some(index)) = (node.sources.pop(), node.source_slots.pop()) else {
                break;
            };

            let signal = &mut signals[source.index()];
            let (Some(moved), Some(moved_slot)) =
                (signal.observers.pop(), signal.observer_slots.pop())
            else {
                continue;
            };

            if index < signal.observers.len() {
                computations[moved.index()].source_slots[moved_slot] = index;
                signal.observers[index] = moved;
                signal.observer_slots[index] = moved_slot;
            }
        }

        computations[computation.index()].state = ComputationState::Init;
        trace!(%computation, "edges cleaned");
    }

    /// Check the symmetric slot invariant over every edge in the arena.
    pub fn verify(&self) -> Result<()> {
        for (c, node) in self.computations.iter().enumerate() {
            let computation = ComputationId::from(c);
            if node.sources.len() != node.source_slots.len() {
                return Err(ReactiveError::SlotListLength {
                    computation,
                    sources: node.sources.len(),
                    slots: node.source_slots.len(),
                });
            }
            for (i, (&signal, &j)) in node.sources.iter().zip(&node.source_slots).enumerate() {
                let observers = &self.signals[signal.index()];
                let mismatch = |detail: String| ReactiveError::SlotMismatch {
                    signal,
                    computation,
                    detail,
                };
                match (observers.observers.get(j), observers.observer_slots.get(j)) {
                    (Some(&c2), Some(&i2)) if c2 == computation && i2 == i => {}
                    (Some(&c2), Some(&i2)) => {
                        return Err(mismatch(format!(
                            "source {i} points at observer {j} = ({c2}, {i2})"
                        )))
                    }
                    _ => return Err(mismatch(format!("observer slot {j} out of range"))),
                }
            }
        }

        for (s, node) in self.signals.iter().enumerate() {
            let signal = SignalId::from(s);
            let edges = node.observers.iter().zip(&node.observer_slots);
            for (j, (&computation, &i)) in edges.enumerate() {
                let back = &self.computations[computation.index()];
                if back.sources.get(i) != Some(&signal) || back.source_slots.get(i) != Some(&j) {
                    return Err(ReactiveError::SlotMismatch {
                        signal,
                        computation,
                        detail: format!("observer {j} is not mirrored by source {i}"),
                    });
                }
            }
        }

        Ok(())
    }

    /// Copy the edge lists and states into a serializable snapshot.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            signals: self
                .signals
                .iter()
                .enumerate()
                .map(|(s, node)| SignalSnapshot {
                    id: SignalId::from(s),
                    observers: node.observers.clone(),
                    observer_slots: node.observer_slots.clone(),
                })
                .collect(),
            computations: self
                .computations
                .iter()
                .enumerate()
                .map(|(c, node)| ComputationSnapshot {
                    id: ComputationId::from(c),
                    state: node.state,
                    sources: node.sources.to_vec(),
                    source_slots: node.source_slots.to_vec(),
                })
                .collect(),
        }
    }
}

/// Point-in-time copy of the whole graph, for debugging and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub signals: Vec<SignalSnapshot>,
    pub computations: Vec<ComputationSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSnapshot {
    pub id: SignalId,
    pub observers: Vec<ComputationId>,
    pub observer_slots: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputationSnapshot {
    pub id: ComputationId,
    pub state: ComputationState,
    pub sources: Vec<SignalId>,
    pub source_slots: Vec<usize>,
}

impl GraphSnapshot {
    /// Render the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_edge_pairs_slots() {
        let mut graph = Graph::new();
        let a = graph.add_signal();
        let b = graph.add_signal();
        let c1 = graph.add_computation();
        let c2 = graph.add_computation();

        graph.register_edge(c1, a);
        graph.register_edge(c2, b);
        graph.register_edge(c2, a);

        assert_eq!(graph.signal(a).unwrap().observers(), &[c1, c2]);
        assert_eq!(graph.signal(a).unwrap().observer_slots(), &[0, 1]);
        assert_eq!(graph.computation(c2).unwrap().sources(), &[b, a]);
        assert_eq!(graph.computation(c2).unwrap().source_slots(), &[0, 1]);
        graph.verify().unwrap();
    }

    #[test]
    fn repeated_read_records_one_edge() {
        let mut graph = Graph::new();
        let a = graph.add_signal();
        let c = graph.add_computation();

        graph.register_edge(c, a);
        graph.register_edge(c, a);

        assert_eq!(graph.signal(a).unwrap().observers().len(), 1);
        assert_eq!(graph.computation(c).unwrap().sources().len(), 1);
    }

    #[test]
    fn clean_patches_moved_observer() {
        let mut graph = Graph::new();
        let s = graph.add_signal();
        let first = graph.add_computation();
        let middle = graph.add_computation();
        let last = graph.add_computation();

        graph.register_edge(first, s);
        graph.register_edge(middle, s);
        graph.register_edge(last, s);

        graph.clean(first);

        // `last` was swapped into position 0.
        assert_eq!(graph.signal(s).unwrap().observers(), &[last, middle]);
        assert_eq!(graph.computation(last).unwrap().source_slots(), &[0]);
        assert!(graph.computation(first).unwrap().sources().is_empty());
        graph.verify().unwrap();
    }

    #[test]
    fn clean_handles_many_signals_and_observers() {
        let mut graph = Graph::new();
        let signals: Vec<_> = (0..4).map(|_| graph.add_signal()).collect();
        let computations: Vec<_> = (0..5).map(|_| graph.add_computation()).collect();

        for (n, &c) in computations.iter().enumerate() {
            for &s in signals.iter().skip(n % 2) {
                graph.register_edge(c, s);
            }
        }
        graph.verify().unwrap();

        graph.clean(computations[1]);
        graph.verify().unwrap();
        graph.clean(computations[4]);
        graph.verify().unwrap();
        graph.register_edge(computations[1], signals[0]);
        graph.verify().unwrap();

        assert_eq!(graph.signal(signals[0]).unwrap().observers().len(), 3);
        assert_eq!(graph.signal(signals[3]).unwrap().observers().len(), 3);
    }

    #[test]
    fn clean_resets_state() {
        let mut graph = Graph::new();
        let c = graph.add_computation();
        graph.set_state(c, ComputationState::Stale);

        graph.clean(c);

        assert_eq!(graph.state(c), Some(ComputationState::Init));
    }

    #[test]
    fn verify_detects_broken_slot() {
        let mut graph = Graph::new();
        let s = graph.add_signal();
        let c = graph.add_computation();
        graph.register_edge(c, s);

        graph.signals[s.index()].observer_slots[0] = 5;

        assert!(matches!(
            graph.verify(),
            Err(ReactiveError::SlotMismatch { .. })
        ));
    }

    #[test]
    fn verify_reports_uneven_source_lists() {
        let mut graph = Graph::new();
        let s = graph.add_signal();
        let c = graph.add_computation();
        graph.register_edge(c, s);

        graph.computations[c.index()].source_slots.push(0);

        match graph.verify() {
            Err(ReactiveError::SlotListLength {
                computation,
                sources,
                slots,
            }) => {
                assert_eq!(computation, c);
                assert_eq!((sources, slots), (1, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut graph = Graph::new();
        let s = graph.add_signal();
        let c = graph.add_computation();
        let stray_signal = SignalId::from(7);
        let stray_computation = ComputationId::from(7);

        assert!(graph.signal(stray_signal).is_none());
        assert!(graph.computation(stray_computation).is_none());
        assert_eq!(graph.state(stray_computation), None);
        assert!(!graph.set_state(stray_computation, ComputationState::Stale));

        graph.register_edge(stray_computation, s);
        graph.register_edge(c, stray_signal);
        graph.clean(stray_computation);

        assert!(graph.signal(s).unwrap().observers().is_empty());
        assert!(graph.computation(c).unwrap().sources().is_empty());
        graph.verify().unwrap();
    }

    #[test]
    fn snapshot_serializes_edges() {
        let mut graph = Graph::new();
        let s = graph.add_signal();
        let c = graph.add_computation();
        graph.register_edge(c, s);

        let snapshot = graph.snapshot();
        assert_eq!(snapshot.signals[0].observers, vec![c]);
        assert_eq!(snapshot.computations[0].sources, vec![s]);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"observer_slots\""));
        assert!(json.contains("\"Init\""));
    }
}
