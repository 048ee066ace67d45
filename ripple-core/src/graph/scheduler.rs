//! Update Scheduler
//!
//! The scheduler holds the two pieces of per-runtime state that drive
//! updates: the listener (the computation currently running, whose reads
//! are recorded as edges) and the effect queue of the active batch.
//!
//! # Algorithm
//!
//! 1. A write marks every `Init` observer of the changed signal `Stale` and
//!    appends it to the queue, opening a batch if none is active.
//! 2. Nested batches flatten into the outermost one.
//! 3. When the outermost batch body returns, the queue is drained by index.
//!    Computations that become stale, or are created, while the queue drains
//!    are appended to the same queue and run before the flush returns.
//!
//! The scheduler only stores state. Running computations is the job of the
//! reactive runtime, which must not hold a borrow of the scheduler while
//! user code executes.

use super::node::ComputationId;

/// Listener and batch queue of one runtime.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    listener: Option<ComputationId>,

    /// `None` when no batch is active.
    queue: Option<Vec<ComputationId>>,
}

impl UpdateScheduler {
    /// Create a scheduler with no listener and no active batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// The computation whose reads are currently tracked.
    pub fn listener(&self) -> Option<ComputationId> {
        self.listener
    }

    /// Install a listener, returning the one it replaces.
    pub fn replace_listener(&mut self, listener: Option<ComputationId>) -> Option<ComputationId> {
        std::mem::replace(&mut self.listener, listener)
    }

    /// Whether a batch is active.
    pub fn is_batching(&self) -> bool {
        self.queue.is_some()
    }

    /// Open a batch.
    ///
    /// Returns `false` when a batch was already active, in which case the
    /// caller joins it and must not flush.
    pub fn begin_batch(&mut self) -> bool {
        if self.queue.is_some() {
            return false;
        }
        self.queue = Some(Vec::new());
        true
    }

    /// Append a computation to the active batch, opening one if needed.
    pub fn enqueue(&mut self, computation: ComputationId) {
        self.queue.get_or_insert_with(Vec::new).push(computation);
    }

    /// The queued computation at `index`, re-reading the live queue length.
    pub fn queued(&self, index: usize) -> Option<ComputationId> {
        self.queue.as_ref().and_then(|queue| queue.get(index).copied())
    }

    /// Number of computations queued in the active batch.
    pub fn queue_len(&self) -> usize {
        self.queue.as_ref().map_or(0, Vec::len)
    }

    /// Close the batch and hand back whatever was queued.
    pub fn end_batch(&mut self) -> Vec<ComputationId> {
        self.queue.take().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_begin_joins_outer_batch() {
        let mut scheduler = UpdateScheduler::new();

        assert!(!scheduler.is_batching());
        assert!(scheduler.begin_batch());
        assert!(!scheduler.begin_batch());
        assert!(scheduler.is_batching());

        scheduler.end_batch();
        assert!(!scheduler.is_batching());
    }

    #[test]
    fn queue_grows_while_draining() {
        let mut scheduler = UpdateScheduler::new();
        scheduler.begin_batch();
        scheduler.enqueue(ComputationId::from(0));

        let mut seen = Vec::new();
        let mut index = 0;
        while let Some(id) = scheduler.queued(index) {
            seen.push(id);
            if id.index() < 2 {
                scheduler.enqueue(ComputationId::from(id.index() + 1));
            }
            index += 1;
        }

        assert_eq!(
            seen,
            vec![ComputationId::from(0), ComputationId::from(1), ComputationId::from(2)]
        );
        assert_eq!(scheduler.end_batch().len(), 3);
    }

    #[test]
    fn enqueue_opens_batch() {
        let mut scheduler = UpdateScheduler::new();
        scheduler.enqueue(ComputationId::from(4));

        assert!(scheduler.is_batching());
        assert_eq!(scheduler.queue_len(), 1);
    }

    #[test]
    fn listener_replacement_returns_previous() {
        let mut scheduler = UpdateScheduler::new();
        let outer = ComputationId::from(1);
        let inner = ComputationId::from(2);

        assert_eq!(scheduler.replace_listener(Some(outer)), None);
        assert_eq!(scheduler.replace_listener(Some(inner)), Some(outer));
        assert_eq!(scheduler.listener(), Some(inner));
        assert_eq!(scheduler.replace_listener(None), Some(inner));
    }
}
