//! Effect Implementation
//!
//! An effect is a computation that re-runs whenever a signal it read during
//! its last run changes.
//!
//! # How Effects Work
//!
//! 1. The body receives the value it returned last time (`None` on the
//!    first run, and after a run that panicked).
//!
//! 2. Created outside any batch, the effect runs immediately. Created while
//!    a batch is active (inside another effect, or inside
//!    [`Runtime::batch`]), it is queued and runs once, after the code that
//!    created it has finished.
//!
//! 3. Before every re-run all of the effect's edges are detached, so the
//!    dependencies after a run are exactly the signals read during it.
//!
//! Effects are never disposed: there is no owner tree, and an effect lives
//! as long as its runtime.

use super::runtime::Runtime;

impl Runtime {
    /// Create an effect in this runtime.
    pub fn create_effect<T, F>(&self, f: F)
    where
        T: 'static,
        F: FnMut(Option<T>) -> T + 'static,
    {
        let mut f = f;
        let mut value: Option<T> = None;
        let computation = self.add_computation(Box::new(move || {
            let next = f(value.take());
            value = Some(next);
        }));

        if self.is_batching() {
            self.defer(computation);
        } else {
            self.run_updates(|| self.run_computation(computation));
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ComputationState;
    use crate::reactive::{Signal, SignalRead, SignalWrite};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn effect_runs_on_creation() {
        let runtime = Runtime::new();
        let run_count = Rc::new(Cell::new(0));
        let counter = run_count.clone();

        runtime.create_effect(move |_| counter.set(counter.get() + 1));

        // Effect should have run once on creation
        assert_eq!(run_count.get(), 1);
        assert_eq!(runtime.computation_count(), 1);
    }

    #[test]
    fn effect_receives_previous_value() {
        let runtime = Runtime::new();
        let signal = Signal::new_in(&runtime, 1);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let reader = signal.clone();
        let log = seen.clone();
        runtime.create_effect(move |prev: Option<i32>| {
            log.borrow_mut().push(prev);
            prev.unwrap_or(0) + reader.get()
        });

        signal.set(10);
        signal.set(100);

        assert_eq!(*seen.borrow(), vec![None, Some(1), Some(11)]);
    }

    #[test]
    fn effect_created_in_batch_waits_for_flush() {
        let runtime = Runtime::new();
        let run_count = Rc::new(Cell::new(0));

        runtime.batch(|| {
            let counter = run_count.clone();
            runtime.create_effect(move |_| counter.set(counter.get() + 1));
            assert_eq!(run_count.get(), 0);
        });

        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn effect_returns_to_init_after_run() {
        let runtime = Runtime::new();
        let signal = Signal::new_in(&runtime, 0);
        let reader = signal.clone();
        runtime.create_effect(move |_| reader.get());

        signal.set(1);

        let snapshot = runtime.snapshot();
        assert_eq!(snapshot.computations[0].state, ComputationState::Init);
        assert_eq!(signal.observer_count(), 1);
    }

    #[test]
    fn failed_run_clears_previous_value() {
        let runtime = Runtime::new();
        let signal = Signal::new_in(&runtime, 0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let reader = signal.clone();
        let log = seen.clone();
        runtime.create_effect(move |prev: Option<i32>| {
            log.borrow_mut().push(prev);
            let value = reader.get();
            assert!(value != 1, "one is not allowed");
            value
        });

        signal.set(1);
        signal.set(2);

        // The panicking run kept its edge, and its value was lost.
        assert_eq!(*seen.borrow(), vec![None, Some(0), None]);
    }
}
