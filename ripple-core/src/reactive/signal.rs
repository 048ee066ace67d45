//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an effect is running, the runtime records
//!    an edge between the signal and that effect.
//!
//! 2. When a different value is written, every observing effect is marked
//!    stale and queued.
//!
//! 3. Writing a value equal to the current one does nothing.
//!
//! # Ownership
//!
//! The value lives in the signal handle. The runtime's graph only holds the
//! signal's edge lists, addressed by [`SignalId`]. Readers get a shared
//! snapshot of the value, so a callback passed to `with` may write back to
//! the same signal, directly or through the effects its writes trigger. A signal keeps a weak
//! reference to its runtime; once the runtime is dropped the signal still
//! reads and writes its value but no longer tracks or notifies.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::{Runtime, WeakRuntime};
use crate::graph::SignalId;

/// Read side of a signal.
pub trait SignalRead {
    type Value;

    /// The signal's handle in the graph.
    fn id(&self) -> SignalId;

    /// Borrow the value, recording a dependency if an effect is running.
    fn with<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> R;

    /// Borrow the value without recording a dependency.
    fn with_untracked<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> R;

    /// Number of computations currently observing the signal.
    fn observer_count(&self) -> usize;

    /// Clone the value, recording a dependency if an effect is running.
    fn get(&self) -> Self::Value
    where
        Self::Value: Clone,
    {
        self.with(<Self::Value as Clone>::clone)
    }

    /// Clone the value without recording a dependency.
    fn get_untracked(&self) -> Self::Value
    where
        Self::Value: Clone,
    {
        self.with_untracked(<Self::Value as Clone>::clone)
    }
}

/// Write side of a signal.
pub trait SignalWrite {
    type Value;

    /// Store `value` and return it. Observers are notified only when it
    /// differs from the current value.
    fn set(&self, value: Self::Value) -> Self::Value;

    /// Compute the next value from the current one, then [`set`](Self::set) it.
    fn update(&self, f: impl FnOnce(&Self::Value) -> Self::Value) -> Self::Value;
}

struct SignalInner<T> {
    id: SignalId,
    runtime: WeakRuntime,
    value: RefCell<Rc<T>>,
}

/// A reactive cell holding a value of type `T`.
///
/// # Example
///
/// ```rust
/// use ripple_core::{create_effect, Signal, SignalRead, SignalWrite};
///
/// let count = Signal::new(0);
///
/// let reader = count.clone();
/// create_effect(move |_| println!("count is {}", reader.get()));
///
/// count.set(5); // prints "count is 5"
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a signal in the calling thread's default runtime.
    pub fn new(value: T) -> Self {
        Self::new_in(&Runtime::current(), value)
    }

    /// Create a signal in `runtime`.
    pub fn new_in(runtime: &Runtime, value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id: runtime.add_signal(),
                runtime: runtime.downgrade(),
                value: RefCell::new(Rc::new(value)),
            }),
        }
    }

    /// Split into a read-only and a write-only handle.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (ReadSignal(self.clone()), WriteSignal(self))
    }

    fn runtime(&self) -> Option<Runtime> {
        self.inner.runtime.upgrade()
    }

    /// The current value. The cell is only borrowed for the duration of the clone.
    fn snapshot(&self) -> Rc<T> {
        Rc::clone(&self.inner.value.borrow())
    }
}

impl<T> SignalRead for Signal<T>
where
    T: 'static,
{
    type Value = T;

    fn id(&self) -> SignalId {
        self.inner.id
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        if let Some(runtime) = self.runtime() {
            runtime.track(self.inner.id);
        }
        f(&self.snapshot())
    }

    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.snapshot())
    }

    fn observer_count(&self) -> usize {
        self.runtime()
            .map_or(0, |runtime| runtime.observer_count(self.inner.id))
    }
}

impl<T> SignalWrite for Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    type Value = T;

    fn set(&self, value: T) -> T {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            if **current == value {
                false
            } else {
                *current = Rc::new(value.clone());
                true
            }
        };

        if changed {
            if let Some(runtime) = self.runtime() {
                runtime.notify(self.inner.id);
            }
        }
        value
    }

    fn update(&self, f: impl FnOnce(&T) -> T) -> T {
        let next = f(&self.snapshot());
        self.set(next)
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &**self.inner.value.borrow())
            .finish()
    }
}

/// Read-only handle to a signal.
pub struct ReadSignal<T>(Signal<T>);

/// Write-only handle to a signal.
pub struct WriteSignal<T>(Signal<T>);

impl<T: 'static> SignalRead for ReadSignal<T> {
    type Value = T;

    fn id(&self) -> SignalId {
        self.0.id()
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }

    fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with_untracked(f)
    }

    fn observer_count(&self) -> usize {
        self.0.observer_count()
    }
}

impl<T> SignalWrite for WriteSignal<T>
where
    T: Clone + PartialEq + 'static,
{
    type Value = T;

    fn set(&self, value: T) -> T {
        self.0.set(value)
    }

    fn update(&self, f: impl FnOnce(&T) -> T) -> T {
        self.0.update(f)
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.0).finish()
    }
}

impl<T: fmt::Debug> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WriteSignal").field(&self.0).finish()
    }
}

impl Runtime {
    /// Create a signal in this runtime and return its read and write handles.
    pub fn create_signal<T: 'static>(&self, initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
        Signal::new_in(self, initial).split()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_get_and_set() {
        let runtime = Runtime::new();
        let (read, write) = runtime.create_signal(0);
        assert_eq!(read.get(), 0);

        assert_eq!(write.set(42), 42);
        assert_eq!(read.get(), 42);
    }

    #[test]
    fn signal_update() {
        let runtime = Runtime::new();
        let signal = Signal::new_in(&runtime, 10);
        assert_eq!(signal.update(|v| v + 5), 15);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn read_without_listener_records_nothing() {
        let runtime = Runtime::new();
        let signal = Signal::new_in(&runtime, "idle");

        assert_eq!(signal.get(), "idle");
        assert_eq!(signal.observer_count(), 0);
        runtime.verify_graph().unwrap();
    }

    #[test]
    fn with_borrows_without_cloning() {
        let runtime = Runtime::new();
        let signal = Signal::new_in(&runtime, vec![1, 2, 3]);
        assert_eq!(signal.with(|v| v.len()), 3);
        assert_eq!(signal.with_untracked(|v| v[2]), 3);
    }

    #[test]
    fn write_inside_with_sees_snapshot() {
        let runtime = Runtime::new();
        let signal = Signal::new_in(&runtime, 1);

        let seen = signal.with(|v| {
            signal.set(*v + 1);
            *v
        });

        assert_eq!(seen, 1);
        assert_eq!(signal.get(), 2);
    }

    #[test]
    fn signal_clone_shares_state() {
        let runtime = Runtime::new();
        let signal1 = Signal::new_in(&runtime, 0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn signal_ids_are_unique() {
        let runtime = Runtime::new();
        let s1 = Signal::new_in(&runtime, 0);
        let s2 = Signal::new_in(&runtime, 0);
        let s3 = Signal::new_in(&runtime, 0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
        assert_eq!(runtime.signal_count(), 3);
    }

    #[test]
    fn signal_outlives_runtime() {
        let signal = {
            let runtime = Runtime::new();
            Signal::new_in(&runtime, 1)
        };

        assert_eq!(signal.set(2), 2);
        assert_eq!(signal.get(), 2);
        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn debug_shows_value() {
        let runtime = Runtime::new();
        let (read, _write) = runtime.create_signal(7);
        assert_eq!(format!("{read:?}"), "ReadSignal(Signal { id: SignalId(0), value: 7 })");
    }
}
