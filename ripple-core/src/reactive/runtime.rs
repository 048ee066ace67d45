//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals and
//! effects. It owns the dependency graph and the scheduler state and runs
//! the update algorithm when a signal changes.
//!
//! # How It Works
//!
//! 1. Reading a signal while a computation is the listener records an edge
//!    between them in the graph.
//!
//! 2. Writing a different value to a signal opens a batch (or joins the
//!    active one), marks each `Init` observer `Stale` and queues it.
//!
//! 3. When the outermost batch body returns, the queue is flushed in order.
//!    Each stale computation has all its edges detached, then runs with
//!    itself as listener so that exactly the signals it reads this time are
//!    recorded again.
//!
//! # Threading
//!
//! A runtime is `!Send`. Every thread gets its own default runtime through
//! [`Runtime::current`], and any number of independent runtimes can be
//! built with [`Runtime::new`].

use std::any::Any;
use std::cell::{RefCell, RefMut};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::{debug, debug_span, error, trace, warn};

use super::context::ReactiveContext;
use crate::config::RuntimeConfig;
use crate::error::{ReactiveError, Result};
use crate::graph::{ComputationId, ComputationState, Graph, GraphSnapshot, SignalId, UpdateScheduler};

/// Type-erased effect body. It feeds the effect its previous value and
/// stores the new one.
pub(crate) type EffectFn = Box<dyn FnMut()>;

type ErrorHandler = Rc<dyn Fn(&ReactiveError)>;

struct RuntimeInner {
    config: RuntimeConfig,
    graph: RefCell<Graph>,
    scheduler: RefCell<UpdateScheduler>,
    /// Indexed by computation. A slot is `None` while its body is running.
    effects: RefCell<Vec<Option<EffectFn>>>,
    error_handler: RefCell<Option<ErrorHandler>>,
}

thread_local! {
    static CURRENT: Runtime = Runtime::new();
}

/// Handle to one reactive runtime.
///
/// Cloning the handle is cheap and refers to the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Non-owning handle held by signals, so that effect bodies capturing
/// signals do not keep their runtime alive in a cycle.
#[derive(Clone)]
pub(crate) struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(runtime = config.label(), "runtime created");
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                graph: RefCell::new(Graph::new()),
                scheduler: RefCell::new(UpdateScheduler::new()),
                effects: RefCell::new(Vec::new()),
                error_handler: RefCell::new(None),
            }),
        }
    }

    /// The calling thread's default runtime.
    pub fn current() -> Self {
        CURRENT.with(Runtime::clone)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `body` as one batch.
    ///
    /// Writes inside `body` queue their observers instead of running them.
    /// The queue is flushed once, when the outermost batch returns. If
    /// `body` panics, the queued computations are dropped back to `Init`
    /// and the panic continues to the caller.
    pub fn batch<R>(&self, body: impl FnOnce() -> R) -> R {
        self.run_updates(body)
    }

    /// Run `f` without recording any signal reads as dependencies.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::untracked(self);
        f()
    }

    /// Install a handler that receives every reported error, in addition
    /// to the `tracing` event.
    pub fn set_error_handler(&self, handler: impl Fn(&ReactiveError) + 'static) {
        *self.inner.error_handler.borrow_mut() = Some(Rc::new(handler));
    }

    /// The computation whose reads are currently tracked.
    pub fn listener(&self) -> Option<ComputationId> {
        self.inner.scheduler.borrow().listener()
    }

    /// Whether a batch is active.
    pub fn is_batching(&self) -> bool {
        self.inner.scheduler.borrow().is_batching()
    }

    pub fn signal_count(&self) -> usize {
        self.inner.graph.borrow().signal_count()
    }

    pub fn computation_count(&self) -> usize {
        self.inner.graph.borrow().computation_count()
    }

    /// Lifecycle state of a computation, or `None` if `computation` does
    /// not belong to this runtime.
    pub fn computation_state(&self, computation: ComputationId) -> Option<ComputationState> {
        self.inner.graph.borrow().state(computation)
    }

    /// Copy the current edges and states of the graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.inner.graph.borrow().snapshot()
    }

    /// Check the symmetric slot invariant over the whole graph.
    pub fn verify_graph(&self) -> Result<()> {
        self.inner.graph.borrow().verify()
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    pub(crate) fn scheduler_mut(&self) -> RefMut<'_, UpdateScheduler> {
        self.inner.scheduler.borrow_mut()
    }

    pub(crate) fn add_signal(&self) -> SignalId {
        self.inner.graph.borrow_mut().add_signal()
    }

    pub(crate) fn add_computation(&self, run: EffectFn) -> ComputationId {
        let id = self.inner.graph.borrow_mut().add_computation();
        self.inner.effects.borrow_mut().push(Some(run));
        id
    }

    pub(crate) fn observer_count(&self, signal: SignalId) -> usize {
        self.inner
            .graph
            .borrow()
            .signal(signal)
            .map_or(0, |node| node.observers().len())
    }

    /// Record `signal` as a source of the current listener, if any.
    pub(crate) fn track(&self, signal: SignalId) {
        let listener = self.inner.scheduler.borrow().listener();
        if let Some(listener) = listener {
            self.inner.graph.borrow_mut().register_edge(listener, signal);
        }
    }

    /// Queue every observer of a changed signal and flush if this call
    /// opened the batch.
    pub(crate) fn notify(&self, signal: SignalId) {
        self.run_updates(|| self.mark_observers(signal));
    }

    /// Queue a computation that has never run; the flush runs it once.
    pub(crate) fn defer(&self, computation: ComputationId) {
        self.inner
            .graph
            .borrow_mut()
            .set_state(computation, ComputationState::Stale);
        self.scheduler_mut().enqueue(computation);
    }

    fn mark_observers(&self, signal: SignalId) {
        let observers: SmallVec<[ComputationId; 8]> = {
            let graph = self.inner.graph.borrow();
            match graph.signal(signal) {
                Some(node) => node.observers().into(),
                None => return,
            }
        };

        let mut graph = self.inner.graph.borrow_mut();
        let mut scheduler = self.scheduler_mut();
        for computation in observers {
            if graph.state(computation) == Some(ComputationState::Init) {
                scheduler.enqueue(computation);
            }
            graph.set_state(computation, ComputationState::Stale);
        }
    }

    pub(crate) fn run_updates<R>(&self, body: impl FnOnce() -> R) -> R {
        if !self.scheduler_mut().begin_batch() {
            return body();
        }

        let _guard = BatchGuard { runtime: self };
        let result = body();
        self.flush();
        result
    }

    fn flush(&self) {
        let span = debug_span!("flush", runtime = self.inner.config.label());
        let _enter = span.enter();

        let limit = self.inner.config.max_flush_runs;
        let mut index = 0;
        let mut runs = 0;
        loop {
            let Some(next) = self.inner.scheduler.borrow().queued(index) else {
                break;
            };

            let limit_hit = limit.filter(|&limit| runs >= limit && self.is_stale(next));
            if let Some(limit) = limit_hit {
                let queue = self.scheduler_mut().end_batch();
                let dropped = self.reset(&queue[index..]);
                self.report(ReactiveError::FlushLimitExceeded { limit, dropped });
                return;
            }

            if self.run_top(next) {
                runs += 1;
            }
            index += 1;
        }

        self.scheduler_mut().end_batch();
        debug!(processed = index, runs, "flush complete");
    }

    fn is_stale(&self, computation: ComputationId) -> bool {
        matches!(
            self.inner.graph.borrow().state(computation),
            Some(state) if state != ComputationState::Init
        )
    }

    /// Run a queued computation unless it already went back to `Init`.
    /// Returns whether it ran.
    fn run_top(&self, computation: ComputationId) -> bool {
        if !self.is_stale(computation) {
            return false;
        }
        self.update_computation(computation);
        true
    }

    fn update_computation(&self, computation: ComputationId) {
        self.inner.graph.borrow_mut().clean(computation);
        self.run_computation(computation);
    }

    pub(crate) fn run_computation(&self, computation: ComputationId) {
        let taken = self
            .inner
            .effects
            .borrow_mut()
            .get_mut(computation.index())
            .and_then(Option::take);
        let Some(mut run) = taken else {
            trace!(%computation, "not runnable");
            return;
        };

        trace!(%computation, "run");
        let outcome = {
            let _ctx = ReactiveContext::enter(self, computation);
            panic::catch_unwind(AssertUnwindSafe(|| run()))
        };
        self.inner.effects.borrow_mut()[computation.index()] = Some(run);

        if let Err(payload) = outcome {
            self.report(ReactiveError::ComputationPanicked {
                computation,
                message: panic_message(payload.as_ref()),
            });
        }
    }

    /// Put `computations` back to `Init` and count how many were still waiting to run.
    fn reset(&self, computations: &[ComputationId]) -> usize {
        let mut graph = self.inner.graph.borrow_mut();
        let mut pending = 0;
        for &computation in computations {
            if graph.state(computation) == Some(ComputationState::Stale) {
                pending += 1;
            }
            graph.set_state(computation, ComputationState::Init);
        }
        pending
    }

    fn report(&self, err: ReactiveError) {
        error!(runtime = self.inner.config.label(), error = %err, "reactive error");
        let handler = self.inner.error_handler.borrow().clone();
        if let Some(handler) = handler {
            handler(&err);
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("label", &self.inner.config.label())
            .field("signals", &self.signal_count())
            .field("computations", &self.computation_count())
            .field("batching", &self.is_batching())
            .finish()
    }
}

/// Closes the batch if its body unwinds, so the runtime stays usable.
struct BatchGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let Ok(mut scheduler) = self.runtime.inner.scheduler.try_borrow_mut() else {
            return;
        };
        let dropped = scheduler.end_batch();
        drop(scheduler);

        if let Ok(mut graph) = self.runtime.inner.graph.try_borrow_mut() {
            for &computation in &dropped {
                graph.set_state(computation, ComputationState::Init);
            }
        }
        warn!(
            runtime = self.runtime.inner.config.label(),
            dropped = dropped.len(),
            "batch aborted by panic"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
