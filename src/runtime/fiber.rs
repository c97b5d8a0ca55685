//! Forked fibers and their handles.
//!
//! `fork` starts a computation on a child fiber and returns a [`Handle`] to
//! it. The child runs immediately on the forking thread up to its first
//! suspension point; after that it continues wherever its async operations
//! resume it.
//!
//! # Ownership
//!
//! The handle does not own the fiber. Dropping the handle does not cancel
//! the child; it only gives up the ability to observe or abort it.
//!
//! # Linking
//!
//! A fiber started with [`fork`](Computation::fork) is linked to its parent's
//! controller: when the parent is cancelled, the child's controller is
//! requested too. The link holds even when the fork happens inside a masked
//! region. It is removed once the child completes.
//! [`fork_daemon`](Computation::fork_daemon) starts an unlinked fiber.

use crate::cancel::CancelSignal;
use crate::combinator::async_bridge::from_callback;
use crate::combinator::sequence::{from_outcome, sync};
use crate::effect::Computation;
use crate::env::Env;
use crate::tracing_compat::trace;
use crate::types::{CancelReason, FiberId, Outcome};
use core::fmt;
use parking_lot::Mutex;
use std::sync::Arc;

type Observer<A, E> = Box<dyn FnOnce(&Outcome<A, E>) + Send>;

struct FiberInner<A, E> {
    outcome: Option<Arc<Outcome<A, E>>>,
    observers: Vec<(u64, Observer<A, E>)>,
    next_observer: u64,
}

struct FiberState<A, E> {
    id: FiberId,
    controller: CancelSignal,
    inner: Mutex<FiberInner<A, E>>,
}

/// A handle to a forked fiber.
///
/// Cloning is cheap; all clones observe the same fiber.
pub struct Handle<A, E> {
    state: Arc<FiberState<A, E>>,
}

impl<A, E> Clone for Handle<A, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<A, E> fmt::Debug for Handle<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.state.id)
            .field("done", &self.is_done())
            .finish()
    }
}

impl<A, E> Handle<A, E> {
    fn new(id: FiberId, controller: CancelSignal) -> Self {
        Self {
            state: Arc::new(FiberState {
                id,
                controller,
                inner: Mutex::new(FiberInner {
                    outcome: None,
                    observers: Vec::new(),
                    next_observer: 0,
                }),
            }),
        }
    }

    /// Returns the identity of the fiber.
    #[must_use]
    pub fn id(&self) -> FiberId {
        self.state.id
    }

    /// Returns true once the fiber has completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state.inner.lock().outcome.is_some()
    }

    /// Requests cancellation of the fiber without waiting for it.
    ///
    /// Returns true if this call performed the request.
    #[allow(clippy::must_use_candidate)]
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.state.controller.request(reason)
    }

    /// Records the outcome and notifies observers, outside the lock.
    fn complete(&self, outcome: Outcome<A, E>) {
        let outcome = Arc::new(outcome);
        let observers = {
            let mut inner = self.state.inner.lock();
            if inner.outcome.is_some() {
                return;
            }
            inner.outcome = Some(Arc::clone(&outcome));
            std::mem::take(&mut inner.observers)
        };
        trace!(
            fiber = %self.state.id,
            severity = outcome.severity(),
            observers = observers.len(),
            "fiber completed"
        );
        for (_, observer) in observers {
            observer(&outcome);
        }
    }

    /// Calls `observer` with the outcome once the fiber completes.
    ///
    /// If the fiber has already completed, `observer` runs immediately and
    /// `None` is returned.
    pub(crate) fn on_complete<F>(&self, observer: F) -> Option<u64>
    where
        F: FnOnce(&Outcome<A, E>) + Send + 'static,
    {
        let mut inner = self.state.inner.lock();
        if let Some(outcome) = inner.outcome.clone() {
            drop(inner);
            observer(&outcome);
            return None;
        }
        let key = inner.next_observer;
        inner.next_observer += 1;
        inner.observers.push((key, Box::new(observer)));
        Some(key)
    }

    pub(crate) fn remove_observer(&self, key: u64) {
        self.state.inner.lock().observers.retain(|(k, _)| *k != key);
    }
}

impl<A, E> Handle<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Returns the outcome if the fiber has completed.
    #[must_use]
    pub fn try_outcome(&self) -> Option<Outcome<A, E>> {
        self.state
            .inner
            .lock()
            .outcome
            .as_deref()
            .cloned()
    }

    /// Waits for the fiber and returns its outcome as a value.
    ///
    /// Does not consume the outcome: every waiter observes the same one.
    /// Cancelling the waiter stops the wait; the fiber keeps running.
    #[must_use]
    pub fn await_outcome<E2, R>(&self) -> Computation<Outcome<A, E>, E2, R>
    where
        E2: Send + 'static,
        R: 'static,
    {
        let handle = self.clone();
        from_callback(move |resume, _signal| {
            let waiter = resume.clone();
            let key = handle.on_complete(move |outcome| {
                waiter.succeed(outcome.clone());
            })?;
            let handle = handle.clone();
            Some(sync(move || handle.remove_observer(key)))
        })
    }

    /// Waits for the fiber and continues with its outcome.
    ///
    /// A failed, cancelled or defective child makes the joiner end the same way.
    #[must_use]
    pub fn join<R>(&self) -> Computation<A, E, R>
    where
        R: 'static,
    {
        self.await_outcome().flat_map(from_outcome)
    }

    /// Requests cancellation of the fiber and waits for it to finish.
    ///
    /// Returns once the child's finalizers have run, with the child's final
    /// outcome. The wait itself cannot be interrupted.
    #[must_use]
    pub fn abort<E2, R>(&self) -> Computation<Outcome<A, E>, E2, R>
    where
        E2: Send + 'static,
        R: 'static,
    {
        let handle = self.clone();
        sync(move || {
            handle.cancel(CancelReason::aborted());
        })
        .zip_right(self.await_outcome())
        .uninterruptible()
    }
}

impl<A, E, R> Computation<A, E, R>
where
    A: Send + Sync + 'static,
    E: Send + Sync + 'static,
    R: 'static,
{
    /// Starts `self` on a child fiber linked to the caller's signal.
    #[must_use]
    pub fn fork<E2>(self) -> Computation<Handle<A, E>, E2, R>
    where
        E2: Send + 'static,
    {
        self.spawn_fiber(true)
    }

    /// Starts `self` on a child fiber that outlives cancellation of the caller.
    #[must_use]
    pub fn fork_daemon<E2>(self) -> Computation<Handle<A, E>, E2, R>
    where
        E2: Send + 'static,
    {
        self.spawn_fiber(false)
    }

    fn spawn_fiber<E2>(self, linked: bool) -> Computation<Handle<A, E>, E2, R>
    where
        E2: Send + 'static,
    {
        Computation::make(move |env, cont| {
            let handle = start_fiber(&self, &env, linked);
            cont(Outcome::Ok(handle));
        })
    }
}

/// Starts `computation` on a child fiber of `parent`.
pub(crate) fn start_fiber<A, E, R>(
    computation: &Computation<A, E, R>,
    parent: &Env,
    linked: bool,
) -> Handle<A, E>
where
    A: Send + Sync + 'static,
    E: Send + Sync + 'static,
    R: 'static,
{
    let controller = CancelSignal::new();
    let child_env = parent.for_child(controller.clone());
    let handle = Handle::new(child_env.fiber_id(), controller.clone());

    let parent_controller = parent.controller().clone();
    let link = if linked {
        parent_controller.add_listener(move |_| {
            controller.request(CancelReason::parent_cancelled());
        })
    } else {
        None
    };

    trace!(parent = %parent.fiber_id(), child = %handle.id(), linked, "fiber started");
    let completer = handle.clone();
    computation.run_with(
        child_env,
        Box::new(move |outcome| {
            if let Some(key) = link {
                parent_controller.remove_listener(key);
            }
            completer.complete(outcome);
        }),
    );
    handle
}

/// Starts `computation` on a detached root fiber.
pub(crate) fn start_root<A, E>(computation: &Computation<A, E>, env: Env) -> Handle<A, E>
where
    A: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    let handle = Handle::new(env.fiber_id(), env.controller().clone());
    let completer = handle.clone();
    computation.run_with(env, Box::new(move |outcome| completer.complete(outcome)));
    handle
}
