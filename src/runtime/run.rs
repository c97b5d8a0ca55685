//! Driving top-level computations.
//!
//! [`Runtime::run`] starts a computation in a fresh root environment and
//! returns a [`RunFuture`] that resolves exactly once with the mapped
//! outcome:
//!
//! | Outcome | `RunFuture` output |
//! |---------|--------------------|
//! | `Ok(a)` | `Ok(a)` |
//! | `Err(e)` | `Err(Failure::Err(e))` |
//! | `Cancelled(r)` | `Err(Failure::Cancelled(r))` |
//! | `Defect(d)` | `Err(Failure::Defect(d))` |
//!
//! The computation starts synchronously inside `run`; the future only
//! observes its completion. Dropping the future does not cancel the run.

use super::builder::Runtime;
use super::fiber::{start_root, Handle};
use crate::cancel::CancelSignal;
use crate::effect::Computation;
use crate::tracing_compat::{trace, warn};
use crate::types::{CancelReason, Failure, Outcome};
use core::fmt;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

struct RunState<A, E> {
    result: Option<Result<A, Failure<E>>>,
    finished: bool,
    waker: Option<Waker>,
}

/// Future returned by [`Runtime::run`].
#[must_use = "a RunFuture does nothing unless polled"]
pub struct RunFuture<A, E> {
    state: Arc<Mutex<RunState<A, E>>>,
    controller: CancelSignal,
}

impl<A, E> RunFuture<A, E> {
    /// Requests cancellation of the run.
    ///
    /// Returns true if this call performed the request.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.controller.request(reason)
    }

    /// Returns true once the computation has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }
}

impl<A, E> fmt::Debug for RunFuture<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunFuture")
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

impl<A, E> Future for RunFuture<A, E> {
    type Output = Result<A, Failure<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut guard = self.state.lock();
        guard.result.take().map_or_else(
            || {
                guard.waker = Some(cx.waker().clone());
                Poll::Pending
            },
            Poll::Ready,
        )
    }
}

impl Runtime {
    /// Runs `computation` in a fresh root environment.
    pub fn run<A, E>(&self, computation: Computation<A, E>) -> RunFuture<A, E>
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        let state = Arc::new(Mutex::new(RunState {
            result: None,
            finished: false,
            waker: None,
        }));
        let completer = Arc::clone(&state);
        let controller = self.run_callback(computation, move |outcome| {
            let waker = {
                let mut guard = completer.lock();
                guard.result = Some(outcome.into_result());
                guard.finished = true;
                guard.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        });
        RunFuture { state, controller }
    }

    /// Runs `computation` and blocks the current thread until it completes.
    pub fn run_blocking<A, E>(&self, computation: Computation<A, E>) -> Result<A, Failure<E>>
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        let future = self.run(computation);
        self.block_on(future)
    }

    /// Runs `computation` and hands its outcome to `on_done`.
    ///
    /// Returns the controller of the run; requesting it cancels the run.
    pub fn run_callback<A, E, F>(&self, computation: Computation<A, E>, on_done: F) -> CancelSignal
    where
        A: Send + 'static,
        E: Send + 'static,
        F: FnOnce(Outcome<A, E>) + Send + 'static,
    {
        let controller = CancelSignal::new();
        let env = self.root_env(controller.clone());
        let fiber = env.fiber_id();
        let runtime = self.clone();
        trace!(runtime = %self.config().name, fiber = %fiber, "run started");
        computation.run_with(
            env,
            Box::new(move |outcome| {
                runtime.report(fiber, &outcome);
                on_done(outcome);
            }),
        );
        controller
    }

    /// Runs `computation` on a root fiber and returns its handle.
    pub fn run_fork<A, E>(&self, computation: Computation<A, E>) -> Handle<A, E>
    where
        A: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let env = self.root_env(CancelSignal::new());
        trace!(runtime = %self.config().name, fiber = %env.fiber_id(), "root fiber started");
        start_root(&computation, env)
    }

    fn report<A, E>(&self, fiber: crate::types::FiberId, outcome: &Outcome<A, E>) {
        let config = self.config();
        if let Outcome::Defect(defect) = outcome {
            if config.log_defects {
                warn!(runtime = %config.name, fiber = %fiber, defect = %defect, "run ended in a defect");
            }
        }
        trace!(
            runtime = %config.name,
            fiber = %fiber,
            ok = outcome.is_ok(),
            cancelled = outcome.is_cancelled(),
            "run finished"
        );
    }
}

/// Runs `computation` on a default [`Runtime`].
pub fn run<A, E>(computation: Computation<A, E>) -> RunFuture<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    Runtime::new().run(computation)
}

/// Runs `computation` on a default [`Runtime`], blocking until it completes.
pub fn run_blocking<A, E>(computation: Computation<A, E>) -> Result<A, Failure<E>>
where
    A: Send + 'static,
    E: Send + 'static,
{
    Runtime::new().run_blocking(computation)
}
