//! The computation type and its low-level constructors.
//!
//! A [`Computation<A, E, R>`] is a value describing deferred work. Running it
//! means handing it an [`Env`] and a [`Continuation`]; the computation
//! eventually invokes the continuation exactly once with an [`Outcome`].
//! Constructing a computation performs no work, and the same computation can
//! be run any number of times, each run independent of the others.
//!
//! Two constructors sit at the bottom of every combinator:
//!
//! - [`Computation::make_no_abort`] contains defects: a panic in the body
//!   becomes [`Outcome::Defect`] instead of unwinding through the runtime.
//!   Its continuation is once-guarded.
//! - [`Computation::make`] additionally performs the **entry check**: when
//!   the environment's signal is already requested the body never runs and
//!   the continuation receives [`Outcome::Cancelled`]. This check is the
//!   single place where cancellation of not-yet-started work is observed.

use crate::env::Env;
use crate::tracing_compat::{error, trace};
use crate::types::{CancelReason, Defect, Outcome};
use core::fmt;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// The callback receiving a computation's outcome.
pub type Continuation<A, E> = Box<dyn FnOnce(Outcome<A, E>) + Send>;

type RunFn<A, E> = dyn Fn(Env, Continuation<A, E>) + Send + Sync;

/// A deferred, possibly asynchronous computation.
///
/// - `A`: success type
/// - `E`: expected failure type
/// - `R`: requirement tag. It is a phantom marker naming the services the
///   computation expects in its [`Context`](crate::env::Context); the driver
///   only runs computations whose tag is `()`.
///
/// Cloning is cheap: clones share the same underlying function.
pub struct Computation<A, E, R = ()> {
    run: Arc<RunFn<A, E>>,
    _requires: PhantomData<fn() -> R>,
}

impl<A, E, R> Clone for Computation<A, E, R> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
            _requires: PhantomData,
        }
    }
}

impl<A, E, R> fmt::Debug for Computation<A, E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("success", &std::any::type_name::<A>())
            .field("error", &std::any::type_name::<E>())
            .finish_non_exhaustive()
    }
}

impl<A, E, R> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    R: 'static,
{
    /// Wraps a run function without entry check or defect containment.
    ///
    /// Only for bodies that cannot panic and never run user code.
    pub(crate) fn from_raw<F>(run: F) -> Self
    where
        F: Fn(Env, Continuation<A, E>) + Send + Sync + 'static,
    {
        Self {
            run: Arc::new(run),
            _requires: PhantomData,
        }
    }

    /// Creates a computation from a run function, with the entry check.
    ///
    /// If the environment's signal is requested when the computation starts,
    /// `run` is not called and the continuation receives `Cancelled`.
    pub fn make<F>(run: F) -> Self
    where
        F: Fn(Env, Continuation<A, E>) + Send + Sync + 'static,
    {
        Self::make_no_abort(move |env, cont| {
            if let Some(reason) = entry_check(&env) {
                cont(Outcome::Cancelled(reason));
                return;
            }
            run(env, cont);
        })
    }

    /// Like [`make`](Self::make) but without defect containment.
    ///
    /// For constructors whose body only hands a stored value to the
    /// continuation.
    pub(crate) fn leaf<F>(run: F) -> Self
    where
        F: Fn(Env, Continuation<A, E>) + Send + Sync + 'static,
    {
        Self::from_raw(move |env, cont| {
            if let Some(reason) = entry_check(&env) {
                cont(Outcome::Cancelled(reason));
                return;
            }
            run(env, cont);
        })
    }

    /// Creates a computation from a run function, without the entry check.
    ///
    /// Panics raised by `run` are reported as [`Outcome::Defect`]. The
    /// continuation handed to `run` ignores every invocation after the
    /// first; a panic raised after the continuation already fired is logged
    /// and dropped.
    pub fn make_no_abort<F>(run: F) -> Self
    where
        F: Fn(Env, Continuation<A, E>) + Send + Sync + 'static,
    {
        Self::from_raw(move |env, cont| {
            let fiber = env.fiber_id();
            let guarded = OnceContinuation::new(cont);
            let inner = guarded.clone().into_continuation();
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| run(env, inner))) {
                let defect = Defect::from_panic(&*payload);
                if !guarded.complete(Outcome::Defect(defect.clone())) {
                    error!(
                        fiber = %fiber,
                        defect = %defect,
                        "panic after the outcome was already delivered"
                    );
                }
            }
        })
    }

    /// Runs the computation in `env`, delivering the outcome to `cont`.
    ///
    /// This is the low-level execution entry point; most callers use the
    /// [`Runtime`](crate::runtime::Runtime) driver instead.
    pub fn run_with(&self, env: Env, cont: Continuation<A, E>) {
        (self.run)(env, cont);
    }

    /// Changes the requirement tag.
    ///
    /// The tag is not checked at run time; use this when a service has been
    /// provided by means the type system cannot see.
    #[must_use]
    pub fn retag<R2>(self) -> Computation<A, E, R2>
    where
        R2: 'static,
    {
        Computation {
            run: self.run,
            _requires: PhantomData,
        }
    }
}

fn entry_check(env: &Env) -> Option<CancelReason> {
    if !env.signal().is_requested() {
        return None;
    }
    let reason = env.signal().reason().unwrap_or_default();
    trace!(fiber = %env.fiber_id(), reason = %reason, "entry check observed cancellation");
    Some(reason)
}

/// A continuation that runs at most once.
///
/// Clones share the slot; whichever clone is invoked first consumes it.
pub(crate) struct OnceContinuation<A, E> {
    slot: Arc<Mutex<Option<Continuation<A, E>>>>,
}

impl<A, E> Clone for OnceContinuation<A, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<A, E> OnceContinuation<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(cont: Continuation<A, E>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(cont))),
        }
    }

    /// Takes the continuation out, if nobody has yet.
    pub(crate) fn claim(&self) -> Option<Continuation<A, E>> {
        self.slot.lock().take()
    }

    /// Returns true once the continuation has been claimed.
    pub(crate) fn is_claimed(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Delivers `outcome` if the continuation is still unclaimed.
    pub(crate) fn complete(&self, outcome: Outcome<A, E>) -> bool {
        match self.claim() {
            Some(cont) => {
                cont(outcome);
                true
            }
            None => false,
        }
    }

    pub(crate) fn into_continuation(self) -> Continuation<A, E> {
        Box::new(move |outcome| {
            self.complete(outcome);
        })
    }
}

/// Runs user code that executes inside a continuation, turning a panic into a defect.
///
/// Continuations must never unwind: the computation that invoked them has
/// already given its outcome away and could not report the panic.
pub(crate) fn catch_defect<T, F>(f: F) -> Result<T, Defect>
where
    F: FnOnce() -> T,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| Defect::from_panic(&*payload))
}
