//! Recovery and finalization.
//!
//! Expected failures can be caught with [`catch_err`](Computation::catch_err)
//! and [`or_else`](Computation::or_else). Defects are only visible through
//! [`result`](Computation::result) and the finalizers, and cancellation can be
//! observed by a finalizer but never turned back into a value.

use super::mask::uninterruptible_mask;
use super::sequence::unit;
use crate::effect::computation::catch_defect;
use crate::effect::Computation;
use crate::tracing_compat::trace;
use crate::types::{Never, Outcome};
use std::sync::Arc;

impl<A, E, R> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    R: 'static,
{
    /// Recovers from an expected failure with the computation `f` builds.
    #[must_use]
    pub fn catch_err<E2, F>(self, f: F) -> Computation<A, E2, R>
    where
        E2: Send + 'static,
        F: Fn(E) -> Computation<A, E2, R> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Computation::make(move |env, cont| {
            let f = Arc::clone(&f);
            let next_env = env.clone();
            self.run_with(
                env,
                Box::new(move |outcome| match outcome {
                    Outcome::Ok(a) => cont(Outcome::Ok(a)),
                    Outcome::Err(e) => match catch_defect(|| f(e)) {
                        Ok(next) => next.run_with(next_env, cont),
                        Err(defect) => cont(Outcome::Defect(defect)),
                    },
                    Outcome::Cancelled(r) => cont(Outcome::Cancelled(r)),
                    Outcome::Defect(d) => cont(Outcome::Defect(d)),
                }),
            );
        })
    }

    /// Falls back to `that` on an expected failure.
    #[must_use]
    pub fn or_else<E2>(self, that: Computation<A, E2, R>) -> Computation<A, E2, R>
    where
        E2: Send + 'static,
    {
        self.catch_err(move |_| that.clone())
    }

    /// Exposes the outcome as a value.
    ///
    /// Success, expected failure and defect all become `Ok(outcome)`.
    /// Cancellation is not reified: the result is still `Cancelled`.
    #[must_use]
    pub fn result<E2>(self) -> Computation<Outcome<A, E>, E2, R>
    where
        E2: Send + 'static,
    {
        Computation::make(move |env, cont| {
            self.run_with(
                env,
                Box::new(move |outcome| match outcome {
                    Outcome::Cancelled(r) => cont(Outcome::Cancelled(r)),
                    other => cont(Outcome::Ok(other)),
                }),
            );
        })
    }

    /// Runs the finalizer `f` on every outcome of `self`, cancellation included.
    ///
    /// The finalizer runs uninterruptibly. Its success replays `self`'s
    /// outcome; its failure or defect replaces it.
    #[must_use]
    pub fn on_result<F>(self, f: F) -> Self
    where
        F: Fn(&Outcome<A, E>) -> Computation<(), E, R> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        uninterruptible_mask(move |restore| {
            let f = Arc::clone(&f);
            restore
                .apply(self.clone())
                .on_result_masked(move |outcome| f(outcome))
        })
    }

    /// Runs `finalizer` after `self`, whatever the outcome.
    #[must_use]
    pub fn ensuring(self, finalizer: Computation<(), E, R>) -> Self {
        self.on_result(move |_| finalizer.clone())
    }

    /// Runs `cleanup` only if `self` ends cancelled.
    #[must_use]
    pub fn on_cancel(self, cleanup: Computation<(), E, R>) -> Self {
        self.on_result(move |outcome| {
            if outcome.is_cancelled() {
                cleanup.clone()
            } else {
                unit()
            }
        })
    }

    /// Ignores every outcome except cancellation.
    ///
    /// Used for cleanup steps whose failure must not mask the outcome they
    /// are cleaning up after.
    #[must_use]
    pub fn ignore<E2>(self) -> Computation<(), E2, R>
    where
        E2: Send + 'static,
    {
        self.result().as_unit()
    }

    /// Runs `self`, then the finalizer, in whatever region the caller set up.
    ///
    /// The finalizer runs in the same environment as `self`; callers are
    /// expected to have masked it already.
    pub(crate) fn on_result_masked<F>(self, f: F) -> Self
    where
        F: Fn(&Outcome<A, E>) -> Computation<(), E, R> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Computation::make_no_abort(move |env, cont| {
            let f = Arc::clone(&f);
            let finalizer_env = env.clone();
            self.run_with(
                env,
                Box::new(move |outcome| {
                    let finalizer = match catch_defect(|| f(&outcome)) {
                        Ok(finalizer) => finalizer,
                        Err(defect) => {
                            cont(Outcome::Defect(defect));
                            return;
                        }
                    };
                    trace!(fiber = %finalizer_env.fiber_id(), severity = outcome.severity(), "running finalizer");
                    finalizer.run_with(
                        finalizer_env,
                        Box::new(move |done| match done.split::<A>() {
                            Ok(()) => cont(outcome),
                            Err(replaced) => cont(replaced),
                        }),
                    );
                }),
            );
        })
    }
}

impl<A, R> Computation<A, Never, R>
where
    A: Send + 'static,
    R: 'static,
{
    /// Widens a computation that cannot fail to any error type.
    #[must_use]
    pub fn widen_err<E>(self) -> Computation<A, E, R>
    where
        E: Send + 'static,
    {
        self.map_err(|never| match never {})
    }
}
