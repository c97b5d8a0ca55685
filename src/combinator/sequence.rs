//! Constructors and sequencing combinators.
//!
//! Every combinator here is defined by wrapping the inner computation's
//! continuation. Sequencing never reorders: the right-hand side of
//! [`flat_map`](Computation::flat_map), [`zip_right`](Computation::zip_right)
//! or [`tap`](Computation::tap) is only built and started from inside the
//! continuation of the left-hand side, after it produced a success.
//!
//! User callbacks run inside continuations. A panic in one of them is
//! converted to [`Outcome::Defect`] at the call site.

use crate::effect::computation::catch_defect;
use crate::effect::Computation;
use crate::tracing_compat::debug;
use crate::types::{CancelReason, Defect, Outcome};
use std::sync::Arc;

/// A computation that succeeds with `value`.
#[must_use]
pub fn succeed<A, E, R>(value: A) -> Computation<A, E, R>
where
    A: Clone + Send + Sync + 'static,
    E: Send + 'static,
    R: 'static,
{
    Computation::leaf(move |_, cont| cont(Outcome::Ok(value.clone())))
}

/// A computation that succeeds with `()`.
#[must_use]
pub fn unit<E, R>() -> Computation<(), E, R>
where
    E: Send + 'static,
    R: 'static,
{
    succeed(())
}

/// A computation that fails with the expected error `error`.
#[must_use]
pub fn fail<A, E, R>(error: E) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Clone + Send + Sync + 'static,
    R: 'static,
{
    Computation::leaf(move |_, cont| cont(Outcome::Err(error.clone())))
}

/// A computation that replays a previously captured outcome.
#[must_use]
pub fn from_outcome<A, E, R>(outcome: Outcome<A, E>) -> Computation<A, E, R>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    R: 'static,
{
    Computation::leaf(move |_, cont| cont(outcome.clone()))
}

/// A computation that fails with a defect carrying `message`.
#[must_use]
pub fn defect<A, E, R>(message: impl Into<String>) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    R: 'static,
{
    die(Defect::new(message))
}

/// A computation that fails with the given defect.
#[must_use]
pub fn die<A, E, R>(cause: Defect) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    R: 'static,
{
    Computation::leaf(move |_, cont| cont(Outcome::Defect(cause.clone())))
}

/// A computation that ends as cancelled with `reason`.
///
/// Cancellation cannot be caught; the only way to react to it is a
/// finalizer such as [`on_cancel`](Computation::on_cancel).
#[must_use]
pub fn cancelled<A, E, R>(reason: CancelReason) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    R: 'static,
{
    Computation::from_raw(move |_, cont| cont(Outcome::Cancelled(reason.clone())))
}

/// Evaluates `thunk` each time the computation runs.
///
/// A panic in `thunk` becomes a defect.
#[must_use]
pub fn sync<A, E, R, F>(thunk: F) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn() -> A + Send + Sync + 'static,
    R: 'static,
{
    Computation::make(move |_, cont| cont(Outcome::Ok(thunk())))
}

/// Evaluates a fallible `thunk` each time the computation runs.
#[must_use]
pub fn try_sync<A, E, R, F>(thunk: F) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Result<A, E> + Send + Sync + 'static,
    R: 'static,
{
    Computation::make(move |_, cont| cont(thunk().into()))
}

/// Defers building a computation until it runs.
#[must_use]
pub fn suspend<A, E, R, F>(build: F) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Computation<A, E, R> + Send + Sync + 'static,
    R: 'static,
{
    Computation::make(move |env, cont| build().run_with(env, cont))
}

impl<A, E, R> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    R: 'static,
{
    /// Transforms the success value.
    #[must_use]
    pub fn map<B, F>(self, f: F) -> Computation<B, E, R>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Computation::make(move |env, cont| {
            let f = Arc::clone(&f);
            self.run_with(
                env,
                Box::new(move |outcome| {
                    let next = match outcome.split() {
                        Ok(a) => catch_defect(|| f(a)).map_or_else(Outcome::Defect, Outcome::Ok),
                        Err(failure) => failure,
                    };
                    cont(next);
                }),
            );
        })
    }

    /// Transforms the expected error. Defects and cancellation pass through.
    #[must_use]
    pub fn map_err<E2, F>(self, f: F) -> Computation<A, E2, R>
    where
        E2: Send + 'static,
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Computation::make(move |env, cont| {
            let f = Arc::clone(&f);
            self.run_with(
                env,
                Box::new(move |outcome| {
                    let next = match outcome {
                        Outcome::Ok(a) => Outcome::Ok(a),
                        Outcome::Err(e) => {
                            catch_defect(|| f(e)).map_or_else(Outcome::Defect, Outcome::Err)
                        }
                        Outcome::Cancelled(r) => Outcome::Cancelled(r),
                        Outcome::Defect(d) => Outcome::Defect(d),
                    };
                    cont(next);
                }),
            );
        })
    }

    /// Replaces the success value with `value`.
    #[must_use]
    pub fn as_value<B>(self, value: B) -> Computation<B, E, R>
    where
        B: Clone + Send + Sync + 'static,
    {
        self.map(move |_| value.clone())
    }

    /// Discards the success value.
    #[must_use]
    pub fn as_unit(self) -> Computation<(), E, R> {
        self.map(|_| ())
    }

    /// Runs `self`, then the computation `f` builds from its value.
    ///
    /// The next computation runs in the same environment as `self`. A
    /// failure of `self` is forwarded unchanged and `f` is never called.
    #[must_use]
    pub fn flat_map<B, F>(self, f: F) -> Computation<B, E, R>
    where
        B: Send + 'static,
        F: Fn(A) -> Computation<B, E, R> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Computation::make(move |env, cont| {
            let f = Arc::clone(&f);
            let next_env = env.clone();
            self.run_with(
                env,
                Box::new(move |outcome| match outcome.split() {
                    Ok(a) => match catch_defect(|| f(a)) {
                        Ok(next) => next.run_with(next_env, cont),
                        Err(defect) => cont(Outcome::Defect(defect)),
                    },
                    Err(failure) => cont(failure),
                }),
            );
        })
    }

    /// Runs a side computation on success, keeping `self`'s value.
    ///
    /// An expected failure of the side computation is discarded: `self`'s
    /// outcome is what the caller observes. Defects and cancellation of the
    /// side computation still propagate, since neither can be silently lost.
    #[must_use]
    pub fn tap<B, F>(self, f: F) -> Self
    where
        B: Send + 'static,
        F: Fn(&A) -> Computation<B, E, R> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Computation::make(move |env, cont| {
            let f = Arc::clone(&f);
            let side_env = env.clone();
            self.run_with(
                env,
                Box::new(move |outcome| match outcome.split() {
                    Ok(a) => match catch_defect(|| f(&a)) {
                        Ok(side) => side.run_with(
                            side_env,
                            Box::new(move |side_outcome: Outcome<B, E>| match side_outcome {
                                Outcome::Ok(_) => cont(Outcome::Ok(a)),
                                Outcome::Err(_) => {
                                    debug!("tap side computation failed; keeping original value");
                                    cont(Outcome::Ok(a));
                                }
                                Outcome::Cancelled(r) => cont(Outcome::Cancelled(r)),
                                Outcome::Defect(d) => cont(Outcome::Defect(d)),
                            }),
                        ),
                        Err(defect) => cont(Outcome::Defect(defect)),
                    },
                    Err(failure) => cont(failure),
                }),
            );
        })
    }

    /// Runs `self` then `that`, keeping `that`'s outcome.
    #[must_use]
    pub fn zip_right<B>(self, that: Computation<B, E, R>) -> Computation<B, E, R>
    where
        B: Send + 'static,
    {
        self.flat_map(move |_| that.clone())
    }

    /// Runs `self` then `that`, keeping `self`'s value.
    ///
    /// Unlike [`tap`](Self::tap), a failure of `that` is the result.
    #[must_use]
    pub fn zip_left<B>(self, that: Computation<B, E, R>) -> Self
    where
        B: Send + 'static,
    {
        Computation::make(move |env, cont| {
            let that = that.clone();
            let next_env = env.clone();
            self.run_with(
                env,
                Box::new(move |outcome| match outcome.split() {
                    Ok(a) => that.run_with(
                        next_env,
                        Box::new(move |next| cont(next.map(|_| a))),
                    ),
                    Err(failure) => cont(failure),
                }),
            );
        })
    }
}
