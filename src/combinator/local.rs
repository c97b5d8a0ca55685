//! Fiber-local variables and the dependency context.
//!
//! [`locally`](Computation::locally) shadows a slot for one inner
//! computation only. The override is a new [`Env`](crate::env::Env) handed to
//! the inner computation; the caller's environment is never touched, so the
//! shadow disappears as soon as the inner computation completes and siblings
//! running concurrently never see it.

use crate::cancel::CancelSignal;
use crate::effect::Computation;
use crate::env::{context_ref, Context, FiberRef};
use crate::types::{Defect, FiberId, Outcome};
use std::any::{type_name, Any};
use std::sync::Arc;

/// Reads the current value of a fiber-local slot.
#[must_use]
pub fn fiber_ref_get<T, E, R>(slot: &FiberRef<T>) -> Computation<T, E, R>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    R: 'static,
{
    let slot = slot.clone();
    Computation::leaf(move |env, cont| cont(Outcome::Ok(env.get(&slot))))
}

/// Reads the service of type `S` from the current dependency context.
///
/// A missing service is a wiring bug, not an expected failure, and is
/// reported as a defect.
#[must_use]
pub fn service<S, E, R>() -> Computation<Arc<S>, E, R>
where
    S: Any + Send + Sync,
    E: Send + 'static,
    R: 'static,
{
    let slot = context_ref();
    Computation::leaf(move |env, cont| {
        let outcome = match env.get(&slot).get::<S>() {
            Some(found) => Outcome::Ok(found),
            None => Outcome::Defect(Defect::new(format!(
                "service not found: {}",
                type_name::<S>()
            ))),
        };
        cont(outcome);
    })
}

/// Reads the whole dependency context.
#[must_use]
pub fn context<E, R>() -> Computation<Context, E, R>
where
    E: Send + 'static,
    R: 'static,
{
    fiber_ref_get(&context_ref())
}

/// Returns the cancellation signal the current region observes.
#[must_use]
pub fn current_signal<E, R>() -> Computation<CancelSignal, E, R>
where
    E: Send + 'static,
    R: 'static,
{
    Computation::leaf(|env, cont| cont(Outcome::Ok(env.signal().clone())))
}

/// Returns true if the current region is interruptible.
#[must_use]
pub fn is_interruptible<E, R>() -> Computation<bool, E, R>
where
    E: Send + 'static,
    R: 'static,
{
    Computation::leaf(|env, cont| cont(Outcome::Ok(env.is_interruptible())))
}

/// Returns the identity of the running fiber.
#[must_use]
pub fn fiber_id<E, R>() -> Computation<FiberId, E, R>
where
    E: Send + 'static,
    R: 'static,
{
    Computation::leaf(|env, cont| cont(Outcome::Ok(env.fiber_id())))
}

impl<A, E, R> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    R: 'static,
{
    /// Runs `self` with `slot` shadowed by `value`.
    #[must_use]
    pub fn locally<T>(self, slot: &FiberRef<T>, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        let slot = slot.clone();
        Computation::make(move |env, cont| {
            self.run_with(env.with_slot(&slot, value.clone()), cont);
        })
    }

    /// Runs `self` with `service` added to the dependency context.
    ///
    /// The requirement tag changes to `R2`: providing a service discharges a
    /// requirement, and a computation whose requirements are all provided is
    /// tagged `()`.
    #[must_use]
    pub fn provide_service<S, R2>(self, service: S) -> Computation<A, E, R2>
    where
        S: Any + Send + Sync,
        R2: 'static,
    {
        let service = Arc::new(service);
        let slot = context_ref();
        Computation::make(move |env, cont| {
            let ctx = env.get(&slot).with_shared(Arc::clone(&service));
            self.run_with(env.with_slot(&slot, ctx), cont);
        })
    }

    /// Runs `self` with every service of `provided` added to the dependency context.
    #[must_use]
    pub fn provide_context<R2>(self, provided: Context) -> Computation<A, E, R2>
    where
        R2: 'static,
    {
        let slot = context_ref();
        Computation::make(move |env, cont| {
            let ctx = env.get(&slot).merge(&provided);
            self.run_with(env.with_slot(&slot, ctx), cont);
        })
    }
}
