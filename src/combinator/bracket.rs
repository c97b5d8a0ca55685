//! Bracket combinator for resource safety.
//!
//! The bracket pattern ensures that resources are always released, even when
//! errors or cancellation occur. It follows the acquire/use/release pattern
//! familiar from RAII and try-finally.
//!
//! # Protocol
//!
//! 1. Enter an uninterruptible mask, so cancellation can never leave a
//!    resource half-acquired.
//! 2. Run `acquire`. If it does not succeed, its outcome is the result and
//!    `release` is not called: nothing was acquired.
//! 3. Run `use(resource)` with the interruptibility of the call site
//!    restored, so `use` stays cancellable.
//! 4. Whatever `use` produced, run `release(resource, &outcome)`, still
//!    masked. Release has no expected-failure channel; whatever value it
//!    produces is discarded.
//! 5. Replay `use`'s outcome, unless `release` died; then its defect is the
//!    result.
//!
//! For every successful acquire, release runs exactly once.

use super::mask::uninterruptible_mask;
use super::sequence::{die, unit};
use crate::effect::Computation;
use crate::types::{Never, Outcome};
use std::sync::Arc;

/// Acquires a resource, uses it, and guarantees release even on error or cancel.
///
/// # Example
/// ```
/// use effectum::combinator::{acquire_use_release, fail, succeed};
/// use effectum::Computation;
///
/// let program: Computation<i32, &str> = acquire_use_release(
///     succeed(1),
///     |_handle| fail("boom"),
///     |_handle, outcome| {
///         assert!(outcome.is_err());
///         succeed(outcome.clone())
///     },
/// );
/// let result = effectum::run_blocking(program);
/// assert_eq!(result.unwrap_err().to_string(), "boom");
/// ```
#[must_use]
pub fn acquire_use_release<Res, A, E, R, X, U, Rel>(
    acquire: Computation<Res, E, R>,
    use_fn: U,
    release: Rel,
) -> Computation<A, E, R>
where
    Res: Clone + Send + Sync + 'static,
    A: Send + 'static,
    E: Send + 'static,
    X: Send + 'static,
    U: Fn(Res) -> Computation<A, E, R> + Send + Sync + 'static,
    Rel: Fn(Res, &Outcome<A, E>) -> Computation<X, Never, R> + Send + Sync + 'static,
    R: 'static,
{
    let use_fn = Arc::new(use_fn);
    let release = Arc::new(release);
    uninterruptible_mask(move |restore| {
        let use_fn = Arc::clone(&use_fn);
        let release = Arc::clone(&release);
        acquire.clone().flat_map(move |resource: Res| {
            let release = Arc::clone(&release);
            let held = resource.clone();
            restore
                .apply(use_fn(resource))
                .on_result_masked(move |outcome| {
                    release(held.clone(), outcome)
                        .result()
                        .flat_map(|done| match done {
                            Outcome::Defect(cause) => die(cause),
                            _ => unit(),
                        })
                })
        })
    })
}

/// Like [`acquire_use_release`], for a release that does not look at the outcome.
#[must_use]
pub fn bracket<Res, A, E, R, X, U, Rel>(
    acquire: Computation<Res, E, R>,
    use_fn: U,
    release: Rel,
) -> Computation<A, E, R>
where
    Res: Clone + Send + Sync + 'static,
    A: Send + 'static,
    E: Send + 'static,
    X: Send + 'static,
    U: Fn(Res) -> Computation<A, E, R> + Send + Sync + 'static,
    Rel: Fn(Res) -> Computation<X, Never, R> + Send + Sync + 'static,
    R: 'static,
{
    acquire_use_release(acquire, use_fn, move |resource, _| release(resource))
}
