//! Race combinator: run two computations, first to finish wins.
//!
//! Both sides run on child fibers. When the first one completes, the other is
//! cancelled and drained:
//!
//! ```text
//! race(a, b):
//!   h1 ← fork(a)
//!   if h1 done: return h1.outcome     // b never starts
//!   h2 ← fork(b)
//!   (winner, loser) ← first_complete(h1, h2)
//!   cancel(loser, race_lost)
//!   await(loser)                      // drain: loser's finalizers finish
//!   return winner.outcome
//! ```
//!
//! Both sides run as unlinked child fibers; the race itself tracks them.
//! The winner's outcome is delivered only after the loser has completed, so
//! no loser finalizer ever runs concurrently with the continuation of the
//! race. "First" means first terminal outcome of any kind: a side that fails
//! first wins the race with its failure.

use super::async_bridge::from_callback;
use super::mask::uninterruptible_mask;
use super::sequence::{from_outcome, unit};
use crate::effect::Computation;
use crate::runtime::Handle;
use crate::tracing_compat::debug;
use crate::types::CancelReason;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Runs `left` and `right` concurrently; the first terminal outcome wins.
///
/// Forking happens uninterruptibly so a cancellation request can never
/// leave a side running unobserved. If the race itself is cancelled, both
/// sides are aborted and drained before `Cancelled` is delivered.
#[must_use]
pub fn race<A, E, R>(left: Computation<A, E, R>, right: Computation<A, E, R>) -> Computation<A, E, R>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    R: 'static,
{
    uninterruptible_mask(move |restore| {
        let right = right.clone();
        left.clone().fork_daemon::<E>().flat_map(move |left_handle| {
            if let Some(outcome) = left_handle.try_outcome() {
                return from_outcome(outcome);
            }
            right.clone().fork_daemon::<E>().flat_map(move |right_handle| {
                let (l, r) = (left_handle.clone(), right_handle.clone());
                restore
                    .apply(settle(left_handle.clone(), right_handle))
                    .on_result_masked(move |outcome| {
                        if outcome.is_cancelled() {
                            l.abort::<E, R>().zip_right(r.abort()).as_unit()
                        } else {
                            unit()
                        }
                    })
            })
        })
    })
}

impl<A, E, R> Computation<A, E, R>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    R: 'static,
{
    /// Method form of [`race`].
    #[must_use]
    pub fn race(self, that: Self) -> Self {
        race(self, that)
    }
}

/// Waits for the first of two running fibers, then drains the other.
fn settle<A, E, R>(left: Handle<A, E>, right: Handle<A, E>) -> Computation<A, E, R>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    R: 'static,
{
    from_callback(move |resume, _signal| {
        let decided = Arc::new(AtomicBool::new(false));
        for (winner, loser) in [(left.clone(), right.clone()), (right.clone(), left.clone())] {
            let decided = Arc::clone(&decided);
            let resume = resume.clone();
            winner.clone().on_complete(move |outcome| {
                if decided.swap(true, Ordering::AcqRel) {
                    return;
                }
                debug!(winner = %winner.id(), loser = %loser.id(), "race decided");
                let outcome = outcome.clone();
                loser.cancel(CancelReason::race_lost());
                loser.on_complete(move |_| {
                    resume.resume_outcome(outcome);
                });
            });
        }
        Some(unit())
    })
}
