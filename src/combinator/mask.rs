//! Interruptibility masking.
//!
//! A region is either interruptible or uninterruptible. The driver's root
//! environment starts interruptible. Transitions happen only through
//! [`uninterruptible`](Computation::uninterruptible),
//! [`interruptible`](Computation::interruptible) and the [`Restore`] handed
//! out by [`uninterruptible_mask`].
//!
//! Masking swaps the signal computations observe for a fresh one that nobody
//! requests. The fiber's controller is untouched, so a request made while
//! masked is remembered and takes effect at the next interruptible region.

use crate::effect::Computation;
use crate::tracing_compat::trace;

/// Re-enables interruption inside an [`uninterruptible_mask`] region.
///
/// Captures whether the mask was entered from an interruptible region. If
/// it was not, [`apply`](Self::apply) leaves its argument masked: a nested
/// mask cannot reopen a window its caller closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restore {
    enabled: bool,
}

impl Restore {
    /// Returns true if applying this restore makes a computation interruptible.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Runs `computation` with the interruptibility in effect where the mask was entered.
    #[must_use]
    pub fn apply<A, E, R>(&self, computation: Computation<A, E, R>) -> Computation<A, E, R>
    where
        A: Send + 'static,
        E: Send + 'static,
        R: 'static,
    {
        if self.enabled {
            computation.interruptible()
        } else {
            computation
        }
    }
}

/// Runs the computation `f` builds in an uninterruptible region.
///
/// `f` receives a [`Restore`] that can reopen interruption for sub-steps.
#[must_use]
pub fn uninterruptible_mask<A, E, R, F>(f: F) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn(Restore) -> Computation<A, E, R> + Send + Sync + 'static,
    R: 'static,
{
    Computation::make_no_abort(move |env, cont| {
        let restore = Restore {
            enabled: env.is_interruptible(),
        };
        let inner_env = if restore.enabled { env.masked() } else { env };
        f(restore).run_with(inner_env, cont);
    })
}

impl<A, E, R> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    R: 'static,
{
    /// Runs `self` where cancellation requests are not observed.
    ///
    /// A request made while `self` runs stays recorded on the fiber's
    /// controller and is observed once control is back in an interruptible
    /// region.
    #[must_use]
    pub fn uninterruptible(self) -> Self {
        Computation::make_no_abort(move |env, cont| {
            if env.is_interruptible() {
                trace!(fiber = %env.fiber_id(), "entering uninterruptible region");
                self.run_with(env.masked(), cont);
            } else {
                self.run_with(env, cont);
            }
        })
    }

    /// Runs `self` observing the fiber's own cancellation signal again.
    #[must_use]
    pub fn interruptible(self) -> Self {
        Computation::make(move |env, cont| {
            self.run_with(env.unmasked(), cont);
        })
    }
}
