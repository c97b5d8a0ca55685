//! Monotonic cancellation signal.
//!
//! A [`CancelSignal`] is the one genuinely shared mutable object of the
//! runtime. Its only transition is active → requested, which is one-way and
//! idempotent: later requests can strengthen the recorded reason but never
//! un-request it.
//!
//! Listeners are registered by asynchronous computations that want to react
//! to a request (for example to cancel a pending timer). Registration returns
//! a [`ListenerKey`]; the owner removes the listener once the operation has
//! completed so that finished work does not keep closures alive on a
//! long-lived signal.

use crate::tracing_compat::debug;
use crate::types::CancelReason;
use core::fmt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static SIGNAL_COUNTER: AtomicU64 = AtomicU64::new(1);

type Listener = Box<dyn FnOnce(&CancelReason) + Send>;

/// Key identifying a registered listener, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    signal: u64,
    slot: u64,
}

struct SignalState {
    reason: Option<CancelReason>,
    listeners: Vec<(u64, Listener)>,
    next_slot: u64,
}

struct SignalInner {
    id: u64,
    requested: AtomicBool,
    state: Mutex<SignalState>,
}

/// A broadcast cancellation signal.
///
/// Cloning is cheap and clones share state: a request through any clone is
/// observed by all of them.
#[derive(Clone)]
pub struct CancelSignal {
    inner: Arc<SignalInner>,
}

impl CancelSignal {
    /// Creates a fresh, never-requested signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: SIGNAL_COUNTER.fetch_add(1, Ordering::Relaxed),
                requested: AtomicBool::new(false),
                state: Mutex::new(SignalState {
                    reason: None,
                    listeners: Vec::new(),
                    next_slot: 0,
                }),
            }),
        }
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Returns the recorded reason, if cancellation has been requested.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.state.lock().reason.clone()
    }

    /// Returns true if both handles refer to the same signal.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Requests cancellation.
    ///
    /// Returns true if this call performed the transition (first caller
    /// wins). Later calls only strengthen the recorded reason. Listeners run
    /// on the calling thread, after the internal lock has been released.
    #[allow(clippy::must_use_candidate)]
    pub fn request(&self, reason: CancelReason) -> bool {
        let listeners = {
            let mut state = self.inner.state.lock();
            if let Some(current) = state.reason.as_mut() {
                current.strengthen(&reason);
                return false;
            }
            state.reason = Some(reason.clone());
            self.inner.requested.store(true, Ordering::Release);
            std::mem::take(&mut state.listeners)
        };

        debug!(
            signal = self.inner.id,
            reason = %reason,
            listeners = listeners.len(),
            "cancellation requested"
        );

        for (_, listener) in listeners {
            listener(&reason);
        }
        true
    }

    /// Registers a listener that runs once when cancellation is requested.
    ///
    /// If the signal is already requested the listener runs immediately on
    /// the calling thread and `None` is returned, since there is nothing left
    /// to remove.
    pub fn add_listener<F>(&self, listener: F) -> Option<ListenerKey>
    where
        F: FnOnce(&CancelReason) + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        if let Some(reason) = state.reason.clone() {
            drop(state);
            listener(&reason);
            return None;
        }
        let slot = state.next_slot;
        state.next_slot += 1;
        state.listeners.push((slot, Box::new(listener)));
        Some(ListenerKey {
            signal: self.inner.id,
            slot,
        })
    }

    /// Removes a previously registered listener.
    ///
    /// Returns true if the listener was still pending. Removing a listener
    /// that already ran (or belongs to another signal) is a no-op.
    #[allow(clippy::must_use_candidate)]
    pub fn remove_listener(&self, key: ListenerKey) -> bool {
        if key.signal != self.inner.id {
            return false;
        }
        let mut state = self.inner.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(slot, _)| *slot != key.slot);
        state.listeners.len() != before
    }

    /// Returns the number of listeners still waiting for a request.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.state.lock().listeners.len()
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSignal")
            .field("id", &self.inner.id)
            .field("requested", &self.is_requested())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CancelKind;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn request_is_monotonic() {
        let signal = CancelSignal::new();
        assert!(!signal.is_requested());
        assert!(signal.reason().is_none());

        assert!(signal.request(CancelReason::user("first")));
        assert!(signal.is_requested());
        assert!(!signal.request(CancelReason::user("second")));
        assert!(signal.is_requested());
    }

    #[test]
    fn later_requests_strengthen_reason() {
        let signal = CancelSignal::new();
        signal.request(CancelReason::user("stop"));
        signal.request(CancelReason::shutdown());
        assert_eq!(signal.reason().map(|r| r.kind), Some(CancelKind::Shutdown));
    }

    #[test]
    fn listeners_run_once_on_request() {
        let signal = CancelSignal::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        let key = signal.add_listener(move |reason| {
            assert_eq!(reason.kind, CancelKind::Aborted);
            hits2.fetch_add(1, Ordering::SeqCst);
        });
        assert!(key.is_some());
        assert_eq!(signal.listener_count(), 1);

        signal.request(CancelReason::aborted());
        signal.request(CancelReason::aborted());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn listener_on_requested_signal_runs_immediately() {
        let signal = CancelSignal::new();
        signal.request(CancelReason::user("already"));
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        let key = signal.add_listener(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });
        assert!(key.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_listener_never_runs() {
        let signal = CancelSignal::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        let key = signal
            .add_listener(move |_| {
                hits2.fetch_add(1, Ordering::SeqCst);
            })
            .expect("signal not yet requested");
        assert!(signal.remove_listener(key));
        assert!(!signal.remove_listener(key));

        signal.request(CancelReason::default());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn key_from_other_signal_is_ignored() {
        let a = CancelSignal::new();
        let b = CancelSignal::new();
        let key = a.add_listener(|_| {}).expect("pending");
        assert!(!b.remove_listener(key));
        assert_eq!(a.listener_count(), 1);
    }

    #[test]
    fn listener_may_reenter_signal() {
        let signal = CancelSignal::new();
        let inner = signal.clone();
        signal.add_listener(move |_| {
            // Re-entrant access must not deadlock.
            assert!(inner.is_requested());
            assert!(inner.add_listener(|_| {}).is_none());
        });
        signal.request(CancelReason::default());
    }

    #[test]
    fn clones_share_state() {
        let a = CancelSignal::new();
        let b = a.clone();
        assert!(a.same_as(&b));
        assert!(!a.same_as(&CancelSignal::new()));
        b.request(CancelReason::default());
        assert!(a.is_requested());
    }
}
