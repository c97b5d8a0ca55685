//! Bridging callback-based and future-based host APIs.
//!
//! [`from_callback`] is the only place a computation suspends. Its `register`
//! function arranges for a [`Resume`] to be invoked once the host operation
//! completes, and may return a cleanup computation that cancels the host
//! operation.
//!
//! # Cancel-safety
//!
//! - Only the first call to [`Resume`] has an effect; later calls are no-ops.
//! - If the observed signal is requested before the operation resumes, the
//!   cleanup runs uninterruptibly and the computation ends `Cancelled`.
//! - The signal listener is removed as soon as the operation resumes, so a
//!   completed operation does not keep closures alive on a long-lived signal.

use crate::cancel::{CancelSignal, ListenerKey};
use crate::effect::{Computation, Continuation};
use crate::env::Env;
use crate::tracing_compat::{debug, trace};
use crate::types::{CancelReason, Never, Outcome};
use core::fmt;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll, Waker};

struct ResumeState<A, E> {
    cont: Mutex<Option<Continuation<A, E>>>,
    listener: Mutex<Option<ListenerKey>>,
    env: Env,
}

impl<A, E> ResumeState<A, E> {
    fn claim(&self) -> Option<Continuation<A, E>> {
        let cont = self.cont.lock().take()?;
        if let Some(key) = self.listener.lock().take() {
            self.env.signal().remove_listener(key);
        }
        Some(cont)
    }
}

/// Completes a suspended [`from_callback`] computation.
///
/// Cloning is cheap; every clone completes the same computation, and only
/// the first completion through any clone has an effect.
pub struct Resume<A, E> {
    state: Arc<ResumeState<A, E>>,
}

impl<A, E> Clone for Resume<A, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<A, E> fmt::Debug for Resume<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resume")
            .field("fiber", &self.state.env.fiber_id())
            .field("resumed", &self.is_resumed())
            .finish()
    }
}

impl<A, E> Resume<A, E> {
    /// Returns true once the computation has been resumed or cancelled.
    #[must_use]
    pub fn is_resumed(&self) -> bool {
        self.state.cont.lock().is_none()
    }
}

impl<A, E> Resume<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    fn new(env: Env, cont: Continuation<A, E>) -> Self {
        Self {
            state: Arc::new(ResumeState {
                cont: Mutex::new(Some(cont)),
                listener: Mutex::new(None),
                env,
            }),
        }
    }

    /// Resumes with the outcome of `effect`, run in the suspended computation's environment.
    ///
    /// Returns false if the computation was already resumed or cancelled.
    #[allow(clippy::must_use_candidate)]
    pub fn resume(&self, effect: Computation<A, E>) -> bool {
        let Some(cont) = self.state.claim() else {
            trace!(fiber = %self.state.env.fiber_id(), "resume ignored: already completed");
            return false;
        };
        effect.run_with(self.state.env.clone(), cont);
        true
    }

    /// Resumes with `outcome`.
    #[allow(clippy::must_use_candidate)]
    pub fn resume_outcome(&self, outcome: Outcome<A, E>) -> bool {
        let Some(cont) = self.state.claim() else {
            trace!(fiber = %self.state.env.fiber_id(), "resume ignored: already completed");
            return false;
        };
        cont(outcome);
        true
    }

    /// Resumes with a success value.
    #[allow(clippy::must_use_candidate)]
    pub fn succeed(&self, value: A) -> bool {
        self.resume_outcome(Outcome::Ok(value))
    }

    /// Resumes with an expected failure.
    #[allow(clippy::must_use_candidate)]
    pub fn fail(&self, error: E) -> bool {
        self.resume_outcome(Outcome::Err(error))
    }

    fn set_listener(&self, signal: &CancelSignal, key: ListenerKey) {
        let mut slot = self.state.listener.lock();
        if self.is_resumed() {
            drop(slot);
            signal.remove_listener(key);
            return;
        }
        *slot = Some(key);
    }
}

/// Creates a computation completed by a host callback.
///
/// `register` runs when the computation starts. It receives a [`Resume`]
/// and the signal the computation observes, and returns the cleanup to run
/// if that signal is requested before the operation resumes. Returning
/// `None` makes the operation non-cancellable: the computation waits for
/// `resume` regardless of cancellation requests.
///
/// If the cleanup itself ends in a defect, that defect is the result instead
/// of `Cancelled`.
#[must_use]
pub fn from_callback<A, E, R, F>(register: F) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn(Resume<A, E>, CancelSignal) -> Option<Computation<(), Never, R>> + Send + Sync + 'static,
    R: 'static,
{
    Computation::make(move |env, cont| {
        let signal = env.signal().clone();
        let resume = Resume::new(env.clone(), cont);
        let Some(cleanup) = register(resume.clone(), signal.clone()) else {
            return;
        };
        if resume.is_resumed() {
            return;
        }

        let state = Arc::clone(&resume.state);
        let cleanup_env = env.clone();
        let key = signal.add_listener(move |reason: &CancelReason| {
            let Some(cont) = state.cont.lock().take() else {
                return;
            };
            state.listener.lock().take();
            debug!(fiber = %cleanup_env.fiber_id(), reason = %reason, "async operation cancelled");
            let reason = reason.clone();
            cleanup.uninterruptible().run_with(
                cleanup_env,
                Box::new(move |done: Outcome<(), Never>| match done {
                    Outcome::Defect(d) => cont(Outcome::Defect(d)),
                    _ => cont(Outcome::Cancelled(reason)),
                }),
            );
        });
        if let Some(key) = key {
            resume.set_listener(&signal, key);
        }
    })
}

/// A boxed host future, as handed to a spawner.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Abandon {
    flag: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

impl Abandon {
    fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
        if let Some(waker) = self.waker.lock().take() {
            waker.wake();
        }
    }
}

/// Drives the host future until it completes or the computation abandons it.
struct Abandonable<F> {
    inner: Pin<Box<F>>,
    abandon: Arc<Abandon>,
}

impl<F: Future> Future for Abandonable<F> {
    type Output = Option<F::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        if self.abandon.flag.load(Ordering::Acquire) {
            return Poll::Ready(None);
        }
        *self.abandon.waker.lock() = Some(cx.waker().clone());
        if self.abandon.flag.load(Ordering::Acquire) {
            return Poll::Ready(None);
        }
        self.inner.as_mut().poll(cx).map(Some)
    }
}

/// Bridges a host future into a computation.
///
/// Each run calls `make_future` and hands the resulting future to `spawn`,
/// which must poll it to completion on some executor. When the computation
/// is cancelled before the future completes, the future is dropped at its
/// next poll.
#[must_use]
pub fn from_future<A, E, R, S, M, Fut>(spawn: S, make_future: M) -> Computation<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Fn(BoxFuture) + Send + Sync + 'static,
    M: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
    R: 'static,
{
    from_callback(move |resume: Resume<A, E>, _signal| {
        let abandon = Arc::new(Abandon {
            flag: AtomicBool::new(false),
            waker: Mutex::new(None),
        });
        let driven = Abandonable {
            inner: Box::pin(make_future()),
            abandon: Arc::clone(&abandon),
        };
        spawn(Box::pin(async move {
            if let Some(result) = driven.await {
                resume.resume_outcome(result.into());
            }
        }));
        Some(super::sequence::sync(move || abandon.trigger()))
    })
}
