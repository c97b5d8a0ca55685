//! Test utilities for Effectum.
//!
//! This module provides shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - A lock serializing tests that mutate environment variables
//! - Synchronous runners and continuation recorders
//! - A release spy for resource-safety tests
//! - Outcome assertion macros

use crate::cancel::CancelSignal;
use crate::combinator::unit;
use crate::effect::{Computation, Continuation};
use crate::env::Env;
use crate::types::{Never, Outcome};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Runs `computation` in a fresh root environment and returns its outcome.
///
/// Panics if the computation suspends instead of completing synchronously.
pub fn run_outcome<A, E, R>(computation: &Computation<A, E, R>) -> Outcome<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
    R: 'static,
{
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    computation.run_with(
        Env::root(CancelSignal::new()),
        Box::new(move |outcome| *sink.lock() = Some(outcome)),
    );
    let outcome = slot.lock().take();
    outcome.expect("computation suspended instead of completing synchronously")
}

/// A continuation recorder that counts how often it is invoked.
pub struct CountingContinuation<A, E> {
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<Outcome<A, E>>>>,
}

impl<A, E> Clone for CountingContinuation<A, E> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
            last: Arc::clone(&self.last),
        }
    }
}

impl<A, E> CountingContinuation<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Creates a recorder that has not been invoked.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns a continuation that records into this recorder.
    #[must_use]
    pub fn continuation(&self) -> Continuation<A, E> {
        let recorder = self.clone();
        Box::new(move |outcome| {
            recorder.calls.fetch_add(1, Ordering::SeqCst);
            *recorder.last.lock() = Some(outcome);
        })
    }

    /// Number of times any continuation of this recorder was invoked.
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recently delivered outcome.
    #[must_use]
    pub fn last(&self) -> Option<Outcome<A, E>>
    where
        A: Clone,
        E: Clone,
    {
        self.last.lock().clone()
    }
}

struct SpyState<Res, A, E> {
    calls: usize,
    last_resource: Option<Res>,
    last_outcome: Option<Outcome<A, E>>,
}

/// Records every call of a release function.
pub struct ReleaseSpy<Res, A, E> {
    state: Arc<Mutex<SpyState<Res, A, E>>>,
}

impl<Res, A, E> Clone for ReleaseSpy<Res, A, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<Res, A, E> ReleaseSpy<Res, A, E>
where
    Res: Clone + Send + 'static,
    A: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a spy that has seen no calls.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SpyState {
                calls: 0,
                last_resource: None,
                last_outcome: None,
            })),
        }
    }

    /// Returns a release function that records its arguments and succeeds.
    pub fn release<R>(
        &self,
    ) -> impl Fn(Res, &Outcome<A, E>) -> Computation<(), Never, R> + Send + Sync + 'static
    where
        R: 'static,
    {
        let state = Arc::clone(&self.state);
        move |resource, outcome| {
            let mut guard = state.lock();
            guard.calls += 1;
            guard.last_resource = Some(resource);
            guard.last_outcome = Some(outcome.clone());
            unit()
        }
    }

    /// Number of release calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }

    /// The resource passed to the most recent release.
    #[must_use]
    pub fn last_resource(&self) -> Option<Res> {
        self.state.lock().last_resource.clone()
    }

    /// The outcome passed to the most recent release.
    #[must_use]
    pub fn last_outcome(&self) -> Option<Outcome<A, E>> {
        self.state.lock().last_outcome.clone()
    }
}

/// Assert that an outcome is Ok with a specific value.
#[macro_export]
macro_rules! assert_outcome_ok {
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            $crate::types::Outcome::Ok(v) => assert_eq!(v, $expected),
            other => unreachable!("expected Outcome::Ok({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that an outcome is Cancelled.
#[macro_export]
macro_rules! assert_outcome_cancelled {
    ($outcome:expr) => {
        match $outcome {
            $crate::types::Outcome::Cancelled(_) => {}
            other => unreachable!("expected Outcome::Cancelled, got {:?}", other),
        }
    };
}

/// Assert that an outcome is a Defect.
#[macro_export]
macro_rules! assert_outcome_defect {
    ($outcome:expr) => {
        match $outcome {
            $crate::types::Outcome::Defect(_) => {}
            other => unreachable!("expected Outcome::Defect, got {:?}", other),
        }
    };
}
