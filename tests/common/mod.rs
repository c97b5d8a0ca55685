#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use effectum::combinator::{from_callback, unit, Resume};
use effectum::{CancelSignal, Computation, Env, Never, Outcome};
use parking_lot::Mutex;
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "EFFECTUM_PROPTEST_SEED";

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    // If CI is set and no explicit seed is provided, use a fixed seed.
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
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

/// Records every outcome delivered to the continuations it hands out.
#[derive(Clone)]
pub struct Recorder<A, E> {
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<Outcome<A, E>>>>,
}

impl<A, E> Recorder<A, E>
where
    A: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Runs `computation` under `controller` with this recorder as continuation.
    pub fn run<R>(&self, computation: &Computation<A, E, R>, controller: &CancelSignal)
    where
        R: 'static,
    {
        let recorder = self.clone();
        computation.run_with(
            Env::root(controller.clone()),
            Box::new(move |outcome| {
                recorder.calls.fetch_add(1, Ordering::SeqCst);
                *recorder.last.lock() = Some(outcome);
            }),
        );
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<Outcome<A, E>> {
        self.last.lock().clone()
    }
}

/// A slot through which a test resumes a parked computation.
pub type ResumeSlot<A> = Arc<Mutex<Option<Resume<A, Never>>>>;

/// A computation that suspends until resumed through the returned slot.
///
/// Cancellation is honoured; the registered cleanup does nothing.
pub fn parked<A: Send + 'static>() -> (Computation<A, Never>, ResumeSlot<A>) {
    let slot: ResumeSlot<A> = Arc::new(Mutex::new(None));
    let register = Arc::clone(&slot);
    let comp = from_callback(move |resume, _signal| {
        *register.lock() = Some(resume);
        Some(unit())
    });
    (comp, slot)
}

/// Shared append-only event log.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}
