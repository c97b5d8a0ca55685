//! Four-valued outcome type with severity lattice.
//!
//! The outcome type represents the terminal result of running a computation:
//!
//! - `Ok(A)`: Success with value
//! - `Err(E)`: Expected failure declared in the computation's error type
//! - `Cancelled(CancelReason)`: The computation observed a cancellation request
//! - `Defect(Defect)`: An unexpected failure (a panic or an explicit defect)
//!
//! These form a severity lattice: `Ok < Err < Cancelled < Defect`
//!
//! Only `Err` is part of the statically tracked error channel. Defects are
//! bugs, not control flow, and cancellation can be observed but never turned
//! back into an expected failure.

use super::cancel::CancelReason;
use core::fmt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::sync::Arc;

/// The cause of an unexpected failure.
///
/// A defect carries a human-readable message and, optionally, an arbitrary
/// shared payload describing the cause. Panics caught at a computation
/// boundary become defects whose message is the panic message.
#[derive(Clone)]
pub struct Defect {
    message: String,
    payload: Option<Arc<dyn Any + Send + Sync>>,
    backtrace: Option<Arc<Backtrace>>,
}

impl Defect {
    /// Creates a defect with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
            backtrace: None,
        }
    }

    /// Creates a defect carrying an arbitrary cause value.
    #[must_use]
    pub fn with_payload<T>(message: impl Into<String>, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            message: message.into(),
            payload: Some(Arc::new(payload)),
            backtrace: None,
        }
    }

    /// Converts a caught panic payload into a defect.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new(message)
    }

    /// Attaches a captured backtrace.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = Some(Arc::new(backtrace));
        self
    }

    /// Returns the defect message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the payload if it has type `T`.
    #[must_use]
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }

    /// Returns the captured backtrace, if any.
    #[must_use]
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_deref()
    }
}

impl fmt::Debug for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defect")
            .field("message", &self.message)
            .field("has_payload", &self.payload.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "defect: {}", self.message)
    }
}

impl PartialEq for Defect {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

/// The four-valued outcome of a computation.
///
/// Forms a severity lattice where worse outcomes dominate:
/// `Ok < Err < Cancelled < Defect`
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<A, E> {
    /// Success with a value.
    Ok(A),
    /// Expected, statically tracked failure.
    Err(E),
    /// The computation was cancelled.
    Cancelled(CancelReason),
    /// Unexpected failure.
    Defect(Defect),
}

impl<A, E> Outcome<A, E> {
    /// Returns the severity level of this outcome (0 = Ok, 3 = Defect).
    #[must_use]
    pub const fn severity(&self) -> u8 {
        match self {
            Self::Ok(_) => 0,
            Self::Err(_) => 1,
            Self::Cancelled(_) => 2,
            Self::Defect(_) => 3,
        }
    }

    /// Returns true if this outcome is `Ok`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns true if this outcome is `Err`.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Returns true if this outcome is `Cancelled`.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns true if this outcome is `Defect`.
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(self, Self::Defect(_))
    }

    /// Returns true for every non-success outcome.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !self.is_ok()
    }

    /// Borrows the success value, if any.
    #[must_use]
    pub const fn ok(&self) -> Option<&A> {
        match self {
            Self::Ok(v) => Some(v),
            _ => None,
        }
    }

    /// Converts this outcome to a standard Result, with cancellation and defects as errors.
    pub fn into_result(self) -> Result<A, Failure<E>> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(Failure::Err(e)),
            Self::Cancelled(r) => Err(Failure::Cancelled(r)),
            Self::Defect(d) => Err(Failure::Defect(d)),
        }
    }

    /// Maps the success value using the provided function.
    pub fn map<B, F: FnOnce(A) -> B>(self, f: F) -> Outcome<B, E> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Err(e) => Outcome::Err(e),
            Self::Cancelled(r) => Outcome::Cancelled(r),
            Self::Defect(d) => Outcome::Defect(d),
        }
    }

    /// Maps the error value using the provided function.
    pub fn map_err<E2, G: FnOnce(E) -> E2>(self, g: G) -> Outcome<A, E2> {
        match self {
            Self::Ok(v) => Outcome::Ok(v),
            Self::Err(e) => Outcome::Err(g(e)),
            Self::Cancelled(r) => Outcome::Cancelled(r),
            Self::Defect(d) => Outcome::Defect(d),
        }
    }

    /// Re-types a non-success outcome, handing back the value on success.
    ///
    /// Sequencing combinators use this to forward failures unchanged.
    pub fn split<B>(self) -> Result<A, Outcome<B, E>> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(Outcome::Err(e)),
            Self::Cancelled(r) => Err(Outcome::Cancelled(r)),
            Self::Defect(d) => Err(Outcome::Defect(d)),
        }
    }

    /// Returns the success value or panics.
    ///
    /// # Panics
    ///
    /// Panics if the outcome is not `Ok`.
    #[track_caller]
    pub fn unwrap(self) -> A
    where
        E: fmt::Debug,
    {
        match self {
            Self::Ok(v) => v,
            Self::Err(e) => panic!("called `Outcome::unwrap()` on an `Err` value: {e:?}"),
            Self::Cancelled(r) => {
                panic!("called `Outcome::unwrap()` on a `Cancelled` value: {r:?}")
            }
            Self::Defect(d) => panic!("called `Outcome::unwrap()` on a `Defect` value: {d}"),
        }
    }

    /// Returns the success value or a default.
    pub fn unwrap_or(self, default: A) -> A {
        match self {
            Self::Ok(v) => v,
            _ => default,
        }
    }
}

impl<A, E> From<Result<A, E>> for Outcome<A, E> {
    fn from(result: Result<A, E>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Err(e),
        }
    }
}

/// Non-success outcome surfaced by the driver.
///
/// `Cancelled` stays distinguishable from `Err` so callers can tell "my own
/// request was cancelled" apart from "it failed".
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Failure<E> {
    /// Expected failure.
    #[error("{0}")]
    Err(E),
    /// Cancellation.
    #[error("cancelled: {0}")]
    Cancelled(CancelReason),
    /// Unexpected failure.
    #[error("{0}")]
    Defect(Defect),
}

impl<E> Failure<E> {
    /// Returns true if this failure is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Converts back into the equivalent outcome.
    pub fn into_outcome<A>(self) -> Outcome<A, E> {
        match self {
            Self::Err(e) => Outcome::Err(e),
            Self::Cancelled(r) => Outcome::Cancelled(r),
            Self::Defect(d) => Outcome::Defect(d),
        }
    }
}

/// Compares two outcomes by severity and returns the worse one.
///
/// This implements the lattice join operation. On equal severity the first
/// argument wins.
pub fn join_outcomes<A, E>(a: Outcome<A, E>, b: Outcome<A, E>) -> Outcome<A, E> {
    if a.severity() >= b.severity() {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        let ok: Outcome<i32, &str> = Outcome::Ok(42);
        let err: Outcome<i32, &str> = Outcome::Err("error");
        let cancelled: Outcome<i32, &str> = Outcome::Cancelled(CancelReason::default());
        let defect: Outcome<i32, &str> = Outcome::Defect(Defect::new("bug"));

        assert!(ok.severity() < err.severity());
        assert!(err.severity() < cancelled.severity());
        assert!(cancelled.severity() < defect.severity());
    }

    #[test]
    fn join_takes_worse() {
        let ok: Outcome<i32, &str> = Outcome::Ok(1);
        let err: Outcome<i32, &str> = Outcome::Err("error");
        assert!(join_outcomes(ok, err).is_err());
    }

    #[test]
    fn join_equal_severity_returns_first() {
        let a: Outcome<i32, &str> = Outcome::Ok(1);
        let b: Outcome<i32, &str> = Outcome::Ok(2);
        assert!(matches!(join_outcomes(a, b), Outcome::Ok(1)));
    }

    #[test]
    fn join_defect_dominates_all() {
        let defect: Outcome<i32, &str> = Outcome::Defect(Defect::new("bug"));
        assert!(join_outcomes(Outcome::Ok(1), defect.clone()).is_defect());
        assert!(join_outcomes(Outcome::Err("e"), defect.clone()).is_defect());
        assert!(join_outcomes(Outcome::Cancelled(CancelReason::default()), defect).is_defect());
    }

    #[test]
    fn map_preserves_failures() {
        let err: Outcome<i32, &str> = Outcome::Err("error");
        assert!(matches!(err.map(|x| x * 2), Outcome::Err("error")));

        let cancelled: Outcome<i32, &str> = Outcome::Cancelled(CancelReason::default());
        assert!(cancelled.map(|x| x * 2).is_cancelled());

        let ok: Outcome<i32, &str> = Outcome::Ok(21);
        assert!(matches!(ok.map(|x| x * 2), Outcome::Ok(42)));
    }

    #[test]
    fn map_err_transforms_err_value() {
        let err: Outcome<i32, &str> = Outcome::Err("short");
        assert!(matches!(err.map_err(str::len), Outcome::Err(5)));
    }

    #[test]
    fn split_retypes_failures() {
        let err: Outcome<i32, &str> = Outcome::Err("e");
        let split: Result<i32, Outcome<String, &str>> = err.split();
        assert!(matches!(split, Err(Outcome::Err("e"))));

        let ok: Outcome<i32, &str> = Outcome::Ok(3);
        assert!(matches!(ok.split::<String>(), Ok(3)));
    }

    #[test]
    #[should_panic(expected = "called `Outcome::unwrap()` on a `Defect` value")]
    fn unwrap_panics_on_defect() {
        let defect: Outcome<i32, &str> = Outcome::Defect(Defect::new("oops"));
        let _ = defect.unwrap();
    }

    #[test]
    fn into_result_distinguishes_cancellation() {
        let cancelled: Outcome<i32, &str> = Outcome::Cancelled(CancelReason::user("stop"));
        let failure = cancelled.into_result().unwrap_err();
        assert!(failure.is_cancelled());
        assert_eq!(failure.to_string(), "cancelled: user: stop");

        let err: Outcome<i32, &str> = Outcome::Err("boom");
        assert_eq!(err.into_result(), Err(Failure::Err("boom")));
    }

    #[test]
    fn defect_from_panic_payloads() {
        let from_str: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(Defect::from_panic(&*from_str).message(), "static message");

        let from_string: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(Defect::from_panic(&*from_string).message(), "owned");

        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(
            Defect::from_panic(&*other).message(),
            "non-string panic payload"
        );
    }

    #[test]
    fn defect_payload_downcast() {
        let defect = Defect::with_payload("io", 404_u16);
        assert_eq!(defect.payload::<u16>(), Some(&404));
        assert_eq!(defect.payload::<String>(), None);
        assert_eq!(defect.to_string(), "defect: io");
    }
}
