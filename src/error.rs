//! Error types and error handling strategy for Effectum.
//!
//! Two layers of failure exist and they are kept apart:
//!
//! - **Domain failures** travel inside computations as
//!   [`Outcome`](crate::Outcome) and surface from the driver as
//!   [`Failure<E>`](crate::Failure). They are values, not errors of the
//!   runtime.
//! - **Runtime errors** describe misuse of the runtime itself, such as an
//!   invalid configuration. They are reported through [`Error`].
//!
//! [`Error`] can also absorb a `Failure<E>` when a caller wants a single
//! error type at an application boundary.

use core::fmt;
use std::sync::Arc;

use crate::types::{CancelReason, Defect, Failure};

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Runtime configuration was rejected.
    InvalidConfig,
    /// A computation failed with an expected error.
    Failed,
    /// A computation was cancelled.
    Cancelled,
    /// A computation died with a defect.
    Defect,
    /// Internal runtime invariant was violated.
    Internal,
}

/// Configuration problems detected while building a runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value found in the environment.
        value: String,
        /// Human-readable description of the accepted values.
        expected: &'static str,
    },
    /// The runtime name was empty.
    #[error("runtime name must not be empty")]
    EmptyName,
}

/// The main error type for Effectum operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error represents cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Returns true if this error represents a defect.
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(self.kind, ErrorKind::Defect)
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a cancellation error from a structured reason.
    #[must_use]
    pub fn cancelled(reason: &CancelReason) -> Self {
        Self::new(ErrorKind::Cancelled).with_message(reason.to_string())
    }

    /// Creates an error describing a defect.
    #[must_use]
    pub fn defect(defect: &Defect) -> Self {
        Self::new(ErrorKind::Defect).with_message(defect.message())
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::new(ErrorKind::InvalidConfig)
            .with_message(e.to_string())
            .with_source(e)
    }
}

impl<E> From<Failure<E>> for Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(failure: Failure<E>) -> Self {
        match failure {
            Failure::Err(e) => Self::new(ErrorKind::Failed)
                .with_message(e.to_string())
                .with_source(e),
            Failure::Cancelled(reason) => Self::cancelled(&reason),
            Failure::Defect(defect) => Self::defect(&defect),
        }
    }
}

/// Extension trait for adding context to Results.
#[allow(clippy::result_large_err)]
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Attach context message computed lazily on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_message(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_message(f()))
    }
}

/// A specialized Result type for Effectum operations.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;
