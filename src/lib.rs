//! Effectum: a cancel-correct effect runtime core for Rust.
//!
//! # Overview
//!
//! A [`Computation<A, E, R>`] is a lazy, reusable description of work that,
//! when run, delivers exactly one [`Outcome`]: a value `A`, an expected
//! failure `E`, a cancellation, or a defect. Computations are built from a
//! small set of primitives and composed with combinators; nothing happens
//! until a [`Runtime`] runs them.
//!
//! # Core Guarantees
//!
//! - **At-most-once continuation**: every run delivers one outcome, even when
//!   a callback resumes twice or panics after resuming
//! - **Cancel-correctness**: cancellation is request → cleanup → `Cancelled`,
//!   observed only at interruptible boundaries
//! - **Resource safety**: [`acquire_use_release`](combinator::acquire_use_release)
//!   releases every acquired resource exactly once, whatever `use` does
//! - **No escaping panics**: a panic inside a computation becomes a defect
//!
//! # Module Structure
//!
//! - [`types`]: Core types (identifiers, outcomes, cancel reasons)
//! - [`cancel`]: Cancellation signals
//! - [`env`]: The execution environment, fiber-local slots, dependency context
//! - [`effect`]: The computation type and its primitive constructors
//! - [`combinator`]: Sequencing, recovery, masking, brackets, async bridging, race
//! - [`runtime`]: The driver, configuration, and forked fibers
//! - [`error`]: Runtime error types
//!
//! # Example
//!
//! ```
//! use effectum::combinator::{acquire_use_release, fail, succeed, unit};
//! use effectum::{run_blocking, Computation, Failure};
//!
//! let program: Computation<i32, &str> =
//!     acquire_use_release(succeed(1), |_| fail("boom"), |_, _| unit());
//! assert_eq!(run_blocking(program), Err(Failure::Err("boom")));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::type_complexity)]

pub mod cancel;
pub mod combinator;
pub mod effect;
pub mod env;
pub mod error;
pub mod runtime;
pub mod tracing_compat;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenient access to core types
pub use cancel::CancelSignal;
pub use effect::{Computation, Continuation};
pub use env::{Context, Env, FiberRef};
pub use error::{ConfigError, Error, ErrorKind, Result, ResultExt};
pub use runtime::{run, run_blocking, Handle, RunFuture, Runtime, RuntimeBuilder, RuntimeConfig};
pub use types::{join_outcomes, CancelKind, CancelReason, Defect, Failure, FiberId, Never, Outcome};
