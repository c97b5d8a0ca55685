//! Core types for the Effectum runtime.
//!
//! - [`id`]: Identifier types (`SlotId`, `FiberId`)
//! - [`outcome`]: Four-valued outcome type with severity lattice
//! - [`cancel`]: Cancellation reason and kind types

pub mod cancel;
pub mod id;
pub mod outcome;

pub use cancel::{CancelKind, CancelReason};
pub use id::{FiberId, SlotId};
pub use outcome::{join_outcomes, Defect, Failure, Outcome};

/// Error type of computations that cannot fail with an expected error.
pub type Never = std::convert::Infallible;
