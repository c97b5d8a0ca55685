//! The computation type.
//!
//! [`Computation`] is defined here together with its two primitive
//! constructors. Everything else in [`combinator`](crate::combinator) is
//! built on top of them by wrapping continuations.

pub mod computation;

pub use computation::{Computation, Continuation};
