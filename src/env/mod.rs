//! Execution environment and fiber-local state.
//!
//! - [`env`]: the immutable, structurally shared [`Env`]
//! - [`fiber_ref`]: typed slots ([`FiberRef`]) and the [`global_value`] registry
//! - [`context`]: the type-keyed dependency [`Context`]

#[allow(clippy::module_inception)]
pub mod env;
pub mod context;
pub mod fiber_ref;

pub use context::{context_ref, Context};
pub use env::Env;
pub use fiber_ref::{global_value, FiberRef};
