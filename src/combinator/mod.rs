//! Combinators over [`Computation`](crate::Computation).
//!
//! This module provides the building blocks:
//!
//! - [`sequence`]: constructors and sequencing (`succeed`, `fail`, `sync`,
//!   `map`, `flat_map`, `tap`, `zip_right`)
//! - [`recover`]: error recovery and finalizers (`catch_err`, `result`,
//!   `on_result`, `ensuring`, `on_cancel`)
//! - [`mask`]: interruptibility regions (`uninterruptible`,
//!   `interruptible`, `uninterruptible_mask`)
//! - [`bracket`](mod@bracket): acquire/use/release resource safety pattern
//! - [`async_bridge`]: suspension on callbacks and host futures
//! - [`local`]: fiber-local slots and the dependency context
//! - [`race`](mod@race): run two computations, first terminal outcome wins

pub mod async_bridge;
pub mod bracket;
pub mod local;
pub mod mask;
pub mod race;
pub mod recover;
pub mod sequence;

pub use async_bridge::{from_callback, from_future, BoxFuture, Resume};
pub use bracket::{acquire_use_release, bracket};
pub use local::{context, current_signal, fiber_id, fiber_ref_get, is_interruptible, service};
pub use mask::{uninterruptible_mask, Restore};
pub use race::race;
pub use sequence::{
    cancelled, defect, die, fail, from_outcome, succeed, suspend, sync, try_sync, unit,
};
