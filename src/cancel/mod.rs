//! Cancellation signals.
//!
//! Cancellation is a cooperative protocol: a request flips a shared signal,
//! computations observe it at their entry check or through a registered
//! listener, and masked regions ignore it until they return to an
//! interruptible boundary.

pub mod signal;

pub use signal::{CancelSignal, ListenerKey};
