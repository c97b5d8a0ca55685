//! Identifier types for runtime entities.
//!
//! Slots and fibers are identified by process-unique counters. Identity is
//! by allocation, never by name: two fiber refs with the same name are
//! still distinct slots.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static SLOT_COUNTER: AtomicU64 = AtomicU64::new(1);
static FIBER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of a fiber-local slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
    /// Allocates a fresh, process-unique slot identity.
    #[must_use]
    pub fn next() -> Self {
        Self(SLOT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric identity.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

/// Identity of a fiber (one execution of a computation by the driver or by `fork`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(u64);

impl FiberId {
    /// Allocates a fresh, process-unique fiber identity.
    #[must_use]
    pub fn next() -> Self {
        Self(FIBER_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a fiber ID for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric identity.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FiberId({})", self.0)
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}
