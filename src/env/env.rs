//! The per-execution environment.

use super::fiber_ref::FiberRef;
use crate::cancel::CancelSignal;
use crate::types::{FiberId, SlotId};
use core::fmt;
use std::any::Any;
use std::sync::Arc;

struct SlotNode {
    id: SlotId,
    value: Arc<dyn Any + Send + Sync>,
    next: Option<Arc<SlotNode>>,
}

/// The environment a computation runs in.
///
/// An `Env` is immutable. Every override ([`with_slot`](Self::with_slot),
/// masking, forking) returns a new `Env` that shares all untouched entries
/// with the one it was derived from, so concurrently running siblings never
/// observe each other's overrides.
///
/// Besides fiber-local slots an `Env` carries three pieces of cancellation
/// state:
///
/// - the **controller**: the fiber's own cancellation signal, the one that
///   [`Handle::abort`](crate::runtime::Handle::abort) and the driver request;
/// - the **signal**: the signal computations currently observe. In an
///   interruptible region it is the controller; inside an uninterruptible
///   region it is a fresh signal nobody ever requests;
/// - the **interruptible** flag.
#[derive(Clone)]
pub struct Env {
    slots: Option<Arc<SlotNode>>,
    signal: CancelSignal,
    controller: CancelSignal,
    interruptible: bool,
    fiber: FiberId,
}

impl Env {
    /// Creates the root environment of a fiber driven by `controller`.
    #[must_use]
    pub fn root(controller: CancelSignal) -> Self {
        Self {
            slots: None,
            signal: controller.clone(),
            controller,
            interruptible: true,
            fiber: FiberId::next(),
        }
    }

    /// Returns the signal currently observed by entry checks and async listeners.
    #[must_use]
    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }

    /// Returns the fiber's own cancellation signal.
    #[must_use]
    pub fn controller(&self) -> &CancelSignal {
        &self.controller
    }

    /// Returns true outside uninterruptible regions.
    #[must_use]
    pub const fn is_interruptible(&self) -> bool {
        self.interruptible
    }

    /// Returns the identity of the fiber this environment belongs to.
    #[must_use]
    pub const fn fiber_id(&self) -> FiberId {
        self.fiber
    }

    /// Reads a slot, falling back to its default.
    #[must_use]
    pub fn get<T>(&self, slot: &FiberRef<T>) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut node = self.slots.as_deref();
        while let Some(current) = node {
            if current.id == slot.id() {
                if let Some(value) = current.value.downcast_ref::<T>() {
                    return value.clone();
                }
                break;
            }
            node = current.next.as_deref();
        }
        slot.default_value()
    }

    /// Returns true if the slot has been set anywhere on this environment's chain.
    #[must_use]
    pub fn is_set<T>(&self, slot: &FiberRef<T>) -> bool
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut node = self.slots.as_deref();
        while let Some(current) = node {
            if current.id == slot.id() {
                return true;
            }
            node = current.next.as_deref();
        }
        false
    }

    /// Returns a new environment where `slot` holds `value`.
    #[must_use]
    pub fn with_slot<T>(&self, slot: &FiberRef<T>, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self {
            slots: Some(Arc::new(SlotNode {
                id: slot.id(),
                value: Arc::new(value),
                next: self.slots.clone(),
            })),
            ..self.clone()
        }
    }

    /// Environment for an uninterruptible region: a fresh, never-requested signal.
    pub(crate) fn masked(&self) -> Self {
        Self {
            signal: CancelSignal::new(),
            interruptible: false,
            ..self.clone()
        }
    }

    /// Environment for an interruptible region nested in a masked one.
    ///
    /// The observed signal goes back to the fiber's controller, so requests
    /// remembered while masked take effect here.
    pub(crate) fn unmasked(&self) -> Self {
        if self.interruptible {
            return self.clone();
        }
        Self {
            signal: self.controller.clone(),
            interruptible: true,
            ..self.clone()
        }
    }

    /// Environment for a child fiber: inherits the slots, owns a new controller.
    pub(crate) fn for_child(&self, controller: CancelSignal) -> Self {
        Self {
            slots: self.slots.clone(),
            signal: controller.clone(),
            controller,
            interruptible: true,
            fiber: FiberId::next(),
        }
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0_usize;
        let mut node = self.slots.as_deref();
        while let Some(current) = node {
            depth += 1;
            node = current.next.as_deref();
        }
        f.debug_struct("Env")
            .field("fiber", &self.fiber)
            .field("interruptible", &self.interruptible)
            .field("signal", &self.signal)
            .field("slots", &depth)
            .finish()
    }
}
