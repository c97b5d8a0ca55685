//! Type-keyed dependency context.
//!
//! The ambient dependency context is an ordinary fiber-local value stored in
//! the built-in [`context_ref`] slot. Layers that configure a transport, a
//! clock or any other collaborator put it into the context once, and code
//! further down reads it back with [`service`](crate::combinator::local::service).

use super::fiber_ref::FiberRef;
use core::fmt;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
struct Entry {
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// An immutable map from service type to service instance.
///
/// Adding a service returns a new context; the original is unchanged, so a
/// context captured by one fiber is never affected by another fiber's
/// additions.
#[derive(Clone, Default)]
pub struct Context {
    services: Arc<HashMap<TypeId, Entry>>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a context that additionally provides `service`, replacing any
    /// previous service of the same type.
    #[must_use]
    pub fn with<S>(&self, service: S) -> Self
    where
        S: Any + Send + Sync,
    {
        self.with_shared(Arc::new(service))
    }

    /// Like [`with`](Self::with), for a service that is already shared.
    #[must_use]
    pub fn with_shared<S>(&self, service: Arc<S>) -> Self
    where
        S: Any + Send + Sync,
    {
        let mut services = (*self.services).clone();
        services.insert(
            TypeId::of::<S>(),
            Entry {
                name: type_name::<S>(),
                value: service,
            },
        );
        Self {
            services: Arc::new(services),
        }
    }

    /// Returns the service of type `S`, if present.
    #[must_use]
    pub fn get<S>(&self) -> Option<Arc<S>>
    where
        S: Any + Send + Sync,
    {
        let entry = self.services.get(&TypeId::of::<S>())?;
        Arc::clone(&entry.value).downcast::<S>().ok()
    }

    /// Returns true if a service of type `S` is present.
    #[must_use]
    pub fn contains<S: Any>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<S>())
    }

    /// Returns a context with every service of `other` added to this one.
    /// Services in `other` win on conflict.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut services = (*self.services).clone();
        services.extend(
            other
                .services
                .iter()
                .map(|(id, entry)| (*id, entry.clone())),
        );
        Self {
            services: Arc::new(services),
        }
    }

    /// Returns the number of services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if the context provides no services.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.services.values().map(|e| e.name).collect();
        names.sort_unstable();
        f.debug_struct("Context").field("services", &names).finish()
    }
}

/// The built-in slot carrying the current dependency context.
#[must_use]
pub fn context_ref() -> FiberRef<Context> {
    FiberRef::global("effectum::context", Context::new)
}
