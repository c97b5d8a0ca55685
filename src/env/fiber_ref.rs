//! Typed fiber-local slots and the process-wide default registry.
//!
//! A [`FiberRef<T>`] is an identity-keyed cell. Its value lives in the
//! [`Env`](super::Env) of the running fiber; when the Env has no entry for
//! the slot, the slot's default is used. Shadowing a slot with
//! [`locally`](crate::Computation::locally) is visible only to the inner
//! computation.
//!
//! Slots that must be shared across independent parts of a program (the
//! dependency [`Context`](super::Context), for instance) are created through
//! [`FiberRef::global`], which returns the same slot for the same key no
//! matter how many times or from where it is called.

use crate::types::SlotId;
use core::fmt;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

type Entry = (TypeId, Arc<dyn Any + Send + Sync>);
type Registry = Mutex<HashMap<&'static str, Entry>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the process-wide value registered under `key`, creating it with
/// `init` on first access.
///
/// The registry is append-only: once a key is initialized every later call
/// returns the same shared value. `init` runs without the registry lock, so
/// it may itself read other global values. Threads racing on the first access
/// may each run `init`; only the first value inserted is kept.
///
/// # Panics
///
/// Panics if `key` was first registered with a different type. Keys are a
/// static namespace and a collision is a programming error.
pub fn global_value<T, F>(key: &'static str, init: F) -> Arc<T>
where
    T: Any + Send + Sync,
    F: FnOnce() -> T,
{
    if let Some(value) = lookup::<T>(&registry().lock(), key) {
        return value;
    }

    let value = Arc::new(init());

    let mut map = registry().lock();
    if let Some(existing) = lookup::<T>(&map, key) {
        return existing;
    }
    let erased: Arc<dyn Any + Send + Sync> = value.clone();
    map.insert(key, (TypeId::of::<T>(), erased));
    value
}

fn lookup<T>(map: &HashMap<&'static str, Entry>, key: &'static str) -> Option<Arc<T>>
where
    T: Any + Send + Sync,
{
    let (type_id, value) = map.get(key)?;
    assert!(
        *type_id == TypeId::of::<T>(),
        "global value {key:?} was registered with a different type"
    );
    Arc::clone(value).downcast::<T>().ok()
}

/// A typed fiber-local slot.
pub struct FiberRef<T> {
    id: SlotId,
    name: &'static str,
    default: Arc<T>,
}

impl<T> FiberRef<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a new slot with its own identity.
    #[must_use]
    pub fn new(name: &'static str, default: T) -> Self {
        Self {
            id: SlotId::next(),
            name,
            default: Arc::new(default),
        }
    }

    /// Returns the canonical slot registered under `key`.
    ///
    /// The first call allocates the slot and computes its default; later
    /// calls return a handle to that same slot.
    #[must_use]
    pub fn global<F>(key: &'static str, default: F) -> Self
    where
        F: FnOnce() -> T,
    {
        let slot = global_value(key, || Self::new(key, default()));
        (*slot).clone()
    }

    /// Returns the slot identity.
    #[must_use]
    pub const fn id(&self) -> SlotId {
        self.id
    }

    /// Returns the slot name (diagnostics only).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns a clone of the slot's default value.
    #[must_use]
    pub fn default_value(&self) -> T {
        (*self.default).clone()
    }
}

impl<T> Clone for FiberRef<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            default: Arc::clone(&self.default),
        }
    }
}

impl<T> fmt::Debug for FiberRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
