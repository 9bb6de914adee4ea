//! Registration entries and the per-container registration map.
//!
//! The registry maps a [`ServiceKey`] to a [`Registration`] that knows how
//! to create instances, which [`ReuseScope`] applies, and where a cached
//! instance lives once one exists.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{BoxError, HearthError, InvalidReason, Result};
use crate::key::ServiceKey;
use crate::resolver::{Resolver, SlotId};
use crate::scope::ReuseScope;

/// A type-erased, shareable service instance.
///
/// The payload is always an `Arc<T>` for the service type `T`, which also
/// lets unsized services (`dyn Trait`) travel through the container.
#[derive(Clone)]
pub struct Instance(Arc<dyn Any + Send + Sync>);

impl Instance {
    /// Wraps a shared service.
    pub fn new<T: ?Sized + Send + Sync + 'static>(service: Arc<T>) -> Self {
        Self(Arc::new(service))
    }

    /// Returns the service if this instance holds a `T`.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.0.downcast_ref::<Arc<T>>().cloned()
    }

    /// Returns `true` if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Instance(..)")
    }
}

/// Type alias for factory functions.
///
/// A factory receives a [`Resolver`] bound to the container it runs
/// against, so it can resolve its own dependencies.
pub type FactoryFn = Arc<dyn Fn(&dyn Resolver) -> Result<Instance> + Send + Sync>;

/// Release logic attached to a registration whose instances need disposal.
pub type DisposeFn = Arc<dyn Fn(&Instance) -> std::result::Result<(), BoxError> + Send + Sync>;

/// A registration before it is accepted by a container.
///
/// This is the type-erased form of
/// [`ServiceDescriptor`](crate::descriptor::ServiceDescriptor) and the unit
/// [`Provider`](crate::provider::Provider)s hand to their registry.
#[derive(Clone)]
pub struct RawRegistration {
    pub key: ServiceKey,
    pub scope: ReuseScope,
    pub factory: Option<FactoryFn>,
    pub disposer: Option<DisposeFn>,
    pub dependencies: Vec<ServiceKey>,
    /// Pre-built instance placed in the cache slot on registration.
    pub preset: Option<Instance>,
}

impl RawRegistration {
    /// Creates a raw registration with no disposer or declared dependencies.
    pub fn new(key: ServiceKey, scope: ReuseScope, factory: Option<FactoryFn>) -> Self {
        Self {
            key,
            scope,
            factory,
            disposer: None,
            dependencies: Vec::new(),
            preset: None,
        }
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.factory.is_none() {
            return Err(HearthError::invalid(&self.key, InvalidReason::MissingFactory));
        }
        if self.key.name().is_some_and(str::is_empty) {
            return Err(HearthError::invalid(&self.key, InvalidReason::EmptyName));
        }
        if self.disposer.is_some() && !self.scope.is_cached() {
            return Err(HearthError::invalid(&self.key, InvalidReason::DisposerOnTransient));
        }
        Ok(())
    }
}

impl fmt::Debug for RawRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRegistration")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("has_factory", &self.factory.is_some())
            .field("disposable", &self.disposer.is_some())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Registration entry owned by exactly one container.
pub(crate) struct Registration {
    pub key: ServiceKey,
    pub factory: FactoryFn,
    pub scope: ReuseScope,
    pub disposer: Option<DisposeFn>,
    pub dependencies: Vec<ServiceKey>,
    /// Filled at most once; survives re-registration of the same key.
    pub cache: Arc<OnceCell<Instance>>,
}

impl Registration {
    /// Identity of the cache slot, shared with any replacement entry.
    pub fn slot_id(&self) -> SlotId {
        Arc::as_ptr(&self.cache) as SlotId
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("cached", &self.cache.get().is_some())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// What [`Registry::insert`] did with a registration.
#[derive(Debug)]
pub(crate) struct Inserted {
    pub entry: Arc<Registration>,
    pub replaced: bool,
}

/// Local registration map of one container.
///
/// Entries are handed out as `Arc`s so no map guard is held while a
/// factory runs.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: DashMap<ServiceKey, Arc<Registration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `raw.key`.
    ///
    /// Replacing keeps the existing cache slot, so an instance created
    /// before the replacement stays the one returned.
    ///
    /// # Errors
    /// Returns [`HearthError::InvalidRegistration`] if the registration is
    /// malformed, or if the key exists and `allow_override` is false.
    pub fn insert(&self, raw: RawRegistration, allow_override: bool) -> Result<Inserted> {
        raw.check()?;
        let RawRegistration { key, scope, factory, disposer, dependencies, .. } = raw;
        let factory = factory.ok_or_else(|| HearthError::invalid(&key, InvalidReason::MissingFactory))?;

        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if !allow_override {
                    return Err(HearthError::invalid(&key, InvalidReason::AlreadyRegistered));
                }
                let cache = occupied.get().cache.clone();
                let entry = Arc::new(Registration { key: key.clone(), factory, scope, disposer, dependencies, cache });
                occupied.insert(entry.clone());
                debug!(key = %key, scope = %scope, "Replaced registration");
                Ok(Inserted { entry, replaced: true })
            }
            Entry::Vacant(vacant) => {
                let entry = Arc::new(Registration {
                    key: key.clone(),
                    factory,
                    scope,
                    disposer,
                    dependencies,
                    cache: Arc::new(OnceCell::new()),
                });
                vacant.insert(entry.clone());
                debug!(key = %key, scope = %scope, "Registered service");
                Ok(Inserted { entry, replaced: false })
            }
        }
    }

    /// Looks up a registration by key.
    pub fn get(&self, key: &ServiceKey) -> Option<Arc<Registration>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<ServiceKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Removes every entry and hands them back.
    ///
    /// The caller decides when they drop, so no map guard is held while
    /// cached instances are released.
    pub fn drain(&self) -> Vec<Arc<Registration>> {
        self.keys()
            .iter()
            .filter_map(|key| self.entries.remove(key).map(|(_, entry)| entry))
            .collect()
    }

    /// Snapshot of every entry, for validation.
    pub fn entries(&self) -> Vec<Arc<Registration>> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }
}
