//! Resolution API shared by containers and factory closures.
//!
//! [`Resolver`] is the small object-safe core factories receive;
//! [`ResolverApi`] layers the typed calls on top of it for every resolver,
//! including `&dyn Resolver`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::warn;

use crate::container::Container;
use crate::error::{CircularDependencyError, HearthError, Result};
use crate::key::ServiceKey;
use crate::registry::Instance;

/// Resolves type-erased instances by key.
///
/// Implemented by [`Container`] and by the resolver handed to factories.
/// Use the typed methods of [`ResolverApi`] instead of calling these
/// directly.
pub trait Resolver {
    /// Resolves `key`, applying the registration's reuse scope.
    fn resolve_key(&self, key: &ServiceKey) -> Result<Instance>;

    /// Invokes the factory for `key` afresh, ignoring its reuse scope.
    ///
    /// The instance is neither cached nor tracked for disposal.
    fn create_key(&self, key: &ServiceKey) -> Result<Instance>;
}

/// Typed resolution methods, available on every [`Resolver`].
///
/// ```rust
/// use hearth_container::prelude::*;
///
/// let container = Container::new();
/// container.register_instance(String::from("postgres://localhost")).unwrap();
///
/// let url: std::sync::Arc<String> = container.resolve().unwrap();
/// assert_eq!(url.as_str(), "postgres://localhost");
/// assert!(container.try_resolve::<u32>().unwrap().is_none());
/// ```
pub trait ResolverApi: Resolver {
    /// Resolves the unnamed registration of `T`.
    ///
    /// # Errors
    /// [`HearthError::UnregisteredService`], [`HearthError::CircularDependency`],
    /// [`HearthError::ContainerDisposed`], or whatever the factory returned.
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        downcast(ServiceKey::of::<T>(), |key| self.resolve_key(key))
    }

    /// Resolves the registration of `T` named `name`.
    fn resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        downcast(ServiceKey::named::<T>(name), |key| self.resolve_key(key))
    }

    /// Resolves `T`, turning "nothing usable registered" into `None`.
    ///
    /// Unregistered services and cycles become `Ok(None)`; a disposed
    /// container and factory failures are still errors.
    fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        optional(self.resolve::<T>())
    }

    /// Named variant of [`try_resolve`](ResolverApi::try_resolve).
    fn try_resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Option<Arc<T>>> {
        optional(self.resolve_named::<T>(name))
    }

    /// Resolves `T`, falling back to `default` when nothing usable is registered.
    fn resolve_or<T: ?Sized + Send + Sync + 'static>(&self, default: Arc<T>) -> Result<Arc<T>> {
        Ok(self.try_resolve::<T>()?.unwrap_or(default))
    }

    /// Creates a fresh `T` regardless of the registration's reuse scope.
    fn create<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        downcast(ServiceKey::of::<T>(), |key| self.create_key(key))
    }

    /// Named variant of [`create`](ResolverApi::create).
    fn create_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        downcast(ServiceKey::named::<T>(name), |key| self.create_key(key))
    }
}

impl<R: Resolver + ?Sized> ResolverApi for R {}

fn downcast<T: ?Sized + Send + Sync + 'static>(
    key: ServiceKey,
    resolve: impl FnOnce(&ServiceKey) -> Result<Instance>,
) -> Result<Arc<T>> {
    let instance = resolve(&key)?;
    instance.downcast::<T>().ok_or_else(|| {
        HearthError::construction(
            &key,
            format!("type mismatch: factory did not produce {}", std::any::type_name::<T>()),
        )
    })
}

fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_miss() => Ok(None),
        Err(err) => Err(err),
    }
}

static NEXT_RESOLUTION: AtomicU64 = AtomicU64::new(1);

/// Cache slots under construction and the resolutions blocked on them,
/// across every thread.
static WAITS: Lazy<Mutex<WaitGraph>> = Lazy::new(|| Mutex::new(WaitGraph::default()));

/// Identity of a cache slot while it is being filled.
pub(crate) type SlotId = usize;

struct Waiter {
    slot: SlotId,
    path: Vec<ServiceKey>,
}

struct Doomed {
    slot: SlotId,
    chain: Vec<ServiceKey>,
}

#[derive(Default)]
struct WaitGraph {
    builders: HashMap<SlotId, u64>,
    waiters: HashMap<u64, Waiter>,
    doomed: HashMap<u64, Doomed>,
}

impl WaitGraph {
    /// Follows "waits on slot" and "slot built by" edges from `start`.
    ///
    /// Returns the key chain and the other resolutions involved if the
    /// walk comes back to `start`.
    fn cycle_from(&self, start: u64) -> Option<(Vec<ServiceKey>, Vec<u64>)> {
        let waiter = self.waiters.get(&start)?;
        let mut chain = waiter.path.clone();
        let mut others = Vec::new();
        let mut slot = waiter.slot;
        loop {
            let builder = *self.builders.get(&slot)?;
            if builder == start {
                return Some((chain, others));
            }
            if others.contains(&builder) {
                return None;
            }
            others.push(builder);
            let next = self.waiters.get(&builder)?;
            chain.push(next.path.last()?.clone());
            slot = next.slot;
        }
    }
}

fn cycle_error(chain: Vec<ServiceKey>) -> HearthError {
    HearthError::CircularDependency(CircularDependencyError { chain })
}

/// Keys under construction during one top-level resolve call.
#[derive(Debug)]
pub(crate) struct ResolutionContext {
    id: u64,
    path: RefCell<Vec<ServiceKey>>,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self {
            id: NEXT_RESOLUTION.fetch_add(1, Ordering::Relaxed),
            path: RefCell::default(),
        }
    }
}

impl ResolutionContext {
    /// The key whose factory is currently running, if any.
    pub fn current(&self) -> Option<ServiceKey> {
        self.path.borrow().last().cloned()
    }

    /// Marks `key` as under construction until the guard drops.
    ///
    /// # Errors
    /// [`HearthError::CircularDependency`] if `key` is already on the path.
    pub fn enter(&self, key: &ServiceKey) -> Result<PathGuard<'_>> {
        let mut path = self.path.borrow_mut();
        if let Some(start) = path.iter().position(|k| k == key) {
            let mut chain = path[start..].to_vec();
            chain.push(key.clone());
            warn!(cycle = ?chain, "Circular dependency detected");
            return Err(cycle_error(chain));
        }
        path.push(key.clone());
        Ok(PathGuard { ctx: self })
    }

    /// Announces that this resolution is about to block on `slot`.
    ///
    /// Call before waiting on a cache slot another thread may be filling.
    /// The wait is withdrawn when the guard drops.
    ///
    /// # Errors
    /// [`HearthError::CircularDependency`] if the resolution filling `slot`
    /// is itself, directly or through others, waiting on this one.
    pub fn wait_for(&self, slot: SlotId) -> Result<WaitGuard> {
        let mut graph = WAITS.lock();
        graph.waiters.insert(self.id, Waiter { slot, path: self.path.borrow().clone() });

        let Some((chain, others)) = graph.cycle_from(self.id) else {
            return Ok(WaitGuard { id: self.id });
        };
        // The others are blocked inside the cycle; fail them when they wake.
        for other in others {
            let found = graph.cycle_from(other);
            let slot = graph.waiters.get(&other).map(|w| w.slot);
            if let (Some((their_chain, _)), Some(slot)) = (found, slot) {
                graph.doomed.insert(other, Doomed { slot, chain: their_chain });
            }
        }
        graph.waiters.remove(&self.id);
        warn!(cycle = ?chain, "Circular dependency between concurrent resolutions");
        Err(cycle_error(chain))
    }

    /// Records this resolution as the one filling `slot` until the guard drops.
    ///
    /// # Errors
    /// [`HearthError::CircularDependency`] if another resolution found this
    /// one waiting on `slot` as part of a cycle.
    pub fn begin_build(&self, slot: SlotId) -> Result<BuildGuard> {
        let mut graph = WAITS.lock();
        if graph.doomed.get(&self.id).is_some_and(|d| d.slot == slot) {
            if let Some(doomed) = graph.doomed.remove(&self.id) {
                return Err(cycle_error(doomed.chain));
            }
        }
        graph.builders.insert(slot, self.id);
        Ok(BuildGuard { slot })
    }
}

pub(crate) struct PathGuard<'a> {
    ctx: &'a ResolutionContext,
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.ctx.path.borrow_mut().pop();
    }
}

pub(crate) struct WaitGuard {
    id: u64,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        let mut graph = WAITS.lock();
        graph.waiters.remove(&self.id);
        graph.doomed.remove(&self.id);
    }
}

pub(crate) struct BuildGuard {
    slot: SlotId,
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        WAITS.lock().builders.remove(&self.slot);
    }
}

/// Resolver handed to factories: resolves against one container while
/// sharing the cycle-detection path of the enclosing call.
pub(crate) struct ContextResolver<'a> {
    pub container: &'a Container,
    pub ctx: &'a ResolutionContext,
}

impl Resolver for ContextResolver<'_> {
    fn resolve_key(&self, key: &ServiceKey) -> Result<Instance> {
        self.container.resolve_in(key, self.ctx)
    }

    fn create_key(&self, key: &ServiceKey) -> Result<Instance> {
        self.container.create_in(key, self.ctx)
    }
}
