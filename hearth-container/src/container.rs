//! # The Container, heart of Hearth
//!
//! Registers factories under [`ServiceKey`]s, resolves instances with
//! [`ReuseScope`] semantics, composes parent/child hierarchies and tears
//! down what each container owns.
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──build()──> Container (root)
//!                                   │
//!                       create_child() / create_scope()
//!                                   │
//!                                   ▼
//!                          Container (child) ── dispose()
//! ```
//!
//! Lookup walks outward (self, then ancestors). Caching lands on the
//! container that owns the registration (`ContainerSingleton`) or on the
//! topmost owner (`HierarchicalSingleton`). Disposal only touches what the
//! disposed container itself owns: it runs release logic, then drops its
//! registrations and cached instances.
//!
//! # Examples
//! ```rust
//! use hearth_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Logger;
//! struct RequestHandler { logger: Arc<Logger> }
//!
//! let root = Container::new();
//! root.register(|_| Ok(Logger)).unwrap();
//! root.register_transient(|r| Ok(RequestHandler { logger: r.resolve()? })).unwrap();
//!
//! let request = root.create_scope().unwrap();
//! let a = request.resolve::<RequestHandler>().unwrap();
//! let b = request.resolve::<RequestHandler>().unwrap();
//! assert!(!Arc::ptr_eq(&a, &b));
//! assert!(Arc::ptr_eq(&a.logger, &b.logger));
//! assert!(Arc::ptr_eq(&a.logger, &root.resolve::<Logger>().unwrap()));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, instrument, trace, warn};

use crate::descriptor::{Injectable, ServiceDescriptor};
use crate::dispose::{DisposalChain, Tracked, release_untracked};
use crate::error::{HearthError, Result, UnregisteredServiceError};
use crate::graph::{DependencyInfo, GraphValidator};
use crate::key::{ServiceKey, similar_keys};
use crate::options::ContainerOptions;
use crate::provider::{Provider, ProviderRegistry};
use crate::registry::{Instance, RawRegistration, Registration, Registry};
use crate::resolver::{ContextResolver, ResolutionContext, Resolver};
use crate::scope::ReuseScope;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed)
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Thread-safe IoC container.
///
/// `Container` is a cheap handle: clones share the same registrations,
/// caches and disposal chain. A child holds its parent alive; the correct
/// teardown order is always child before parent.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    id: u64,
    label: String,
    allow_override: bool,
    depth: usize,
    registry: Registry,
    parent: RwLock<Option<Container>>,
    tracked: DisposalChain,
    disposed: AtomicBool,
    live_children: AtomicUsize,
}

impl Container {
    /// Creates an empty root container with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Creates an empty root container.
    pub fn with_options(options: ContainerOptions) -> Self {
        let id = next_id();
        let label = options.label.unwrap_or_else(|| format!("root#{id}"));
        debug!(container = id, %label, "Created root container");
        Self::from_parts(id, label, options.allow_override, None)
    }

    /// Creates a builder that validates declared dependencies on `build()`.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    fn from_parts(id: u64, label: String, allow_override: bool, parent: Option<Container>) -> Self {
        let depth = parent.as_ref().map_or(0, |p| p.depth() + 1);
        Self {
            inner: Arc::new(ContainerInner {
                id,
                label,
                allow_override,
                depth,
                registry: Registry::new(),
                parent: RwLock::new(parent),
                tracked: DisposalChain::default(),
                disposed: AtomicBool::new(false),
                live_children: AtomicUsize::new(0),
            }),
        }
    }

    // ── Identity and introspection ──

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Number of ancestors; `0` for a root.
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    /// The parent container, until this container is disposed.
    pub fn parent(&self) -> Option<Container> {
        self.inner.parent.read().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Returns `true` if both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of registrations held locally.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Returns `true` if `key` is registered on this container itself.
    pub fn contains_local(&self, key: &ServiceKey) -> bool {
        self.inner.registry.contains(key)
    }

    /// Returns `true` if `key` is visible from this container.
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.ancestry().iter().any(|c| c.contains_local(key))
    }

    /// Keys registered on this container itself.
    pub fn registered_keys(&self) -> Vec<ServiceKey> {
        self.inner.registry.keys()
    }

    /// Number of cached instances this container will release on disposal.
    pub fn tracked_count(&self) -> usize {
        self.inner.tracked.len()
    }

    /// Number of child containers created here and not yet disposed.
    pub fn child_count(&self) -> usize {
        self.inner.live_children.load(Ordering::Acquire)
    }

    /// This container followed by its ancestors, nearest first.
    fn ancestry(&self) -> Vec<Container> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent();
        while let Some(container) = current {
            current = container.parent();
            chain.push(container);
        }
        chain
    }

    // ── Registration ──

    /// Adds a typed registration.
    ///
    /// Registering an existing key replaces its factory and scope. An
    /// instance already cached for that key is **not** evicted: it keeps
    /// being returned for caching scopes until the container is disposed.
    ///
    /// # Errors
    /// [`HearthError::InvalidRegistration`] for a malformed registration or
    /// a duplicate when overrides are disabled;
    /// [`HearthError::ContainerDisposed`] after [`dispose`](Container::dispose).
    pub fn add<T: ?Sized + Send + Sync + 'static>(&self, descriptor: ServiceDescriptor<T>) -> Result<()> {
        self.add_raw(descriptor.into_raw())
    }

    /// Adds a type-erased registration.
    pub fn add_raw(&self, registration: RawRegistration) -> Result<()> {
        self.ensure_live()?;
        let preset = registration.preset.clone();
        let inserted = self.inner.registry.insert(registration, self.inner.allow_override)?;

        if inserted.replaced && inserted.entry.cache.get().is_some() {
            debug!(
                container = self.inner.id,
                key = %inserted.entry.key,
                "Replacement keeps the instance created before it"
            );
        }

        if let Some(instance) = preset {
            self.adopt(&inserted.entry, instance)?;
        }
        Ok(())
    }

    /// Places a pre-built instance in `entry`'s cache and takes over its release.
    fn adopt(&self, entry: &Registration, instance: Instance) -> Result<()> {
        if entry.cache.set(instance.clone()).is_err() {
            warn!(
                container = self.inner.id,
                key = %entry.key,
                "Registered instance is shadowed by an instance created earlier"
            );
        }
        self.track(Tracked {
            key: entry.key.clone(),
            instance,
            disposer: entry.disposer.clone(),
        })
    }

    /// Registers `T` as a [`ReuseScope::ContainerSingleton`].
    pub fn register<T: Send + Sync + 'static>(
        &self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Result<()> {
        self.add(ServiceDescriptor::new(factory))
    }

    /// Registers `T` as [`ReuseScope::Transient`].
    pub fn register_transient<T: Send + Sync + 'static>(
        &self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Result<()> {
        self.add(ServiceDescriptor::new(factory).reused_within(ReuseScope::Transient))
    }

    /// Registers `T` as a [`ReuseScope::HierarchicalSingleton`].
    pub fn register_hierarchical<T: Send + Sync + 'static>(
        &self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Result<()> {
        self.add(ServiceDescriptor::new(factory).reused_within(ReuseScope::HierarchicalSingleton))
    }

    /// Registers a named `T` with an explicit scope.
    pub fn register_named<T: Send + Sync + 'static>(
        &self,
        name: &str,
        scope: ReuseScope,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Result<()> {
        self.add(ServiceDescriptor::new(factory).named(name).reused_within(scope))
    }

    /// Registers a pre-built value as a `ContainerSingleton`.
    ///
    /// The container owns the value from now on. To have its release
    /// logic run on disposal, add
    /// `ServiceDescriptor::instance(value).disposable()` instead.
    pub fn register_instance<T: Send + Sync + 'static>(&self, value: T) -> Result<()> {
        self.add(ServiceDescriptor::instance(value))
    }

    /// Named variant of [`register_instance`](Container::register_instance).
    pub fn register_instance_named<T: Send + Sync + 'static>(&self, name: &str, value: T) -> Result<()> {
        self.add(ServiceDescriptor::instance(value).named(name))
    }

    /// Registers a constructor-injected `T`.
    ///
    /// Dependencies are read from [`Injectable::dependencies`] once, here.
    pub fn autowire<T: Injectable>(&self, scope: ReuseScope) -> Result<()> {
        self.add(ServiceDescriptor::<T>::injectable().reused_within(scope))
    }

    /// Named variant of [`autowire`](Container::autowire).
    pub fn autowire_named<T: Injectable>(&self, name: &str, scope: ReuseScope) -> Result<()> {
        self.add(ServiceDescriptor::<T>::injectable().named(name).reused_within(scope))
    }

    /// Installs a [`Provider`] module.
    pub fn add_provider(&self, provider: &dyn Provider) -> Result<()> {
        debug!(container = self.inner.id, provider = provider.name(), "Installing provider");
        let mut sink = self.clone();
        provider.register(&mut sink)
    }

    // ── Child scopes ──

    /// Creates a child container.
    ///
    /// The child starts empty, sees every ancestor registration, and keeps
    /// its own caches and disposal chain. It must be disposed before this
    /// container.
    pub fn create_child(&self) -> Result<Container> {
        self.ensure_live()?;
        let id = next_id();
        let label = format!("{}/child#{id}", self.inner.label);
        self.inner.live_children.fetch_add(1, Ordering::AcqRel);
        debug!(parent = self.inner.id, container = id, depth = self.depth() + 1, "Created child container");
        Ok(Self::from_parts(id, label, self.inner.allow_override, Some(self.clone())))
    }

    /// Creates a child bound to a unit of work, disposed when the guard drops.
    pub fn create_scope(&self) -> Result<ScopedContainer> {
        Ok(ScopedContainer {
            container: self.create_child()?,
        })
    }

    // ── Validation ──

    /// Validates the declared dependencies of every visible registration.
    ///
    /// Nearer registrations shadow ancestor ones with the same key.
    ///
    /// # Errors
    /// [`HearthError::CircularDependency`], [`HearthError::UnregisteredService`]
    /// or [`HearthError::ScopeMismatch`].
    pub fn validate(&self) -> Result<()> {
        self.ensure_live()?;
        let mut nodes = HashMap::new();
        for container in self.ancestry().iter().rev() {
            for entry in container.inner.registry.entries() {
                nodes.insert(
                    entry.key.clone(),
                    DependencyInfo {
                        key: entry.key.clone(),
                        dependencies: entry.dependencies.clone(),
                        scope: entry.scope,
                    },
                );
            }
        }
        GraphValidator::new(nodes).validate()
    }

    // ── Disposal ──

    /// Releases every tracked instance, newest first, then detaches from
    /// the parent.
    ///
    /// Release logic runs for disposable registrations, and every cached
    /// instance is dropped in the same order; handles callers still hold
    /// stay valid. Registrations are removed, so [`len`](Container::len)
    /// is `0` afterwards. Child containers are not disposed. Transient
    /// instances were never tracked and are unaffected. A second call is a
    /// no-op.
    ///
    /// # Errors
    /// [`HearthError::DisposalFailure`] listing every release that failed;
    /// the sweep always runs to completion first.
    #[instrument(skip(self), fields(container = self.inner.id))]
    pub fn dispose(&self) -> Result<()> {
        self.inner.teardown()
    }

    fn track(&self, tracked: Tracked) -> Result<()> {
        self.inner.tracked.track(tracked).map_err(|rejected| {
            release_untracked(rejected);
            self.disposed_error()
        })
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(self.disposed_error())
        } else {
            Ok(())
        }
    }

    fn disposed_error(&self) -> HearthError {
        HearthError::ContainerDisposed {
            container: self.inner.label.clone(),
        }
    }

    // ── Resolution engine ──

    pub(crate) fn resolve_in(&self, key: &ServiceKey, ctx: &ResolutionContext) -> Result<Instance> {
        self.ensure_live()?;
        let required_by = ctx.current();
        let _guard = ctx.enter(key)?;
        let (owner, entry) = self.lookup(key, required_by)?;
        trace!(container = self.inner.id, key = %key, scope = %entry.scope, "Resolving");

        match entry.scope {
            ReuseScope::Transient => self.invoke(&entry, ctx),
            ReuseScope::ContainerSingleton => owner.cached_or_create(&entry, ctx),
            ReuseScope::HierarchicalSingleton => self.resolve_hierarchical(key, ctx),
        }
    }

    pub(crate) fn create_in(&self, key: &ServiceKey, ctx: &ResolutionContext) -> Result<Instance> {
        self.ensure_live()?;
        let required_by = ctx.current();
        let _guard = ctx.enter(key)?;
        let (_, entry) = self.lookup(key, required_by)?;
        trace!(container = self.inner.id, key = %key, "Creating fresh instance");
        self.invoke(&entry, ctx)
    }

    /// Finds the nearest container holding `key`.
    fn lookup(&self, key: &ServiceKey, required_by: Option<ServiceKey>) -> Result<(Container, Arc<Registration>)> {
        let mut current = self.clone();
        loop {
            current.ensure_live()?;
            if let Some(entry) = current.inner.registry.get(key) {
                return Ok((current, entry));
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        let visible: Vec<ServiceKey> = self.ancestry().iter().flat_map(Container::registered_keys).collect();
        Err(HearthError::UnregisteredService(UnregisteredServiceError {
            requested: key.clone(),
            required_by,
            suggestions: similar_keys(key, &visible),
        }))
    }

    /// Runs a factory with a resolver bound to this container.
    fn invoke(&self, entry: &Registration, ctx: &ResolutionContext) -> Result<Instance> {
        let resolver = ContextResolver { container: self, ctx };
        (entry.factory)(&resolver)
    }

    /// Returns `entry`'s cached instance, creating it exactly once.
    ///
    /// Concurrent callers for the same entry wait for the single creation.
    /// A caller that would wait on a creation which is itself waiting on
    /// that caller gets [`HearthError::CircularDependency`] instead.
    /// The factory resolves its dependencies against this container.
    fn cached_or_create(&self, entry: &Registration, ctx: &ResolutionContext) -> Result<Instance> {
        if let Some(hit) = entry.cache.get() {
            trace!(container = self.inner.id, key = %entry.key, "Cache hit");
            return Ok(hit.clone());
        }

        let slot = entry.slot_id();
        let waiting = ctx.wait_for(slot)?;
        let instance = entry.cache.get_or_try_init(move || -> Result<Instance> {
            let _building = ctx.begin_build(slot)?;
            drop(waiting);
            let instance = self.invoke(entry, ctx)?;
            self.track(Tracked {
                key: entry.key.clone(),
                instance: instance.clone(),
                disposer: entry.disposer.clone(),
            })?;
            debug!(container = self.inner.id, key = %entry.key, scope = %entry.scope, "Created cached instance");
            Ok(instance)
        })?;
        Ok(instance.clone())
    }

    /// Nearest cached hierarchical instance, or a new one on the topmost owner.
    fn resolve_hierarchical(&self, key: &ServiceKey, ctx: &ResolutionContext) -> Result<Instance> {
        let mut topmost: Option<(Container, Arc<Registration>)> = None;

        for container in self.ancestry() {
            container.ensure_live()?;
            let Some(entry) = container.inner.registry.get(key) else {
                continue;
            };
            if entry.scope != ReuseScope::HierarchicalSingleton {
                continue;
            }
            if let Some(hit) = entry.cache.get() {
                trace!(container = container.inner.id, key = %key, "Hierarchical cache hit");
                return Ok(hit.clone());
            }
            topmost = Some((container, entry));
        }

        match topmost {
            Some((owner, entry)) => owner.cached_or_create(&entry, ctx),
            None => self.lookup(key, ctx.current()).and_then(|(_, entry)| self.invoke(&entry, ctx)),
        }
    }
}

impl ContainerInner {
    fn teardown(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            trace!(container = self.id, "Already disposed");
            return Ok(());
        }

        let live = self.live_children.load(Ordering::Acquire);
        if live > 0 {
            warn!(
                container = self.id,
                live_children = live,
                "Disposing a container whose child scopes are still live; dispose children first"
            );
        }

        let entries = self.tracked.close();
        debug!(container = self.id, label = %self.label, tracked = entries.len(), "Disposing container");
        // Cache slots go first so the sweep holds the last container-side handles.
        let registrations = self.registry.drain();
        trace!(container = self.id, dropped = registrations.len(), "Dropped registrations");
        drop(registrations);
        let outcome = DisposalChain::sweep(&self.label, entries);

        let parent = self.parent.write().take();
        if let Some(parent) = parent {
            parent.inner.live_children.fetch_sub(1, Ordering::AcqRel);
        }
        outcome
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        if *self.disposed.get_mut() {
            return;
        }
        let owned = self.tracked.disposable_len();
        if owned > 0 {
            warn!(container = self.id, disposable = owned, "Container dropped without dispose(); releasing now");
        }
        if let Err(err) = self.teardown() {
            warn!(container = self.id, error = %err, "Implicit disposal failed");
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for Container {
    fn resolve_key(&self, key: &ServiceKey) -> Result<Instance> {
        let ctx = ResolutionContext::default();
        self.resolve_in(key, &ctx)
    }

    fn create_key(&self, key: &ServiceKey) -> Result<Instance> {
        let ctx = ResolutionContext::default();
        self.create_in(key, &ctx)
    }
}

impl ProviderRegistry for Container {
    fn register_raw(&mut self, registration: RawRegistration) -> Result<()> {
        self.add_raw(registration)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("depth", &self.inner.depth)
            .field("registered", &self.inner.registry.len())
            .field("tracked", &self.inner.tracked.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ═══════════════════════════════════════════
// ScopedContainer
// ═══════════════════════════════════════════

/// A child container bound to one unit of work.
///
/// Derefs to the child [`Container`]. Dropping the guard disposes the
/// child on every exit path; call [`finish`](ScopedContainer::finish) to
/// observe disposal faults instead of having them logged.
pub struct ScopedContainer {
    container: Container,
}

impl ScopedContainer {
    /// The child container.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Disposes the child now and reports the outcome.
    pub fn finish(self) -> Result<()> {
        self.container.dispose()
    }
}

impl Deref for ScopedContainer {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

impl Drop for ScopedContainer {
    fn drop(&mut self) {
        if let Err(err) = self.container.dispose() {
            warn!(container = self.container.id(), error = %err, "Scope disposal failed");
        }
    }
}

impl fmt::Debug for ScopedContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopedContainer").field(&self.container).finish()
    }
}

// ═══════════════════════════════════════════
// ContainerBuilder
// ═══════════════════════════════════════════

/// Collects registrations for a root container and validates them on
/// [`build()`](ContainerBuilder::build).
///
/// # Examples
/// ```rust
/// use hearth_container::prelude::*;
///
/// struct Config { url: String }
/// struct Pool { url: String }
///
/// let container = Container::builder()
///     .label("app")
///     .instance(Config { url: "postgres://localhost".into() })
///     .add(ServiceDescriptor::new(|r| {
///         let config = r.resolve::<Config>()?;
///         Ok(Pool { url: config.url.clone() })
///     })
///     .depends_on(ServiceKey::of::<Config>()))
///     .build()
///     .expect("valid container");
///
/// assert_eq!(container.label(), "app");
/// assert_eq!(container.resolve::<Pool>().unwrap().url, "postgres://localhost");
/// ```
pub struct ContainerBuilder {
    options: ContainerOptions,
    pending: Vec<RawRegistration>,
    error: Option<HearthError>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            options: ContainerOptions::default(),
            pending: Vec::new(),
            error: None,
        }
    }

    pub fn options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.options.label = Some(label.into());
        self
    }

    /// Allow later registrations to replace earlier ones with the same key.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.options.allow_override = allow;
        self
    }

    // ── Typed registrations ──

    pub fn singleton<T: Send + Sync + 'static>(
        self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.add(ServiceDescriptor::new(factory))
    }

    pub fn hierarchical<T: Send + Sync + 'static>(
        self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.add(ServiceDescriptor::new(factory).reused_within(ReuseScope::HierarchicalSingleton))
    }

    pub fn transient<T: Send + Sync + 'static>(
        self,
        factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.add(ServiceDescriptor::new(factory).reused_within(ReuseScope::Transient))
    }

    pub fn instance<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.add(ServiceDescriptor::instance(value))
    }

    pub fn autowire<T: Injectable>(self, scope: ReuseScope) -> Self {
        self.add(ServiceDescriptor::<T>::injectable().reused_within(scope))
    }

    pub fn add<T: ?Sized + Send + Sync + 'static>(mut self, descriptor: ServiceDescriptor<T>) -> Self {
        self.pending.push(descriptor.into_raw());
        self
    }

    /// Add a [`Provider`] module. Its first error surfaces from `build()`.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        if self.error.is_none() {
            if let Err(err) = provider.register(&mut self) {
                self.error = Some(err);
            }
        }
        self
    }

    // ── Build ──

    /// Builds the root container and validates the declared graph.
    ///
    /// # Errors
    /// The first registration or provider error, then any graph error
    /// from [`Container::validate`].
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        if let Some(err) = self.error {
            return Err(err);
        }

        info!(registrations = self.pending.len(), "Building container");
        let container = Container::with_options(self.options);
        for registration in self.pending {
            container.add_raw(registration)?;
        }
        container.validate()?;

        info!(container = container.id(), "Container built");
        Ok(container)
    }
}

impl ProviderRegistry for ContainerBuilder {
    fn register_raw(&mut self, registration: RawRegistration) -> Result<()> {
        self.pending.push(registration);
        Ok(())
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("options", &self.options)
            .field("pending", &self.pending.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, ScopedContainer};
    pub use crate::descriptor::{Injectable, ServiceDescriptor};
    pub use crate::dispose::Dispose;
    pub use crate::error::{BoxError, HearthError, Result};
    pub use crate::key::ServiceKey;
    pub use crate::options::ContainerOptions;
    pub use crate::provider::{Provider, ProviderRegistry};
    pub use crate::resolver::{Resolver, ResolverApi};
    pub use crate::scope::ReuseScope;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispose::Dispose;
    use crate::error::{BoxError, InvalidReason};
    use crate::resolver::ResolverApi;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;
    use std::sync::{Barrier, mpsc};
    use std::thread;
    use std::time::Duration;

    struct Logger;

    struct RequestHandler {
        logger: Arc<Logger>,
    }

    struct RequestId(u32);

    type ReleaseLog = Arc<Mutex<Vec<String>>>;

    struct Resource {
        name: String,
        log: ReleaseLog,
        fail: bool,
    }

    impl Dispose for Resource {
        fn dispose(&self) -> std::result::Result<(), BoxError> {
            self.log.lock().push(self.name.clone());
            if self.fail {
                Err(format!("{} failed to close", self.name).into())
            } else {
                Ok(())
            }
        }
    }

    fn resource(container: &Container, name: &str, log: &ReleaseLog, fail: bool) {
        let log = log.clone();
        let owned = name.to_string();
        container
            .add(
                ServiceDescriptor::new(move |_| {
                    Ok(Resource { name: owned.clone(), log: log.clone(), fail })
                })
                .named(name)
                .disposable(),
            )
            .unwrap();
    }

    fn counting<T, F>(counter: Arc<AtomicU32>, make: F) -> impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static
    where
        T: Send + Sync + 'static,
        F: Fn(u32) -> T + Send + Sync + 'static,
    {
        move |_| Ok(make(counter.fetch_add(1, Ordering::SeqCst)))
    }

    // ── Reuse scopes ──

    #[test]
    fn container_singleton_created_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let container = Container::new();
        container.register(counting(calls.clone(), |_| Logger)).unwrap();

        let a = container.resolve::<Logger>().unwrap();
        let b = container.resolve::<Logger>().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_resolution_creates_one_instance() {
        const THREADS: usize = 16;
        let calls = Arc::new(AtomicU32::new(0));
        let container = Container::new();
        container
            .register({
                let calls = calls.clone();
                move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    Ok(Logger)
                }
            })
            .unwrap();

        let barrier = Barrier::new(THREADS);
        let resolved: Vec<Arc<Logger>> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        container.resolve::<Logger>().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(resolved.iter().all(|l| Arc::ptr_eq(l, &resolved[0])));
    }

    #[test]
    fn concurrent_hierarchical_resolution_from_siblings_creates_one_instance() {
        const THREADS: usize = 8;
        let calls = Arc::new(AtomicU32::new(0));
        let root = Container::new();
        root.register_hierarchical({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                Ok(Logger)
            }
        })
        .unwrap();

        let children: Vec<Container> = (0..THREADS).map(|_| root.create_child().unwrap()).collect();
        let barrier = Barrier::new(THREADS);
        let resolved: Vec<Arc<Logger>> = thread::scope(|s| {
            let handles: Vec<_> = children
                .iter()
                .map(|child| {
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        child.resolve::<Logger>().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(resolved.iter().all(|l| Arc::ptr_eq(l, &resolved[0])));
        assert!(Arc::ptr_eq(&resolved[0], &root.resolve::<Logger>().unwrap()));
        assert_eq!(root.tracked_count(), 1);
        assert!(children.iter().all(|c| c.tracked_count() == 0));
    }

    #[test]
    fn transient_instances_are_distinct_and_untracked() {
        let calls = Arc::new(AtomicU32::new(0));
        let container = Container::new();
        container.register_transient(counting(calls.clone(), RequestId)).unwrap();

        let ids: Vec<u32> = (0..5).map(|_| container.resolve::<RequestId>().unwrap().0).collect();

        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(container.tracked_count(), 0);
    }

    #[test]
    fn transient_cannot_carry_release_logic() {
        let container = Container::new();
        let log = ReleaseLog::default();
        let err = container
            .add(
                ServiceDescriptor::new(move |_| Ok(Resource { name: "t".into(), log: log.clone(), fail: false }))
                    .reused_within(ReuseScope::Transient)
                    .disposable(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            HearthError::InvalidRegistration(ref e) if e.reason == InvalidReason::DisposerOnTransient
        ));
    }

    #[test]
    fn child_shares_parent_container_singleton() {
        let root = Container::new();
        root.register(|_| Ok(Logger)).unwrap();
        root.register_transient(|r| Ok(RequestHandler { logger: r.resolve()? })).unwrap();

        let child = root.create_child().unwrap();
        let first = child.resolve::<RequestHandler>().unwrap();
        let second = child.resolve::<RequestHandler>().unwrap();
        let direct = root.resolve::<Logger>().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.logger, &second.logger));
        assert!(Arc::ptr_eq(&first.logger, &direct));
        child.dispose().unwrap();
    }

    #[test]
    fn child_registration_shadows_parent() {
        let root = Container::new();
        root.register(|_| Ok(Logger)).unwrap();
        let child = root.create_child().unwrap();
        child.register(|_| Ok(Logger)).unwrap();

        let from_root = root.resolve::<Logger>().unwrap();
        let from_child = child.resolve::<Logger>().unwrap();

        assert!(!Arc::ptr_eq(&from_root, &from_child));
        assert!(Arc::ptr_eq(&from_child, &child.resolve::<Logger>().unwrap()));
    }

    #[test]
    fn hierarchical_shared_across_descendants() {
        let calls = Arc::new(AtomicU32::new(0));
        let root = Container::new();
        root.register_hierarchical(counting(calls.clone(), |_| Logger)).unwrap();

        let before = root.resolve::<Logger>().unwrap();
        let child = root.create_child().unwrap();
        let grandchild = child.create_child().unwrap();

        assert!(Arc::ptr_eq(&before, &child.resolve::<Logger>().unwrap()));
        assert!(Arc::ptr_eq(&before, &grandchild.resolve::<Logger>().unwrap()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hierarchical_first_resolved_from_descendant_lives_on_owner() {
        let log = ReleaseLog::default();
        let root = Container::new();
        {
            let log = log.clone();
            root.add(
                ServiceDescriptor::new(move |_| Ok(Resource { name: "pool".into(), log: log.clone(), fail: false }))
                    .reused_within(ReuseScope::HierarchicalSingleton)
                    .disposable(),
            )
            .unwrap();
        }

        let child = root.create_child().unwrap();
        let grandchild = child.create_child().unwrap();
        let deep = grandchild.resolve::<Resource>().unwrap();

        assert_eq!(root.tracked_count(), 1);
        assert_eq!(grandchild.tracked_count(), 0);
        assert!(Arc::ptr_eq(&deep, &root.resolve::<Resource>().unwrap()));

        grandchild.dispose().unwrap();
        child.dispose().unwrap();
        assert!(log.lock().is_empty());
        root.dispose().unwrap();
        assert_eq!(*log.lock(), vec!["pool".to_string()]);
    }

    #[test]
    fn hierarchical_caches_on_topmost_owner() {
        let root = Container::new();
        root.register_hierarchical(|_| Ok(RequestId(1))).unwrap();
        let child = root.create_child().unwrap();
        child.register_hierarchical(|_| Ok(RequestId(2))).unwrap();

        let from_child = child.resolve::<RequestId>().unwrap();
        assert_eq!(from_child.0, 1);
        assert!(Arc::ptr_eq(&from_child, &root.resolve::<RequestId>().unwrap()));
    }

    #[test]
    fn transient_resolves_request_state_from_child() {
        struct Handler {
            request: Arc<RequestId>,
            logger: Arc<Logger>,
        }

        let root = Container::new();
        root.register(|_| Ok(Logger)).unwrap();
        root.register_transient(|r| {
            Ok(Handler {
                request: r.resolve()?,
                logger: r.resolve()?,
            })
        })
        .unwrap();

        for id in [7, 8] {
            let scope = root.create_scope().unwrap();
            scope.register_instance(RequestId(id)).unwrap();
            let handler = scope.resolve::<Handler>().unwrap();
            assert_eq!(handler.request.0, id);
            assert!(Arc::ptr_eq(&handler.logger, &root.resolve::<Logger>().unwrap()));
        }
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn cached_factory_resolves_against_owner() {
        struct Session {
            _request: Arc<RequestId>,
        }

        let root = Container::new();
        root.register(|r| Ok(Session { _request: r.resolve()? })).unwrap();
        let child = root.create_child().unwrap();
        child.register_instance(RequestId(1)).unwrap();

        match child.resolve::<Session>() {
            Err(HearthError::UnregisteredService(err)) => {
                assert_eq!(err.requested, ServiceKey::of::<RequestId>());
                assert_eq!(err.required_by, Some(ServiceKey::of::<Session>()));
            }
            other => panic!("Expected UnregisteredService, got: {:?}", other.map(|_| ())),
        }
    }

    // ── Named resolution and create ──

    #[test]
    fn named_registrations_are_independent() {
        let container = Container::new();
        container.register_instance_named("primary", String::from("db-1")).unwrap();
        container.register_instance_named("replica", String::from("db-2")).unwrap();

        assert_eq!(container.resolve_named::<String>("primary").unwrap().as_str(), "db-1");
        assert_eq!(container.resolve_named::<String>("replica").unwrap().as_str(), "db-2");
        assert!(container.try_resolve::<String>().unwrap().is_none());
    }

    #[test]
    fn create_forces_a_fresh_untracked_instance() {
        let calls = Arc::new(AtomicU32::new(0));
        let log = ReleaseLog::default();
        let container = Container::new();
        {
            let calls = calls.clone();
            let log = log.clone();
            container
                .add(
                    ServiceDescriptor::new(move |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(Resource { name: "conn".into(), log: log.clone(), fail: false })
                    })
                    .disposable(),
                )
                .unwrap();
        }

        let cached = container.resolve::<Resource>().unwrap();
        let fresh = container.create::<Resource>().unwrap();

        assert!(!Arc::ptr_eq(&cached, &fresh));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(container.tracked_count(), 1);
        assert!(Arc::ptr_eq(&cached, &container.resolve::<Resource>().unwrap()));
    }

    // ── Failures ──

    #[test]
    fn unregistered_service_and_try_resolve() {
        trait Foo: Send + Sync {}

        let container = Container::new();
        assert!(matches!(
            container.resolve::<dyn Foo>(),
            Err(HearthError::UnregisteredService(_))
        ));
        assert!(container.try_resolve::<dyn Foo>().unwrap().is_none());
    }

    #[test]
    fn unregistered_suggests_named_variants() {
        let container = Container::new();
        container.register_instance_named("audit", Logger).unwrap();

        match container.resolve::<Logger>() {
            Err(HearthError::UnregisteredService(err)) => {
                assert_eq!(err.suggestions, vec![ServiceKey::named::<Logger>("audit")]);
            }
            other => panic!("Expected UnregisteredService, got: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn circular_dependency_detected() {
        struct A {
            _b: Arc<B>,
        }
        struct B {
            _a: Arc<A>,
        }

        let container = Container::new();
        container.register_transient(|r| Ok(A { _b: r.resolve()? })).unwrap();
        container.register_transient(|r| Ok(B { _a: r.resolve()? })).unwrap();

        match container.resolve::<A>() {
            Err(HearthError::CircularDependency(err)) => {
                assert_eq!(
                    err.chain,
                    vec![ServiceKey::of::<A>(), ServiceKey::of::<B>(), ServiceKey::of::<A>()]
                );
            }
            other => panic!("Expected CircularDependency, got: {:?}", other.map(|_| ())),
        }
        assert!(container.try_resolve::<B>().unwrap().is_none());
    }

    #[test]
    fn cycle_through_singletons_leaves_cache_empty() {
        struct A;
        struct B;

        let container = Container::new();
        container
            .register(|r| {
                r.resolve::<B>()?;
                Ok(A)
            })
            .unwrap();
        container
            .register(|r| {
                r.resolve::<A>()?;
                Ok(B)
            })
            .unwrap();

        assert!(matches!(container.resolve::<A>(), Err(HearthError::CircularDependency(_))));
        container.register(|_| Ok(B)).unwrap();
        assert!(container.resolve::<A>().is_ok());
    }

    #[test]
    fn concurrent_cycle_fails_instead_of_blocking() {
        struct A;
        struct B;

        let barrier = Arc::new(Barrier::new(2));
        let calls = Arc::new(AtomicU32::new(0));
        let container = Container::new();
        {
            let (barrier, calls) = (barrier.clone(), calls.clone());
            container
                .register(move |r| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    barrier.wait();
                    r.resolve::<B>()?;
                    Ok(A)
                })
                .unwrap();
        }
        {
            let (barrier, calls) = (barrier.clone(), calls.clone());
            container
                .register(move |r| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    barrier.wait();
                    r.resolve::<A>()?;
                    Ok(B)
                })
                .unwrap();
        }

        let (tx, rx) = mpsc::channel();
        for start_with_a in [true, false] {
            let container = container.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let outcome = if start_with_a {
                    container.resolve::<A>().map(|_| ())
                } else {
                    container.resolve::<B>().map(|_| ())
                };
                let _ = tx.send(outcome);
            });
        }

        for _ in 0..2 {
            match rx.recv_timeout(Duration::from_secs(5)) {
                Ok(Err(HearthError::CircularDependency(err))) => {
                    assert_eq!(err.chain.len(), 3);
                    assert_eq!(err.chain.first(), err.chain.last());
                }
                Ok(other) => panic!("Expected CircularDependency, got: {other:?}"),
                Err(_) => panic!("resolver thread still blocked after 5s"),
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(container.tracked_count(), 0);
    }

    #[test]
    fn factory_error_propagates() {
        let container = Container::new();
        container
            .register::<Logger>(|_| Err(HearthError::construction(&ServiceKey::of::<Logger>(), "no sink")))
            .unwrap();

        assert!(matches!(
            container.resolve::<Logger>(),
            Err(HearthError::ConstructionFailed { .. })
        ));
        assert!(container.try_resolve::<Logger>().is_err());
    }

    #[test]
    fn resolve_or_falls_back() {
        let container = Container::new();
        let fallback = Arc::new(RequestId(0));
        let resolved = container.resolve_or(fallback.clone()).unwrap();
        assert!(Arc::ptr_eq(&resolved, &fallback));
    }

    #[test]
    fn overrides_can_be_disabled() {
        let container = Container::with_options(ContainerOptions::default().allow_override(false));
        container.register(|_| Ok(Logger)).unwrap();
        let err = container.register(|_| Ok(Logger)).unwrap_err();
        assert!(matches!(
            err,
            HearthError::InvalidRegistration(ref e) if e.reason == InvalidReason::AlreadyRegistered
        ));

        let child = container.create_child().unwrap();
        assert!(child.register(|_| Ok(Logger)).is_ok());
        assert!(child.register(|_| Ok(Logger)).is_err());
    }

    // ── Re-registration ──

    #[test]
    fn reregistration_after_resolution_keeps_cached_instance() {
        let container = Container::new();
        container.register(|_| Ok(RequestId(1))).unwrap();
        let before = container.resolve::<RequestId>().unwrap();

        container.register(|_| Ok(RequestId(2))).unwrap();
        let after = container.resolve::<RequestId>().unwrap();

        assert_eq!(after.0, 1);
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(container.create::<RequestId>().unwrap().0, 2);
    }

    #[test]
    fn reregistration_before_resolution_uses_new_factory() {
        let container = Container::new();
        container.register(|_| Ok(RequestId(1))).unwrap();
        container.register(|_| Ok(RequestId(2))).unwrap();
        assert_eq!(container.resolve::<RequestId>().unwrap().0, 2);
        assert_eq!(container.len(), 1);
    }

    // ── Disposal ──

    #[test]
    fn dispose_releases_in_reverse_creation_order() {
        let log = ReleaseLog::default();
        let container = Container::new();
        for name in ["a", "b", "c"] {
            resource(&container, name, &log, false);
        }

        for name in ["b", "c", "a"] {
            container.resolve_named::<Resource>(name).unwrap();
        }
        assert_eq!(container.tracked_count(), 3);

        container.dispose().unwrap();
        assert_eq!(*log.lock(), vec!["a", "c", "b"]);

        container.dispose().unwrap();
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn dependencies_are_released_after_dependents() {
        struct Repo {
            _pool: Arc<Resource>,
            log: ReleaseLog,
        }
        impl Dispose for Repo {
            fn dispose(&self) -> std::result::Result<(), BoxError> {
                self.log.lock().push("repo".into());
                Ok(())
            }
        }

        let log = ReleaseLog::default();
        let container = Container::new();
        resource(&container, "pool", &log, false);
        {
            let log = log.clone();
            container
                .add(
                    ServiceDescriptor::new(move |r| {
                        Ok(Repo { _pool: r.resolve_named("pool")?, log: log.clone() })
                    })
                    .disposable(),
                )
                .unwrap();
        }

        container.resolve::<Repo>().unwrap();
        container.dispose().unwrap();
        assert_eq!(*log.lock(), vec!["repo", "pool"]);
    }

    #[test]
    fn operations_after_dispose_fail() {
        let container = Container::new();
        container.register(|_| Ok(Logger)).unwrap();
        container.dispose().unwrap();

        assert!(container.is_disposed());
        assert!(matches!(container.resolve::<Logger>(), Err(HearthError::ContainerDisposed { .. })));
        assert!(matches!(container.try_resolve::<Logger>(), Err(HearthError::ContainerDisposed { .. })));
        assert!(matches!(container.register(|_| Ok(Logger)), Err(HearthError::ContainerDisposed { .. })));
        assert!(container.create_child().is_err());
    }

    #[test]
    fn dispose_sweeps_past_faults() {
        let log = ReleaseLog::default();
        let container = Container::new();
        resource(&container, "first", &log, true);
        resource(&container, "second", &log, false);
        resource(&container, "third", &log, true);
        for name in ["first", "second", "third"] {
            container.resolve_named::<Resource>(name).unwrap();
        }

        match container.dispose() {
            Err(HearthError::DisposalFailure(failure)) => {
                assert_eq!(failure.faults.len(), 2);
                assert_eq!(failure.faults[0].key, ServiceKey::named::<Resource>("third"));
                assert_eq!(failure.faults[1].key, ServiceKey::named::<Resource>("first"));
            }
            other => panic!("Expected DisposalFailure, got: {other:?}"),
        }
        assert_eq!(*log.lock(), vec!["third", "second", "first"]);
        assert!(container.dispose().is_ok());
    }

    #[test]
    fn child_disposal_is_independent_of_parent() {
        let log = ReleaseLog::default();
        let root = Container::new();
        resource(&root, "shared", &log, false);
        let child = root.create_child().unwrap();
        resource(&child, "scoped", &log, false);

        child.resolve_named::<Resource>("shared").unwrap();
        child.resolve_named::<Resource>("scoped").unwrap();
        assert_eq!(root.tracked_count(), 1);
        assert_eq!(child.tracked_count(), 1);
        assert_eq!(root.child_count(), 1);

        child.dispose().unwrap();
        assert_eq!(*log.lock(), vec!["scoped"]);
        assert!(child.parent().is_none());
        assert_eq!(root.child_count(), 0);
        assert!(root.resolve_named::<Resource>("shared").is_ok());
    }

    #[test]
    fn dispose_drops_cached_instances_while_handle_is_held() {
        struct Conn {
            name: &'static str,
            log: ReleaseLog,
        }
        impl Drop for Conn {
            fn drop(&mut self) {
                self.log.lock().push(self.name.to_string());
            }
        }

        let log = ReleaseLog::default();
        let root = Container::new();
        let child = root.create_child().unwrap();
        for name in ["first", "second"] {
            let log = log.clone();
            child
                .register_named(name, ReuseScope::ContainerSingleton, move |_| Ok(Conn { name, log: log.clone() }))
                .unwrap();
        }
        for name in ["first", "second"] {
            drop(child.resolve_named::<Conn>(name).unwrap());
        }
        assert!(log.lock().is_empty());
        assert_eq!(child.tracked_count(), 2);

        child.dispose().unwrap();
        assert_eq!(*log.lock(), vec!["second", "first"]);
        assert_eq!(child.tracked_count(), 0);
        assert!(child.is_empty());
    }

    #[test]
    fn dispose_leaves_handles_held_by_callers_valid() {
        let container = Container::new();
        container.register(|_| Ok(RequestId(9))).unwrap();
        let held = container.resolve::<RequestId>().unwrap();

        container.dispose().unwrap();
        assert_eq!(held.0, 9);
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn parent_disposal_does_not_recurse_into_children() {
        let log = ReleaseLog::default();
        let root = Container::new();
        root.register(|_| Ok(Logger)).unwrap();
        let child = root.create_child().unwrap();
        resource(&child, "scoped", &log, false);
        child.resolve_named::<Resource>("scoped").unwrap();

        root.dispose().unwrap();
        assert!(log.lock().is_empty());
        assert!(!child.is_disposed());
        assert!(matches!(child.resolve::<Logger>(), Err(HearthError::ContainerDisposed { .. })));

        child.dispose().unwrap();
        assert_eq!(*log.lock(), vec!["scoped"]);
    }

    #[test]
    fn registered_instance_is_owned_by_container() {
        let log = ReleaseLog::default();
        let container = Container::new();
        container
            .add(
                ServiceDescriptor::instance(Resource { name: "given".into(), log: log.clone(), fail: false })
                    .disposable(),
            )
            .unwrap();

        assert_eq!(container.tracked_count(), 1);
        container.dispose().unwrap();
        assert_eq!(*log.lock(), vec!["given"]);
    }

    #[test]
    fn scope_guard_disposes_on_drop() {
        let log = ReleaseLog::default();
        let root = Container::new();
        {
            let scope = root.create_scope().unwrap();
            resource(&scope, "request", &log, false);
            scope.resolve_named::<Resource>("request").unwrap();
            assert_eq!(root.child_count(), 1);
        }
        assert_eq!(*log.lock(), vec!["request"]);
        assert_eq!(root.child_count(), 0);
    }

    #[test]
    fn scope_finish_reports_faults() {
        let log = ReleaseLog::default();
        let root = Container::new();
        let scope = root.create_scope().unwrap();
        resource(&scope, "broken", &log, true);
        scope.resolve_named::<Resource>("broken").unwrap();

        assert!(matches!(scope.finish(), Err(HearthError::DisposalFailure(_))));
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn dropping_last_handle_releases_tracked_instances() {
        let log = ReleaseLog::default();
        {
            let container = Container::new();
            resource(&container, "leaked", &log, false);
            container.resolve_named::<Resource>("leaked").unwrap();
        }
        assert_eq!(*log.lock(), vec!["leaked"]);
    }

    // ── Builder, providers, validation ──

    #[test]
    fn builder_builds_and_validates() {
        let container = Container::builder()
            .label("app")
            .singleton(|_| Ok(Logger))
            .add(
                ServiceDescriptor::new(|r| Ok(RequestHandler { logger: r.resolve()? }))
                    .reused_within(ReuseScope::Transient)
                    .depends_on(ServiceKey::of::<Logger>()),
            )
            .build()
            .unwrap();

        assert_eq!(container.label(), "app");
        assert_eq!(container.len(), 2);
        assert!(container.resolve::<RequestHandler>().is_ok());
    }

    #[test]
    fn builder_rejects_missing_declared_dependency() {
        let result = Container::builder()
            .add(
                ServiceDescriptor::new(|r| Ok(RequestHandler { logger: r.resolve()? }))
                    .depends_on(ServiceKey::of::<Logger>()),
            )
            .build();

        assert!(matches!(result, Err(HearthError::UnregisteredService(_))));
    }

    #[test]
    fn builder_rejects_captive_transient() {
        let result = Container::builder()
            .transient(|_| Ok(RequestId(1)))
            .add(ServiceDescriptor::new(|_| Ok(Logger)).depends_on(ServiceKey::of::<RequestId>()))
            .build();

        assert!(matches!(result, Err(HearthError::ScopeMismatch(_))));
    }

    #[test]
    fn validate_sees_ancestor_registrations() {
        let root = Container::new();
        root.register(|_| Ok(Logger)).unwrap();
        let child = root.create_child().unwrap();
        child
            .add(
                ServiceDescriptor::new(|r| Ok(RequestHandler { logger: r.resolve()? }))
                    .reused_within(ReuseScope::Transient)
                    .depends_on(ServiceKey::of::<Logger>()),
            )
            .unwrap();

        assert!(child.validate().is_ok());
        assert!(root.validate().is_ok());
    }

    #[test]
    fn provider_installs_into_container_and_builder() {
        struct LoggingProvider;
        impl Provider for LoggingProvider {
            fn register(&self, registry: &mut dyn ProviderRegistry) -> Result<()> {
                registry.add(ServiceDescriptor::new(|_| Ok(Logger)))
            }
        }

        let container = Container::new();
        container.add_provider(&LoggingProvider).unwrap();
        assert!(container.contains(&ServiceKey::of::<Logger>()));

        let built = Container::builder().add_provider(&LoggingProvider).build().unwrap();
        assert!(built.resolve::<Logger>().is_ok());
    }

    #[test]
    fn introspection() {
        let root = Container::with_options(ContainerOptions::default().with_label("app"));
        root.register(|_| Ok(Logger)).unwrap();
        let child = root.create_child().unwrap();

        assert_eq!(root.depth(), 0);
        assert_eq!(child.depth(), 1);
        assert!(child.label().starts_with("app/child#"));
        assert!(child.parent().is_some_and(|p| p.ptr_eq(&root)));
        assert!(child.contains(&ServiceKey::of::<Logger>()));
        assert!(!child.contains_local(&ServiceKey::of::<Logger>()));
        assert!(child.is_empty());
        assert_eq!(root.registered_keys(), vec![ServiceKey::of::<Logger>()]);

        let debug = format!("{root:?}");
        assert!(debug.contains("Container"));
        assert!(debug.contains("app"));
    }
}
