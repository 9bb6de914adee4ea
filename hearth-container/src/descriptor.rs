//! Typed registration descriptors and constructor injection.
//!
//! A [`ServiceDescriptor`] describes one registration: what it produces,
//! under which key and scope, whether the container owns its release, and
//! which dependencies it declares. Containers and builders accept
//! descriptors through `add`.
//!
//! # Examples
//! ```
//! use hearth_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! let container = Container::new();
//! container
//!     .add(ServiceDescriptor::<dyn Greeter>::shared(|_| Ok(Arc::new(English) as Arc<dyn Greeter>))
//!         .named("en")
//!         .reused_within(ReuseScope::HierarchicalSingleton))
//!     .unwrap();
//!
//! let greeter = container.resolve_named::<dyn Greeter>("en").unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use crate::dispose::{Dispose, disposer_for};
use crate::error::Result;
use crate::key::ServiceKey;
use crate::registry::{FactoryFn, Instance, RawRegistration};
use crate::resolver::Resolver;
use crate::scope::ReuseScope;

/// A service that knows how to build itself from a resolver.
///
/// This is the constructor-injection convention: the dependency list is
/// read once, when the type is registered, and the resulting factory is
/// an ordinary explicit factory. Usually derived with
/// `#[derive(Injectable)]` from the facade crate.
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Keys this type requires, in constructor order.
    fn dependencies() -> Vec<ServiceKey>;

    /// Builds an instance, resolving dependencies through `resolver`.
    fn inject(resolver: &dyn Resolver) -> Result<Self>;
}

/// Typed description of a registration for service type `T`.
#[must_use = "a descriptor does nothing until it is added to a container"]
pub struct ServiceDescriptor<T: ?Sized> {
    raw: RawRegistration,
    _service: PhantomData<fn() -> Arc<T>>,
}

impl<T: Send + Sync + 'static> ServiceDescriptor<T> {
    /// Describes a factory-built service, cached per container by default.
    pub fn new(factory: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static) -> Self {
        Self::from_factory(Arc::new(move |resolver: &dyn Resolver| {
            Ok(Instance::new(Arc::new(factory(resolver)?)))
        }))
    }

    /// Describes a pre-built value owned by the container.
    pub fn instance(value: T) -> Self {
        Self::shared_instance(Arc::new(value))
    }
}

impl<T: Injectable> ServiceDescriptor<T> {
    /// Describes a constructor-injected service.
    ///
    /// Declared dependencies are captured now and feed graph validation.
    pub fn injectable() -> Self {
        Self::new(T::inject).depends_on_all(T::dependencies())
    }
}

impl<T: ?Sized + Send + Sync + 'static> ServiceDescriptor<T> {
    /// Describes a service whose factory already returns an `Arc<T>`.
    ///
    /// This is the way to register trait objects.
    pub fn shared(factory: impl Fn(&dyn Resolver) -> Result<Arc<T>> + Send + Sync + 'static) -> Self {
        Self::from_factory(Arc::new(move |resolver: &dyn Resolver| {
            Ok(Instance::new(factory(resolver)?))
        }))
    }

    /// Describes an already shared value owned by the container.
    pub fn shared_instance(value: Arc<T>) -> Self {
        let instance = Instance::new(value);
        let preset = instance.clone();
        let mut descriptor = Self::from_factory(Arc::new(move |_: &dyn Resolver| Ok(instance.clone())));
        descriptor.raw.preset = Some(preset);
        descriptor
    }

    fn from_factory(factory: FactoryFn) -> Self {
        Self {
            raw: RawRegistration::new(ServiceKey::of::<T>(), ReuseScope::default(), Some(factory)),
            _service: PhantomData,
        }
    }

    /// Registers under `name` instead of the unnamed key.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.raw.key = self.raw.key.renamed(name);
        self
    }

    /// Sets the reuse scope.
    pub fn reused_within(mut self, scope: ReuseScope) -> Self {
        self.raw.scope = scope;
        self
    }

    /// Declares a dependency for graph validation.
    pub fn depends_on(mut self, key: ServiceKey) -> Self {
        self.raw.dependencies.push(key);
        self
    }

    /// Declares several dependencies for graph validation.
    pub fn depends_on_all(mut self, keys: impl IntoIterator<Item = ServiceKey>) -> Self {
        self.raw.dependencies.extend(keys);
        self
    }

    pub fn key(&self) -> &ServiceKey {
        &self.raw.key
    }

    pub fn scope(&self) -> ReuseScope {
        self.raw.scope
    }

    /// Erases the service type.
    pub fn into_raw(self) -> RawRegistration {
        self.raw
    }
}

impl<T: ?Sized + Dispose + 'static> ServiceDescriptor<T> {
    /// Hands release of created instances to the container.
    ///
    /// Only valid with a caching scope; a transient registration with a
    /// release contract is rejected when added.
    pub fn disposable(mut self) -> Self {
        self.raw.disposer = Some(disposer_for::<T>());
        self
    }
}

impl<T: ?Sized> std::fmt::Debug for ServiceDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ServiceDescriptor").field(&self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;

    struct Port(u16);

    struct Pool;
    impl Dispose for Pool {
        fn dispose(&self) -> std::result::Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn defaults_to_container_singleton() {
        let descriptor = ServiceDescriptor::new(|_| Ok(Port(80)));
        assert_eq!(descriptor.scope(), ReuseScope::ContainerSingleton);
        assert_eq!(descriptor.key(), &ServiceKey::of::<Port>());
    }

    #[test]
    fn builder_methods_shape_the_registration() {
        let raw = ServiceDescriptor::new(|_| Ok(Pool))
            .named("primary")
            .reused_within(ReuseScope::HierarchicalSingleton)
            .depends_on(ServiceKey::of::<Port>())
            .disposable()
            .into_raw();

        assert_eq!(raw.key, ServiceKey::named::<Pool>("primary"));
        assert_eq!(raw.scope, ReuseScope::HierarchicalSingleton);
        assert_eq!(raw.dependencies, vec![ServiceKey::of::<Port>()]);
        assert!(raw.disposer.is_some());
        assert!(raw.preset.is_none());
    }

    #[test]
    fn instance_presets_the_cache() {
        let raw = ServiceDescriptor::instance(Port(8080)).into_raw();
        let preset = raw.preset.clone().unwrap();
        assert_eq!(preset.downcast::<Port>().unwrap().0, 8080);
    }

    #[test]
    fn injectable_captures_dependencies() {
        struct Handler;
        impl Injectable for Handler {
            fn dependencies() -> Vec<ServiceKey> {
                vec![ServiceKey::of::<Port>(), ServiceKey::named::<Pool>("primary")]
            }
            fn inject(_: &dyn Resolver) -> Result<Self> {
                Ok(Handler)
            }
        }

        let raw = ServiceDescriptor::<Handler>::injectable().into_raw();
        assert_eq!(raw.dependencies.len(), 2);
        assert_eq!(raw.key, ServiceKey::of::<Handler>());
    }
}
