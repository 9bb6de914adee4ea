//! Provider trait: a module of related registrations.
//!
//! Hosts group the services of one concern (data access, auth, HTTP
//! handlers) in a provider and install it once on the root container.
//!
//! # Examples
//! ```rust
//! use hearth_container::prelude::*;
//!
//! struct Settings { url: String }
//! struct Pool { url: String }
//!
//! struct DataProvider;
//!
//! impl Provider for DataProvider {
//!     fn register(&self, registry: &mut dyn ProviderRegistry) -> Result<()> {
//!         registry.add(ServiceDescriptor::instance(Settings { url: "postgres://db".into() }))?;
//!         registry.add(ServiceDescriptor::new(|r| {
//!             let settings = r.resolve::<Settings>()?;
//!             Ok(Pool { url: settings.url.clone() })
//!         }))
//!     }
//! }
//!
//! let container = Container::new();
//! container.add_provider(&DataProvider).unwrap();
//! assert_eq!(container.resolve::<Pool>().unwrap().url, "postgres://db");
//! ```

use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::registry::RawRegistration;

/// A module that registers related services.
pub trait Provider: Send + Sync {
    /// Registers this module's services.
    fn register(&self, registry: &mut dyn ProviderRegistry) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Registration sink that providers write into.
///
/// Implemented by [`Container`](crate::container::Container) and
/// [`ContainerBuilder`](crate::container::ContainerBuilder); a mock
/// implementation lets providers be tested on their own.
pub trait ProviderRegistry {
    /// Accepts one type-erased registration.
    fn register_raw(&mut self, registration: RawRegistration) -> Result<()>;
}

impl dyn ProviderRegistry + '_ {
    /// Accepts a typed descriptor.
    pub fn add<T: ?Sized + Send + Sync + 'static>(&mut self, descriptor: ServiceDescriptor<T>) -> Result<()> {
        self.register_raw(descriptor.into_raw())
    }
}
