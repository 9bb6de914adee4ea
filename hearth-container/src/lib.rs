//! Core container implementation for Hearth.

pub mod container;
pub mod descriptor;
pub mod dispose;
pub mod error;
mod graph;
pub mod key;
pub mod options;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use container::{Container, ContainerBuilder, ScopedContainer, prelude};
pub use descriptor::{Injectable, ServiceDescriptor};
pub use dispose::Dispose;
pub use error::{BoxError, HearthError, Result};
pub use key::ServiceKey;
pub use options::ContainerOptions;
pub use provider::{Provider, ProviderRegistry};
pub use registry::{Instance, RawRegistration};
pub use resolver::{Resolver, ResolverApi};
pub use scope::ReuseScope;
