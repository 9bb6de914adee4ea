//! # Hearth: a thread-safe IoC container for Rust
//!
//! Register factories under typed keys, resolve them with a reuse scope,
//! open child scopes per unit of work, and tear everything down in
//! reverse creation order.
//!
//! ```rust
//! use hearth::prelude::*;
//! use std::sync::Arc;
//!
//! struct Logger;
//!
//! #[derive(Injectable)]
//! struct RequestHandler {
//!     logger: Arc<Logger>,
//! }
//!
//! let root = Container::new();
//! root.register(|_| Ok(Logger)).unwrap();
//! root.autowire::<RequestHandler>(ReuseScope::Transient).unwrap();
//!
//! let scope = root.create_scope().unwrap();
//! let handler = scope.resolve::<RequestHandler>().unwrap();
//! assert!(Arc::ptr_eq(&handler.logger, &root.resolve::<Logger>().unwrap()));
//! ```

extern crate self as hearth;

pub use hearth_container::*;
pub use hearth_derive::*;
pub use hearth_support::*;

/// Everything needed to register, resolve and derive.
pub mod prelude {
    pub use hearth_container::prelude::*;
    pub use hearth_derive::Injectable;
}
