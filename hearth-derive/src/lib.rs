//! Derive macros for Hearth, re-exported from `hearth-macros`.
//!
//! ```rust,ignore
//! use hearth::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! struct Handler {
//!     logger: Arc<Logger>,
//!     #[inject(name = "primary")]
//!     pool: Arc<Pool>,
//!     metrics: Option<Arc<Metrics>>,
//! }
//! ```

pub use hearth_macros::Injectable;
