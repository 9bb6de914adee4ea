//! Reuse scopes.
//!
//! A reuse scope decides whether a resolved instance is cached, and where:
//! - [`ReuseScope::Transient`]: new instance every time, owned by the caller
//! - [`ReuseScope::ContainerSingleton`]: cached on the container holding the registration
//! - [`ReuseScope::HierarchicalSingleton`]: cached on the topmost container
//!   owning the registration and shared with every descendant
//!
//! # Ordering
//! Scopes order by how long their instances live:
//! `HierarchicalSingleton > ContainerSingleton > Transient`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Policy governing whether and where a resolved instance is cached.
///
/// # Examples
/// ```
/// use hearth_container::scope::ReuseScope;
///
/// assert!(ReuseScope::HierarchicalSingleton > ReuseScope::ContainerSingleton);
/// assert!(ReuseScope::ContainerSingleton > ReuseScope::Transient);
/// assert_eq!(ReuseScope::default(), ReuseScope::ContainerSingleton);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReuseScope {
    /// New instance on every resolution.
    ///
    /// Never cached and never tracked for disposal: ownership passes to
    /// the caller.
    Transient,

    /// One instance per registering container.
    ///
    /// Created on first resolution, cached in the entry of the container
    /// whose map holds the registration and released when that container
    /// is disposed.
    #[default]
    ContainerSingleton,

    /// One instance for a whole container subtree.
    ///
    /// Cached on the topmost ancestor that owns a registration for the
    /// key, so every descendant observes the same instance.
    HierarchicalSingleton,
}

impl ReuseScope {
    /// Returns `true` if instances are cached under this scope.
    #[inline]
    pub fn is_cached(&self) -> bool {
        !matches!(self, ReuseScope::Transient)
    }

    #[inline]
    fn rank(&self) -> u8 {
        match self {
            ReuseScope::HierarchicalSingleton => 2,
            ReuseScope::ContainerSingleton => 1,
            ReuseScope::Transient => 0,
        }
    }
}

impl PartialOrd for ReuseScope {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReuseScope {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for ReuseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReuseScope::Transient => "Transient",
            ReuseScope::ContainerSingleton => "ContainerSingleton",
            ReuseScope::HierarchicalSingleton => "HierarchicalSingleton",
        })
    }
}
