//! Error types for Hearth container operations.
//!
//! Every error names the key involved and, where it helps, what to do
//! about it. Resolution failures are deterministic: the same registration
//! graph always fails the same way.

use std::fmt;

use hearth_support::rendering::{count_noun, render_chain};

use crate::key::ServiceKey;
use crate::scope::ReuseScope;

/// Boxed error used by factories and release logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Hearth operations.
#[derive(Debug, thiserror::Error)]
pub enum HearthError {
    /// A registration was rejected.
    #[error("{}", .0)]
    InvalidRegistration(InvalidRegistrationError),

    /// No entry for the key anywhere in the container chain.
    #[error("{}", .0)]
    UnregisteredService(UnregisteredServiceError),

    /// A key was requested again while it was still being constructed.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// The container (or an ancestor it delegated to) was disposed.
    #[error("Container {container} is disposed; create a new scope instead of reusing it")]
    ContainerDisposed { container: String },

    /// One or more tracked instances failed to release.
    #[error("{}", .0)]
    DisposalFailure(DisposalFailureError),

    /// A factory returned an error or an instance of the wrong type.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: ServiceKey,
        #[source]
        source: BoxError,
    },

    /// A declared dependency outlives its consumer's scope rules.
    #[error("{}", .0)]
    ScopeMismatch(ScopeMismatchError),
}

impl HearthError {
    /// Returns `true` for the errors that mean "nothing usable is registered":
    /// [`UnregisteredService`](HearthError::UnregisteredService) and
    /// [`CircularDependency`](HearthError::CircularDependency).
    ///
    /// These are the failures `try_resolve` turns into `None`.
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            HearthError::UnregisteredService(_) | HearthError::CircularDependency(_)
        )
    }

    /// Wraps a factory error for `key`.
    pub fn construction(key: &ServiceKey, source: impl Into<BoxError>) -> Self {
        HearthError::ConstructionFailed {
            key: key.clone(),
            source: source.into(),
        }
    }

    pub(crate) fn invalid(key: &ServiceKey, reason: InvalidReason) -> Self {
        HearthError::InvalidRegistration(InvalidRegistrationError {
            key: key.clone(),
            reason,
        })
    }
}

/// Why a registration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The registration carried no factory.
    MissingFactory,
    /// A named registration used an empty name.
    EmptyName,
    /// A release contract was attached to a `Transient` registration,
    /// whose instances the container never tracks.
    DisposerOnTransient,
    /// The key is already registered locally and overrides are disabled.
    AlreadyRegistered,
}

/// Error for a rejected registration.
#[derive(Debug)]
pub struct InvalidRegistrationError {
    pub key: ServiceKey,
    pub reason: InvalidReason,
}

impl fmt::Display for InvalidRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid registration for {}: ", self.key)?;
        match self.reason {
            InvalidReason::MissingFactory => write!(
                f,
                "no factory supplied\n  Hint: every registration needs a creation function"
            ),
            InvalidReason::EmptyName => write!(
                f,
                "name must not be empty\n  Hint: use an unnamed registration instead"
            ),
            InvalidReason::DisposerOnTransient => write!(
                f,
                "transient instances are never tracked, so their release logic would never run\n  Hint: register with a caching scope or release the instance yourself"
            ),
            InvalidReason::AlreadyRegistered => write!(
                f,
                "key already registered\n  Hint: enable allow_override in ContainerOptions to replace registrations"
            ),
        }
    }
}

/// Error when a key is not registered anywhere in the chain.
#[derive(Debug)]
pub struct UnregisteredServiceError {
    /// The key that was requested.
    pub requested: ServiceKey,
    /// The service whose factory asked for it, if any.
    pub required_by: Option<ServiceKey>,
    /// Registered keys with similar names.
    pub suggestions: Vec<ServiceKey>,
}

impl fmt::Display for UnregisteredServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not registered: {}", self.requested)?;

        if let Some(parent) = &self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: register {} on this container or one of its ancestors",
            self.requested.short_type_name()
        )
    }
}

/// Error when a cycle is found during one top-level resolution.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The keys forming the cycle, first key repeated at the end.
    pub chain: Vec<ServiceKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.chain.iter().map(ServiceKey::type_name).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))?;
        write!(
            f,
            "\n  Hint: resolve one side lazily through the resolver or restructure the services"
        )
    }
}

/// A single failed release attempt.
#[derive(Debug)]
pub struct DisposalFault {
    pub key: ServiceKey,
    pub message: String,
}

/// Aggregate of every fault raised during one disposal sweep.
#[derive(Debug)]
pub struct DisposalFailureError {
    /// Label of the container that was swept.
    pub container: String,
    /// Faults in the order they occurred.
    pub faults: Vec<DisposalFault>,
}

impl fmt::Display for DisposalFailureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Disposing container {} raised {}:",
            self.container,
            count_noun(self.faults.len(), "fault")
        )?;
        for fault in &self.faults {
            write!(f, "\n  - {}: {}", fault.key, fault.message)?;
        }
        Ok(())
    }
}

/// Error when a cached registration declares a shorter-lived dependency.
///
/// A `ContainerSingleton` holding a `Transient` keeps one stale instance
/// alive for as long as the container.
#[derive(Debug)]
pub struct ScopeMismatchError {
    pub dependency: ServiceKey,
    pub dependency_scope: ReuseScope,
    pub consumer: ServiceKey,
    pub consumer_scope: ReuseScope,
}

impl fmt::Display for ScopeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scope mismatch: {} ({}) depends on {} ({})",
            self.consumer, self.consumer_scope, self.dependency, self.dependency_scope,
        )?;
        write!(
            f,
            "\n  A {} registration cannot capture a {} dependency",
            self.consumer_scope, self.dependency_scope,
        )?;
        write!(
            f,
            "\n  Hint: register {} as {} or wider",
            self.dependency, self.consumer_scope,
        )
    }
}

/// Convenient Result type for Hearth operations.
pub type Result<T> = std::result::Result<T, HearthError>;
