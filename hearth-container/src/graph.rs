//! Declared-dependency graph validation.
//!
//! Registrations may declare the keys their factory needs (explicitly via
//! `depends_on`, or through `Injectable`). Validation walks those
//! declarations without running any factory:
//! - every declared dependency is registered somewhere in the chain
//! - no declared cycles
//! - no caching registration declares a shorter-lived dependency
//!
//! Dependencies a factory resolves without declaring them are only
//! checked at resolution time.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::error::{CircularDependencyError, HearthError, ScopeMismatchError, UnregisteredServiceError};
use crate::key::{ServiceKey, similar_keys};
use crate::scope::ReuseScope;

/// What validation needs to know about one visible registration.
#[derive(Debug, Clone)]
pub(crate) struct DependencyInfo {
    pub key: ServiceKey,
    pub dependencies: Vec<ServiceKey>,
    pub scope: ReuseScope,
}

/// Depth-first validator over declared dependencies.
pub(crate) struct GraphValidator {
    nodes: HashMap<ServiceKey, DependencyInfo>,
    visiting: HashSet<ServiceKey>,
    validated: HashSet<ServiceKey>,
    path: Vec<ServiceKey>,
}

impl GraphValidator {
    pub fn new(nodes: HashMap<ServiceKey, DependencyInfo>) -> Self {
        Self {
            nodes,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// Validates every node.
    ///
    /// # Errors
    /// - [`HearthError::CircularDependency`] for a declared cycle
    /// - [`HearthError::UnregisteredService`] for a missing declared dependency
    /// - [`HearthError::ScopeMismatch`] for a captive shorter-lived dependency
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<(), HearthError> {
        let mut keys: Vec<ServiceKey> = self.nodes.keys().cloned().collect();
        // Deterministic order so the same graph always reports the same error.
        keys.sort_by(|a, b| a.type_name().cmp(b.type_name()).then_with(|| a.name().cmp(&b.name())));

        debug!(registrations = keys.len(), "Validating declared dependencies");
        for key in keys {
            self.visit(&key)?;
        }
        debug!("Declared dependency graph is valid");
        Ok(())
    }

    fn visit(&mut self, key: &ServiceKey) -> Result<(), HearthError> {
        if self.validated.contains(key) {
            return Ok(());
        }

        if self.visiting.contains(key) {
            let start = self.path.iter().position(|k| k == key).unwrap_or(0);
            let mut chain = self.path[start..].to_vec();
            chain.push(key.clone());
            warn!(cycle = ?chain, "Declared dependency cycle");
            return Err(HearthError::CircularDependency(CircularDependencyError { chain }));
        }

        let info = self.nodes.get(key).cloned().ok_or_else(|| {
            HearthError::UnregisteredService(UnregisteredServiceError {
                requested: key.clone(),
                required_by: self.path.last().cloned(),
                suggestions: similar_keys(key, self.nodes.keys()),
            })
        })?;

        self.visiting.insert(key.clone());
        self.path.push(key.clone());

        for dependency in &info.dependencies {
            if let Some(dep_info) = self.nodes.get(dependency) {
                check_scopes(&info, dep_info)?;
            }
            self.visit(dependency)?;
        }

        self.path.pop();
        self.visiting.remove(key);
        self.validated.insert(key.clone());
        Ok(())
    }
}

/// A consumer must not outlive what it captures.
fn check_scopes(consumer: &DependencyInfo, dependency: &DependencyInfo) -> Result<(), HearthError> {
    if consumer.scope > dependency.scope {
        warn!(
            consumer = %consumer.key,
            consumer_scope = %consumer.scope,
            dependency = %dependency.key,
            dependency_scope = %dependency.scope,
            "Scope mismatch"
        );
        return Err(HearthError::ScopeMismatch(ScopeMismatchError {
            consumer: consumer.key.clone(),
            consumer_scope: consumer.scope,
            dependency: dependency.key.clone(),
            dependency_scope: dependency.scope,
        }));
    }
    Ok(())
}
