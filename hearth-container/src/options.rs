//! Container configuration.

use serde::{Deserialize, Serialize};

/// Programmatic settings for a root container.
///
/// Child containers inherit `allow_override` and derive their label from
/// the parent's. The struct is serde-enabled so a host can embed it in
/// its own configuration.
///
/// ```
/// use hearth_container::options::ContainerOptions;
///
/// let options = ContainerOptions::default().with_label("app");
/// assert!(options.allow_override);
/// assert_eq!(options.label.as_deref(), Some("app"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerOptions {
    /// Name used in logs and error messages; defaults to `root#<id>`.
    pub label: Option<String>,
    /// Whether registering an existing key replaces it (`true`) or fails
    /// with `InvalidRegistration`.
    pub allow_override: bool,
}

impl ContainerOptions {
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            label: None,
            allow_override: true,
        }
    }
}
