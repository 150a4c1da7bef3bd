//! Tracker configuration.
//!
//! Configuration is stored as YAML with kebab-case keys. Every field has a
//! default, so an empty document is a valid configuration:
//!
//! ```yaml
//! issue-prefix: proj
//! dependencies:
//!   duplicate-edges: ignore
//!   single-parent: false
//! ready:
//!   default-sort: hybrid
//! ```

use crate::domain::SortPolicy;
use crate::error::{Error, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Default issue prefix if none specified
pub const DEFAULT_PREFIX: &str = "proj";

/// Minimum prefix length
pub const MIN_PREFIX_LENGTH: usize = 2;

/// Maximum prefix length
pub const MAX_PREFIX_LENGTH: usize = 20;

/// Top-level tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrackerConfig {
    /// Issue ID prefix (e.g., "proj" for "proj-abc")
    pub issue_prefix: String,

    /// Dependency edge policy
    pub dependencies: DependencyConfig,

    /// Ready-work defaults
    pub ready: ReadyConfig,
}

/// How the dependency index treats edge insertions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DependencyConfig {
    /// What to do when an identical `(from, to, kind)` edge already exists
    pub duplicate_edges: DuplicateEdgePolicy,

    /// Reject a second `ParentChild` edge out of the same child
    pub single_parent: bool,
}

/// Treatment of an edge identical to one already recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateEdgePolicy {
    /// Succeed without changing anything
    #[default]
    Ignore,

    /// Fail with `Error::DuplicateEdge`
    Reject,
}

/// Ready-work defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReadyConfig {
    /// Ordering used when a work filter does not request one
    pub default_sort: SortPolicy,
}

impl TrackerConfig {
    /// Create a configuration with the given prefix and default policies.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            issue_prefix: prefix.into(),
            dependencies: DependencyConfig::default(),
            ready: ReadyConfig::default(),
        }
    }

    /// Parse and validate a YAML document.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the YAML is malformed, `Error::Validation` if the
    /// prefix is invalid.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as YAML.
    ///
    /// # Errors
    ///
    /// `Error::Config` if serialization fails.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// `Error::Io` if the file cannot be read, otherwise as [`Self::from_yaml_str`].
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// `Error::Config` if serialization fails, `Error::Io` if the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_yaml_string()?).await?;
        Ok(())
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// `Error::Validation` with `InvalidPrefix` if the prefix is malformed.
    pub fn validate(&self) -> Result<()> {
        validate_prefix(&self.issue_prefix)?;
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

/// Validate issue ID prefix format.
///
/// Requirements:
/// - 2-20 characters
/// - Alphanumeric only (letters and digits)
///
/// # Errors
///
/// `ValidationError::InvalidPrefix` naming the violated requirement.
pub fn validate_prefix(prefix: &str) -> std::result::Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason,
    };

    if prefix.len() < MIN_PREFIX_LENGTH {
        return Err(invalid(format!(
            "must be at least {MIN_PREFIX_LENGTH} characters"
        )));
    }

    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(invalid(format!(
            "cannot exceed {MAX_PREFIX_LENGTH} characters"
        )));
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid(
            "must contain only alphanumeric characters".to_string(),
        ));
    }

    Ok(())
}
