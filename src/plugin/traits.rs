//! Core Plugin Traits
//!
//! Defines the plugin lifecycle interface and the metadata attached to
//! every registered plugin.

use std::collections::HashMap;
use std::fmt;
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use super::error::{PluginError, PluginResult};

/// Well-known metadata config key for the build stage command
pub const CONFIG_BUILD_COMMAND: &str = "build-command";

/// Well-known metadata config key for the deploy stage command
pub const CONFIG_DEPLOY_COMMAND: &str = "deploy-command";

/// Well-known metadata config key for the command working directory
pub const CONFIG_WORKING_DIR: &str = "working-dir";

/// Plugin lifecycle status as tracked by the registry
///
/// The registry owns the authoritative status for each plugin; a plugin's
/// own `status()` report is advisory and used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginStatus {
    /// Not yet seen by the registry
    Unknown,

    /// Registration accepted, initialize in progress
    Loading,

    /// Initialized and ready to activate
    Loaded,

    /// Activated and participating in pipelines
    Active,

    /// Deactivated but still registered
    Inactive,

    /// Shutdown in progress during unregistration
    Unloading,

    /// A lifecycle call failed; terminal until re-registered
    Failed,
}

impl PluginStatus {
    /// Whether a plugin in this status may be asked to activate
    pub fn can_activate(&self) -> bool {
        matches!(self, PluginStatus::Loaded | PluginStatus::Inactive)
    }

    /// Whether this status is terminal for the registered instance
    pub fn is_terminal(&self) -> bool {
        matches!(self, PluginStatus::Failed)
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PluginStatus::Unknown => "unknown",
            PluginStatus::Loading => "loading",
            PluginStatus::Loaded => "loaded",
            PluginStatus::Active => "active",
            PluginStatus::Inactive => "inactive",
            PluginStatus::Unloading => "unloading",
            PluginStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Plugin metadata and information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Plugin name (unique identifier)
    pub name: String,

    /// Plugin version
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Plugin author
    #[serde(default)]
    pub author: String,

    /// Names of plugins this plugin depends on
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Free-form configuration entries (stage commands, working dir, ...)
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl PluginMetadata {
    /// Create metadata with the required fields
    pub fn new<S: Into<String>, V: Into<String>>(name: S, version: V) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: String::new(),
            dependencies: Vec::new(),
            config: HashMap::new(),
        }
    }

    /// Set the description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    /// Set the author
    pub fn with_author<S: Into<String>>(mut self, author: S) -> Self {
        self.author = author.into();
        self
    }

    /// Add a dependency on another plugin
    pub fn with_dependency<S: Into<String>>(mut self, dependency: S) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Set the full dependency list
    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Add a configuration entry
    pub fn with_config_entry<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Validate metadata before registration
    ///
    /// Rejects empty names and self-dependencies. Duplicate dependency
    /// entries are tolerated and deduplicated by the graph.
    pub fn validate(&self) -> PluginResult<()> {
        if self.name.trim().is_empty() {
            return Err(PluginError::invalid_metadata("plugin name must not be empty"));
        }
        if self.version.trim().is_empty() {
            return Err(PluginError::invalid_metadata(
                format!("plugin '{}' has an empty version", self.name)
            ));
        }
        if self.dependencies.iter().any(|dep| dep == &self.name) {
            return Err(PluginError::cyclic_dependency(
                format!("plugin '{}' depends on itself", self.name)
            ));
        }
        Ok(())
    }

    /// Configured build command, if any
    pub fn build_command(&self) -> Option<&str> {
        self.config.get(CONFIG_BUILD_COMMAND).map(String::as_str)
    }

    /// Configured deploy command, if any
    pub fn deploy_command(&self) -> Option<&str> {
        self.config.get(CONFIG_DEPLOY_COMMAND).map(String::as_str)
    }

    /// Configured working directory for stage commands, if any
    pub fn working_dir(&self) -> Option<&str> {
        self.config.get(CONFIG_WORKING_DIR).map(String::as_str)
    }
}

/// Core plugin interface that all plugins must implement
///
/// Lifecycle calls are driven exclusively by the registry, which records
/// the resulting status transitions. Implementations should be quick;
/// long-running work belongs in pipeline stages, not lifecycle hooks.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Initialize the plugin with its registered metadata
    ///
    /// Called once during registration, after the registry has accepted
    /// the plugin. An error leaves the plugin registered in failed state.
    async fn initialize(&mut self, metadata: &PluginMetadata) -> PluginResult<()>;

    /// Activate the plugin so pipelines may target it
    async fn activate(&mut self) -> PluginResult<()>;

    /// Deactivate the plugin, releasing any active resources
    async fn deactivate(&mut self) -> PluginResult<()>;

    /// Final cleanup before the plugin is dropped from the registry
    async fn shutdown(&mut self) -> PluginResult<()>;

    /// The plugin's own view of its status, for diagnostics
    fn status(&self) -> PluginStatus;

    /// Names of plugins this plugin depends on
    ///
    /// Must agree with the registered metadata; the registry builds its
    /// dependency graph from the metadata, not from this method.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let metadata = PluginMetadata::new("metrics", "1.2.0")
            .with_description("Collects metrics")
            .with_author("Test Author")
            .with_dependency("base")
            .with_config_entry(CONFIG_BUILD_COMMAND, "make build");

        assert_eq!(metadata.name, "metrics");
        assert_eq!(metadata.version, "1.2.0");
        assert_eq!(metadata.dependencies, vec!["base".to_string()]);
        assert_eq!(metadata.build_command(), Some("make build"));
        assert_eq!(metadata.deploy_command(), None);
    }

    #[test]
    fn test_metadata_validation() {
        assert!(PluginMetadata::new("ok", "1.0.0").validate().is_ok());

        let empty_name = PluginMetadata::new("  ", "1.0.0");
        assert!(matches!(
            empty_name.validate().unwrap_err(),
            PluginError::InvalidMetadata { .. }
        ));

        let empty_version = PluginMetadata::new("plugin", "");
        assert!(matches!(
            empty_version.validate().unwrap_err(),
            PluginError::InvalidMetadata { .. }
        ));

        let self_dep = PluginMetadata::new("loop", "1.0.0").with_dependency("loop");
        assert!(matches!(
            self_dep.validate().unwrap_err(),
            PluginError::CyclicDependency { .. }
        ));
    }

    #[test]
    fn test_status_transitions() {
        assert!(PluginStatus::Loaded.can_activate());
        assert!(PluginStatus::Inactive.can_activate());
        assert!(!PluginStatus::Active.can_activate());
        assert!(!PluginStatus::Failed.can_activate());
        assert!(PluginStatus::Failed.is_terminal());
        assert!(!PluginStatus::Loaded.is_terminal());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PluginStatus::Active.to_string(), "active");
        assert_eq!(PluginStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_metadata_serde_defaults() {
        let yaml = "name: minimal\nversion: 0.1.0\n";
        let metadata: PluginMetadata = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(metadata.name, "minimal");
        assert!(metadata.dependencies.is_empty());
        assert!(metadata.config.is_empty());
    }
}
