//! Plugin Error Types
//!
//! Comprehensive error handling for plugin registration and lifecycle
//! operations with context-aware error types.

use thiserror::Error;

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Comprehensive error types for plugin operations
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    /// Plugin name already present in the registry
    #[error("Plugin already registered: {plugin_name}")]
    DuplicateName { plugin_name: String },

    /// Declared dependency is not registered
    #[error("Plugin '{plugin_name}' depends on '{dependency}' which is not registered")]
    MissingDependency { plugin_name: String, dependency: String },

    /// Registration would introduce a dependency cycle
    #[error("Cyclic dependency detected: {message}")]
    CyclicDependency { message: String },

    /// Plugin not found
    #[error("Plugin not found: {plugin_name}")]
    NotFound { plugin_name: String },

    /// Plugin still has active dependents
    #[error("Plugin '{plugin_name}' has active dependents: {dependents}")]
    HasActiveDependents { plugin_name: String, dependents: String },

    /// Dependency must be active first
    #[error("Plugin '{plugin_name}' requires dependency '{dependency}' to be active")]
    DependencyNotActive { plugin_name: String, dependency: String },

    /// Plugin activation failed
    #[error("Activation failed for plugin '{plugin_name}': {message}")]
    ActivationFailed { plugin_name: String, message: String },

    /// Plugin lifecycle call failed
    #[error("Lifecycle failure in plugin '{plugin_name}': {message}")]
    LifecycleFailed { plugin_name: String, message: String },

    /// Plugin metadata failed validation
    #[error("Invalid plugin metadata: {message}")]
    InvalidMetadata { message: String },

    /// Plugin descriptor parsing error
    #[error("Descriptor parse error: {message}")]
    DescriptorParse { message: String },

    /// Version compatibility error
    #[error("Version compatibility error: {message}")]
    VersionIncompatible { message: String },
}

impl PluginError {
    /// Create a duplicate name error
    pub fn duplicate_name<S: Into<String>>(plugin_name: S) -> Self {
        Self::DuplicateName { plugin_name: plugin_name.into() }
    }

    /// Create a missing dependency error
    pub fn missing_dependency<S: Into<String>, D: Into<String>>(plugin_name: S, dependency: D) -> Self {
        Self::MissingDependency {
            plugin_name: plugin_name.into(),
            dependency: dependency.into(),
        }
    }

    /// Create a cyclic dependency error
    pub fn cyclic_dependency<S: Into<String>>(message: S) -> Self {
        Self::CyclicDependency { message: message.into() }
    }

    /// Create a plugin not found error
    pub fn not_found<S: Into<String>>(plugin_name: S) -> Self {
        Self::NotFound { plugin_name: plugin_name.into() }
    }

    /// Create an active dependents error from the dependent plugin names
    pub fn has_active_dependents<S: Into<String>>(plugin_name: S, dependents: &[String]) -> Self {
        Self::HasActiveDependents {
            plugin_name: plugin_name.into(),
            dependents: dependents.join(", "),
        }
    }

    /// Create a dependency not active error
    pub fn dependency_not_active<S: Into<String>, D: Into<String>>(plugin_name: S, dependency: D) -> Self {
        Self::DependencyNotActive {
            plugin_name: plugin_name.into(),
            dependency: dependency.into(),
        }
    }

    /// Create an activation failed error
    pub fn activation_failed<S: Into<String>, M: Into<String>>(plugin_name: S, message: M) -> Self {
        Self::ActivationFailed {
            plugin_name: plugin_name.into(),
            message: message.into(),
        }
    }

    /// Create a lifecycle failed error
    pub fn lifecycle_failed<S: Into<String>, M: Into<String>>(plugin_name: S, message: M) -> Self {
        Self::LifecycleFailed {
            plugin_name: plugin_name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid metadata error
    pub fn invalid_metadata<S: Into<String>>(message: S) -> Self {
        Self::InvalidMetadata { message: message.into() }
    }

    /// Create a descriptor parse error
    pub fn descriptor_parse<S: Into<String>>(message: S) -> Self {
        Self::DescriptorParse { message: message.into() }
    }

    /// Create a version incompatible error
    pub fn version_incompatible<S: Into<String>>(message: S) -> Self {
        Self::VersionIncompatible { message: message.into() }
    }

    /// Check if error is a structural registration problem
    pub fn is_registration_error(&self) -> bool {
        matches!(self,
            PluginError::DuplicateName { .. } |
            PluginError::MissingDependency { .. } |
            PluginError::CyclicDependency { .. } |
            PluginError::InvalidMetadata { .. } |
            PluginError::VersionIncompatible { .. }
        )
    }

    /// Check if error came from a plugin lifecycle call
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(self,
            PluginError::ActivationFailed { .. } |
            PluginError::LifecycleFailed { .. }
        )
    }

    /// Check if error is an ordering constraint that the caller can resolve
    pub fn is_ordering_error(&self) -> bool {
        matches!(self,
            PluginError::HasActiveDependents { .. } |
            PluginError::DependencyNotActive { .. }
        )
    }
}

// Allow conversion from common error types
impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::descriptor_parse(format!("IO error: {}", err))
    }
}

impl From<serde_yaml::Error> for PluginError {
    fn from(err: serde_yaml::Error) -> Self {
        PluginError::descriptor_parse(format!("YAML error: {}", err))
    }
}
