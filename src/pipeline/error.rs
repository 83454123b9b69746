//! Pipeline Error Types
//!
//! Error handling for pipeline admission and stage execution. Stage
//! failures inside a running pipeline are recorded on the run's status;
//! these errors cover admission, gating and infrastructure problems.

use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error types for pipeline operations
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// A pipeline for this plugin is already in flight
    #[error("Pipeline already running for plugin: {plugin_name}")]
    AlreadyRunning { plugin_name: String },

    /// Target plugin is not registered
    #[error("Plugin not found: {plugin_name}")]
    PluginNotFound { plugin_name: String },

    /// Build stage failed
    #[error("Build failed for plugin '{plugin_name}': {message}")]
    BuildFailed { plugin_name: String, message: String },

    /// Test stage failed
    #[error("Tests failed for plugin '{plugin_name}': {message}")]
    TestFailed { plugin_name: String, message: String },

    /// Deploy stage failed
    #[error("Deploy failed for plugin '{plugin_name}': {message}")]
    DeployFailed { plugin_name: String, message: String },

    /// Deploy gating: a chain member is not active
    #[error("Cannot deploy '{plugin_name}': dependency chain member '{dependency}' is not active")]
    DependencyNotActive { plugin_name: String, dependency: String },

    /// Pipeline infrastructure failure
    #[error("Pipeline internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    /// Create an already running error
    pub fn already_running<S: Into<String>>(plugin_name: S) -> Self {
        Self::AlreadyRunning { plugin_name: plugin_name.into() }
    }

    /// Create a plugin not found error
    pub fn plugin_not_found<S: Into<String>>(plugin_name: S) -> Self {
        Self::PluginNotFound { plugin_name: plugin_name.into() }
    }

    /// Create a build failed error
    pub fn build_failed<S: Into<String>, M: Into<String>>(plugin_name: S, message: M) -> Self {
        Self::BuildFailed {
            plugin_name: plugin_name.into(),
            message: message.into(),
        }
    }

    /// Create a test failed error
    pub fn test_failed<S: Into<String>, M: Into<String>>(plugin_name: S, message: M) -> Self {
        Self::TestFailed {
            plugin_name: plugin_name.into(),
            message: message.into(),
        }
    }

    /// Create a deploy failed error
    pub fn deploy_failed<S: Into<String>, M: Into<String>>(plugin_name: S, message: M) -> Self {
        Self::DeployFailed {
            plugin_name: plugin_name.into(),
            message: message.into(),
        }
    }

    /// Create a dependency not active error
    pub fn dependency_not_active<S: Into<String>, D: Into<String>>(plugin_name: S, dependency: D) -> Self {
        Self::DependencyNotActive {
            plugin_name: plugin_name.into(),
            dependency: dependency.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Check if the error is a stage failure (as opposed to admission or
    /// infrastructure)
    pub fn is_stage_failure(&self) -> bool {
        matches!(self,
            PipelineError::BuildFailed { .. } |
            PipelineError::TestFailed { .. } |
            PipelineError::DeployFailed { .. }
        )
    }

    /// Check if the error happened before any stage ran
    pub fn is_admission_error(&self) -> bool {
        matches!(self,
            PipelineError::AlreadyRunning { .. } |
            PipelineError::PluginNotFound { .. } |
            PipelineError::DependencyNotActive { .. }
        )
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::internal(format!("pipeline task failed: {}", err))
    }
}
