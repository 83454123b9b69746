//! Automation Error Types

use thiserror::Error;
use crate::pipeline::error::PipelineError;
use crate::plugin::error::PluginError;
use crate::tester::TesterError;

/// Errors surfaced by automation workflows
#[derive(Error, Debug)]
pub enum AutomationError {
    /// Registry or lifecycle failure
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Pipeline admission or execution failure
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Test case registration failure
    #[error(transparent)]
    Tester(#[from] TesterError),

    /// Skeleton generation failure
    #[error("Scaffold failed: {message}")]
    ScaffoldFailed { message: String },

    /// Deployment requested for a plugin that is not active
    #[error("Plugin '{plugin_name}' must be active before deployment")]
    PluginNotActive { plugin_name: String },
}

impl AutomationError {
    /// Create a scaffold failure error
    pub fn scaffold_failed<S: Into<String>>(message: S) -> Self {
        Self::ScaffoldFailed { message: message.into() }
    }

    /// Create a plugin-not-active error
    pub fn plugin_not_active<S: Into<String>>(plugin_name: S) -> Self {
        Self::PluginNotActive { plugin_name: plugin_name.into() }
    }
}

impl From<std::io::Error> for AutomationError {
    fn from(err: std::io::Error) -> Self {
        Self::scaffold_failed(err.to_string())
    }
}

/// Result type for automation operations
pub type AutomationResult<T> = Result<T, AutomationError>;
