//! Tester Error Types
//!
//! Errors for test case management. Case outcomes themselves are data,
//! returned as results, not errors.

use thiserror::Error;

/// Result type for tester operations
pub type TesterResult<T> = Result<T, TesterError>;

/// Error types for tester operations
#[derive(Error, Debug, Clone)]
pub enum TesterError {
    /// A case exceeded the configured timeout
    #[error("timeout after {seconds}s")]
    TestTimeout { test_name: String, seconds: f64 },

    /// A case with this name already exists for the plugin
    #[error("Test case '{test_name}' already exists for plugin '{plugin_name}'")]
    CaseAlreadyExists { plugin_name: String, test_name: String },

    /// No such case registered for the plugin
    #[error("Test case '{test_name}' not found for plugin '{plugin_name}'")]
    CaseNotFound { plugin_name: String, test_name: String },
}

impl TesterError {
    /// Create a test timeout error
    pub fn test_timeout<S: Into<String>>(test_name: S, seconds: f64) -> Self {
        Self::TestTimeout {
            test_name: test_name.into(),
            seconds,
        }
    }

    /// Create a case already exists error
    pub fn case_already_exists<P: Into<String>, T: Into<String>>(plugin_name: P, test_name: T) -> Self {
        Self::CaseAlreadyExists {
            plugin_name: plugin_name.into(),
            test_name: test_name.into(),
        }
    }

    /// Create a case not found error
    pub fn case_not_found<P: Into<String>, T: Into<String>>(plugin_name: P, test_name: T) -> Self {
        Self::CaseNotFound {
            plugin_name: plugin_name.into(),
            test_name: test_name.into(),
        }
    }
}
