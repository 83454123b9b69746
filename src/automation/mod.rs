//! Automation Module
//!
//! Workflows that compose the plugin registry, pipeline engine and test
//! runner, plus skeleton scaffolding for new plugins.

pub mod error;
pub mod facade;
pub mod scaffold;

// Re-export core types for easier access
pub use error::{AutomationError, AutomationResult};
pub use facade::AutomationFacade;
pub use scaffold::{Scaffolder, TemplateScaffolder, DESCRIPTOR_FILE_NAME};
