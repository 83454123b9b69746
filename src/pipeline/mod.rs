//! Pipeline Module
//!
//! Build, test and deploy automation for registered plugins. The engine
//! admits at most one run per plugin at a time, executes stage commands
//! through a pluggable executor, and records progress on a shared
//! status board.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use plugforge::plugin::SharedPluginRegistry;
//! use plugforge::pipeline::{PipelineEngine, ShellExecutor};
//! use plugforge::tester::TestRunner;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SharedPluginRegistry::new();
//! let tester = Arc::new(TestRunner::new());
//! let engine = PipelineEngine::new(registry, tester, Arc::new(ShellExecutor::new()));
//!
//! let handle = engine.run("my-plugin").await?;
//! let status = handle.await?;
//! println!("{}", status);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod executor;
pub mod status;

// Re-export core types for easier access
pub use engine::{PipelineEngine, PipelineHandle};
pub use error::{PipelineError, PipelineResult};
pub use executor::{CommandExecutor, ExecutionOutput, ShellExecutor};
pub use status::{PipelineStage, PipelineStatus, StageSet};
