//! Plugin System Module
//!
//! Registry-managed plugin lifecycle with dependency resolution. Plugins
//! implement the async `Plugin` trait; the registry owns them, tracks
//! their status and keeps the dependency graph consistent with every
//! registration.
//!
//! # Example Usage
//!
//! ```no_run
//! use plugforge::plugin::{PluginRegistry, PluginMetadata};
//!
//! # async fn example(plugin: Box<dyn plugforge::plugin::Plugin>) -> plugforge::plugin::PluginResult<()> {
//! let mut registry = PluginRegistry::new();
//! registry.register(plugin, PluginMetadata::new("demo", "1.0.0")).await?;
//! registry.activate("demo").await?;
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod error;
pub mod graph;
pub mod registry;
pub mod descriptor;
pub mod builtin;

#[cfg(test)]
pub mod tests;

// Re-export core types for easier access
pub use traits::{Plugin, PluginMetadata, PluginStatus};
pub use error::{PluginError, PluginResult};
pub use graph::DependencyGraph;

// Registry and descriptors
pub use registry::{PluginRegistry, PluginReport, SharedPluginRegistry};
pub use descriptor::{DescriptorDiscovery, DescriptorTest, PluginDescriptor};
pub use builtin::CommandPlugin;
