//! Built-in Plugin Implementations
//!
//! Plugins shipped with the crate. Descriptor-discovered plugins are
//! backed by the command plugin.

pub mod command;

// Re-export built-in plugins
pub use command::CommandPlugin;
