//! Command Plugin
//!
//! Built-in plugin whose lifecycle hooks shell out to commands declared
//! in descriptor configuration. This is what descriptor-discovered
//! plugins register as.

use std::sync::Arc;
use async_trait::async_trait;
use crate::pipeline::executor::CommandExecutor;
use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::{Plugin, PluginMetadata, PluginStatus};

/// Config key for a command run during initialization.
pub const CONFIG_INITIALIZE_COMMAND: &str = "initialize-command";
/// Config key for a command run on activation.
pub const CONFIG_ACTIVATE_COMMAND: &str = "activate-command";
/// Config key for a command run on deactivation.
pub const CONFIG_DEACTIVATE_COMMAND: &str = "deactivate-command";
/// Config key for a command run during shutdown.
pub const CONFIG_SHUTDOWN_COMMAND: &str = "shutdown-command";

/// Plugin that delegates its lifecycle to configured shell commands
///
/// Hooks with no configured command succeed without doing anything, so
/// a descriptor only has to declare the hooks it cares about.
pub struct CommandPlugin {
    metadata: PluginMetadata,
    status: PluginStatus,
    executor: Arc<dyn CommandExecutor>,
}

impl CommandPlugin {
    /// Create a command plugin from explicit metadata
    pub fn new(metadata: PluginMetadata, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            metadata,
            status: PluginStatus::Unknown,
            executor,
        }
    }

    /// Create a command plugin backing a parsed descriptor
    pub fn from_descriptor(descriptor: &PluginDescriptor, executor: Arc<dyn CommandExecutor>) -> Self {
        Self::new(descriptor.metadata(), executor)
    }

    /// The metadata this plugin was built from
    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    async fn run_hook(&self, config_key: &str) -> PluginResult<()> {
        let command = match self.metadata.config.get(config_key) {
            Some(command) if !command.trim().is_empty() => command.clone(),
            _ => return Ok(()),
        };

        log::debug!(
            "Plugin '{}' running {} hook: {}",
            self.metadata.name,
            config_key,
            command
        );
        let output = self.executor.execute(&command).await;
        if output.success() {
            Ok(())
        } else {
            Err(PluginError::lifecycle_failed(
                &self.metadata.name,
                format!("{} '{}' failed: {}", config_key, command, output.failure_detail()),
            ))
        }
    }

    async fn transition(&mut self, config_key: &str, on_success: PluginStatus) -> PluginResult<()> {
        match self.run_hook(config_key).await {
            Ok(()) => {
                self.status = on_success;
                Ok(())
            }
            Err(e) => {
                self.status = PluginStatus::Failed;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Plugin for CommandPlugin {
    async fn initialize(&mut self, metadata: &PluginMetadata) -> PluginResult<()> {
        // registry-held metadata is authoritative from here on
        self.metadata = metadata.clone();
        self.status = PluginStatus::Loading;
        self.transition(CONFIG_INITIALIZE_COMMAND, PluginStatus::Loaded).await
    }

    async fn activate(&mut self) -> PluginResult<()> {
        self.transition(CONFIG_ACTIVATE_COMMAND, PluginStatus::Active).await
    }

    async fn deactivate(&mut self) -> PluginResult<()> {
        self.transition(CONFIG_DEACTIVATE_COMMAND, PluginStatus::Inactive).await
    }

    async fn shutdown(&mut self) -> PluginResult<()> {
        self.transition(CONFIG_SHUTDOWN_COMMAND, PluginStatus::Unknown).await
    }

    fn status(&self) -> PluginStatus {
        self.status
    }

    fn dependencies(&self) -> Vec<String> {
        self.metadata.dependencies.clone()
    }
}
