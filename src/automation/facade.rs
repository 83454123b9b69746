//! Automation Facade
//!
//! Thin orchestration over the registry, pipeline engine and test
//! runner. Workflows here compose subsystem calls; all state stays in
//! the subsystems themselves.

use std::path::PathBuf;
use std::sync::Arc;
use crate::pipeline::engine::PipelineEngine;
use crate::pipeline::executor::CommandExecutor;
use crate::pipeline::status::{PipelineStatus, StageSet};
use crate::plugin::builtin::CommandPlugin;
use crate::plugin::descriptor::{DescriptorTest, PluginDescriptor};
use crate::plugin::error::PluginError;
use crate::plugin::registry::SharedPluginRegistry;
use crate::plugin::traits::{Plugin, PluginMetadata};
use crate::tester::TestRunner;
use crate::version::{get_api_version, is_api_compatible};
use super::error::{AutomationError, AutomationResult};
use super::scaffold::Scaffolder;

/// Integrated workflows over registry, pipeline and tester
pub struct AutomationFacade {
    registry: SharedPluginRegistry,
    engine: PipelineEngine,
    tester: Arc<TestRunner>,
    scaffolder: Arc<dyn Scaffolder>,
    executor: Arc<dyn CommandExecutor>,
}

impl AutomationFacade {
    /// Create a facade over already-constructed collaborators
    pub fn new(
        registry: SharedPluginRegistry,
        engine: PipelineEngine,
        tester: Arc<TestRunner>,
        scaffolder: Arc<dyn Scaffolder>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            registry,
            engine,
            tester,
            scaffolder,
            executor,
        }
    }

    /// The shared registry this facade operates on
    pub fn registry(&self) -> &SharedPluginRegistry {
        &self.registry
    }

    /// The pipeline engine this facade operates on
    pub fn engine(&self) -> &PipelineEngine {
        &self.engine
    }

    /// The test runner this facade seeds descriptor cases into
    pub fn tester(&self) -> &Arc<TestRunner> {
        &self.tester
    }

    /// Scaffold a skeleton for a new plugin, then register it
    ///
    /// Scaffolding happens first so a rejected registration never
    /// leaves the registry changed; a failed registration does leave
    /// the scaffolded directory behind for inspection.
    pub async fn setup(
        &self,
        metadata: PluginMetadata,
        plugin: Box<dyn Plugin>,
    ) -> AutomationResult<PathBuf> {
        let plugin_dir = self.scaffolder.scaffold(&metadata).await?;
        let plugin_name = metadata.name.clone();
        self.registry.inner().write().await.register(plugin, metadata).await?;
        log::info!("Setup complete for plugin '{}' at {}", plugin_name, plugin_dir.display());
        Ok(plugin_dir)
    }

    /// Register a descriptor-defined plugin backed by a command plugin
    ///
    /// Gates on API version compatibility before touching the registry,
    /// then seeds the test runner with the descriptor's test cases.
    pub async fn register_descriptor(&self, descriptor: &PluginDescriptor) -> AutomationResult<()> {
        descriptor.validate()?;
        if let Some(required) = descriptor.api_version {
            if !is_api_compatible(required) {
                return Err(PluginError::version_incompatible(format!(
                    "plugin '{}' requires API version {} but this build provides {}",
                    descriptor.name,
                    required,
                    get_api_version()
                ))
                .into());
            }
        }

        let metadata = descriptor.metadata();
        let plugin = CommandPlugin::from_descriptor(descriptor, Arc::clone(&self.executor));
        self.registry
            .inner()
            .write()
            .await
            .register(Box::new(plugin), metadata)
            .await?;

        for case in &descriptor.tests {
            self.seed_descriptor_case(&descriptor.name, case)?;
        }
        Ok(())
    }

    /// Run the build and test stages and wait for the outcome
    pub async fn build_and_test(&self, plugin_name: &str) -> AutomationResult<PipelineStatus> {
        let handle = self
            .engine
            .run_stages(plugin_name, StageSet::build_and_test())
            .await?;
        Ok(handle.await?)
    }

    /// Run the deploy stage for an already-active plugin
    pub async fn deploy(&self, plugin_name: &str) -> AutomationResult<PipelineStatus> {
        if !self.registry.is_active(plugin_name).await {
            return Err(AutomationError::plugin_not_active(plugin_name));
        }
        let handle = self.engine.run_stages(plugin_name, StageSet::DEPLOY).await?;
        Ok(handle.await?)
    }

    /// Run the full build, test, deploy pipeline and wait for the outcome
    pub async fn full_pipeline(&self, plugin_name: &str) -> AutomationResult<PipelineStatus> {
        let handle = self.engine.run(plugin_name).await?;
        Ok(handle.await?)
    }

    /// Turn one descriptor test entry into a runnable case
    fn seed_descriptor_case(&self, plugin_name: &str, case: &DescriptorTest) -> AutomationResult<()> {
        let executor = Arc::clone(&self.executor);
        let command = case.command.clone();
        self.tester.add_test_case(plugin_name, &case.name, move || {
            let executor = Arc::clone(&executor);
            let command = command.clone();
            async move {
                let output = executor.execute(&command).await;
                if output.success() {
                    Ok(())
                } else {
                    Err(output.failure_detail())
                }
            }
        })?;
        Ok(())
    }
}
