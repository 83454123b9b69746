//! Integration tests for end-to-end automation workflows
//!
//! Drives the facade through scaffold, descriptor registration, pipeline
//! and deploy flows with real files and shell commands.

use std::sync::Arc;

use tempfile::TempDir;

use plugforge::automation::{
    AutomationError, AutomationFacade, TemplateScaffolder, DESCRIPTOR_FILE_NAME,
};
use plugforge::pipeline::{CommandExecutor, PipelineEngine, PipelineStage, ShellExecutor};
use plugforge::plugin::{
    CommandPlugin, DescriptorDiscovery, PluginDescriptor, PluginMetadata, PluginStatus,
    SharedPluginRegistry,
};
use plugforge::tester::TestRunner;
use plugforge::version::get_api_version;

/// Setup scaffolds the skeleton on disk and registers the plugin
#[tokio::test]
async fn test_setup_scaffolds_and_registers() {
    let dir = TempDir::new().unwrap();
    let (facade, executor) = facade_into(&dir);

    let metadata = PluginMetadata::new("metrics", "0.1.0");
    let plugin = Box::new(CommandPlugin::new(metadata.clone(), Arc::clone(&executor)));
    let plugin_dir = facade.setup(metadata, plugin).await.unwrap();

    assert!(plugin_dir.join(DESCRIPTOR_FILE_NAME).exists());
    assert!(plugin_dir.join("README.md").exists());

    let inner = facade.registry().inner().read().await;
    assert_eq!(inner.status("metrics"), Some(PluginStatus::Loaded));
}

/// A scaffolded descriptor loads back through discovery and registers
/// cleanly, smoke test included
#[tokio::test]
async fn test_scaffolded_descriptor_round_trip() {
    let dir = TempDir::new().unwrap();
    let (facade, executor) = facade_into(&dir);

    let metadata = PluginMetadata::new("metrics", "0.1.0");
    let plugin = Box::new(CommandPlugin::new(metadata.clone(), Arc::clone(&executor)));
    facade.setup(metadata, plugin).await.unwrap();

    let discovery = DescriptorDiscovery::new(dir.path()).unwrap();
    let descriptors = discovery.discover().await.unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].name, "metrics");
    assert_eq!(descriptors[0].api_version, Some(get_api_version()));

    // Register into a fresh facade, as a later host process would
    let scratch = TempDir::new().unwrap();
    let (host, _executor) = facade_into(&scratch);
    host.register_descriptor(&descriptors[0]).await.unwrap();
    assert_eq!(host.tester().case_count_for("metrics"), 1);

    let status = host.build_and_test("metrics").await.unwrap();
    assert!(status.success);
    assert!(status.output.contains("[test] 1 case(s) passed"));
}

/// Descriptors from an incompatible API generation are refused
#[tokio::test]
async fn test_register_descriptor_gates_api_version() {
    let dir = TempDir::new().unwrap();
    let (facade, _executor) = facade_into(&dir);

    let descriptor = descriptor_named("relic", Some(get_api_version() - 20000));
    let err = facade.register_descriptor(&descriptor).await.unwrap_err();
    assert!(err.to_string().contains("requires API version"));

    let inner = facade.registry().inner().read().await;
    assert_eq!(inner.status("relic"), None);
}

/// Descriptor registration, activation and the full pipeline in sequence
#[tokio::test]
async fn test_descriptor_to_full_pipeline() {
    let dir = TempDir::new().unwrap();
    let (facade, _executor) = facade_into(&dir);

    let mut descriptor = descriptor_named("metrics", None);
    descriptor.config.insert("build-command".to_string(), "echo compiled".to_string());
    descriptor.config.insert("deploy-command".to_string(), "true".to_string());
    facade.register_descriptor(&descriptor).await.unwrap();

    facade
        .registry()
        .inner()
        .write()
        .await
        .activate("metrics")
        .await
        .unwrap();

    let status = facade.full_pipeline("metrics").await.unwrap();
    assert!(status.success);
    assert_eq!(status.stage, PipelineStage::Deploy);
    assert!(status.output.contains("[build] compiled"));
    assert!(status.output.contains("[test] 1 case(s) passed"));
    assert!(status.output.contains("[deploy] ok"));
}

/// Deployment is refused while the plugin is not active
#[tokio::test]
async fn test_deploy_requires_active_plugin() {
    let dir = TempDir::new().unwrap();
    let (facade, _executor) = facade_into(&dir);

    let descriptor = descriptor_named("metrics", None);
    facade.register_descriptor(&descriptor).await.unwrap();

    let err = facade.deploy("metrics").await.unwrap_err();
    assert!(matches!(err, AutomationError::PluginNotActive { .. }));
}

/// A failing descriptor test case fails the pipeline's test stage
#[tokio::test]
async fn test_failing_descriptor_case_fails_pipeline() {
    let dir = TempDir::new().unwrap();
    let (facade, _executor) = facade_into(&dir);

    let mut descriptor = descriptor_named("metrics", None);
    descriptor.tests.push(plugforge::plugin::DescriptorTest {
        name: "sad".to_string(),
        command: "false".to_string(),
    });
    facade.register_descriptor(&descriptor).await.unwrap();

    let status = facade.build_and_test("metrics").await.unwrap();
    assert!(status.is_failed());
    assert_eq!(status.stage, PipelineStage::Test);
    assert!(status.output.contains("[test] failed: sad"));
    assert!(status.error.contains("1/2 case(s) failed"));
    assert!(status.error.contains("sad"));
}

/// Setup refuses to overwrite an existing plugin directory
#[tokio::test]
async fn test_setup_refuses_existing_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("metrics")).unwrap();
    let (facade, executor) = facade_into(&dir);

    let metadata = PluginMetadata::new("metrics", "0.1.0");
    let plugin = Box::new(CommandPlugin::new(metadata.clone(), Arc::clone(&executor)));
    let err = facade.setup(metadata, plugin).await.unwrap_err();

    assert!(matches!(err, AutomationError::ScaffoldFailed { .. }));
    assert!(err.to_string().contains("already exists"));

    // Nothing was registered
    let inner = facade.registry().inner().read().await;
    assert_eq!(inner.plugin_count(), 0);
}

// Helper functions

fn facade_into(dir: &TempDir) -> (AutomationFacade, Arc<dyn CommandExecutor>) {
    let registry = SharedPluginRegistry::new();
    let tester = Arc::new(TestRunner::new());
    let executor: Arc<dyn CommandExecutor> = Arc::new(ShellExecutor::new());
    let engine = PipelineEngine::with_max_concurrent(
        registry.clone(),
        Arc::clone(&tester),
        Arc::clone(&executor),
        2,
    );
    let scaffolder = Arc::new(TemplateScaffolder::new(dir.path()).unwrap());
    let facade = AutomationFacade::new(
        registry,
        engine,
        tester,
        scaffolder,
        Arc::clone(&executor),
    );
    (facade, executor)
}

/// A minimal valid descriptor with one passing smoke test
fn descriptor_named(name: &str, api_version: Option<i64>) -> PluginDescriptor {
    PluginDescriptor {
        name: name.to_string(),
        version: "1.0.0".to_string(),
        description: format!("The {} plugin", name),
        author: String::new(),
        api_version,
        dependencies: Vec::new(),
        config: Default::default(),
        tests: vec![plugforge::plugin::DescriptorTest {
            name: "smoke".to_string(),
            command: "true".to_string(),
        }],
        file_path: None,
    }
}
