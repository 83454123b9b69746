//! Integration tests for the registry-managed plugin lifecycle
//!
//! Exercises the public registry API end to end with command-backed
//! plugins running real shell commands, including descriptor discovery
//! from disk.

use std::sync::Arc;

use tempfile::TempDir;

use plugforge::pipeline::{CommandExecutor, ShellExecutor};
use plugforge::plugin::{
    CommandPlugin, DescriptorDiscovery, PluginError, PluginMetadata, PluginResult, PluginStatus,
    SharedPluginRegistry,
};

/// Walk one plugin through register, activate, deactivate and unregister
#[tokio::test]
async fn test_command_plugin_full_lifecycle() {
    let registry = SharedPluginRegistry::new();
    let executor = shell();

    register(&registry, &executor, "metrics", &[], &[("initialize-command", "true")])
        .await
        .unwrap();

    {
        let inner = registry.inner().read().await;
        assert_eq!(inner.status("metrics"), Some(PluginStatus::Loaded));
        assert_eq!(inner.last_error("metrics"), None);
    }

    let mut inner = registry.inner().write().await;
    inner.activate("metrics").await.unwrap();
    assert_eq!(inner.status("metrics"), Some(PluginStatus::Active));

    inner.deactivate("metrics").await.unwrap();
    assert_eq!(inner.status("metrics"), Some(PluginStatus::Inactive));

    inner.unregister("metrics").await.unwrap();
    assert_eq!(inner.status("metrics"), None);
    assert_eq!(inner.plugin_count(), 0);
}

/// A failing initialize hook leaves the plugin registered but failed
#[tokio::test]
async fn test_failing_initialize_hook_marks_plugin_failed() {
    let registry = SharedPluginRegistry::new();
    let executor = shell();

    register(&registry, &executor, "broken", &[], &[("initialize-command", "false")])
        .await
        .unwrap();

    let mut inner = registry.inner().write().await;
    assert_eq!(inner.status("broken"), Some(PluginStatus::Failed));
    assert!(inner.last_error("broken").is_some());

    // Failed plugins cannot be activated, only re-registered
    let err = inner.activate("broken").await.unwrap_err();
    assert!(matches!(err, PluginError::ActivationFailed { .. }));

    inner.unregister("broken").await.unwrap();
    drop(inner);

    register(&registry, &executor, "broken", &[], &[("initialize-command", "true")])
        .await
        .unwrap();
    let inner = registry.inner().read().await;
    assert_eq!(inner.status("broken"), Some(PluginStatus::Loaded));
    assert_eq!(inner.last_error("broken"), None);
}

/// Dependencies gate activation and deactivation across a chain
#[tokio::test]
async fn test_dependency_chain_activation_rules() {
    let registry = SharedPluginRegistry::new();
    let executor = shell();

    register(&registry, &executor, "storage", &[], &[]).await.unwrap();
    register(&registry, &executor, "metrics", &["storage"], &[]).await.unwrap();
    register(&registry, &executor, "reporting", &["metrics"], &[]).await.unwrap();

    let mut inner = registry.inner().write().await;

    // Cannot activate out of order
    let err = inner.activate("reporting").await.unwrap_err();
    assert!(matches!(err, PluginError::DependencyNotActive { .. }));

    let order = inner
        .resolve_activation_order(&["reporting".to_string()])
        .unwrap();
    assert_eq!(order, vec!["storage", "metrics", "reporting"]);
    for name in &order {
        inner.activate(name).await.unwrap();
    }
    assert_eq!(inner.active_count(), 3);

    // Cannot pull a dependency out from under active dependents
    let err = inner.deactivate("storage").await.unwrap_err();
    match err {
        PluginError::HasActiveDependents { dependents, .. } => {
            assert!(dependents.contains("metrics"));
        }
        other => panic!("Expected HasActiveDependents, got {:?}", other),
    }
    let err = inner.unregister("metrics").await.unwrap_err();
    assert!(matches!(err, PluginError::HasActiveDependents { .. }));

    // Teardown in reverse order works
    inner.deactivate("reporting").await.unwrap();
    inner.deactivate("metrics").await.unwrap();
    inner.deactivate("storage").await.unwrap();
    assert_eq!(inner.active_count(), 0);
}

/// Registration rejects unknown dependencies and duplicate names
#[tokio::test]
async fn test_registration_guards() {
    let registry = SharedPluginRegistry::new();
    let executor = shell();

    let err = register(&registry, &executor, "orphan", &["missing"], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::MissingDependency { .. }));

    register(&registry, &executor, "solo", &[], &[]).await.unwrap();
    let err = register(&registry, &executor, "solo", &[], &[]).await.unwrap_err();
    assert!(matches!(err, PluginError::DuplicateName { .. }));
}

/// Descriptors on disk are discovered, sorted and ready to register
#[tokio::test]
async fn test_descriptor_discovery_from_directory() {
    let dir = TempDir::new().unwrap();
    write_descriptor(&dir, "storage", "name: storage\nversion: 1.0.0\n");
    write_descriptor(
        &dir,
        "metrics",
        "name: metrics\nversion: 1.0.0\ndependencies:\n  - storage\nconfig:\n  initialize-command: \"true\"\n",
    );

    let discovery = DescriptorDiscovery::new(dir.path()).unwrap();
    let descriptors = discovery.discover().await.unwrap();
    let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["metrics", "storage"]);

    // Register in dependency order and bring both up
    let registry = SharedPluginRegistry::new();
    let executor = shell();
    for descriptor in [&descriptors[1], &descriptors[0]] {
        let metadata = descriptor.metadata();
        let plugin = Box::new(CommandPlugin::from_descriptor(descriptor, Arc::clone(&executor)));
        registry.inner().write().await.register(plugin, metadata).await.unwrap();
    }

    let mut inner = registry.inner().write().await;
    inner.activate("storage").await.unwrap();
    inner.activate("metrics").await.unwrap();
    assert!(inner.active_plugins().contains(&"metrics".to_string()));
}

/// Reports expose status, dependencies and recorded errors
#[tokio::test]
async fn test_registry_reports() {
    let registry = SharedPluginRegistry::new();
    let executor = shell();

    register(&registry, &executor, "base", &[], &[]).await.unwrap();
    register(&registry, &executor, "broken", &[], &[("initialize-command", "false")])
        .await
        .unwrap();

    let inner = registry.inner().read().await;
    let reports = inner.report();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].name, "base");
    assert_eq!(reports[0].status, PluginStatus::Loaded);
    assert_eq!(reports[1].name, "broken");
    assert_eq!(reports[1].status, PluginStatus::Failed);
    assert!(reports[1].last_error.is_some());
    assert_eq!(inner.failed_plugins(), vec!["broken".to_string()]);
}

// Helper functions

fn shell() -> Arc<dyn CommandExecutor> {
    Arc::new(ShellExecutor::new())
}

fn metadata_with(name: &str, dependencies: &[&str], config: &[(&str, &str)]) -> PluginMetadata {
    let mut metadata = PluginMetadata::new(name, "1.0.0");
    metadata.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
    metadata.config = config
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    metadata
}

async fn register(
    registry: &SharedPluginRegistry,
    executor: &Arc<dyn CommandExecutor>,
    name: &str,
    dependencies: &[&str],
    config: &[(&str, &str)],
) -> PluginResult<()> {
    let metadata = metadata_with(name, dependencies, config);
    let plugin = Box::new(CommandPlugin::new(metadata.clone(), Arc::clone(executor)));
    registry.inner().write().await.register(plugin, metadata).await
}

fn write_descriptor(dir: &TempDir, name: &str, content: &str) {
    let plugin_dir = dir.path().join(name);
    std::fs::create_dir_all(&plugin_dir).unwrap();
    std::fs::write(plugin_dir.join("plugin.yaml"), content).unwrap();
}
