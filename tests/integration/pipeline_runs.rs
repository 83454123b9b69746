//! Integration tests for concurrent pipeline runs
//!
//! Runs real shell commands through the engine so the build, test and
//! deploy stages execute end to end, including the single-flight and
//! concurrency-limit guarantees.

use std::sync::Arc;

use plugforge::pipeline::{
    CommandExecutor, PipelineEngine, PipelineError, PipelineStage, ShellExecutor, StageSet,
};
use plugforge::plugin::{CommandPlugin, PluginMetadata, SharedPluginRegistry};
use plugforge::tester::TestRunner;

/// Build, test and deploy run in order and accumulate their output
#[tokio::test]
async fn test_full_pipeline_with_shell_commands() {
    let (engine, tester, registry) = engine_for(&[(
        "alpha",
        &[("build-command", "echo building alpha"), ("deploy-command", "true")],
    )])
    .await;
    registry.inner().write().await.activate("alpha").await.unwrap();
    tester.add_test_case("alpha", "smoke", || async { Ok(()) }).unwrap();

    let handle = engine.run("alpha").await.unwrap();
    assert_eq!(handle.plugin_name(), "alpha");

    let status = handle.await.unwrap();
    assert!(status.success);
    assert_eq!(status.stage, PipelineStage::Deploy);
    assert!(status.output.contains("[build] building alpha"));
    assert!(status.output.contains("[test] 1 case(s) passed"));
    assert!(status.output.contains("[deploy] ok"));
}

/// A failing build command fails the run with the exit detail recorded
#[tokio::test]
async fn test_failing_build_command_records_detail() {
    let (engine, _tester, _registry) = engine_for(&[(
        "alpha",
        &[("build-command", "echo boom >&2; exit 3")],
    )])
    .await;

    let status = engine
        .run_stages("alpha", StageSet::build_and_test())
        .await
        .unwrap()
        .await
        .unwrap();

    assert!(status.is_failed());
    assert_eq!(status.stage, PipelineStage::Build);
    assert!(status.error.contains("exit code 3"));
    assert!(status.error.contains("boom"));
}

/// Deploying requires the plugin and its whole dependency chain active
#[tokio::test]
async fn test_deploy_stage_gated_on_active_chain() {
    let (engine, _tester, registry) = engine_for(&[
        ("storage", &[]),
        ("alpha", &[("deploy-command", "true")]),
    ])
    .await;

    // alpha depends on storage, neither is active yet
    let status = engine
        .run_stages("alpha", StageSet::DEPLOY)
        .await
        .unwrap()
        .await
        .unwrap();
    assert!(status.is_failed());
    assert!(status.error.contains("is not active"));

    {
        let mut inner = registry.inner().write().await;
        inner.activate("storage").await.unwrap();
        inner.activate("alpha").await.unwrap();
    }

    let status = engine
        .run_stages("alpha", StageSet::DEPLOY)
        .await
        .unwrap()
        .await
        .unwrap();
    assert!(status.success);
    assert!(status.output.contains("[deploy] ok"));
}

/// Only one run per plugin may be in flight at a time
#[tokio::test]
async fn test_single_flight_per_plugin() {
    let (engine, _tester, _registry) = engine_for(&[(
        "alpha",
        &[("build-command", "sleep 0.3")],
    )])
    .await;

    let first = engine
        .run_stages("alpha", StageSet::BUILD)
        .await
        .unwrap();
    assert!(engine.is_running("alpha"));

    let second = engine.run_stages("alpha", StageSet::BUILD).await;
    assert!(matches!(second.unwrap_err(), PipelineError::AlreadyRunning { .. }));

    let status = first.await.unwrap();
    assert!(status.success);
    assert!(!engine.is_running("alpha"));
}

/// A limit of one still drains every queued run
#[tokio::test]
async fn test_concurrency_limit_queues_runs() {
    let registry = SharedPluginRegistry::new();
    let executor: Arc<dyn CommandExecutor> = Arc::new(ShellExecutor::new());
    register_plugins(
        &registry,
        &executor,
        &[
            ("alpha", &[("build-command", "sleep 0.1")]),
            ("beta", &[("build-command", "sleep 0.1")]),
        ],
    )
    .await;
    let tester = Arc::new(TestRunner::new());
    let engine = PipelineEngine::with_max_concurrent(registry, tester, executor, 1);
    assert_eq!(engine.max_concurrent(), 1);

    let first = engine.run_stages("alpha", StageSet::BUILD).await.unwrap();
    let second = engine.run_stages("beta", StageSet::BUILD).await.unwrap();

    let (first, second) = tokio::join!(first, second);
    assert!(first.unwrap().success);
    assert!(second.unwrap().success);

    let statuses = engine.statuses().await;
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().all(|s| s.is_finished()));
}

/// The status board keeps the most recent run per plugin
#[tokio::test]
async fn test_status_board_replaced_per_run() {
    let (engine, tester, _registry) = engine_for(&[("alpha", &[])]).await;
    tester
        .add_test_case("alpha", "flaky", || async { Err("not today".to_string()) })
        .unwrap();

    let failed = engine
        .run_stages("alpha", StageSet::TEST)
        .await
        .unwrap()
        .await
        .unwrap();
    assert!(failed.is_failed());

    tester.remove_test_case("alpha", "flaky").unwrap();

    let passed = engine
        .run_stages("alpha", StageSet::TEST)
        .await
        .unwrap()
        .await
        .unwrap();
    assert!(passed.success);
    assert_ne!(failed.run_id, passed.run_id);

    let board = engine.status("alpha").await.unwrap();
    assert_eq!(board.run_id, passed.run_id);
    assert!(board.success);
}

// Helper functions

type PluginSpec<'a> = (&'a str, &'a [(&'a str, &'a str)]);

async fn engine_for(
    plugins: &[PluginSpec<'_>],
) -> (PipelineEngine, Arc<TestRunner>, SharedPluginRegistry) {
    let registry = SharedPluginRegistry::new();
    let executor: Arc<dyn CommandExecutor> = Arc::new(ShellExecutor::new());
    register_plugins(&registry, &executor, plugins).await;

    let tester = Arc::new(TestRunner::new());
    let engine = PipelineEngine::with_max_concurrent(
        registry.clone(),
        Arc::clone(&tester),
        executor,
        4,
    );
    (engine, tester, registry)
}

/// Registers plugins in order; every plugin after the first depends on
/// the one before it
async fn register_plugins(
    registry: &SharedPluginRegistry,
    executor: &Arc<dyn CommandExecutor>,
    plugins: &[PluginSpec<'_>],
) {
    let mut previous: Option<String> = None;
    for (name, config) in plugins {
        let mut metadata = PluginMetadata::new(*name, "1.0.0");
        if let Some(dep) = &previous {
            metadata.dependencies = vec![dep.clone()];
        }
        metadata.config = config
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let plugin = Box::new(CommandPlugin::new(metadata.clone(), Arc::clone(executor)));
        registry
            .inner()
            .write()
            .await
            .register(plugin, metadata)
            .await
            .unwrap();
        previous = Some(name.to_string());
    }
}
