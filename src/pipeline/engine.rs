//! Pipeline Engine
//!
//! Runs build, test and deploy stages for plugins as spawned tasks.
//! Admission enforces one in-flight run per plugin while different
//! plugins proceed in parallel under a global concurrency limit. Every
//! run updates a shared status board that can be observed while the run
//! is still executing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use pin_project::pin_project;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;
use crate::plugin::registry::SharedPluginRegistry;
use crate::plugin::traits::PluginStatus;
use crate::tester::{TestResult, TestRunner};
use super::error::{PipelineError, PipelineResult};
use super::executor::CommandExecutor;
use super::status::{PipelineStage, PipelineStatus as RunStatus, StageSet};

/// Handle to one admitted pipeline run
///
/// Resolves to the run's final status once every requested stage has
/// finished or one of them has failed. The run proceeds whether or not
/// the handle is awaited; dropping the handle never cancels the run.
#[pin_project]
#[derive(Debug)]
pub struct PipelineHandle {
    plugin_name: String,
    run_id: Uuid,
    #[pin]
    handle: JoinHandle<RunStatus>,
}

impl PipelineHandle {
    /// Plugin this run targets
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Unique id of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl Future for PipelineHandle {
    type Output = PipelineResult<RunStatus>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.handle.poll(cx) {
            Poll::Ready(Ok(status)) => Poll::Ready(Ok(status)),
            Poll::Ready(Err(join_err)) => Poll::Ready(Err(PipelineError::from(join_err))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Engine coordinating concurrent pipeline runs
pub struct PipelineEngine {
    registry: SharedPluginRegistry,
    tester: Arc<TestRunner>,
    executor: Arc<dyn CommandExecutor>,
    statuses: Arc<RwLock<HashMap<String, RunStatus>>>,
    in_flight: Arc<DashMap<String, Uuid>>,
    limiter: Arc<Semaphore>,
    max_concurrent: usize,
}

impl PipelineEngine {
    /// Create an engine with one concurrency permit per logical CPU
    pub fn new(
        registry: SharedPluginRegistry,
        tester: Arc<TestRunner>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self::with_max_concurrent(registry, tester, executor, num_cpus::get())
    }

    /// Create an engine with an explicit concurrency limit
    pub fn with_max_concurrent(
        registry: SharedPluginRegistry,
        tester: Arc<TestRunner>,
        executor: Arc<dyn CommandExecutor>,
        max_concurrent: usize,
    ) -> Self {
        let permits = max_concurrent.max(1);
        Self {
            registry,
            tester,
            executor,
            statuses: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(DashMap::new()),
            limiter: Arc::new(Semaphore::new(permits)),
            max_concurrent: permits,
        }
    }

    /// The configured concurrency limit
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run the full build, test, deploy pipeline for a plugin
    pub async fn run(&self, plugin_name: &str) -> PipelineResult<PipelineHandle> {
        self.run_stages(plugin_name, StageSet::all()).await
    }

    /// Run a subset of pipeline stages for a plugin
    ///
    /// Returns immediately with a handle once the run is admitted. At
    /// most one run per plugin may be in flight; a second request while
    /// one is running is rejected rather than queued. When the global
    /// concurrency limit is saturated the admitted run waits for a
    /// permit inside its own task, with its status showing in progress.
    pub async fn run_stages(&self, plugin_name: &str, stages: StageSet) -> PipelineResult<PipelineHandle> {
        let first_stage = match stages.stages().first() {
            Some(stage) => *stage,
            None => return Err(PipelineError::internal("no stages requested")),
        };

        if self.registry.inner().read().await.status(plugin_name).is_none() {
            return Err(PipelineError::plugin_not_found(plugin_name));
        }

        let run_id = Uuid::new_v4();
        match self.in_flight.entry(plugin_name.to_string()) {
            Entry::Occupied(_) => {
                return Err(PipelineError::already_running(plugin_name));
            }
            Entry::Vacant(slot) => {
                slot.insert(run_id);
            }
        }

        // status appears on the board atomically with admission
        let status = RunStatus::started(plugin_name, run_id, first_stage);
        self.statuses.write().await.insert(plugin_name.to_string(), status.clone());

        let worker = PipelineWorker {
            status,
            registry: self.registry.clone(),
            tester: Arc::clone(&self.tester),
            executor: Arc::clone(&self.executor),
            statuses: Arc::clone(&self.statuses),
        };
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            plugin_name: plugin_name.to_string(),
        };
        let limiter = Arc::clone(&self.limiter);

        log::info!(
            "Pipeline {} admitted for plugin '{}' ({} stage(s))",
            run_id,
            plugin_name,
            stages.stages().len()
        );

        let handle = tokio::spawn(async move {
            let _guard = guard;
            match limiter.acquire_owned().await {
                Ok(_permit) => worker.execute(stages).await,
                Err(_) => {
                    worker
                        .abandon(PipelineError::internal("failed to acquire pipeline permit"))
                        .await
                }
            }
        });

        Ok(PipelineHandle {
            plugin_name: plugin_name.to_string(),
            run_id,
            handle,
        })
    }

    /// Status of the most recent run for a plugin, if any
    pub async fn status(&self, plugin_name: &str) -> Option<RunStatus> {
        self.statuses.read().await.get(plugin_name).cloned()
    }

    /// Snapshot of the whole status board, sorted by plugin name
    pub async fn statuses(&self) -> Vec<RunStatus> {
        let mut all: Vec<RunStatus> = self.statuses.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.plugin_name.cmp(&b.plugin_name));
        all
    }

    /// Whether a run is currently in flight for the plugin
    pub fn is_running(&self, plugin_name: &str) -> bool {
        self.in_flight.contains_key(plugin_name)
    }

    /// Number of runs currently in flight
    pub fn running_count(&self) -> usize {
        self.in_flight.len()
    }
}

impl Clone for PipelineEngine {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            tester: Arc::clone(&self.tester),
            executor: Arc::clone(&self.executor),
            statuses: Arc::clone(&self.statuses),
            in_flight: Arc::clone(&self.in_flight),
            limiter: Arc::clone(&self.limiter),
            max_concurrent: self.max_concurrent,
        }
    }
}

/// Clears the per-plugin admission slot when the run's task ends,
/// however it ends
struct InFlightGuard {
    in_flight: Arc<DashMap<String, Uuid>>,
    plugin_name: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.plugin_name);
    }
}

/// State carried by one spawned pipeline run
struct PipelineWorker {
    status: RunStatus,
    registry: SharedPluginRegistry,
    tester: Arc<TestRunner>,
    executor: Arc<dyn CommandExecutor>,
    statuses: Arc<RwLock<HashMap<String, RunStatus>>>,
}

impl PipelineWorker {
    async fn execute(mut self, stages: StageSet) -> RunStatus {
        for stage in stages.stages() {
            self.status.stage = stage;
            self.publish().await;

            let outcome = match stage {
                PipelineStage::Build => self.build_stage().await,
                PipelineStage::Test => self.test_stage().await,
                PipelineStage::Deploy => self.deploy_stage().await,
            };

            match outcome {
                Ok(note) => {
                    self.status.push_output(&note);
                    self.publish().await;
                }
                Err(e) => {
                    log::warn!(
                        "Pipeline {} for plugin '{}' failed in {} stage: {}",
                        self.status.run_id,
                        self.status.plugin_name,
                        stage,
                        e
                    );
                    self.status.finish_failure(e.to_string());
                    self.publish().await;
                    return self.status;
                }
            }
        }

        log::info!(
            "Pipeline {} for plugin '{}' succeeded",
            self.status.run_id,
            self.status.plugin_name
        );
        self.status.finish_success();
        self.publish().await;
        self.status
    }

    /// Fail the run before any stage has started
    async fn abandon(mut self, error: PipelineError) -> RunStatus {
        log::warn!(
            "Pipeline {} for plugin '{}' abandoned: {}",
            self.status.run_id,
            self.status.plugin_name,
            error
        );
        self.status.finish_failure(error.to_string());
        self.publish().await;
        self.status
    }

    /// Copy the run's current status onto the shared board
    async fn publish(&self) {
        self.statuses
            .write()
            .await
            .insert(self.status.plugin_name.clone(), self.status.clone());
    }

    async fn build_stage(&self) -> PipelineResult<String> {
        let plugin_name = &self.status.plugin_name;
        let command = {
            let registry = self.registry.inner().read().await;
            match registry.metadata(plugin_name) {
                Some(metadata) => metadata.build_command().map(str::to_string),
                None => return Err(PipelineError::plugin_not_found(plugin_name)),
            }
        };

        match command {
            Some(command) => {
                let output = self.executor.execute(&command).await;
                if output.success() {
                    Ok(stage_note(PipelineStage::Build, &output.stdout))
                } else {
                    Err(PipelineError::build_failed(plugin_name, output.failure_detail()))
                }
            }
            None => Ok("[build] skipped: no build-command configured".to_string()),
        }
    }

    async fn test_stage(&mut self) -> PipelineResult<String> {
        let plugin_name = self.status.plugin_name.clone();
        if self.tester.case_count_for(&plugin_name) == 0 {
            return Ok("[test] skipped: no test cases registered".to_string());
        }

        let results = self.tester.run_plugin(&plugin_name).await;
        let failed: Vec<&TestResult> = results.iter().filter(|r| !r.passed).collect();

        if failed.is_empty() {
            Ok(format!("[test] {} case(s) passed", results.len()))
        } else {
            let names: Vec<&str> = failed.iter().map(|r| r.test_name.as_str()).collect();
            self.status
                .push_output(&format!("[test] failed: {}", names.join(", ")));
            let detail: Vec<String> = failed
                .iter()
                .map(|r| format!("{}: {}", r.test_name, r.message))
                .collect();
            Err(PipelineError::test_failed(
                &plugin_name,
                format!("{}/{} case(s) failed ({})", failed.len(), results.len(), detail.join("; ")),
            ))
        }
    }

    async fn deploy_stage(&self) -> PipelineResult<String> {
        let plugin_name = &self.status.plugin_name;
        let command = {
            let registry = self.registry.inner().read().await;
            let chain = registry
                .dependency_chain(plugin_name)
                .map_err(|_| PipelineError::plugin_not_found(plugin_name))?;
            for member in &chain {
                if registry.status(member) != Some(PluginStatus::Active) {
                    return Err(PipelineError::dependency_not_active(plugin_name, member));
                }
            }
            registry
                .metadata(plugin_name)
                .and_then(|m| m.deploy_command().map(str::to_string))
        };

        match command {
            Some(command) => {
                let output = self.executor.execute(&command).await;
                if output.success() {
                    Ok(stage_note(PipelineStage::Deploy, &output.stdout))
                } else {
                    Err(PipelineError::deploy_failed(plugin_name, output.failure_detail()))
                }
            }
            None => Ok("[deploy] skipped: no deploy-command configured".to_string()),
        }
    }
}

fn stage_note(stage: PipelineStage, stdout: &str) -> String {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        format!("[{}] ok", stage)
    } else {
        format!("[{}] {}", stage, trimmed)
    }
}
