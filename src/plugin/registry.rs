//! Plugin Registry
//!
//! Manages plugin registration, lifecycle transitions and dependency-aware
//! lookups. The registry owns every plugin instance together with its
//! metadata and authoritative status, and keeps the dependency graph in
//! step with registration and removal.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::plugin::traits::{Plugin, PluginMetadata, PluginStatus};
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::graph::DependencyGraph;

/// A registered plugin with its bookkeeping
struct PluginEntry {
    plugin: Box<dyn Plugin>,
    metadata: PluginMetadata,
    status: PluginStatus,
    last_error: Option<String>,
}

/// Snapshot of one registry entry for reporting and display
#[derive(Debug, Clone)]
pub struct PluginReport {
    pub name: String,
    pub version: String,
    pub description: String,
    pub status: PluginStatus,
    pub dependencies: Vec<String>,
    pub last_error: Option<String>,
}

/// Registry for managing plugin instances and their lifecycle
pub struct PluginRegistry {
    /// Registered plugins by name
    entries: HashMap<String, PluginEntry>,

    /// Dependency graph mirroring the registered metadata
    graph: DependencyGraph,
}

impl PluginRegistry {
    /// Create a new plugin registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            graph: DependencyGraph::new(),
        }
    }

    /// Register a plugin under the metadata's name
    ///
    /// Validates the metadata, checks that every declared dependency is
    /// already registered and that no cycle would form, then runs the
    /// plugin's `initialize` hook. An initialize failure leaves the plugin
    /// registered in failed status; the registration itself still
    /// succeeds and the failure is recorded against the entry.
    pub async fn register(&mut self, plugin: Box<dyn Plugin>, metadata: PluginMetadata) -> PluginResult<()> {
        metadata.validate()?;
        let name = metadata.name.clone();

        if self.entries.contains_key(&name) {
            return Err(PluginError::duplicate_name(&name));
        }
        for dependency in &metadata.dependencies {
            if !self.entries.contains_key(dependency) {
                return Err(PluginError::missing_dependency(&name, dependency));
            }
        }
        if self.graph.would_create_cycle(&name, &metadata.dependencies) {
            return Err(PluginError::cyclic_dependency(
                format!("registering '{}' would close a dependency cycle", name)
            ));
        }

        self.graph.add_node(&name, &metadata.dependencies);
        let version = metadata.version.clone();
        self.entries.insert(name.clone(), PluginEntry {
            plugin,
            metadata,
            status: PluginStatus::Loading,
            last_error: None,
        });
        log::debug!("Plugin '{}' registered, initializing", name);

        if let Some(entry) = self.entries.get_mut(&name) {
            let metadata = entry.metadata.clone();
            match entry.plugin.initialize(&metadata).await {
                Ok(()) => {
                    entry.status = PluginStatus::Loaded;
                    log::info!("Plugin '{}' v{} loaded", name, version);
                }
                Err(e) => {
                    entry.status = PluginStatus::Failed;
                    entry.last_error = Some(e.to_string());
                    log::warn!("Plugin '{}' failed to initialize: {}", name, e);
                }
            }
        }
        Ok(())
    }

    /// Unregister a plugin, running deactivate (when active) and shutdown
    ///
    /// Refused while any active plugin depends on it. Once the guards
    /// pass the plugin always comes out: lifecycle hook failures during
    /// teardown are logged, not propagated.
    pub async fn unregister(&mut self, name: &str) -> PluginResult<()> {
        if !self.entries.contains_key(name) {
            return Err(PluginError::not_found(name));
        }
        let active_dependents = self.active_dependents(name);
        if !active_dependents.is_empty() {
            return Err(PluginError::has_active_dependents(name, &active_dependents));
        }

        if let Some(mut entry) = self.entries.remove(name) {
            let was_active = entry.status == PluginStatus::Active;
            entry.status = PluginStatus::Unloading;
            if was_active {
                if let Err(e) = entry.plugin.deactivate().await {
                    log::warn!("Plugin '{}' failed to deactivate during unregister: {}", name, e);
                }
            }
            if let Err(e) = entry.plugin.shutdown().await {
                log::warn!("Plugin '{}' failed to shut down cleanly: {}", name, e);
            }
        }
        self.graph.remove_node(name);
        log::info!("Plugin '{}' unregistered", name);
        Ok(())
    }

    /// Activate a plugin
    ///
    /// Requires every direct dependency to be active. Activating an
    /// already active plugin is a no-op. Failed plugins cannot be
    /// activated; they must be unregistered and registered again.
    pub async fn activate(&mut self, name: &str) -> PluginResult<()> {
        let status = match self.entries.get(name) {
            Some(entry) => entry.status,
            None => return Err(PluginError::not_found(name)),
        };
        if status == PluginStatus::Active {
            return Ok(());
        }
        if !status.can_activate() {
            return Err(PluginError::activation_failed(
                name,
                format!("cannot activate from status '{}'", status)
            ));
        }

        for dependency in self.graph.dependencies_of(name).to_vec() {
            let dependency_active = self.entries
                .get(&dependency)
                .map(|e| e.status == PluginStatus::Active)
                .unwrap_or(false);
            if !dependency_active {
                return Err(PluginError::dependency_not_active(name, dependency));
            }
        }

        match self.entries.get_mut(name) {
            Some(entry) => match entry.plugin.activate().await {
                Ok(()) => {
                    entry.status = PluginStatus::Active;
                    log::info!("Plugin '{}' activated", name);
                    Ok(())
                }
                Err(e) => {
                    entry.status = PluginStatus::Failed;
                    entry.last_error = Some(e.to_string());
                    log::warn!("Plugin '{}' failed to activate: {}", name, e);
                    Err(PluginError::activation_failed(name, e.to_string()))
                }
            },
            None => Err(PluginError::not_found(name)),
        }
    }

    /// Deactivate a plugin
    ///
    /// Refused while any active plugin depends on it. Deactivating a
    /// plugin that is not active is a no-op. If the plugin's deactivate
    /// hook fails the plugin is marked failed but the call still
    /// succeeds: the plugin is no longer active either way.
    pub async fn deactivate(&mut self, name: &str) -> PluginResult<()> {
        let status = match self.entries.get(name) {
            Some(entry) => entry.status,
            None => return Err(PluginError::not_found(name)),
        };
        if status != PluginStatus::Active {
            return Ok(());
        }
        let active_dependents = self.active_dependents(name);
        if !active_dependents.is_empty() {
            return Err(PluginError::has_active_dependents(name, &active_dependents));
        }

        if let Some(entry) = self.entries.get_mut(name) {
            match entry.plugin.deactivate().await {
                Ok(()) => {
                    entry.status = PluginStatus::Inactive;
                    log::info!("Plugin '{}' deactivated", name);
                }
                Err(e) => {
                    entry.status = PluginStatus::Failed;
                    entry.last_error = Some(e.to_string());
                    log::warn!("Plugin '{}' deactivate hook failed, marking failed: {}", name, e);
                }
            }
        }
        Ok(())
    }

    /// Get a plugin by name (immutable)
    pub fn get_plugin(&self, name: &str) -> Option<&dyn Plugin> {
        self.entries.get(name).map(|e| e.plugin.as_ref())
    }

    /// Get the registered metadata for a plugin
    pub fn metadata(&self, name: &str) -> Option<&PluginMetadata> {
        self.entries.get(name).map(|e| &e.metadata)
    }

    /// Get the authoritative status of a plugin
    pub fn status(&self, name: &str) -> Option<PluginStatus> {
        self.entries.get(name).map(|e| e.status)
    }

    /// Last recorded lifecycle error for a plugin, if any
    pub fn last_error(&self, name: &str) -> Option<String> {
        self.entries.get(name).and_then(|e| e.last_error.clone())
    }

    /// List all registered plugin names in registration order
    pub fn list_plugins(&self) -> Vec<String> {
        self.graph.nodes().to_vec()
    }

    /// List active plugin names in registration order
    pub fn active_plugins(&self) -> Vec<String> {
        self.filter_by_status(PluginStatus::Active)
    }

    /// List failed plugin names in registration order
    pub fn failed_plugins(&self) -> Vec<String> {
        self.filter_by_status(PluginStatus::Failed)
    }

    /// Direct dependents of a plugin, in registration order
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.graph.dependents_of(name).to_vec()
    }

    /// Transitive dependencies of a plugin followed by the plugin itself,
    /// each entry after everything it depends on
    pub fn dependency_chain(&self, name: &str) -> PluginResult<Vec<String>> {
        if !self.entries.contains_key(name) {
            return Err(PluginError::not_found(name));
        }
        self.graph.dependency_chain(name)
    }

    /// Compute an activation order covering the given plugins and all of
    /// their transitive dependencies
    ///
    /// Dependencies come before dependents; ties resolve to registration
    /// order, so the result is deterministic for a given registry.
    pub fn resolve_activation_order(&self, names: &[String]) -> PluginResult<Vec<String>> {
        for name in names {
            if !self.entries.contains_key(name) {
                return Err(PluginError::not_found(name));
            }
        }
        self.graph.topological_order(names)
    }

    /// Get the count of registered plugins
    pub fn plugin_count(&self) -> usize {
        self.entries.len()
    }

    /// Get the count of active plugins
    pub fn active_count(&self) -> usize {
        self.entries.values().filter(|e| e.status == PluginStatus::Active).count()
    }

    /// Reports for every registered plugin in registration order
    pub fn report(&self) -> Vec<PluginReport> {
        self.graph
            .nodes()
            .iter()
            .filter_map(|name| self.report_for(name))
            .collect()
    }

    /// Report for a single plugin
    pub fn report_for(&self, name: &str) -> Option<PluginReport> {
        self.entries.get(name).map(|entry| PluginReport {
            name: entry.metadata.name.clone(),
            version: entry.metadata.version.clone(),
            description: entry.metadata.description.clone(),
            status: entry.status,
            dependencies: entry.metadata.dependencies.clone(),
            last_error: entry.last_error.clone(),
        })
    }

    fn filter_by_status(&self, status: PluginStatus) -> Vec<String> {
        self.graph
            .nodes()
            .iter()
            .filter(|name| {
                self.entries
                    .get(name.as_str())
                    .map(|e| e.status == status)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn active_dependents(&self, name: &str) -> Vec<String> {
        self.graph
            .dependents_of(name)
            .iter()
            .filter(|dependent| {
                self.entries
                    .get(dependent.as_str())
                    .map(|e| e.status == PluginStatus::Active)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe plugin registry wrapper
pub struct SharedPluginRegistry {
    inner: Arc<RwLock<PluginRegistry>>,
}

impl SharedPluginRegistry {
    /// Create a new shared plugin registry
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(PluginRegistry::new())),
        }
    }

    /// Get the inner registry for direct access
    pub fn inner(&self) -> &Arc<RwLock<PluginRegistry>> {
        &self.inner
    }

    /// Clone the Arc for sharing
    pub fn clone_inner(&self) -> Arc<RwLock<PluginRegistry>> {
        Arc::clone(&self.inner)
    }

    /// Whether a plugin is currently active
    pub async fn is_active(&self, name: &str) -> bool {
        self.inner.read().await.status(name) == Some(PluginStatus::Active)
    }
}

impl Clone for SharedPluginRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for SharedPluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
