//! Plugin Descriptors
//!
//! YAML descriptor format for file-based plugins, plus directory discovery.
//! A descriptor carries the plugin metadata, optional pipeline commands and
//! the test cases the plugin declares.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use tokio::fs;
use super::error::{PluginError, PluginResult};
use super::traits::PluginMetadata;

/// A test case declared by a descriptor
///
/// The command is run through the pipeline's command executor; a non-zero
/// exit status fails the case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorTest {
    /// Case name, unique within the descriptor
    pub name: String,

    /// Shell command to execute
    pub command: String,
}

/// Parsed plugin descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin name (unique identifier)
    pub name: String,

    /// Plugin version
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Plugin author
    #[serde(default)]
    pub author: String,

    /// API version the plugin targets, YYYYMMDD
    ///
    /// Omitted means the plugin accepts whatever the host provides.
    #[serde(default)]
    pub api_version: Option<i64>,

    /// Names of plugins this plugin depends on
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Free-form configuration entries (stage commands, working dir, ...)
    #[serde(default)]
    pub config: HashMap<String, String>,

    /// Declared test cases, run in declaration order
    #[serde(default)]
    pub tests: Vec<DescriptorTest>,

    /// Where the descriptor was loaded from
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl PluginDescriptor {
    /// Parse a descriptor from YAML content
    pub fn parse_yaml(content: &str) -> PluginResult<Self> {
        let descriptor: PluginDescriptor = serde_yaml::from_str(content)?;
        Ok(descriptor)
    }

    /// Validate the descriptor
    ///
    /// Applies the metadata rules plus descriptor-specific checks: test
    /// names must be unique and test commands non-empty.
    pub fn validate(&self) -> PluginResult<()> {
        self.metadata().validate()?;

        let mut seen = Vec::new();
        for test in &self.tests {
            if test.name.trim().is_empty() {
                return Err(PluginError::descriptor_parse(
                    format!("plugin '{}' declares a test with an empty name", self.name)
                ));
            }
            if test.command.trim().is_empty() {
                return Err(PluginError::descriptor_parse(
                    format!("test '{}' of plugin '{}' has an empty command", test.name, self.name)
                ));
            }
            if seen.contains(&test.name) {
                return Err(PluginError::descriptor_parse(
                    format!("plugin '{}' declares test '{}' more than once", self.name, test.name)
                ));
            }
            seen.push(test.name.clone());
        }
        Ok(())
    }

    /// Build registration metadata from the descriptor
    pub fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: self.name.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            dependencies: self.dependencies.clone(),
            config: self.config.clone(),
        }
    }
}

/// File-based descriptor discovery
#[derive(Debug, Clone)]
pub struct DescriptorDiscovery {
    plugin_directory: PathBuf,
}

impl DescriptorDiscovery {
    /// Create a discovery instance over a plugin directory
    pub fn new<P: AsRef<Path>>(plugin_directory: P) -> PluginResult<Self> {
        let path = plugin_directory.as_ref().to_path_buf();

        if !path.exists() {
            return Err(PluginError::descriptor_parse(format!(
                "Plugin directory does not exist: {}",
                path.display()
            )));
        }
        if !path.is_dir() {
            return Err(PluginError::descriptor_parse(format!(
                "Plugin path is not a directory: {}",
                path.display()
            )));
        }

        Ok(Self { plugin_directory: path })
    }

    /// The directory being scanned
    pub fn plugin_directory(&self) -> &Path {
        &self.plugin_directory
    }

    /// Recursively scan the plugin directory for descriptors
    ///
    /// Files that are not valid descriptors are skipped; other YAML files
    /// may legitimately live next to plugins. Results are sorted by
    /// plugin name so discovery order does not depend on the filesystem.
    pub async fn discover(&self) -> PluginResult<Vec<PluginDescriptor>> {
        let mut descriptors = Vec::new();
        let mut directories_to_scan = vec![self.plugin_directory.clone()];

        while let Some(current_dir) = directories_to_scan.pop() {
            let mut entries = fs::read_dir(&current_dir).await.map_err(|e| {
                PluginError::descriptor_parse(format!(
                    "Failed to read directory {}: {}",
                    current_dir.display(),
                    e
                ))
            })?;

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                PluginError::descriptor_parse(format!("Failed to read directory entry: {}", e))
            })? {
                let path = entry.path();

                if path.is_dir() {
                    directories_to_scan.push(path);
                } else if is_yaml_file(&path) {
                    match self.load_descriptor(&path).await {
                        Ok(descriptor) => descriptors.push(descriptor),
                        Err(e) => {
                            log::debug!("Skipping {}: {}", path.display(), e);
                            continue;
                        }
                    }
                }
            }
        }

        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(descriptors)
    }

    /// Load and validate a single descriptor file
    pub async fn load_descriptor(&self, file_path: &Path) -> PluginResult<PluginDescriptor> {
        let content = fs::read_to_string(file_path).await.map_err(|e| {
            PluginError::descriptor_parse(format!(
                "Failed to read file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        let mut descriptor = PluginDescriptor::parse_yaml(&content)?;
        descriptor.file_path = Some(file_path.to_path_buf());
        descriptor.validate()?;
        Ok(descriptor)
    }
}

fn is_yaml_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}
