//! Plugin Scaffolding
//!
//! Renders new plugin skeletons from Handlebars templates. The facade
//! talks to a narrow `Scaffolder` trait, so tests can substitute a
//! recording implementation.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::Utc;
use handlebars::Handlebars;
use serde::Serialize;
use crate::plugin::traits::PluginMetadata;
use crate::version::get_api_version;
use super::error::{AutomationError, AutomationResult};

/// File name of the descriptor every scaffolded plugin receives.
pub const DESCRIPTOR_FILE_NAME: &str = "plugin.yaml";

const DESCRIPTOR_TEMPLATE: &str = r#"# Plugin descriptor for {{name}}
# Generated {{date}}
name: {{name}}
version: "{{version}}"
description: "{{description}}"
author: "{{author}}"
api_version: {{api_version}}
{{#if has_dependencies}}
dependencies:
{{#each dependencies}}
  - {{this}}
{{/each}}
{{/if}}

# Pipeline commands, uncomment and adjust as needed:
# config:
#   build-command: make build
#   deploy-command: make deploy

tests:
  - name: smoke
    command: "true"
"#;

const README_TEMPLATE: &str = r#"# {{name}}

{{description}}

- Version: {{version}}
- Author: {{author}}
{{#if has_dependencies}}
- Depends on:{{#each dependencies}} {{this}}{{/each}}
{{/if}}

## Layout

`plugin.yaml` declares the plugin's metadata, its pipeline commands and
its test cases. Edit it and drop this directory into the plugin
directory to have the plugin discovered.
"#;

#[derive(Debug, Clone, Serialize)]
struct ScaffoldContext {
    name: String,
    version: String,
    description: String,
    author: String,
    dependencies: Vec<String>,
    has_dependencies: bool,
    api_version: i64,
    date: String,
}

impl ScaffoldContext {
    fn from_metadata(metadata: &PluginMetadata) -> Self {
        Self {
            name: metadata.name.clone(),
            version: metadata.version.clone(),
            description: metadata.description.clone(),
            author: metadata.author.clone(),
            dependencies: metadata.dependencies.clone(),
            has_dependencies: !metadata.dependencies.is_empty(),
            api_version: get_api_version(),
            date: Utc::now().format("%Y-%m-%d").to_string(),
        }
    }
}

/// Generates skeleton files for a new plugin
#[async_trait]
pub trait Scaffolder: Send + Sync {
    /// Create a skeleton for the plugin and return its directory
    async fn scaffold(&self, metadata: &PluginMetadata) -> AutomationResult<PathBuf>;
}

/// Scaffolder rendering descriptor and README from built-in templates
pub struct TemplateScaffolder {
    handlebars: Handlebars<'static>,
    target_dir: PathBuf,
}

impl TemplateScaffolder {
    /// Create a scaffolder writing below the given directory
    pub fn new<P: Into<PathBuf>>(target_dir: P) -> AutomationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string("descriptor", DESCRIPTOR_TEMPLATE)
            .map_err(|e| AutomationError::scaffold_failed(e.to_string()))?;
        handlebars
            .register_template_string("readme", README_TEMPLATE)
            .map_err(|e| AutomationError::scaffold_failed(e.to_string()))?;

        Ok(Self {
            handlebars,
            target_dir: target_dir.into(),
        })
    }

    /// Directory new plugin skeletons are created under
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }
}

#[async_trait]
impl Scaffolder for TemplateScaffolder {
    async fn scaffold(&self, metadata: &PluginMetadata) -> AutomationResult<PathBuf> {
        metadata.validate()?;

        let plugin_dir = self.target_dir.join(&metadata.name);
        if plugin_dir.exists() {
            return Err(AutomationError::scaffold_failed(format!(
                "directory already exists: {}",
                plugin_dir.display()
            )));
        }

        let context = ScaffoldContext::from_metadata(metadata);
        let descriptor = self
            .handlebars
            .render("descriptor", &context)
            .map_err(|e| AutomationError::scaffold_failed(e.to_string()))?;
        let readme = self
            .handlebars
            .render("readme", &context)
            .map_err(|e| AutomationError::scaffold_failed(e.to_string()))?;

        tokio::fs::create_dir_all(&plugin_dir).await?;
        tokio::fs::write(plugin_dir.join(DESCRIPTOR_FILE_NAME), descriptor).await?;
        tokio::fs::write(plugin_dir.join("README.md"), readme).await?;

        log::info!("Scaffolded plugin '{}' at {}", metadata.name, plugin_dir.display());
        Ok(plugin_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use crate::plugin::descriptor::PluginDescriptor;

    fn sample_metadata() -> PluginMetadata {
        PluginMetadata::new("reporting", "0.2.0")
            .with_description("Nightly report generator")
            .with_author("build team")
            .with_dependencies(&["storage", "metrics"])
    }

    #[tokio::test]
    async fn test_scaffold_writes_descriptor_and_readme() {
        let dir = TempDir::new().unwrap();
        let scaffolder = TemplateScaffolder::new(dir.path()).unwrap();

        let plugin_dir = scaffolder.scaffold(&sample_metadata()).await.unwrap();

        assert_eq!(plugin_dir, dir.path().join("reporting"));
        assert!(plugin_dir.join(DESCRIPTOR_FILE_NAME).exists());
        assert!(plugin_dir.join("README.md").exists());

        let readme = std::fs::read_to_string(plugin_dir.join("README.md")).unwrap();
        assert!(readme.contains("# reporting"));
        assert!(readme.contains("Nightly report generator"));
        assert!(readme.contains("storage"));
    }

    #[tokio::test]
    async fn test_scaffolded_descriptor_parses_and_validates() {
        let dir = TempDir::new().unwrap();
        let scaffolder = TemplateScaffolder::new(dir.path()).unwrap();

        let plugin_dir = scaffolder.scaffold(&sample_metadata()).await.unwrap();
        let yaml = std::fs::read_to_string(plugin_dir.join(DESCRIPTOR_FILE_NAME)).unwrap();
        let descriptor = PluginDescriptor::parse_yaml(&yaml).unwrap();
        descriptor.validate().unwrap();

        assert_eq!(descriptor.name, "reporting");
        assert_eq!(descriptor.version, "0.2.0");
        assert_eq!(descriptor.dependencies, vec!["storage", "metrics"]);
        assert_eq!(descriptor.api_version, Some(get_api_version()));
        assert_eq!(descriptor.tests.len(), 1);
        assert_eq!(descriptor.tests[0].name, "smoke");
    }

    #[tokio::test]
    async fn test_scaffold_without_dependencies_omits_section() {
        let dir = TempDir::new().unwrap();
        let scaffolder = TemplateScaffolder::new(dir.path()).unwrap();
        let metadata = PluginMetadata::new("lonely", "1.0.0");

        let plugin_dir = scaffolder.scaffold(&metadata).await.unwrap();
        let yaml = std::fs::read_to_string(plugin_dir.join(DESCRIPTOR_FILE_NAME)).unwrap();
        assert!(!yaml.contains("dependencies:"));

        let descriptor = PluginDescriptor::parse_yaml(&yaml).unwrap();
        assert!(descriptor.dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_scaffold_refuses_existing_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("reporting")).unwrap();
        let scaffolder = TemplateScaffolder::new(dir.path()).unwrap();

        let err = scaffolder.scaffold(&sample_metadata()).await.unwrap_err();
        assert!(matches!(err, AutomationError::ScaffoldFailed { .. }));
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_scaffold_rejects_invalid_metadata() {
        let dir = TempDir::new().unwrap();
        let scaffolder = TemplateScaffolder::new(dir.path()).unwrap();
        let metadata = PluginMetadata::new("", "1.0.0");

        let err = scaffolder.scaffold(&metadata).await.unwrap_err();
        assert!(matches!(err, AutomationError::Plugin(_)));
        assert!(!dir.path().join(DESCRIPTOR_FILE_NAME).exists());
    }
}
