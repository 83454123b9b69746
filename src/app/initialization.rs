//! Application initialization and configuration

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::automation::{AutomationFacade, TemplateScaffolder};
use crate::pipeline::{CommandExecutor, PipelineEngine, ShellExecutor};
use crate::plugin::{DependencyGraph, DescriptorDiscovery, PluginDescriptor, SharedPluginRegistry};
use crate::tester::TestRunner;
use crate::{cli, config, logging};

/// Directory scanned for descriptors when neither the command line nor the
/// configuration names one
pub const DEFAULT_PLUGIN_DIR: &str = "./plugins";

/// Collaborators shared by every command handler
pub struct AppContext {
    pub facade: AutomationFacade,
    pub executor: Arc<dyn CommandExecutor>,
    pub plugin_dir: PathBuf,
}

pub fn load_configuration(args: &cli::Args) -> Result<config::ConfigManager> {
    let mut manager = if let Some(config_file) = &args.config_file {
        debug!("Loading configuration from explicit file: {}", config_file.display());
        config::ConfigManager::load_from_file(config_file.clone())?
    } else {
        config::ConfigManager::load()?
    };

    if let Some(section_name) = &args.config_name {
        debug!("Selecting configuration section: {}", section_name);
        manager.select_section(section_name.clone());
    }

    Ok(manager)
}

pub fn configure_logging(args: &cli::Args, config: &config::ConfigManager) -> Result<logging::LogConfig> {
    use log::LevelFilter;
    use std::str::FromStr;

    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        match config.get_log_level("base", "console-level") {
            Ok(Some(level)) => level,
            Ok(None) => LevelFilter::Info,
            Err(e) => {
                debug!("Invalid console-level in config, using default: {}", e);
                LevelFilter::Info
            }
        }
    };

    let format = if !args.log_format.is_empty() && args.log_format != "text" {
        logging::LogFormat::from_str(&args.log_format).map_err(|e| anyhow::anyhow!(e))?
    } else {
        match config.get_value("base", "log-format") {
            Some(format_str) => {
                logging::LogFormat::from_str(format_str).unwrap_or(logging::LogFormat::Text)
            }
            None => logging::LogFormat::Text,
        }
    };

    let log_file_path = args
        .log_file
        .clone()
        .or_else(|| config.get_path("base", "log-file"));

    let file_log_level = match &args.log_file_level {
        Some(level_str) => Some(logging::parse_log_level(level_str)?),
        None => match config.get_log_level("base", "file-log-level") {
            Ok(Some(level)) => Some(level),
            Ok(None) => None,
            Err(e) => {
                debug!("Invalid file-log-level in config, using None: {}", e);
                None
            }
        },
    };

    let (destination, file_level) = match (log_file_path.as_ref(), file_log_level) {
        (Some(file_path), Some(level)) => {
            (logging::LogDestination::Both(file_path.clone()), Some(level))
        }
        (Some(file_path), None) => {
            // File sink inherits the console level when none is configured
            (logging::LogDestination::Both(file_path.clone()), Some(console_level))
        }
        (None, None) => (logging::LogDestination::Console, None),
        (None, Some(_)) => {
            // validate_args rejects this combination before we get here
            return Err(anyhow::anyhow!("Log file level specified without log file"));
        }
    };

    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

/// Apply colour overrides before anything writes to the terminal
pub fn configure_colors(args: &cli::Args) {
    if args.no_color {
        colored::control::set_override(false);
    } else if args.color {
        colored::control::set_override(true);
    }
}

/// Wire up the registry, tester, executor, engine and facade from the
/// command line and configuration
pub fn build_automation(args: &cli::Args, config: &config::ConfigManager) -> Result<AppContext> {
    let tester_settings = config.get_tester_settings()?;
    let pipeline_settings = config.get_pipeline_settings()?;

    let tester = match args.test_timeout {
        Some(secs) => Arc::new(TestRunner::with_timeout(Duration::from_secs(secs))),
        None => match tester_settings.timeout {
            Some(timeout) => Arc::new(TestRunner::with_timeout(timeout)),
            None => Arc::new(TestRunner::new()),
        },
    };
    tester.set_verbose(args.verbose || args.debug || tester_settings.verbose);

    let executor: Arc<dyn CommandExecutor> = match &pipeline_settings.working_dir {
        Some(dir) => {
            debug!("Pipeline commands run in {}", dir.display());
            Arc::new(ShellExecutor::with_working_dir(dir))
        }
        None => Arc::new(ShellExecutor::new()),
    };

    let registry = SharedPluginRegistry::new();
    let engine = match pipeline_settings.max_concurrent {
        Some(limit) => PipelineEngine::with_max_concurrent(
            registry.clone(),
            Arc::clone(&tester),
            Arc::clone(&executor),
            limit,
        ),
        None => PipelineEngine::new(registry.clone(), Arc::clone(&tester), Arc::clone(&executor)),
    };

    let plugin_dir = args
        .plugin_dir
        .clone()
        .or_else(|| config.get_plugin_directory())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLUGIN_DIR));

    let scaffold_dir = args.scaffold_dir.clone().unwrap_or_else(|| plugin_dir.clone());
    let scaffolder = Arc::new(TemplateScaffolder::new(&scaffold_dir)?);

    let facade = AutomationFacade::new(
        registry,
        engine,
        tester,
        scaffolder,
        Arc::clone(&executor),
    );

    Ok(AppContext {
        facade,
        executor,
        plugin_dir,
    })
}

/// Discover descriptors under the plugin directory and register them
///
/// A missing directory is not an error; there is simply nothing to load.
/// Returns how many plugins were registered.
pub async fn load_plugins(facade: &AutomationFacade, plugin_dir: &Path) -> Result<usize> {
    if !plugin_dir.exists() {
        debug!(
            "Plugin directory {} does not exist, skipping discovery",
            plugin_dir.display()
        );
        return Ok(0);
    }

    let discovery = DescriptorDiscovery::new(plugin_dir)?;
    let descriptors = discovery.discover().await?;
    register_descriptors(facade, &descriptors).await
}

/// Register parsed descriptors so dependencies come before dependents
///
/// Registration aborts on the first failure. A descriptor that names a
/// dependency no other descriptor provides fails inside the registry with
/// a missing-dependency error, which surfaces here with the plugin name
/// attached.
pub async fn register_descriptors(
    facade: &AutomationFacade,
    descriptors: &[PluginDescriptor],
) -> Result<usize> {
    if descriptors.is_empty() {
        return Ok(0);
    }

    let mut graph = DependencyGraph::new();
    for descriptor in descriptors {
        graph.add_node(&descriptor.name, &descriptor.dependencies);
    }

    let names: Vec<String> = graph.nodes().to_vec();
    let order = graph
        .topological_order(&names)
        .context("Failed to order plugin descriptors for registration")?;

    let by_name: HashMap<&str, &PluginDescriptor> = descriptors
        .iter()
        .map(|d| (d.name.as_str(), d))
        .collect();

    let mut registered = 0;
    for name in &order {
        if let Some(descriptor) = by_name.get(name.as_str()) {
            facade
                .register_descriptor(descriptor)
                .await
                .with_context(|| format!("Failed to register plugin '{}'", name))?;
            registered += 1;
        }
    }

    info!(
        "Registered {} plugin(s) from {} descriptor(s)",
        registered,
        descriptors.len()
    );
    Ok(registered)
}
