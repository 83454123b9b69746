use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use toml::Value;
use log::{debug, info};

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Pipeline settings sourced from the `[pipeline]` section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSettings {
    /// Maximum concurrent pipeline runs; `None` means one per CPU
    pub max_concurrent: Option<usize>,

    /// Working directory for stage commands
    pub working_dir: Option<PathBuf>,
}

/// Tester settings sourced from the `[tester]` section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TesterSettings {
    /// Per-case timeout; `None` means the runner default
    pub timeout: Option<Duration>,

    /// Log each case result as it completes
    pub verbose: bool,
}

/// Configuration manager
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        let config_paths = discover_config_files();

        for path in config_paths {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using empty configuration");
        Ok(Self {
            config: Configuration::new(),
            config_file_path: None,
            selected_section: None,
        })
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Successfully loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    /// Path of the loaded configuration file, if any
    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: selected_section -> specified section -> base
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    /// Get unsigned integer value with type conversion
    pub fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>> {
        match self.get_value(section, key) {
            Some(value) => {
                let parsed = value.parse::<usize>()
                    .with_context(|| format!("Invalid integer value for {}.{}: {}", section, key, value))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Get a duration in whole seconds with type conversion
    pub fn get_duration_secs(&self, section: &str, key: &str) -> Result<Option<Duration>> {
        match self.get_value(section, key) {
            Some(value) => {
                let secs = value.parse::<u64>()
                    .with_context(|| format!("Invalid seconds value for {}.{}: {}", section, key, value))?;
                Ok(Some(Duration::from_secs(secs)))
            }
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Get pipeline settings from the config file
    pub fn get_pipeline_settings(&self) -> Result<PipelineSettings> {
        let mut settings = PipelineSettings::default();

        if let Some(max_concurrent) = self.get_usize("pipeline", "max-concurrent")? {
            if max_concurrent == 0 {
                return Err(anyhow::anyhow!("pipeline.max-concurrent must be at least 1"));
            }
            settings.max_concurrent = Some(max_concurrent);
        }

        settings.working_dir = self.get_path("pipeline", "working-dir");

        Ok(settings)
    }

    /// Get tester settings from the config file
    pub fn get_tester_settings(&self) -> Result<TesterSettings> {
        let mut settings = TesterSettings::default();

        if let Some(timeout) = self.get_duration_secs("tester", "timeout-secs")? {
            if timeout.is_zero() {
                return Err(anyhow::anyhow!("tester.timeout-secs must be at least 1"));
            }
            settings.timeout = Some(timeout);
        }

        settings.verbose = self.get_bool("tester", "verbose")?.unwrap_or(false);

        Ok(settings)
    }

    /// Get the plugin descriptor directory from the config file
    pub fn get_plugin_directory(&self) -> Option<PathBuf> {
        self.get_path("plugins", "directory")
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $PLUGFORGE_CONFIG
    if let Ok(env_path) = env::var("PLUGFORGE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    // 2. Project local
    paths.push(PathBuf::from("./plugforge.toml"));

    // 3. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("plugforge").join("config.toml"));
    }

    // 4. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".plugforge.toml"));
    }

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: Value = content.parse()
        .context("Failed to parse TOML content")?;

    let mut config = Configuration::new();

    if let Value::Table(table) = toml_value {
        flatten_toml_table(&table, String::new(), &mut config);
    }

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) => {
                if subtable.values().all(|v| !matches!(v, Value::Table(_))) {
                    // Leaf table, becomes a configuration section
                    let mut section_map = HashMap::new();
                    for (subkey, subvalue) in subtable {
                        section_map.insert(subkey.clone(), toml_value_to_string(subvalue));
                    }
                    config.insert(section_name, section_map);
                } else {
                    flatten_toml_table(subtable, section_name, config);
                }
            }
            _ => {
                // Direct key-value pair at the top level
                let mut section_map = HashMap::new();
                section_map.insert("value".to_string(), toml_value_to_string(value));
                config.insert(section_name, section_map);
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
        _ => String::new(),
    }
}
