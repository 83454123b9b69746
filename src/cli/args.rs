use clap::{Parser, ArgAction};
use anyhow::Result;
use regex::Regex;
use std::path::PathBuf;
use log::{debug, info};

/// Plugin lifecycle and automation tool
#[derive(Parser, Debug)]
#[command(name = "plugforge")]
#[command(about = "Manages a registry of plugins with dependency-aware lifecycle control, build/test/deploy pipelines and descriptor-declared test suites")]
#[command(version)]
pub struct Args {
    /// Directory containing plugin descriptors (plugin.yaml files)
    #[arg(short = 'd', long = "plugin-dir", value_name = "PATH")]
    pub plugin_dir: Option<PathBuf>,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Force colored output even when not writing to a terminal
    #[arg(long = "color")]
    pub color: bool,

    // ============ REGISTRY COMMANDS ============

    /// List registered plugins with status and dependencies
    #[arg(long = "list-plugins")]
    pub list_plugins: bool,

    /// Show detailed information for one plugin
    #[arg(long = "plugin-info", value_name = "NAME")]
    pub plugin_info: Option<String>,

    /// Activate a plugin, activating its dependencies first - supports repeated use
    #[arg(long = "activate", value_name = "NAME", action = ArgAction::Append)]
    pub activate: Vec<String>,

    /// Deactivate a plugin (refused while active plugins depend on it)
    #[arg(long = "deactivate", value_name = "NAME")]
    pub deactivate: Option<String>,

    // ============ PIPELINE COMMANDS ============

    /// Run the full build, test, deploy pipeline for a plugin
    #[arg(long = "pipeline", value_name = "NAME")]
    pub pipeline: Option<String>,

    /// Run the build and test stages for a plugin
    #[arg(long = "build-test", value_name = "NAME")]
    pub build_test: Option<String>,

    /// Run the deploy stage for an already-active plugin
    #[arg(long = "deploy", value_name = "NAME")]
    pub deploy: Option<String>,

    // ============ TEST COMMANDS ============

    /// Run registered test cases for a plugin, or for every plugin when no name is given
    #[arg(long = "run-tests", value_name = "PLUGIN", num_args = 0..=1, default_missing_value = "all")]
    pub run_tests: Option<String>,

    /// Only run test cases whose plugin::case path matches the regex
    #[arg(long = "test-filter", value_name = "REGEX")]
    pub test_filter: Option<String>,

    /// Per-case timeout in seconds
    #[arg(long = "test-timeout", value_name = "SECS")]
    pub test_timeout: Option<u64>,

    // ============ SCAFFOLDING ============

    /// Scaffold and register a new plugin skeleton
    #[arg(long = "setup", value_name = "NAME")]
    pub setup: Option<String>,

    /// Dependency of the plugin being set up - supports repeated use
    #[arg(long = "setup-dep", value_name = "NAME", action = ArgAction::Append)]
    pub setup_dep: Vec<String>,

    /// Directory new plugin skeletons are written to (defaults to the plugin directory)
    #[arg(long = "scaffold-dir", value_name = "PATH")]
    pub scaffold_dir: Option<PathBuf>,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    debug!("Parsing command line arguments");
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    debug!("Validating CLI argument combinations");

    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    match args.log_format.to_lowercase().as_str() {
        "text" | "json" => {},
        _ => return Err(anyhow::anyhow!(
            "Invalid log format '{}'. Valid options: text, json", args.log_format
        )),
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace", level
            )),
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    if args.no_color && args.color {
        return Err(anyhow::anyhow!(
            "Conflicting color flags: only one of --color or --no-color may be specified"
        ));
    }

    if let Some(ref pattern) = args.test_filter {
        Regex::new(pattern)
            .map_err(|e| anyhow::anyhow!("Invalid --test-filter regex '{}': {}", pattern, e))?;
    }

    if args.test_timeout == Some(0) {
        return Err(anyhow::anyhow!("--test-timeout must be at least 1 second"));
    }

    if args.setup.is_none() && !args.setup_dep.is_empty() {
        return Err(anyhow::anyhow!("--setup-dep requires --setup to be specified"));
    }

    if args.setup.is_none() && args.scaffold_dir.is_some() {
        return Err(anyhow::anyhow!("--scaffold-dir requires --setup to be specified"));
    }

    info!("CLI arguments validated successfully");
    Ok(())
}
