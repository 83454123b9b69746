mod app;
mod automation;
mod cli;
mod config;
mod logging;
mod pipeline;
mod plugin;
mod tester;
mod version;

use anyhow::Result;
use log::{debug, error};
use std::process;

use crate::automation::AutomationError;
use crate::pipeline::PipelineError;
use crate::plugin::PluginError;
use crate::tester::TesterError;

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {:?}", panic_info);
        eprintln!("Panic: {:?}", panic_info);
        process::exit(101);
    }));

    if let Err(e) = run() {
        if is_user_error(&e) {
            // Domain errors carry their own message, keep stderr clean
            eprintln!("{:#}", e);
        } else {
            error!("Application error: {}", e);
            eprintln!("Error: {:#}", e);
        }
        process::exit(1);
    }
}

/// Whether the error chain bottoms out in a domain error rather than a
/// configuration or IO problem
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.downcast_ref::<PluginError>().is_some()
            || cause.downcast_ref::<PipelineError>().is_some()
            || cause.downcast_ref::<TesterError>().is_some()
            || cause.downcast_ref::<AutomationError>().is_some()
    })
}

fn run() -> Result<()> {
    let args = cli::parse_args();
    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;
    app::configure_colors(&args);

    debug!(
        "Configuration loaded from {:?}",
        config_manager.config_file_path()
    );

    // Single runtime for the whole application
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let context = app::build_automation(&args, &config_manager)?;

        let loaded = app::load_plugins(&context.facade, &context.plugin_dir).await?;
        debug!(
            "Loaded {} plugin(s) from {}",
            loaded,
            context.plugin_dir.display()
        );

        app::dispatch_commands(&args, &context).await
    })
}
