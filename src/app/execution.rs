//! Command dispatch for the automation CLI

use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, info};
use prettytable::{format, Cell, Row, Table};
use regex::Regex;

use crate::app::initialization::AppContext;
use crate::cli;
use crate::pipeline::PipelineStatus;
use crate::plugin::{CommandPlugin, PluginMetadata, PluginReport, PluginStatus};
use crate::tester::TestResult;

/// Execute every command selected on the command line
///
/// Commands run in a fixed order so one invocation can scaffold a plugin,
/// activate it, run its pipeline and list the result. The first failing
/// command aborts the rest. With no command selected the plugin listing
/// is shown.
pub async fn dispatch_commands(args: &cli::Args, context: &AppContext) -> Result<()> {
    let mut handled = false;

    if let Some(name) = &args.setup {
        handle_setup(args, context, name).await?;
        handled = true;
    }

    if !args.activate.is_empty() {
        handle_activate(context, &args.activate).await?;
        handled = true;
    }

    if let Some(name) = &args.deactivate {
        handle_deactivate(context, name).await?;
        handled = true;
    }

    if let Some(name) = &args.pipeline {
        info!("Running full pipeline for plugin '{}'", name);
        let status = context.facade.full_pipeline(name).await?;
        report_pipeline_outcome(&status)?;
        handled = true;
    }

    if let Some(name) = &args.build_test {
        info!("Running build and test stages for plugin '{}'", name);
        let status = context.facade.build_and_test(name).await?;
        report_pipeline_outcome(&status)?;
        handled = true;
    }

    if let Some(name) = &args.deploy {
        info!("Running deploy stage for plugin '{}'", name);
        let status = context.facade.deploy(name).await?;
        report_pipeline_outcome(&status)?;
        handled = true;
    }

    if let Some(selection) = &args.run_tests {
        handle_run_tests(args, context, selection).await?;
        handled = true;
    }

    if args.list_plugins {
        handle_list_plugins(context).await;
        handled = true;
    }

    if let Some(name) = &args.plugin_info {
        handle_plugin_info(context, name).await?;
        handled = true;
    }

    if !handled {
        handle_list_plugins(context).await;
    }

    Ok(())
}

/// Scaffold a plugin skeleton on disk and register it
async fn handle_setup(args: &cli::Args, context: &AppContext, name: &str) -> Result<()> {
    let metadata = PluginMetadata {
        name: name.to_string(),
        version: "0.1.0".to_string(),
        description: format!("The {} plugin", name),
        author: std::env::var("USER").unwrap_or_default(),
        dependencies: args.setup_dep.clone(),
        config: Default::default(),
    };

    let plugin = Box::new(CommandPlugin::new(
        metadata.clone(),
        std::sync::Arc::clone(&context.executor),
    ));
    let plugin_dir = context.facade.setup(metadata, plugin).await?;

    println!(
        "{} scaffolded plugin '{}' at {}",
        "ok:".green().bold(),
        name,
        plugin_dir.display()
    );
    Ok(())
}

/// Activate the named plugins after their transitive dependencies
async fn handle_activate(context: &AppContext, names: &[String]) -> Result<()> {
    let registry = context.facade.registry();

    let order = {
        let inner = registry.inner().read().await;
        inner.resolve_activation_order(names)?
    };
    debug!("Activation order: {:?}", order);

    let mut activated = Vec::new();
    let mut inner = registry.inner().write().await;
    for name in &order {
        if inner.status(name) == Some(PluginStatus::Active) {
            continue;
        }
        inner
            .activate(name)
            .await
            .with_context(|| format!("Failed to activate plugin '{}'", name))?;
        activated.push(name.clone());
    }
    drop(inner);

    if activated.is_empty() {
        println!("Nothing to do, requested plugins are already active");
    } else {
        println!(
            "{} activated {} plugin(s): {}",
            "ok:".green().bold(),
            activated.len(),
            activated.join(", ")
        );
    }
    Ok(())
}

async fn handle_deactivate(context: &AppContext, name: &str) -> Result<()> {
    let registry = context.facade.registry();
    let mut inner = registry.inner().write().await;
    inner
        .deactivate(name)
        .await
        .with_context(|| format!("Failed to deactivate plugin '{}'", name))?;
    drop(inner);

    println!("{} deactivated plugin '{}'", "ok:".green().bold(), name);
    Ok(())
}

/// Print a finished run and turn a failed one into an error
fn report_pipeline_outcome(status: &PipelineStatus) -> Result<()> {
    if !status.output.is_empty() {
        println!("{}", status.output.trim_end());
    }

    if status.success {
        println!(
            "{} pipeline for '{}' (run {})",
            "PASS".green().bold(),
            status.plugin_name,
            status.run_id
        );
        Ok(())
    } else {
        println!(
            "{} pipeline for '{}': {}",
            "FAIL".red().bold(),
            status.plugin_name,
            status.error
        );
        Err(anyhow::anyhow!(
            "Pipeline failed for plugin '{}'",
            status.plugin_name
        ))
    }
}

/// Run registered test cases and print a result table
///
/// A filter regex wins over the plugin selection; the selection "all"
/// runs every case.
async fn handle_run_tests(args: &cli::Args, context: &AppContext, selection: &str) -> Result<()> {
    let tester = context.facade.tester();

    let results = if let Some(pattern) = &args.test_filter {
        let regex = Regex::new(pattern).context("Invalid test filter pattern")?;
        tester.run_filtered(&regex).await
    } else if selection == "all" {
        tester.run_all().await
    } else {
        tester.run_plugin(selection).await
    };

    print_test_results(&results);

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        return Err(anyhow::anyhow!("{} test case(s) failed", failed));
    }
    Ok(())
}

fn print_test_results(results: &[TestResult]) {
    if results.is_empty() {
        println!("No test cases matched.");
        return;
    }

    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|result| {
            vec![
                result.plugin_name.clone(),
                result.test_name.clone(),
                result.outcome_label().to_string(),
                format!("{:.2?}", result.duration),
                result.message.lines().next().unwrap_or("").to_string(),
            ]
        })
        .collect();
    print!(
        "{}",
        format_clean_table(&["Plugin", "Case", "Result", "Duration", "Detail"], &rows)
    );

    let passed = results.iter().filter(|r| r.passed).count();
    let summary = format!(
        "{} passed, {} failed, {} total",
        passed,
        results.len() - passed,
        results.len()
    );
    if passed == results.len() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
}

async fn handle_list_plugins(context: &AppContext) {
    let reports = {
        let inner = context.facade.registry().inner().read().await;
        inner.report()
    };
    print_plugin_table(&reports);
}

fn print_plugin_table(reports: &[PluginReport]) {
    if reports.is_empty() {
        println!("No plugins registered.");
        return;
    }

    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|report| {
            vec![
                report.name.clone(),
                report.version.clone(),
                report.status.to_string(),
                if report.dependencies.is_empty() {
                    "-".to_string()
                } else {
                    report.dependencies.join(", ")
                },
                report.last_error.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print!(
        "{}",
        format_clean_table(
            &["Name", "Version", "Status", "Dependencies", "Last error"],
            &rows
        )
    );
}

async fn handle_plugin_info(context: &AppContext, name: &str) -> Result<()> {
    let report = {
        let inner = context.facade.registry().inner().read().await;
        inner.report_for(name)
    };
    let Some(report) = report else {
        return Err(anyhow::anyhow!("Plugin '{}' is not registered", name));
    };

    println!("Plugin:       {}", report.name);
    println!("Version:      {}", report.version);
    if !report.description.is_empty() {
        println!("Description:  {}", report.description);
    }
    println!("Status:       {}", report.status);
    println!(
        "Dependencies: {}",
        if report.dependencies.is_empty() {
            "-".to_string()
        } else {
            report.dependencies.join(", ")
        }
    );
    if let Some(error) = &report.last_error {
        println!("Last error:   {}", error.red());
    }

    let case_count = context.facade.tester().case_count_for(name);
    println!("Test cases:   {}", case_count);

    match context.facade.engine().status(name).await {
        Some(run) => println!("Last run:     {}", run),
        None => println!("Last run:     never"),
    }

    Ok(())
}

/// Format rows with prettytable's clean style, indented two spaces
fn format_clean_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);

    let header_cells: Vec<Cell> = headers.iter().map(|header| Cell::new(header)).collect();
    table.add_row(Row::new(header_cells));

    for row in rows {
        let data_cells: Vec<Cell> = row.iter().map(|cell| Cell::new(cell)).collect();
        table.add_row(Row::new(data_cells));
    }

    let table_output = table.to_string();
    let mut result = String::new();
    for line in table_output.lines() {
        result.push_str("  ");
        result.push_str(line);
        result.push('\n');
    }

    result
}
