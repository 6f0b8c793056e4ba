//! Plugin management commands

use std::path::Path;

use anyhow::Result;
use strata_plugins::{DependencyInfo, DependencyState};
use tabled::{settings::Style, Table, Tabled};

use super::load_manager;
use crate::cli::{PluginCommands, PluginListArgs, PluginNameArgs};
use crate::output;

pub fn run(cmd: PluginCommands, settings: &Path) -> Result<()> {
    match cmd {
        PluginCommands::Enable(args) => enable(args, settings),
        PluginCommands::Disable(args) => disable(args, settings),
        PluginCommands::List(args) => list(args, settings),
    }
}

// ============================================================================
// Enable / disable
// ============================================================================

fn enable(args: PluginNameArgs, settings: &Path) -> Result<()> {
    let mut manager = load_manager(settings)?;
    manager.plugin_enable(&args.name)?;
    output::success(&format!("Plugin {} enabled", args.name));
    output::info("Run 'strata deploy' to generate its files");
    Ok(())
}

fn disable(args: PluginNameArgs, settings: &Path) -> Result<()> {
    let mut manager = load_manager(settings)?;
    manager.plugin_disable(&args.name)?;
    output::success(&format!("Plugin {} disabled", args.name));
    Ok(())
}

// ============================================================================
// List
// ============================================================================

#[derive(Tabled)]
struct PluginRow {
    #[tabled(rename = "Plugin")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Dependencies")]
    dependencies: String,
}

fn list(args: PluginListArgs, settings: &Path) -> Result<()> {
    let manager = load_manager(settings)?;
    let names = (!args.names.is_empty()).then_some(args.names.as_slice());
    let infos = manager.plugins_infos(names)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    if infos.is_empty() {
        output::info(&format!(
            "No plugins installed in {}",
            manager.registry().plugins_path().display()
        ));
        return Ok(());
    }

    let rows: Vec<PluginRow> = infos
        .iter()
        .map(|info| PluginRow {
            name: info.name.clone(),
            enabled: output::flag(info.enabled),
            version: match (&info.version, &info.error) {
                (Some(version), _) => version.clone(),
                (None, Some(error)) => format!("error: {}", error),
                (None, None) => "-".to_string(),
            },
            dependencies: describe_dependencies(&info.dependencies),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    let enabled = infos.iter().filter(|i| i.enabled).count();
    println!("\nEnabled: {} of {}", enabled, infos.len());
    Ok(())
}

fn describe_dependencies(dependencies: &[DependencyInfo]) -> String {
    if dependencies.is_empty() {
        return "-".to_string();
    }
    dependencies
        .iter()
        .map(|dep| {
            let mut text = dep.name.clone();
            if !dep.requirements.is_empty() {
                text.push_str(&format!(" ({})", dep.requirements.join(", ")));
            }
            if dep.optional {
                text.push_str(" [optional]");
            }
            match &dep.state {
                DependencyState::Ok { version } => text.push_str(&format!(": {}", version)),
                DependencyState::Skipped => text.push_str(": skipped"),
                DependencyState::Error { message } => text.push_str(&format!(": {}", message)),
            }
            text
        })
        .collect::<Vec<_>>()
        .join("\n")
}
