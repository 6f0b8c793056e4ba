//! Deployment and service commands

use std::path::Path;

use anyhow::{Context, Result};
use strata_deploy::DeployOptions;

use super::load_manager;
use crate::cli::{DeployArgs, ServicesArgs};
use crate::output;

pub fn deploy(args: DeployArgs, settings: &Path) -> Result<()> {
    let manager = load_manager(settings)?;
    let options = DeployOptions {
        restart: args.restart,
        reload: args.reload,
        backup: !args.no_backup,
    };
    let report = manager.deploy(&options).context("Deployment failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::header("Deployment");
    output::kv("Plugins", &join_or_none(&report.plugins));
    for path in &report.written {
        output::kv("Wrote", &path.display().to_string());
    }
    for path in &report.backed_up {
        output::kv("Backed up", &path.display().to_string());
    }
    if !report.restarted.is_empty() {
        output::kv("Restarted", &report.restarted.join(", "));
    }
    if !report.reloaded.is_empty() {
        output::kv("Reloaded", &report.reloaded.join(", "));
    }
    match &report.archive {
        Some(archive) => output::kv("Backup", &archive.display().to_string()),
        None if options.backup => {}
        None => output::warning("Replaced files were not backed up"),
    }
    println!();
    output::success(&format!(
        "Deployed {} file(s) for {} plugin(s)",
        report.written.len(),
        report.plugins.len()
    ));
    Ok(())
}

/// `restart` and `reload` share everything but the action
pub fn restart(args: ServicesArgs, settings: &Path, reload: bool) -> Result<()> {
    let manager = load_manager(settings)?;
    let plan = manager.restart_services(&args.plugins, reload)?;

    let (services, verb) = if reload {
        (&plan.reload, "Reloaded")
    } else {
        (&plan.restart, "Restarted")
    };
    if services.is_empty() {
        output::info("No services to act on");
    } else {
        output::success(&format!("{} {}", verb, services.join(", ")));
    }
    Ok(())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
