//! Profile management commands

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::load_manager;
use crate::cli::{ProfileCommands, ProfileEnableArgs, ProfileListArgs, ProfileNameArgs};
use crate::output;

pub fn run(cmd: ProfileCommands, settings: &Path) -> Result<()> {
    match cmd {
        ProfileCommands::Enable(args) => enable(args, settings),
        ProfileCommands::Disable(args) => disable(args, settings),
        ProfileCommands::List(args) => list(args, settings),
    }
}

fn enable(args: ProfileEnableArgs, settings: &Path) -> Result<()> {
    let mut manager = load_manager(settings)?;
    manager.profile_enable(&args.name, args.level)?;
    output::success(&format!(
        "Profile {} enabled at level {}",
        args.name, args.level
    ));
    Ok(())
}

fn disable(args: ProfileNameArgs, settings: &Path) -> Result<()> {
    let mut manager = load_manager(settings)?;
    manager.profile_disable(&args.name)?;
    output::success(&format!("Profile {} disabled", args.name));
    Ok(())
}

#[derive(Tabled, Serialize)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Enabled")]
    #[serde(skip)]
    enabled: String,
    #[tabled(rename = "Level")]
    #[serde(skip)]
    level_display: String,
    #[tabled(skip)]
    level: Option<u32>,
}

fn list(args: ProfileListArgs, settings: &Path) -> Result<()> {
    let manager = load_manager(settings)?;
    let rows: Vec<ProfileRow> = manager
        .profiles_infos()?
        .into_iter()
        .map(|info| ProfileRow {
            enabled: output::flag(info.level.is_some()),
            level_display: info
                .level
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string()),
            level: info.level,
            name: info.name,
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        output::info(&format!(
            "No profiles installed in {}",
            manager.config().layout().profiles_dir().display()
        ));
        return Ok(());
    }

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}
