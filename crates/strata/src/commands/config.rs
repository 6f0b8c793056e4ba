//! Show and edit configuration values

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use strata_core::ConfigStore;
use strata_deploy::Manager;
use tabled::{settings::Style, Table, Tabled};

use super::load_manager;
use crate::cli::{ItemArgs, KeyArgs, SectionArgs, SetArgs, ShowArgs};
use crate::output;

// ============================================================================
// Show
// ============================================================================

#[derive(Tabled)]
struct ValueRow {
    #[tabled(rename = "Section")]
    section: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn show(args: ShowArgs, settings: &Path) -> Result<()> {
    let manager = load_manager(settings)?;
    let mut store = match args.layer.layer() {
        Some(layer) => manager.config().layer(layer).clone(),
        None => manager.config().effective(),
    };
    if let Some(section) = &args.section {
        store = only_section(&store, section)?;
    }

    let rows: Vec<ValueRow> = if args.typed {
        let typed = manager.with_plugin_types(store)?.typed_view()?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&typed)?);
            return Ok(());
        }
        typed
            .into_iter()
            .flat_map(|(section, values)| {
                values.into_iter().map(move |(key, value)| ValueRow {
                    section: section.clone(),
                    key,
                    value: serde_json::to_string(&value).unwrap_or_default(),
                })
            })
            .collect()
    } else {
        if args.json {
            let raw: serde_json::Map<String, serde_json::Value> = store
                .sections()
                .map(|(name, section)| {
                    let values: serde_json::Map<String, serde_json::Value> = section
                        .iter()
                        .map(|(k, v)| (k.clone(), json!(v)))
                        .collect();
                    (name.clone(), serde_json::Value::Object(values))
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&raw)?);
            return Ok(());
        }
        store
            .sections()
            .flat_map(|(name, section)| {
                section.iter().map(move |(key, value)| ValueRow {
                    section: name.clone(),
                    key: key.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    };

    if rows.is_empty() {
        output::info("No configuration values");
        return Ok(());
    }
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

/// A store holding just `section` of `store`
fn only_section(store: &ConfigStore, name: &str) -> Result<ConfigStore> {
    let section = store.get_section(name)?;
    let mut only = ConfigStore::new();
    let target = only.section_mut(name);
    for (key, value) in section.iter() {
        target.set_raw(key.clone(), value.clone());
    }
    Ok(only)
}

// ============================================================================
// Mutations
// ============================================================================

/// Apply `edit` to the local layer and save it
fn edit_local(
    settings: &Path,
    edit: impl FnOnce(&mut Manager) -> strata_core::Result<()>,
) -> Result<()> {
    let mut manager = load_manager(settings)?;
    edit(&mut manager)?;
    manager
        .save_local()
        .context("Failed to save local configuration")?;
    Ok(())
}

pub fn set(args: SetArgs, settings: &Path) -> Result<()> {
    edit_local(settings, |m| {
        m.config_mut().set(&args.section, &args.key, &args.value)
    })?;
    output::success(&format!("{}.{} = {}", args.section, args.key, args.value));
    Ok(())
}

pub fn delete_key(args: KeyArgs, settings: &Path) -> Result<()> {
    edit_local(settings, |m| m.config_mut().delete_key(&args.section, &args.key))?;
    output::success(&format!("Deleted {}.{}", args.section, args.key));
    Ok(())
}

pub fn delete_section(args: SectionArgs, settings: &Path) -> Result<()> {
    edit_local(settings, |m| m.config_mut().delete_section(&args.section))?;
    output::success(&format!("Deleted section {}", args.section));
    Ok(())
}

pub fn list_add(args: ItemArgs, settings: &Path) -> Result<()> {
    let policy = args.policy();
    edit_local(settings, |m| {
        m.config_mut()
            .list_add(&args.section, &args.key, &args.value, policy)
    })?;
    output::success(&format!("Added {} to {}.{}", args.value, args.section, args.key));
    Ok(())
}

pub fn list_remove(args: ItemArgs, settings: &Path) -> Result<()> {
    let policy = args.policy();
    edit_local(settings, |m| {
        m.config_mut()
            .list_remove(&args.section, &args.key, &args.value, policy)
    })?;
    output::success(&format!(
        "Removed {} from {}.{}",
        args.value, args.section, args.key
    ));
    Ok(())
}

pub fn sequence_add(args: ItemArgs, settings: &Path) -> Result<()> {
    let policy = args.policy();
    edit_local(settings, |m| {
        m.config_mut()
            .sequence_add(&args.section, &args.key, &args.value, policy)
    })?;
    output::success(&format!("Added {} to {}.{}", args.value, args.section, args.key));
    Ok(())
}

pub fn sequence_remove(args: ItemArgs, settings: &Path) -> Result<()> {
    let policy = args.policy();
    edit_local(settings, |m| {
        m.config_mut()
            .sequence_remove(&args.section, &args.key, &args.value, policy)
    })?;
    output::success(&format!(
        "Removed {} from {}.{}",
        args.value, args.section, args.key
    ));
    Ok(())
}
