//! Plugins shipped with strata

mod environment;
mod hosts;

pub use environment::Environment;
pub use hosts::Hosts;

use strata_core::TypeTag;

use crate::descriptor::Descriptor;
use crate::error::{PluginError, Result};
use crate::plugin::PluginContext;

/// Version of a built-in: the descriptor's when set, the crate's otherwise
fn builtin_version(descriptor: &Descriptor) -> String {
    if descriptor.version.is_empty() {
        env!("CARGO_PKG_VERSION").to_string()
    } else {
        descriptor.version.clone()
    }
}

/// Declared list-like key of the plugin section; absent means empty
fn list_items(ctx: &PluginContext, key: &str, tag: TypeTag) -> Result<Vec<String>> {
    let Some(section) = ctx.conf.section(&ctx.name) else {
        return Ok(Vec::new());
    };
    match section.typed(key, tag) {
        Ok(value) => Ok(value.into_list().unwrap_or_default()),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(PluginError::Core(e)),
    }
}
