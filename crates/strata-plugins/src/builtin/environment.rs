use std::path::{Path, PathBuf};

use strata_core::TypeTag;

use super::{builtin_version, list_items};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::plugin::{ConfType, Dependency, Plugin, PluginContext};

const ENVIRONMENT_FILE: &str = "environment";

/// Writes the system `PATH` from `[environment] paths`
#[derive(Debug, Clone)]
pub struct Environment {
    version: String,
    dependencies: Vec<Dependency>,
}

impl Environment {
    pub fn new(descriptor: &Descriptor) -> Self {
        Self {
            version: builtin_version(descriptor),
            dependencies: descriptor.dependencies.clone(),
        }
    }
}

impl Plugin for Environment {
    fn version(&self) -> &str {
        &self.version
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.dependencies.clone()
    }

    fn conf_types(&self, ctx: &PluginContext) -> Vec<ConfType> {
        vec![ConfType::new(&ctx.name, "paths", TypeTag::List)]
    }

    fn conf_files_path(&self, ctx: &PluginContext) -> Vec<PathBuf> {
        vec![ctx.etc_path(ENVIRONMENT_FILE)]
    }

    fn file_content(&self, ctx: &PluginContext, _path: &Path) -> Result<String> {
        let paths = list_items(ctx, "paths", TypeTag::List)?;
        Ok(format!("PATH=\"{}\"\n", paths.join(":")))
    }
}
