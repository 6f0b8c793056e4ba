//! Descriptor-driven plugins rendering `%(key)s` templates

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use strata_core::Error;

use crate::descriptor::Descriptor;
use crate::error::{PluginError, Result};
use crate::plugin::{ConfType, Dependency, Plugin, PluginContext};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%(?:\(([^)]*)\)s|(%))?").expect("placeholder regex is valid")
});

/// Substitute `%(key)s` placeholders from `values`; `%%` renders `%`
pub fn render(plugin: &str, template: &str, values: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        if let Some(key) = caps.get(1) {
            let value = values.get(key.as_str()).ok_or_else(|| {
                PluginError::template(plugin, format!("key \"{}\" is not defined", key.as_str()))
            })?;
            out.push_str(value);
        } else if caps.get(2).is_some() {
            out.push('%');
        } else {
            return Err(PluginError::template(
                plugin,
                format!("stray \"%\" at offset {}", whole.start()),
            ));
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Plugin whose behaviour comes entirely from its descriptor
#[derive(Debug, Clone)]
pub struct TemplatePlugin {
    descriptor: Descriptor,
}

impl TemplatePlugin {
    pub fn new(descriptor: &Descriptor) -> Self {
        Self {
            descriptor: descriptor.clone(),
        }
    }

    /// Template file for `path`: `template_<file>`, `template_<file sans .conf>`, `template`
    pub fn template_path(&self, ctx: &PluginContext, path: &Path) -> Result<PathBuf> {
        let section = ctx.conf.section(&ctx.name).ok_or_else(|| {
            PluginError::template(&ctx.name, format!("no [{}] section", ctx.name))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let candidates = [
            format!("template_{}", file_name),
            format!("template_{}", file_name.replace(".conf", "")),
            "template".to_string(),
        ];
        candidates
            .iter()
            .find_map(|key| section.get_raw(key))
            .map(|template| ctx.templates_dir.join(template))
            .ok_or_else(|| {
                PluginError::template(
                    &ctx.name,
                    format!("no template configured for {}", path.display()),
                )
            })
    }
}

impl Plugin for TemplatePlugin {
    fn version(&self) -> &str {
        &self.descriptor.version
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.descriptor.dependencies.clone()
    }

    fn conf_types(&self, ctx: &PluginContext) -> Vec<ConfType> {
        self.descriptor
            .types
            .iter()
            .map(|(key, tag)| ConfType::new(&ctx.name, key, *tag))
            .collect()
    }

    fn services_to_restart(&self) -> Vec<String> {
        self.descriptor.restart.clone()
    }

    fn services_to_reload(&self) -> Vec<String> {
        self.descriptor.reload.clone()
    }

    fn conf_files_path(&self, ctx: &PluginContext) -> Vec<PathBuf> {
        self.descriptor
            .files
            .iter()
            .map(|f| ctx.etc_path(f))
            .collect()
    }

    fn files_to_backup_path(&self, ctx: &PluginContext) -> Vec<PathBuf> {
        self.descriptor
            .backup
            .iter()
            .map(|f| ctx.etc_path(f))
            .collect()
    }

    fn file_content(&self, ctx: &PluginContext, path: &Path) -> Result<String> {
        let template_path = self.template_path(ctx, path)?;
        let template = std::fs::read_to_string(&template_path)
            .map_err(|e| Error::io(&template_path, e))?;

        let values: BTreeMap<String, String> = ctx
            .conf
            .section(&ctx.name)
            .map(|s| s.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        render(&ctx.name, &template, &values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ConfigStore;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_keys() {
        let rendered = render(
            "motd",
            "Welcome to %(host)s (%(load)s%% load)\n",
            &values(&[("host", "edge1"), ("load", "12")]),
        )
        .unwrap();
        assert_eq!(rendered, "Welcome to edge1 (12% load)\n");
    }

    #[test]
    fn test_render_missing_key() {
        let err = render("motd", "%(host)s", &values(&[])).unwrap_err();
        assert!(matches!(err, PluginError::Template { ref message, .. } if message.contains("host")));
    }

    #[test]
    fn test_render_stray_percent() {
        assert!(render("motd", "100% sure", &values(&[])).is_err());
        assert_eq!(render("motd", "no placeholders", &values(&[])).unwrap(), "no placeholders");
    }

    #[test]
    fn test_template_path_lookup_order() {
        let descriptor = Descriptor::from_store(
            "ntp",
            Path::new("ntp.conf"),
            &ConfigStore::parse("[plugin]\nversion = 1\nfiles = ntp.conf\n").unwrap(),
        )
        .unwrap();
        let plugin = TemplatePlugin::new(&descriptor);
        let ctx = |conf: &str| PluginContext {
            name: "ntp".to_string(),
            conf: ConfigStore::parse(conf).unwrap(),
            etc_dir: PathBuf::from("/etc"),
            templates_dir: PathBuf::from("/tpl"),
            dependencies: BTreeMap::new(),
        };
        let file = Path::new("/etc/ntp.conf");

        let full = ctx("[ntp]\ntemplate_ntp.conf = a\ntemplate_ntp = b\ntemplate = c\n");
        assert_eq!(plugin.template_path(&full, file).unwrap(), PathBuf::from("/tpl/a"));

        let stem = ctx("[ntp]\ntemplate_ntp = b\ntemplate = c\n");
        assert_eq!(plugin.template_path(&stem, file).unwrap(), PathBuf::from("/tpl/b"));

        let fallback = ctx("[ntp]\ntemplate = c\n");
        assert_eq!(plugin.template_path(&fallback, file).unwrap(), PathBuf::from("/tpl/c"));

        assert!(plugin.template_path(&ctx("[ntp]\n"), file).is_err());
        assert!(plugin.template_path(&ctx(""), file).is_err());
    }
}
