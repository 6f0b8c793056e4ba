//! ConfigStore: named sections loaded from a file or a directory of fragments

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs::write_atomic;
use crate::parser::{self, ParsedFile};
use crate::section::ConfigSection;
use crate::value::{TypeTag, Value};

/// Extension of every configuration file
pub const CONF_EXTENSION: &str = "conf";

/// Serializable typed form of a store: section -> key -> value
pub type TypedView = BTreeMap<String, BTreeMap<String, Value>>;

/// Ordered mapping of section name to [`ConfigSection`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    sections: BTreeMap<String, ConfigSection>,
    path: Option<PathBuf>,
    comments: Vec<String>,
}

fn has_conf_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == CONF_EXTENSION)
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store bound to `path` for later saving
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Load a `.conf` file or every `.conf` file of a directory.
    ///
    /// A directory named `*.conf`, a file without the `.conf` extension and
    /// a missing path are each reported with their own error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_inner(path.as_ref(), false)
    }

    /// Like [`ConfigStore::load`], but each fragment of a directory may only
    /// hold sections named after its file stem (`<stem>` or `<stem>:<sub>`)
    pub fn load_scoped(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_inner(path.as_ref(), true)
    }

    fn load_inner(path: &Path, scoped: bool) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound {
                path: path.to_path_buf(),
            },
            _ => Error::io(path, e),
        })?;

        let mut store = Self::with_path(path);
        if metadata.is_dir() {
            if has_conf_extension(path) {
                return Err(Error::IsDirectory {
                    path: path.to_path_buf(),
                });
            }
            for file in Self::fragments(path)? {
                let fragment = Self::read_file(&file)?;
                if scoped {
                    let scope = file
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    fragment.verify_scope(&scope)?;
                }
                store.update(&fragment);
            }
        } else {
            if !has_conf_extension(path) {
                return Err(Error::NotConfFile {
                    path: path.to_path_buf(),
                });
            }
            let file = Self::read_file(path)?;
            store.sections = file.sections;
            store.comments = file.comments;
        }
        tracing::debug!(
            "Loaded {} section(s) from {}",
            store.sections.len(),
            path.display()
        );
        Ok(store)
    }

    /// `.conf` files directly inside `dir`, sorted by name
    fn fragments(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let path = entry.map_err(|e| Error::io(dir, e))?.path();
            if path.is_file() && has_conf_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::from_parsed(parser::parse(&text, path)?, Some(path)))
    }

    /// Build a store from section text
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::from_parsed(
            parser::parse(text, Path::new("<memory>"))?,
            None,
        ))
    }

    fn from_parsed(parsed: ParsedFile, path: Option<&Path>) -> Self {
        let mut store = Self {
            path: path.map(Path::to_path_buf),
            comments: parsed.comments,
            ..Default::default()
        };
        for (name, entries) in parsed.sections {
            let section = store.section_mut(&name);
            for (key, value) in entries {
                section.set_raw(key, value);
            }
        }
        store
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn set_comments(&mut self, comments: Vec<String>) {
        self.comments = comments;
    }

    /// Section text: comment block, then non-empty sections and keys in
    /// sorted order
    pub fn render(&self) -> String {
        parser::render(
            &self.comments,
            self.sections
                .iter()
                .filter(|(_, section)| !section.is_empty())
                .map(|(name, section)| {
                    (
                        name.as_str(),
                        section.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                    )
                }),
        )
    }

    /// Save atomically to the bound path
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| Error::invalid_setting("path", "store has no file path"))?;
        self.save_to(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.render())?;
        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> impl Iterator<Item = (&String, &ConfigSection)> {
        self.sections.iter()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn contains_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.get(name)
    }

    /// Section by name, failing with `SectionNotFound`
    pub fn get_section(&self, name: &str) -> Result<&ConfigSection> {
        self.sections
            .get(name)
            .ok_or_else(|| Error::section_not_found(name))
    }

    /// Mutable section, created empty when absent
    pub fn section_mut(&mut self, name: &str) -> &mut ConfigSection {
        self.sections
            .entry(name.to_string())
            .or_insert_with(|| ConfigSection::new(name))
    }

    pub fn remove_section(&mut self, name: &str) -> Option<ConfigSection> {
        self.sections.remove(name)
    }

    pub fn get(&self, section: &str, key: &str) -> Result<Value> {
        self.get_section(section)?.get(key)
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        self.section_mut(section).set(key, value)
    }

    pub fn set_type(&mut self, section: &str, key: &str, tag: TypeTag) -> Result<()> {
        self.section_mut(section).set_type(key, tag)
    }

    pub fn get_type(&self, section: &str, key: &str) -> Option<TypeTag> {
        self.section(section)?.declared_type(key)
    }

    pub fn del_type(&mut self, section: &str, key: &str) -> Option<TypeTag> {
        self.sections.get_mut(section)?.del_type(key)
    }

    /// Overlay `other`: shared sections are merged key by key, new sections
    /// are added as they are
    pub fn update(&mut self, other: &ConfigStore) {
        for (name, section) in &other.sections {
            match self.sections.get_mut(name) {
                Some(existing) => existing.update(section),
                None => {
                    self.sections.insert(name.clone(), section.clone());
                }
            }
        }
    }

    /// (section, key) pairs both stores define with different values
    pub fn conflicts(&self, other: &ConfigStore) -> Vec<(String, String)> {
        let mut conflicts = Vec::new();
        for (name, section) in &other.sections {
            let Some(mine) = self.sections.get(name) else {
                continue;
            };
            for (key, value) in section.iter() {
                if mine.get_raw(key).is_some_and(|current| current != value) {
                    conflicts.push((name.clone(), key.clone()));
                }
            }
        }
        conflicts
    }

    /// [`ConfigStore::update`], returning the keys whose values disagreed
    pub fn update_verify_conflict(&mut self, other: &ConfigStore) -> Vec<(String, String)> {
        let conflicts = self.conflicts(other);
        self.update(other);
        conflicts
    }

    /// Sections belonging to plugin `name`: `name` and `name:<anything>`
    pub fn plugin_view(&self, name: &str) -> ConfigStore {
        let pattern = format!("^{}(|:.*)$", regex::escape(name));
        let sections = match Regex::new(&pattern) {
            Ok(re) => self
                .sections
                .iter()
                .filter(|(section, _)| re.is_match(section))
                .map(|(section, content)| (section.clone(), content.clone()))
                .collect(),
            Err(_) => BTreeMap::new(),
        };
        ConfigStore {
            sections,
            path: None,
            comments: Vec::new(),
        }
    }

    /// Every section in typed form
    pub fn typed_view(&self) -> Result<TypedView> {
        self.sections
            .iter()
            .map(|(name, section)| Ok((name.clone(), section.typed_entries()?)))
            .collect()
    }

    /// Every section must be `scope` or `scope:<sub>`
    pub fn verify_scope(&self, scope: &str) -> Result<()> {
        let prefix = format!("{}:", scope);
        for name in self.sections.keys() {
            if name != scope && !name.starts_with(&prefix) {
                return Err(Error::UnauthorizedSection {
                    section: name.clone(),
                    scope: scope.to_string(),
                });
            }
        }
        Ok(())
    }
}
