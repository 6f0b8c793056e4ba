//! Layered configuration: base < profiles < local
//!
//! The local layer names the active profiles in its `[strata]` section as a
//! sequence: `profiles-<n> = a, b` activates profiles `a` and `b` at position
//! `n`. Positions apply in ascending order. Profiles sharing a position are
//! peers and must agree on every key that no later position and no local
//! value overrides.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::sequence::Slot;
use crate::store::{ConfigStore, CONF_EXTENSION};
use crate::value::{Codec, ListCodec, TypeTag};

/// Section of the local layer holding strata's own state
pub const META_SECTION: &str = "strata";
/// Sequence key listing the active profiles per position
pub const PROFILES_KEY: &str = "profiles";
/// Position used when enabling a profile without an explicit level
pub const DEFAULT_PROFILE_LEVEL: u32 = 1;

/// Name of a configuration layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Base,
    Profile,
    Local,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Base => "base",
            Layer::Profile => "profile",
            Layer::Local => "local",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk layout under the configuration root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `base/` when it exists, `base.conf` otherwise
    pub fn base_path(&self) -> PathBuf {
        let dir = self.root.join("base");
        if dir.is_dir() {
            dir
        } else {
            self.root.join("base.conf")
        }
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join("profiles")
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir()
            .join(format!("{}.{}", name, CONF_EXTENSION))
    }

    pub fn local_path(&self) -> PathBuf {
        self.root.join(format!("local.{}", CONF_EXTENSION))
    }

    /// Names of every profile file, sorted
    pub fn installed_profiles(&self) -> Result<Vec<String>> {
        let dir = self.profiles_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))? {
            let path = entry.map_err(|e| Error::io(&dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == CONF_EXTENSION) {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// A profile and the position it is enabled at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInfo {
    pub name: String,
    /// `None` when installed but not enabled; a bare `profiles` key is level 0
    pub level: Option<u32>,
}

/// Disagreement between two profiles of one position
struct PendingConflict {
    position: usize,
    first: String,
    second: String,
    section: String,
    key: String,
}

/// The three layers of a configuration root
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    layout: Layout,
    base: ConfigStore,
    profiles: ConfigStore,
    local: ConfigStore,
}

impl LayeredConfig {
    /// Load every layer under `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = Layout::new(root);

        let local = Self::load_local(&layout)?;
        let profiles = Self::load_profiles(&layout, &local)?;
        let base_path = layout.base_path();
        let base = if base_path.is_dir() {
            ConfigStore::load_scoped(&base_path)?
        } else {
            ConfigStore::load(&base_path)?
        };

        tracing::debug!(
            "Opened configuration at {} ({} base, {} profile, {} local sections)",
            layout.root().display(),
            base.section_names().count(),
            profiles.section_names().count(),
            local.section_names().count()
        );
        Ok(Self {
            layout,
            base,
            profiles,
            local,
        })
    }

    fn load_local(layout: &Layout) -> Result<ConfigStore> {
        let path = layout.local_path();
        let mut local = match ConfigStore::load(&path) {
            Ok(local) => local,
            Err(Error::NotFound { .. }) => return Ok(ConfigStore::with_path(&path)),
            Err(e) => return Err(e),
        };
        declare_profiles(&mut local)?;
        Ok(local)
    }

    /// Merge the profile positions named by `local`
    fn load_profiles(layout: &Layout, local: &ConfigStore) -> Result<ConfigStore> {
        let positions = profile_positions(local)?;

        let mut loaded: Vec<ConfigStore> = Vec::with_capacity(positions.len());
        let mut pending: Vec<PendingConflict> = Vec::new();
        for (index, names) in positions.values().enumerate() {
            let mut position = ConfigStore::new();
            let mut owners: BTreeMap<(String, String), String> = BTreeMap::new();
            for name in names {
                let path = layout.profile_path(name);
                if !path.is_file() {
                    return Err(Error::ProfileNotInstalled { name: name.clone() });
                }
                let profile = ConfigStore::load(&path)?;
                for (section, key) in position.conflicts(&profile) {
                    let first = owners
                        .get(&(section.clone(), key.clone()))
                        .cloned()
                        .unwrap_or_default();
                    pending.push(PendingConflict {
                        position: index,
                        first,
                        second: name.clone(),
                        section,
                        key,
                    });
                }
                for (section, content) in profile.sections() {
                    for (key, _) in content.iter() {
                        owners
                            .entry((section.clone(), key.clone()))
                            .or_insert_with(|| name.clone());
                    }
                }
                position.update(&profile);
            }
            tracing::debug!("Loaded profile position {}: {}", index, names.join(", "));
            loaded.push(position);
        }

        for conflict in pending {
            let overridden = loaded[conflict.position + 1..]
                .iter()
                .chain(std::iter::once(local))
                .any(|layer| {
                    layer
                        .section(&conflict.section)
                        .is_some_and(|s| s.contains_key(&conflict.key))
                });
            if !overridden {
                return Err(Error::ProfileConflict {
                    first: conflict.first,
                    second: conflict.second,
                    section: conflict.section,
                    key: conflict.key,
                });
            }
            tracing::debug!(
                "Profile conflict on {}: {} resolved by a later layer",
                conflict.section,
                conflict.key
            );
        }

        let mut merged = ConfigStore::new();
        for position in &loaded {
            merged.update(position);
        }
        Ok(merged)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn base(&self) -> &ConfigStore {
        &self.base
    }

    /// All enabled profiles merged
    pub fn profiles(&self) -> &ConfigStore {
        &self.profiles
    }

    pub fn local(&self) -> &ConfigStore {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut ConfigStore {
        &mut self.local
    }

    pub fn layer(&self, layer: Layer) -> &ConfigStore {
        match layer {
            Layer::Base => &self.base,
            Layer::Profile => &self.profiles,
            Layer::Local => &self.local,
        }
    }

    /// Everything below local: base overlaid by profiles
    pub fn parent(&self) -> ConfigStore {
        let mut parent = self.base.clone();
        parent.update(&self.profiles);
        parent
    }

    /// base overlaid by profiles overlaid by local
    pub fn effective(&self) -> ConfigStore {
        let mut effective = self.parent();
        effective.update(&self.local);
        effective
    }

    /// Highest layer below local defining `key` (a raw key or a slot name)
    pub fn parent_layer_of(&self, section: &str, key: &str) -> Option<Layer> {
        [Layer::Profile, Layer::Base].into_iter().find(|layer| {
            self.layer(*layer)
                .section(section)
                .is_some_and(|s| s.contains_key(key))
        })
    }

    pub fn save_local(&self) -> Result<()> {
        self.local.save()
    }

    /// Level a profile is enabled at
    pub fn profile_level(&self, name: &str) -> Result<Option<u32>> {
        Ok(profile_positions(&self.local)?
            .into_iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .map(|(slot, _)| slot_level(slot)))
    }

    /// Enable profile `name` at `level` and save the local layer
    pub fn profile_enable(&mut self, name: &str, level: u32) -> Result<()> {
        if !self.layout.profile_path(name).is_file() {
            return Err(Error::ProfileNotInstalled {
                name: name.to_string(),
            });
        }
        if let Some(current) = self.profile_level(name)? {
            return Err(Error::ProfileAlreadyEnabled {
                name: name.to_string(),
                level: current,
            });
        }

        let mut local = self.local.clone();
        let key = Slot::Index(level).key_name(PROFILES_KEY);
        local
            .section_mut(META_SECTION)
            .append_item(&key, TypeTag::List, name)?;
        self.commit_profiles(local)?;
        tracing::info!("Enabled profile {} at level {}", name, level);
        Ok(())
    }

    /// Disable profile `name` and save the local layer
    pub fn profile_disable(&mut self, name: &str) -> Result<()> {
        let positions = profile_positions(&self.local)?;
        let (slot, names) = positions
            .into_iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .ok_or_else(|| Error::ProfileNotEnabled {
                name: name.to_string(),
            })?;

        let mut local = self.local.clone();
        let section = local.section_mut(META_SECTION);
        let key = slot.key_name(PROFILES_KEY);
        if names.len() == 1 {
            section.remove(&key);
        } else {
            section.remove_item(&key, TypeTag::List, name)?;
        }
        if section.is_empty() {
            local.remove_section(META_SECTION);
        }
        self.commit_profiles(local)?;
        tracing::info!("Disabled profile {}", name);
        Ok(())
    }

    /// Reload the profile layer against `local`, then adopt and save it
    fn commit_profiles(&mut self, mut local: ConfigStore) -> Result<()> {
        declare_profiles(&mut local)?;
        let profiles = Self::load_profiles(&self.layout, &local)?;
        local.save()?;
        self.local = local;
        self.profiles = profiles;
        Ok(())
    }

    /// Every installed profile with its level
    pub fn profiles_infos(&self) -> Result<Vec<ProfileInfo>> {
        let mut infos = Vec::new();
        for name in self.layout.installed_profiles()? {
            let level = self.profile_level(&name)?;
            infos.push(ProfileInfo { name, level });
        }
        Ok(infos)
    }
}

fn slot_level(slot: Slot) -> u32 {
    match slot {
        Slot::Bare => 0,
        Slot::Index(n) => n,
    }
}

/// Active profile names per position, in application order
/// `[strata] profiles` is a sequence of positions
fn declare_profiles(local: &mut ConfigStore) -> Result<()> {
    if local.contains_section(META_SECTION) {
        local.set_type(META_SECTION, PROFILES_KEY, TypeTag::Sequence)?;
    }
    Ok(())
}

fn profile_positions(local: &ConfigStore) -> Result<BTreeMap<Slot, Vec<String>>> {
    let Some(section) = local.section(META_SECTION) else {
        return Ok(BTreeMap::new());
    };
    let mut positions = BTreeMap::new();
    for (slot, raw) in section.slots(PROFILES_KEY) {
        let names = ListCodec::decode(&raw).map_err(|e| Error::conversion(PROFILES_KEY, e))?;
        if !names.is_empty() {
            positions.insert(slot, names);
        }
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_local_is_empty_layer() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "base.conf", "[a]\nx = 1\n");

        let layers = LayeredConfig::open(temp.path()).unwrap();
        assert!(layers.local().is_empty());
        assert_eq!(layers.effective().get("a", "x").unwrap(), Value::from("1"));
    }

    #[test]
    fn test_missing_base_fails() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            LayeredConfig::open(temp.path()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_later_position_wins_without_conflict() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "base.conf", "[a]\nx = base\n");
        write(temp.path(), "profiles/one.conf", "[a]\nx = one\n");
        write(temp.path(), "profiles/two.conf", "[a]\nx = two\n");
        write(
            temp.path(),
            "local.conf",
            "[strata]\nprofiles-1 = one\nprofiles-2 = two\n",
        );

        let layers = LayeredConfig::open(temp.path()).unwrap();
        assert_eq!(layers.effective().get("a", "x").unwrap(), Value::from("two"));
    }

    #[test]
    fn test_local_profiles_typed_as_sequence() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "base.conf", "[a]\nx = base\n");
        write(temp.path(), "profiles/one.conf", "[a]\nx = one\n");
        write(temp.path(), "profiles/two.conf", "[b]\ny = two\n");
        write(temp.path(), "local.conf", "[strata]\nprofiles-1 = one\n");

        let mut layers = LayeredConfig::open(temp.path()).unwrap();
        assert_eq!(
            layers.local().get_type(META_SECTION, PROFILES_KEY),
            Some(TypeTag::Sequence)
        );
        layers.profile_enable("two", 2).unwrap();

        let typed = layers.local().typed_view().unwrap();
        assert_eq!(
            typed[META_SECTION],
            BTreeMap::from([(
                PROFILES_KEY.to_string(),
                Value::Sequence(vec!["one".to_string(), "two".to_string()])
            )])
        );
    }

    #[test]
    fn test_missing_profile_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "base.conf", "[a]\nx = 1\n");
        write(temp.path(), "local.conf", "[strata]\nprofiles-1 = ghost\n");

        assert!(matches!(
            LayeredConfig::open(temp.path()),
            Err(Error::ProfileNotInstalled { .. })
        ));
    }

    #[test]
    fn test_profile_enable_disable_cycle() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "base.conf", "[a]\nx = base\n");
        write(temp.path(), "profiles/one.conf", "[a]\nx = one\n");

        let mut layers = LayeredConfig::open(temp.path()).unwrap();
        layers.profile_enable("one", DEFAULT_PROFILE_LEVEL).unwrap();
        assert_eq!(layers.effective().get("a", "x").unwrap(), Value::from("one"));
        assert!(matches!(
            layers.profile_enable("one", 3),
            Err(Error::ProfileAlreadyEnabled { level: 1, .. })
        ));
        assert!(matches!(
            layers.profile_enable("ghost", 1),
            Err(Error::ProfileNotInstalled { .. })
        ));

        let reopened = LayeredConfig::open(temp.path()).unwrap();
        assert_eq!(reopened.profile_level("one").unwrap(), Some(1));

        layers.profile_disable("one").unwrap();
        assert_eq!(layers.effective().get("a", "x").unwrap(), Value::from("base"));
        assert!(layers.local().section(META_SECTION).is_none());
        assert!(matches!(
            layers.profile_disable("one"),
            Err(Error::ProfileNotEnabled { .. })
        ));
    }

    #[test]
    fn test_profiles_infos() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "base.conf", "[a]\nx = 1\n");
        write(temp.path(), "profiles/one.conf", "[a]\ny = 1\n");
        write(temp.path(), "profiles/two.conf", "[a]\nz = 1\n");
        write(temp.path(), "local.conf", "[strata]\nprofiles-2 = two\n");

        let layers = LayeredConfig::open(temp.path()).unwrap();
        assert_eq!(
            layers.profiles_infos().unwrap(),
            vec![
                ProfileInfo {
                    name: "one".to_string(),
                    level: None
                },
                ProfileInfo {
                    name: "two".to_string(),
                    level: Some(2)
                },
            ]
        );
    }

    #[test]
    fn test_parent_layer_of() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "base.conf", "[a]\nx = 1\ny = 1\n");
        write(temp.path(), "profiles/one.conf", "[a]\ny = 2\n");
        write(temp.path(), "local.conf", "[strata]\nprofiles-1 = one\n");

        let layers = LayeredConfig::open(temp.path()).unwrap();
        assert_eq!(layers.parent_layer_of("a", "x"), Some(Layer::Base));
        assert_eq!(layers.parent_layer_of("a", "y"), Some(Layer::Profile));
        assert_eq!(layers.parent_layer_of("a", "z"), None);
    }
}
