//! Edits of the local layer
//!
//! Only the local layer is written. List and sequence edits start from the
//! value the parent layers provide when local does not define the key yet,
//! unless the caller asks to refuse that with [`ParentPolicy::Refuse`].
//! Sequence slots inherited from a parent are masked with an empty local
//! value when an edit drops them.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::layers::{Layer, LayeredConfig};
use crate::section::ConfigSection;
use crate::sequence::{self, Slot};
use crate::store::ConfigStore;
use crate::value::{TypeTag, Value};

/// What a list edit does when only a parent layer defines the key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentPolicy {
    /// Copy the parent's elements into local and edit them there
    #[default]
    Inherit,
    /// Fail with `ExistsInParent`
    Refuse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Add,
    Remove,
}

impl Edit {
    fn label(&self, kind: TypeTag) -> &'static str {
        match (self, kind) {
            (Edit::Add, TypeTag::Sequence) => "sequence add   ",
            (Edit::Remove, TypeTag::Sequence) => "sequence remove",
            (Edit::Add, _) => "list add       ",
            (Edit::Remove, _) => "list remove    ",
        }
    }
}

fn slots_of(store: &ConfigStore, section: &str, key: &str) -> BTreeMap<Slot, String> {
    store
        .section(section)
        .map(|s| s.slots(key))
        .unwrap_or_default()
}

impl LayeredConfig {
    /// Set a value in the local layer
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        self.local_mut()
            .section_mut(section)
            .set(key, Value::from(value))?;
        tracing::info!("set            : {}: {} = {}", section, key, value);
        Ok(())
    }

    /// Delete a key from the local layer, dropping the section once empty
    pub fn delete_key(&mut self, section: &str, key: &str) -> Result<()> {
        let local = self.local_mut();
        if !local.contains_section(section) {
            return Err(Error::section_not_found(section));
        }
        let content = local.section_mut(section);
        content.delete(key)?;
        if content.is_empty() {
            local.remove_section(section);
        }
        tracing::info!("delete key     : {}: {}", section, key);
        Ok(())
    }

    /// Delete a whole section from the local layer
    pub fn delete_section(&mut self, section: &str) -> Result<()> {
        self.local_mut()
            .remove_section(section)
            .ok_or_else(|| Error::section_not_found(section))?;
        tracing::info!("delete section : {}", section);
        Ok(())
    }

    pub fn list_add(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
        policy: ParentPolicy,
    ) -> Result<()> {
        self.edit_items(section, key, value, TypeTag::List, Edit::Add, policy)
    }

    pub fn list_remove(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
        policy: ParentPolicy,
    ) -> Result<()> {
        self.edit_items(section, key, value, TypeTag::List, Edit::Remove, policy)
    }

    pub fn sequence_add(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
        policy: ParentPolicy,
    ) -> Result<()> {
        self.edit_items(section, key, value, TypeTag::Sequence, Edit::Add, policy)
    }

    pub fn sequence_remove(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
        policy: ParentPolicy,
    ) -> Result<()> {
        self.edit_items(section, key, value, TypeTag::Sequence, Edit::Remove, policy)
    }

    /// Parent layer defining `key` (or any of its slots for a sequence)
    fn parent_source(&self, section: &str, key: &str, kind: TypeTag) -> Option<Layer> {
        if kind != TypeTag::Sequence {
            return self.parent_layer_of(section, key);
        }
        [Layer::Profile, Layer::Base]
            .into_iter()
            .find(|layer| !slots_of(self.layer(*layer), section, key).is_empty())
    }

    fn edit_items(
        &mut self,
        section: &str,
        key: &str,
        value: &str,
        kind: TypeTag,
        edit: Edit,
        policy: ParentPolicy,
    ) -> Result<()> {
        let local_has = match self.local().section(section) {
            Some(content) => content.items(key, kind)?.is_some(),
            None => false,
        };
        let parent_layer = self.parent_source(section, key, kind);

        if !local_has {
            if let (Some(layer), ParentPolicy::Refuse) = (parent_layer, policy) {
                return Err(Error::ExistsInParent {
                    section: section.to_string(),
                    key: key.to_string(),
                    layer: layer.to_string(),
                });
            }
            if let Some(layer) = parent_layer {
                tracing::debug!(
                    "{}: {} only defined in {} configuration, inheriting its value",
                    section,
                    key,
                    layer
                );
            }
        }

        if kind == TypeTag::Sequence {
            self.edit_sequence(section, key, value, edit)?;
        } else {
            let parent = self.parent();
            let mut content = self
                .local()
                .section(section)
                .cloned()
                .unwrap_or_else(|| ConfigSection::new(section));
            if !local_has && parent_layer.is_some() {
                if let Some(inherited) = parent.section(section) {
                    if let Some(items) = inherited.items(key, kind)? {
                        content.write_items(key, kind, &items);
                    }
                }
            }
            match edit {
                Edit::Add => content.append_item(key, kind, value)?,
                Edit::Remove => content.remove_item(key, kind, value)?,
            }
            let local = self.local_mut().section_mut(section);
            *local = content;
        }

        tracing::info!("{}: {}: {} {}", edit.label(kind), section, key, value);
        Ok(())
    }

    /// Edit a sequence over its effective slots and write the difference
    /// back to local
    fn edit_sequence(&mut self, section: &str, key: &str, value: &str, edit: Edit) -> Result<()> {
        let parent_slots = slots_of(&self.parent(), section, key);
        let local_slots = slots_of(self.local(), section, key);
        let mut effective = parent_slots.clone();
        effective.extend(local_slots.clone());

        let mut items = sequence::decode(&effective);
        let position = items.iter().position(|item| item == value);
        match (edit, position) {
            (Edit::Add, Some(_)) => {
                return Err(Error::ListValueAlreadyExists {
                    section: section.to_string(),
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
            (Edit::Remove, None) => {
                return Err(Error::ListValueNotFound {
                    section: section.to_string(),
                    key: key.to_string(),
                    value: value.to_string(),
                })
            }
            (Edit::Add, None) => items.push(value.to_string()),
            (Edit::Remove, Some(index)) => {
                items.remove(index);
            }
        }

        let assigned = sequence::reindex(&effective, &items);
        let local = self.local_mut().section_mut(section);
        for slot in effective.keys().filter(|slot| !assigned.contains_key(slot)) {
            let slot_key = slot.key_name(key);
            if parent_slots.contains_key(slot) {
                local.set_raw(slot_key, "");
            } else {
                local.remove(&slot_key);
            }
        }
        for (slot, element) in assigned {
            let inherited = parent_slots.get(&slot) == Some(&element);
            if inherited && !local_slots.contains_key(&slot) {
                continue;
            }
            local.set_raw(slot.key_name(key), element);
        }
        Ok(())
    }
}
