//! ConfigSection: raw string values plus declared key types
//!
//! Keys are looked up with the typed suffix convention: if `paths` is
//! declared as `list`, `get("paths_list")` returns the decoded list while
//! `get("paths")` still returns the raw string. Sequences have no raw form;
//! their elements live in `key`/`key-<n>` slots.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::error::{ConversionError, Error, Result};
use crate::sequence::{self, Slot};
use crate::value::{convert, Codec, ListCodec, TypeTag, Value};

static TYPED_ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)_([^_]+)$").expect("typed alias regex is valid"));

/// Split `key` into (base, type) when it is a typed alias
fn split_alias(key: &str) -> Option<(&str, TypeTag)> {
    let caps = TYPED_ALIAS_RE.captures(key)?;
    let base = caps.get(1)?.as_str();
    let tag = caps.get(2)?.as_str().parse().ok()?;
    Some((base, tag))
}

/// One `[section]` of a configuration store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSection {
    name: String,
    values: BTreeMap<String, String>,
    types: BTreeMap<String, TypeTag>,
}

impl ConfigSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Raw entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Store a raw string, bypassing type handling
    pub fn set_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove a raw entry
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn declared_type(&self, key: &str) -> Option<TypeTag> {
        self.types.get(key).copied()
    }

    pub fn types(&self) -> &BTreeMap<String, TypeTag> {
        &self.types
    }

    /// Resolve `key` to (base key, type) if it names a declared typed alias
    fn typed_alias(&self, key: &str) -> Option<(String, TypeTag)> {
        let (base, tag) = split_alias(key)?;
        (self.declared_type(base) == Some(tag)).then(|| (base.to_string(), tag))
    }

    /// Read a value, decoding it when `key` is a typed alias
    pub fn get(&self, key: &str) -> Result<Value> {
        match self.typed_alias(key) {
            Some((base, tag)) => self.typed(&base, tag),
            None => self
                .get_raw(key)
                .map(Value::from)
                .ok_or_else(|| Error::key_not_found(&self.name, key)),
        }
    }

    /// Decode the value of `key` as `tag`
    pub fn typed(&self, key: &str, tag: TypeTag) -> Result<Value> {
        match tag {
            TypeTag::Sequence => {
                let slots = self.slots(key);
                if slots.is_empty() {
                    return Err(Error::key_not_found(&self.name, key));
                }
                Ok(Value::Sequence(sequence::decode(&slots)))
            }
            TypeTag::Str => self.get(key),
            _ => {
                let raw = self
                    .get_raw(key)
                    .ok_or_else(|| Error::key_not_found(&self.name, key))?;
                convert(TypeTag::Str, tag, &Value::from(raw)).map_err(|e| Error::conversion(key, e))
            }
        }
    }

    /// Typed value of `key` using its declared type, raw string otherwise
    pub fn get_declared(&self, key: &str) -> Result<Value> {
        match self.declared_type(key) {
            Some(tag) => self.typed(key, tag),
            None => self.get(key),
        }
    }

    /// Write a value. Typed values (or any value on a typed alias) are
    /// encoded to their string form before being stored.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (base, declared) = match self.typed_alias(key) {
            Some((base, tag)) => (base, Some(tag)),
            None => (key.to_string(), self.declared_type(key)),
        };

        match (&value, declared) {
            (Value::Str(raw), Some(TypeTag::Sequence)) => {
                let items = ListCodec::decode(raw).map_err(|e| Error::conversion(&base, e))?;
                self.write_items(&base, TypeTag::Sequence, &items);
            }
            (Value::Str(raw), Some(tag)) if tag != TypeTag::Str => {
                convert(TypeTag::Str, tag, &value).map_err(|e| Error::conversion(&base, e))?;
                self.values.insert(base, raw.clone());
            }
            (Value::Str(raw), _) => {
                self.values.insert(base, raw.clone());
            }
            (Value::Sequence(items), None | Some(TypeTag::Sequence)) => {
                self.write_items(&base, TypeTag::Sequence, items);
            }
            (typed, declared) => {
                let tag = typed.type_tag();
                if let Some(declared) = declared.filter(|d| *d != tag && *d != TypeTag::Str) {
                    return Err(Error::conversion(
                        &base,
                        ConversionError::BadType {
                            from: tag,
                            to: declared,
                        },
                    ));
                }
                let encoded =
                    convert(tag, TypeTag::Str, typed).map_err(|e| Error::conversion(&base, e))?;
                if let Value::Str(raw) = encoded {
                    self.values.insert(base, raw);
                }
            }
        }
        Ok(())
    }

    /// Declare the type of `key`; the current value, if any, must decode
    pub fn set_type(&mut self, key: &str, tag: TypeTag) -> Result<()> {
        if tag == TypeTag::Str {
            self.types.remove(key);
            return Ok(());
        }
        let alias = format!("{}_{}", key, tag);
        if self.values.contains_key(&alias) {
            return Err(Error::TypedAliasConflict {
                key: key.to_string(),
                alias,
            });
        }
        if tag != TypeTag::Sequence {
            if let Some(raw) = self.get_raw(key) {
                convert(TypeTag::Str, tag, &Value::from(raw))
                    .map_err(|e| Error::conversion(key, e))?;
            }
        }
        self.types.insert(key.to_string(), tag);
        Ok(())
    }

    /// Forget the declared type of `key`, keeping its raw value
    pub fn del_type(&mut self, key: &str) -> Option<TypeTag> {
        self.types.remove(key)
    }

    /// Slots of sequence `key`, holes included
    pub fn slots(&self, key: &str) -> BTreeMap<Slot, String> {
        sequence::collect_slots(key, self.values.iter())
    }

    /// Elements of a list or sequence, `None` when the key is absent
    pub fn items(&self, key: &str, kind: TypeTag) -> Result<Option<Vec<String>>> {
        if kind == TypeTag::Sequence {
            let slots = self.slots(key);
            return Ok((!slots.is_empty()).then(|| sequence::decode(&slots)));
        }
        match self.get_raw(key) {
            Some(raw) => ListCodec::decode(raw)
                .map(Some)
                .map_err(|e| Error::conversion(key, e)),
            None => Ok(None),
        }
    }

    /// Replace the elements of a list or sequence.
    ///
    /// Sequences are re-indexed against their current slots; slots that are
    /// not reused are removed.
    pub fn write_items(&mut self, key: &str, kind: TypeTag, items: &[String]) {
        if kind != TypeTag::Sequence {
            self.values.insert(key.to_string(), ListCodec::encode(&items.to_vec()));
            return;
        }
        let old = self.slots(key);
        let new = sequence::reindex(&old, items);
        for slot in old.keys().filter(|slot| !new.contains_key(slot)) {
            self.values.remove(&slot.key_name(key));
        }
        for (slot, value) in new {
            self.values.insert(slot.key_name(key), value);
        }
    }

    /// Append `value` to a list or sequence, creating it when absent
    pub fn append_item(&mut self, key: &str, kind: TypeTag, value: &str) -> Result<()> {
        let mut items = self.items(key, kind)?.unwrap_or_default();
        if items.iter().any(|item| item == value) {
            return Err(Error::ListValueAlreadyExists {
                section: self.name.clone(),
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        items.push(value.to_string());
        self.write_items(key, kind, &items);
        Ok(())
    }

    /// Remove `value` from a list or sequence
    pub fn remove_item(&mut self, key: &str, kind: TypeTag, value: &str) -> Result<()> {
        let mut items = self.items(key, kind)?.unwrap_or_default();
        let position = items
            .iter()
            .position(|item| item == value)
            .ok_or_else(|| Error::ListValueNotFound {
                section: self.name.clone(),
                key: key.to_string(),
                value: value.to_string(),
            })?;
        items.remove(position);
        self.write_items(key, kind, &items);
        Ok(())
    }

    /// Delete a key; a declared sequence loses all of its slots
    pub fn delete(&mut self, key: &str) -> Result<()> {
        if self.declared_type(key) == Some(TypeTag::Sequence) {
            let slots = self.slots(key);
            if slots.is_empty() {
                return Err(Error::key_not_found(&self.name, key));
            }
            for slot in slots.keys() {
                self.values.remove(&slot.key_name(key));
            }
            return Ok(());
        }
        self.values
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::key_not_found(&self.name, key))
    }

    /// Overlay `other` key by key; its type declarations are carried over
    pub fn update(&mut self, other: &ConfigSection) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
        for (key, tag) in &other.types {
            self.types.insert(key.clone(), *tag);
        }
    }

    /// Every key in typed form: declared keys decoded, sequences collapsed
    pub fn typed_entries(&self) -> Result<BTreeMap<String, Value>> {
        let mut entries = BTreeMap::new();
        let mut slot_keys = Vec::new();
        for (key, tag) in &self.types {
            if *tag == TypeTag::Sequence {
                let slots = self.slots(key);
                slot_keys.extend(slots.keys().map(|slot| slot.key_name(key)));
                entries.insert(key.clone(), Value::Sequence(sequence::decode(&slots)));
            } else if self.contains_key(key) {
                entries.insert(key.clone(), self.typed(key, *tag)?);
            }
        }
        for (key, raw) in &self.values {
            if !entries.contains_key(key) && !slot_keys.contains(key) {
                entries.insert(key.clone(), Value::from(raw.as_str()));
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn environment() -> ConfigSection {
        let mut section = ConfigSection::new("environment");
        section.set_raw("paths", "/bin, /usr/bin");
        section.set_type("paths", TypeTag::List).unwrap();
        section
    }

    #[test]
    fn test_typed_alias_lookup() {
        let section = environment();
        assert_eq!(section.get("paths").unwrap(), Value::from("/bin, /usr/bin"));
        assert_eq!(
            section.get("paths_list").unwrap(),
            Value::List(strings(&["/bin", "/usr/bin"]))
        );
        // undeclared alias is an ordinary missing key
        assert!(section.get("paths_bool").unwrap_err().is_not_found());
    }

    #[test]
    fn test_set_through_alias_reencodes() {
        let mut section = environment();
        section
            .set("paths_list", Value::List(strings(&["/sbin"])))
            .unwrap();
        assert_eq!(section.get_raw("paths"), Some("/sbin"));
    }

    #[test]
    fn test_set_typed_value_on_plain_key() {
        let mut section = ConfigSection::new("s");
        section.set("enabled", true).unwrap();
        section.set("limit", Value::Size(4096)).unwrap();
        assert_eq!(section.get_raw("enabled"), Some("yes"));
        assert_eq!(section.get_raw("limit"), Some("4k"));
    }

    #[test]
    fn test_set_rejects_wrong_type_for_declared_key() {
        let mut section = environment();
        let err = section.set("paths", true).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));

        section.set_type("flag", TypeTag::Bool).unwrap();
        let err = section.set("flag", "maybe").unwrap_err();
        assert!(matches!(
            err,
            Error::Conversion {
                source: ConversionError::StrToBool { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_set_type_validates_existing_value() {
        let mut section = ConfigSection::new("s");
        section.set_raw("size", "12Q");
        assert!(section.set_type("size", TypeTag::Size).is_err());
        assert_eq!(section.declared_type("size"), None);
    }

    #[test]
    fn test_set_type_on_missing_key_then_read() {
        let mut section = ConfigSection::new("s");
        section.set_type("size", TypeTag::Size).unwrap();
        assert!(section.get("size_size").unwrap_err().is_not_found());
        section.set("size", "2M").unwrap();
        assert_eq!(section.get("size_size").unwrap(), Value::Size(2 * 1024 * 1024));
    }

    #[test]
    fn test_typed_alias_conflict() {
        let mut section = ConfigSection::new("s");
        section.set_raw("paths", "a");
        section.set_raw("paths_list", "b");
        let err = section.set_type("paths", TypeTag::List).unwrap_err();
        assert!(matches!(err, Error::TypedAliasConflict { .. }));
    }

    #[test]
    fn test_del_type_keeps_raw_value() {
        let mut section = environment();
        assert_eq!(section.del_type("paths"), Some(TypeTag::List));
        assert!(section.get("paths_list").unwrap_err().is_not_found());
        assert_eq!(section.get_raw("paths"), Some("/bin, /usr/bin"));
    }

    #[test]
    fn test_sequence_through_section() {
        let mut section = ConfigSection::new("vpn");
        section.set_type("tun", TypeTag::Sequence).unwrap();
        section
            .set("tun_sequence", Value::Sequence(strings(&["A", "B", "C"])))
            .unwrap();
        assert_eq!(section.get_raw("tun-1"), Some("B"));

        section.remove_item("tun", TypeTag::Sequence, "B").unwrap();
        section.append_item("tun", TypeTag::Sequence, "D").unwrap();

        assert_eq!(section.get_raw("tun-0"), Some("A"));
        assert_eq!(section.get_raw("tun-1"), Some("D"));
        assert_eq!(section.get_raw("tun-2"), Some("C"));
        assert_eq!(section.get_raw("tun-3"), None);
        assert_eq!(
            section.get("tun_sequence").unwrap(),
            Value::Sequence(strings(&["A", "D", "C"]))
        );
    }

    #[test]
    fn test_list_item_operations() {
        let mut section = environment();
        section.append_item("paths", TypeTag::List, "/sbin").unwrap();
        assert_eq!(section.get_raw("paths"), Some("/bin, /usr/bin, /sbin"));

        let err = section.append_item("paths", TypeTag::List, "/bin").unwrap_err();
        assert!(matches!(err, Error::ListValueAlreadyExists { .. }));

        section.remove_item("paths", TypeTag::List, "/usr/bin").unwrap();
        assert_eq!(section.get_raw("paths"), Some("/bin, /sbin"));

        let err = section.remove_item("paths", TypeTag::List, "/opt").unwrap_err();
        assert!(matches!(err, Error::ListValueNotFound { .. }));
    }

    #[test]
    fn test_delete_sequence_removes_all_slots() {
        let mut section = ConfigSection::new("vpn");
        section.set_raw("tun", "Z");
        section.set_raw("tun-0", "A");
        section.set_raw("tunnel", "keep");
        section.set_type("tun", TypeTag::Sequence).unwrap();

        section.delete("tun").unwrap();
        assert_eq!(section.len(), 1);
        assert!(section.delete("tun").unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_overlays_values_and_types() {
        let mut base = ConfigSection::new("environment");
        base.set_raw("paths", "");
        base.set_raw("other", "1");

        base.update(&environment());

        assert_eq!(base.get_raw("paths"), Some("/bin, /usr/bin"));
        assert_eq!(base.get_raw("other"), Some("1"));
        assert_eq!(base.declared_type("paths"), Some(TypeTag::List));
    }

    #[test]
    fn test_typed_entries() {
        let mut section = environment();
        section.set_raw("name", "x");
        section.set_raw("tun-0", "A");
        section.set_raw("tun-1", "");
        section.set_raw("tun-4", "B");
        section.set_type("tun", TypeTag::Sequence).unwrap();

        let entries = section.typed_entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries["tun"], Value::Sequence(strings(&["A", "B"])));
        assert_eq!(entries["paths"], Value::List(strings(&["/bin", "/usr/bin"])));
        assert_eq!(entries["name"], Value::from("x"));
    }
}
