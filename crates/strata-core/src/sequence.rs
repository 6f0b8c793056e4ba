//! Sequence values spread over several keys
//!
//! A sequence `tun` is stored as `tun` and/or `tun-<n>` keys of one section.
//! Elements are ordered by slot (bare key first, then ascending index).
//! Rewriting a sequence keeps unchanged elements in their old slot and packs
//! new elements into the lowest free indexes, so adding or removing one
//! element never renumbers the others.

use std::collections::{BTreeMap, BTreeSet};

/// Storage position of one sequence element
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    /// The key itself, without index
    Bare,
    /// `key-<n>`
    Index(u32),
}

impl Slot {
    /// Key name this slot occupies for sequence `key`
    pub fn key_name(&self, key: &str) -> String {
        match self {
            Slot::Bare => key.to_string(),
            Slot::Index(n) => format!("{}-{}", key, n),
        }
    }

    /// Parse `candidate` as a slot of sequence `key`
    pub fn parse(key: &str, candidate: &str) -> Option<Slot> {
        if candidate == key {
            return Some(Slot::Bare);
        }
        let digits = candidate.strip_prefix(key)?.strip_prefix('-')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Slot::Index)
    }
}

/// Collect the slots of sequence `key` from a section's entries
pub fn collect_slots<'a, I>(key: &str, entries: I) -> BTreeMap<Slot, String>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    entries
        .into_iter()
        .filter_map(|(name, value)| Slot::parse(key, name).map(|slot| (slot, value.clone())))
        .collect()
}

/// Ordered elements of a sequence; empty slots are holes and are skipped
pub fn decode(slots: &BTreeMap<Slot, String>) -> Vec<String> {
    slots
        .values()
        .filter(|value| !value.is_empty())
        .cloned()
        .collect()
}

/// Assign slots to `new`, keeping old slots for unchanged elements.
///
/// Unchanged elements are the longest common subsequence between the old
/// elements (in slot order) and `new`, so their relative order is kept.
/// Remaining elements take the lowest indexes not held by unchanged ones,
/// in list order. Old slots that are not reassigned are absent from the
/// result and must be deleted by the caller.
pub fn reindex(old: &BTreeMap<Slot, String>, new: &[String]) -> BTreeMap<Slot, String> {
    let old_entries: Vec<(Slot, &str)> = old
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(slot, value)| (*slot, value.as_str()))
        .collect();

    let mut assigned: Vec<Option<Slot>> = vec![None; new.len()];
    for (old_pos, new_pos) in common_subsequence(&old_entries, new) {
        assigned[new_pos] = Some(old_entries[old_pos].0);
    }

    let mut used: BTreeSet<Slot> = assigned.iter().flatten().copied().collect();
    let mut next = 0u32;
    for slot in assigned.iter_mut().filter(|slot| slot.is_none()) {
        while used.contains(&Slot::Index(next)) {
            next += 1;
        }
        *slot = Some(Slot::Index(next));
        used.insert(Slot::Index(next));
    }

    assigned
        .into_iter()
        .zip(new.iter())
        .filter_map(|(slot, value)| slot.map(|slot| (slot, value.clone())))
        .collect()
}

/// Fresh assignment `key-0..key-n` for a sequence with no history
pub fn encode(new: &[String]) -> BTreeMap<Slot, String> {
    reindex(&BTreeMap::new(), new)
}

/// Index pairs (old, new) of a longest common subsequence
fn common_subsequence(old: &[(Slot, &str)], new: &[String]) -> Vec<(usize, usize)> {
    let (n, m) = (old.len(), new.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if old[i].1 == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i].1 == new[j] {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(entries: &[(&str, &str)]) -> BTreeMap<Slot, String> {
        let owned: Vec<(String, String)> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        collect_slots("tun", owned.iter().map(|(k, v)| (k, v)))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_slot_parse() {
        assert_eq!(Slot::parse("tun", "tun"), Some(Slot::Bare));
        assert_eq!(Slot::parse("tun", "tun-12"), Some(Slot::Index(12)));
        assert_eq!(Slot::parse("tun", "tun-"), None);
        assert_eq!(Slot::parse("tun", "tun-x"), None);
        assert_eq!(Slot::parse("tun", "tunnel-1"), None);
        assert_eq!(Slot::parse("tun", "other"), None);
    }

    #[test]
    fn test_decode_orders_by_slot_and_skips_holes() {
        let old = slots(&[("tun-2", "C"), ("tun", "Z"), ("tun-0", "A"), ("tun-1", "")]);
        assert_eq!(decode(&old), strings(&["Z", "A", "C"]));
    }

    #[test]
    fn test_remove_and_add_reuses_freed_index() {
        let old = slots(&[("tun-0", "A"), ("tun-1", "B"), ("tun-2", "C")]);
        let new = reindex(&old, &strings(&["A", "C", "D"]));

        assert_eq!(new.get(&Slot::Index(0)).map(String::as_str), Some("A"));
        assert_eq!(new.get(&Slot::Index(1)).map(String::as_str), Some("D"));
        assert_eq!(new.get(&Slot::Index(2)).map(String::as_str), Some("C"));
        assert!(!new.contains_key(&Slot::Index(3)));
    }

    #[test]
    fn test_removal_leaves_other_slots_untouched() {
        let old = slots(&[("tun-0", "A"), ("tun-1", "B"), ("tun-5", "C")]);
        let new = reindex(&old, &strings(&["A", "C"]));

        assert_eq!(new.len(), 2);
        assert_eq!(new.get(&Slot::Index(0)).map(String::as_str), Some("A"));
        assert_eq!(new.get(&Slot::Index(5)).map(String::as_str), Some("C"));
    }

    #[test]
    fn test_append_fills_lowest_gap() {
        let old = slots(&[("tun-1", "A"), ("tun-3", "B")]);
        let new = reindex(&old, &strings(&["A", "B", "C", "D"]));

        assert_eq!(new.get(&Slot::Index(0)).map(String::as_str), Some("C"));
        assert_eq!(new.get(&Slot::Index(2)).map(String::as_str), Some("D"));
        assert_eq!(new.get(&Slot::Index(1)).map(String::as_str), Some("A"));
        assert_eq!(new.get(&Slot::Index(3)).map(String::as_str), Some("B"));
    }

    #[test]
    fn test_bare_slot_is_kept() {
        let old = slots(&[("tun", "A"), ("tun-0", "B")]);
        let new = reindex(&old, &strings(&["A", "B", "C"]));

        assert_eq!(new.get(&Slot::Bare).map(String::as_str), Some("A"));
        assert_eq!(new.get(&Slot::Index(0)).map(String::as_str), Some("B"));
        assert_eq!(new.get(&Slot::Index(1)).map(String::as_str), Some("C"));
    }

    #[test]
    fn test_reorder_keeps_relative_order_of_stable_elements() {
        let old = slots(&[("tun-0", "A"), ("tun-1", "B"), ("tun-2", "C")]);
        let new = reindex(&old, &strings(&["C", "A", "B"]));

        // A and B stay put; C no longer fits before them and is moved
        assert_eq!(new.get(&Slot::Index(0)).map(String::as_str), Some("A"));
        assert_eq!(new.get(&Slot::Index(1)).map(String::as_str), Some("B"));
        assert_eq!(new.get(&Slot::Index(2)).map(String::as_str), Some("C"));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let items = strings(&["a, b", "c", "d"]);
        let encoded = encode(&items);
        assert_eq!(
            encoded.keys().map(|s| s.key_name("p")).collect::<Vec<_>>(),
            vec!["p-0", "p-1", "p-2"]
        );
        assert_eq!(decode(&encoded), items);
    }

    #[test]
    fn test_duplicates_are_matched_once() {
        let old = slots(&[("tun-0", "A"), ("tun-1", "A")]);
        let new = reindex(&old, &strings(&["A"]));
        assert_eq!(new.len(), 1);
        assert_eq!(new.get(&Slot::Index(0)).map(String::as_str), Some("A"));
    }
}
