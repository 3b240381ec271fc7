use std::collections::{BTreeMap, btree_map};

use serde::Serialize;

use crate::HotkeyBinding;

/// In-memory mapping from normalized key combo to binding.
///
/// Keys are always normalized on the way in, so lookups with any spelling of
/// a combo find the same entry. Iteration is sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HotkeyTable {
    /// Bindings keyed by normalized combo.
    entries: BTreeMap<String, HotkeyBinding>,
}

impl HotkeyTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a binding, returning the normalized key it was stored under.
    ///
    /// An empty normalized key is allowed (a draft binding); it is kept in the
    /// table but never armed as a hook.
    pub fn add_or_replace(&mut self, key_combo: &str, binding: HotkeyBinding) -> String {
        let key = keychord::normalize(key_combo);
        self.entries.insert(key.clone(), binding);
        key
    }

    /// Insert under a key that is already normalized.
    pub(crate) fn insert_normalized(
        &mut self,
        key: String,
        binding: HotkeyBinding,
    ) -> Option<HotkeyBinding> {
        self.entries.insert(key, binding)
    }

    /// Remove a binding; `None` if nothing was stored under the combo.
    pub fn remove(&mut self, key_combo: &str) -> Option<HotkeyBinding> {
        self.entries.remove(&keychord::normalize(key_combo))
    }

    /// Move a binding to a new combo, replacing whatever was stored there.
    ///
    /// Returns the new normalized key, or `None` if `from` did not exist.
    pub fn rename(&mut self, from: &str, to: &str) -> Option<String> {
        let binding = self.remove(from)?;
        Some(self.add_or_replace(to, binding))
    }

    /// Replace the tag of an existing binding. Returns false if absent.
    pub fn set_tag(&mut self, key_combo: &str, tag: &str) -> bool {
        match self.entries.get_mut(&keychord::normalize(key_combo)) {
            Some(binding) => {
                binding.tag = tag.to_string();
                true
            }
            None => false,
        }
    }

    /// Look up a binding by any spelling of its combo.
    pub fn get(&self, key_combo: &str) -> Option<&HotkeyBinding> {
        self.entries.get(&keychord::normalize(key_combo))
    }

    /// Iterate all bindings in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, HotkeyBinding> {
        self.entries.iter()
    }

    /// Bindings that can be armed as hooks: non-empty key and at least one step.
    pub fn armable(&self) -> impl Iterator<Item = (&str, &HotkeyBinding)> {
        self.entries
            .iter()
            .filter(|(k, b)| !k.is_empty() && !b.actions.is_empty())
            .map(|(k, b)| (k.as_str(), b))
    }

    /// Sorted list of stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of stored bindings, drafts included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no bindings are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a HotkeyTable {
    type Item = (&'a String, &'a HotkeyBinding);
    type IntoIter = btree_map::Iter<'a, String, HotkeyBinding>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Action;

    fn binding(text: &str) -> HotkeyBinding {
        HotkeyBinding::untagged(vec![Action::text(text, 0.1)])
    }

    #[test]
    fn add_normalizes_and_last_write_wins() {
        let mut t = HotkeyTable::new();
        assert_eq!(t.add_or_replace("Shift+Ctrl+A", binding("one")), "ctrl+shift+a");
        t.add_or_replace("ctrl+shift+a", binding("two"));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("SHIFT+ctrl+a"), Some(&binding("two")));
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut t = HotkeyTable::new();
        assert!(t.remove("ctrl+9").is_none());
        t.add_or_replace("ctrl+9", binding("x"));
        assert!(t.remove("Ctrl + 9").is_some());
        assert!(t.is_empty());
    }

    #[test]
    fn drafts_are_stored_but_not_armable() {
        let mut t = HotkeyTable::new();
        assert_eq!(t.add_or_replace("  ", binding("draft")), "");
        t.add_or_replace("ctrl+e", HotkeyBinding::default());
        t.add_or_replace("ctrl+f", binding("f"));
        assert_eq!(t.len(), 3);
        let armable: Vec<&str> = t.armable().map(|(k, _)| k).collect();
        assert_eq!(armable, vec!["ctrl+f"]);
    }

    #[test]
    fn rename_moves_binding() {
        let mut t = HotkeyTable::new();
        t.add_or_replace("ctrl+1", binding("x"));
        assert_eq!(t.rename("ctrl+1", "alt+ctrl+2"), Some("ctrl+alt+2".to_string()));
        assert!(t.get("ctrl+1").is_none());
        assert_eq!(t.get("ctrl+alt+2"), Some(&binding("x")));
        assert_eq!(t.rename("ctrl+1", "ctrl+3"), None);
    }

    #[test]
    fn set_tag() {
        let mut t = HotkeyTable::new();
        t.add_or_replace("ctrl+1", binding("x"));
        assert!(t.set_tag("ctrl+1", "label"));
        assert_eq!(t.get("ctrl+1").map(|b| b.tag.as_str()), Some("label"));
        assert!(!t.set_tag("ctrl+2", "nope"));
    }

    #[test]
    fn iteration_is_sorted() {
        let mut t = HotkeyTable::new();
        t.add_or_replace("shift+b", binding("b"));
        t.add_or_replace("alt+a", binding("a"));
        t.add_or_replace("ctrl+c", binding("c"));
        assert_eq!(t.keys(), vec!["alt+a", "ctrl+c", "shift+b"]);
    }
}
