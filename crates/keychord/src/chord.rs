use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Modifier, Result};

/// The plus key, which doubles as the token separator.
const PLUS: &str = "+";

/// Split a spec into lowercase, whitespace-free tokens, dropping empty segments.
///
/// A spec that is `+` or ends in `++` names the plus key itself: `ctrl++` is
/// ctrl held with `+`.
fn tokens(spec: &str) -> Vec<String> {
    let compact: String = spec
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let (body, plus) = if compact == PLUS || compact.ends_with("++") {
        (&compact[..compact.len() - 1], true)
    } else {
        (compact.as_str(), false)
    };
    let mut out: Vec<String> = body
        .split('+')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if plus {
        out.push(PLUS.to_string());
    }
    out
}

/// Returns the canonical form of a key combination spec.
///
/// Modifiers come first in the fixed order `ctrl`, `shift`, `alt`, `super`
/// (aliases are folded and duplicates collapsed), followed by the remaining
/// key tokens in their written order. Everything is lowercased and whitespace
/// is removed. A spec with no tokens normalizes to the empty string.
///
/// Normalizing an already-normalized string returns it unchanged.
pub fn normalize(spec: &str) -> String {
    let mut modifiers: Vec<Modifier> = Vec::new();
    let mut keys: Vec<String> = Vec::new();
    for token in tokens(spec) {
        match Modifier::from_spec(&token) {
            Some(m) => {
                if !modifiers.contains(&m) {
                    modifiers.push(m);
                }
            }
            None => keys.push(token),
        }
    }
    modifiers.sort_by_key(|m| m.rank());
    modifiers
        .iter()
        .map(|m| m.to_spec().to_string())
        .chain(keys)
        .collect::<Vec<_>>()
        .join("+")
}

/// A key combination: modifiers held while the key tokens are pressed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    /// Modifiers in canonical order, without duplicates.
    pub modifiers: Vec<Modifier>,
    /// Non-modifier key names, lowercase, in press order. Never empty.
    pub keys: Vec<String>,
}

impl Chord {
    /// Parses a chord specification such as "ctrl+shift+v" or "Enter".
    ///
    /// - Case-insensitive; whitespace inside tokens is ignored.
    /// - Modifier aliases are accepted (see [`Modifier::from_spec`]).
    /// - At least one non-modifier key is required.
    pub fn parse(spec: &str) -> Result<Self> {
        let canonical = normalize(spec);
        if canonical.is_empty() {
            return Err(Error::Empty);
        }
        let mut modifiers = Vec::new();
        let mut keys = Vec::new();
        for token in tokens(&canonical) {
            match Modifier::from_spec(&token) {
                Some(m) => modifiers.push(m),
                None => keys.push(token),
            }
        }
        if keys.is_empty() {
            return Err(Error::MissingKey(spec.to_string()));
        }
        Ok(Self { modifiers, keys })
    }

    /// Convenience constructor for a single key with modifiers.
    pub fn new(modifiers: &[Modifier], key: &str) -> Self {
        let mut modifiers = modifiers.to_vec();
        modifiers.sort_by_key(|m| m.rank());
        modifiers.dedup();
        Self {
            modifiers,
            keys: vec![key.to_lowercase()],
        }
    }

    /// Returns the canonical string form of this chord.
    pub fn to_string_canonical(&self) -> String {
        self.modifiers
            .iter()
            .map(|m| m.to_spec().to_string())
            .chain(self.keys.iter().cloned())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_canonical())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn canonical_modifier_order() {
        assert_eq!(normalize("Shift+ CTRL+a"), "ctrl+shift+a");
        assert_eq!(normalize("ctrl+shift+a"), "ctrl+shift+a");
        assert_eq!(normalize("alt+shift+ctrl+F5"), "ctrl+shift+alt+f5");
        assert_eq!(normalize("cmd+opt+k"), "alt+super+k");
    }

    #[test]
    fn whitespace_and_empty_segments() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("ctrl + + 1"), "ctrl+1");
        assert_eq!(normalize(" Page Up "), "pageup");
    }

    #[test]
    fn trailing_double_plus_is_the_plus_key() {
        assert_eq!(normalize("ctrl++"), "ctrl++");
        assert_eq!(normalize("Shift + Ctrl + +"), "ctrl+shift++");
        assert_eq!(normalize("+"), "+");
        assert_eq!(normalize("++"), "+");
        assert_eq!(normalize("ctrl+"), "ctrl");

        let c = Chord::parse("ctrl++").expect("parse");
        assert_eq!(c.modifiers, vec![Modifier::Control]);
        assert_eq!(c.keys, vec!["+".to_string()]);
        assert_eq!(c.to_string(), "ctrl++");
        assert_eq!(Chord::parse("ctrl++").expect("reparse"), c);
    }

    #[test]
    fn duplicate_modifiers_collapse() {
        assert_eq!(normalize("ctrl+control+a"), "ctrl+a");
    }

    #[test]
    fn key_tokens_keep_order() {
        assert_eq!(normalize("b+shift+a"), "shift+b+a");
    }

    #[test]
    fn parse_basic_chord() {
        let c = Chord::parse("shift+ctrl+v").expect("parse");
        assert_eq!(c.modifiers, vec![Modifier::Control, Modifier::Shift]);
        assert_eq!(c.keys, vec!["v".to_string()]);
        assert_eq!(c.to_string(), "ctrl+shift+v");
    }

    #[test]
    fn parse_plain_key() {
        let c = Chord::parse("Enter").expect("parse");
        assert!(c.modifiers.is_empty());
        assert_eq!(c.to_string(), "enter");
    }

    #[test]
    fn parse_rejects_modifier_only_and_empty() {
        assert_eq!(
            Chord::parse("ctrl+shift"),
            Err(Error::MissingKey("ctrl+shift".into()))
        );
        assert_eq!(Chord::parse("  "), Err(Error::Empty));
        assert_eq!(Chord::parse("ctrl+"), Err(Error::MissingKey("ctrl+".into())));
    }

    #[test]
    fn new_sorts_modifiers() {
        let c = Chord::new(&[Modifier::Super, Modifier::Control, Modifier::Super], "V");
        assert_eq!(c.to_string(), "ctrl+super+v");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(spec in "[a-zA-Z0-9 +]{0,24}") {
            let once = normalize(&spec);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(!once.contains(' '));
            // A leading or trailing `+` only ever comes from the plus key.
            prop_assert!(!once.starts_with('+') || once == "+");
            prop_assert!(!once.ends_with('+') || once == "+" || once.ends_with("++"));
        }

        #[test]
        fn modifier_permutations_agree(
            mods in proptest::sample::subsequence(vec!["ctrl", "shift", "alt"], 0..=3),
            key in "[a-z0-9]{1,3}",
        ) {
            let mut forward: Vec<&str> = mods.clone();
            forward.push(&key);
            let mut reversed: Vec<&str> = mods.iter().rev().copied().collect();
            reversed.push(&key);
            prop_assert_eq!(normalize(&forward.join("+")), normalize(&reversed.join("+")));
        }
    }
}
