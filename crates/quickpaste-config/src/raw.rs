//! Schema migration for stored hotkey entries.
//!
//! Older config files stored each hotkey value in one of several shapes. Every
//! shape decodes through [`RawEntry`], an untagged enum whose variant order is
//! the fallback order:
//!
//! 1. a bare string: one text step, untagged
//! 2. an object with `actions`: the current schema, taken as-is
//! 3. a bare list of step objects: becomes `actions`, untagged
//! 4. a single step object (`type`/`kind` but no `actions`): a one-step list, untagged

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::{
    Action, Error, HotkeyBinding, HotkeyTable, Result, defaults::LEGACY_DELAY_SECS,
};

/// One stored hotkey value in any supported schema.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    /// Oldest format: the value was the text to paste.
    Text(String),
    /// Current format.
    Current(HotkeyBinding),
    /// Ordered steps without a tag.
    List(Vec<Action>),
    /// A single step object.
    Single(Action),
}

impl RawEntry {
    /// Short schema name for diagnostics.
    fn schema(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Current(_) => "current",
            Self::List(_) => "list",
            Self::Single(_) => "single",
        }
    }
}

impl From<RawEntry> for HotkeyBinding {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Text(value) => Self::untagged(vec![Action::text(value, LEGACY_DELAY_SECS)]),
            RawEntry::Current(binding) => binding,
            RawEntry::List(actions) => Self::untagged(actions),
            RawEntry::Single(action) => Self::untagged(vec![action]),
        }
    }
}

/// Decode a single stored entry, given as JSON text, in any supported schema.
pub fn decode_entry(text: &str) -> Result<HotkeyBinding> {
    let raw: RawEntry = serde_json::from_str(text).map_err(|e| Error::Entry(e.to_string()))?;
    Ok(raw.into())
}

/// Decode a whole config document into a table, migrating and normalizing keys.
///
/// Entries that match no schema are skipped with a warning. When two stored
/// keys normalize to the same combo, the one decoded later wins.
pub(crate) fn decode_table(text: &str) -> serde_json::Result<HotkeyTable> {
    let doc: Map<String, Value> = serde_json::from_str(text)?;
    let mut table = HotkeyTable::new();
    for (stored_key, value) in doc {
        let raw = match serde_json::from_value::<RawEntry>(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %stored_key, error = %e, "skipping_unreadable_hotkey_entry");
                continue;
            }
        };
        trace!(key = %stored_key, schema = raw.schema(), "hotkey_entry_decoded");
        let key = keychord::normalize(&stored_key);
        if key != stored_key {
            debug!(from = %stored_key, to = %key, "hotkey_key_normalized");
        }
        if table.insert_normalized(key.clone(), raw.into()).is_some() {
            warn!(key = %key, "duplicate_hotkey_after_normalization; keeping later entry");
        }
    }
    Ok(table)
}
