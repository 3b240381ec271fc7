use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::{debug, info, warn};

use crate::{Action, Error, HotkeyTable, Result, defaults::IMAGES_DIR, images, raw};

/// Reads and writes the hotkey table as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    /// Location of the config document.
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store for the document at `path`. Nothing is read until [`Self::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the config document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Managed images directory, a sibling of the config document.
    pub fn images_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) => parent.join(IMAGES_DIR),
            None => PathBuf::from(IMAGES_DIR),
        }
    }

    /// Load strictly: read and parse errors are returned.
    ///
    /// A missing file is not an error and yields an empty table.
    pub fn try_load(&self) -> Result<HotkeyTable> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "config_missing; starting empty");
                return Ok(HotkeyTable::new());
            }
            Err(e) => {
                return Err(Error::Read {
                    path: self.path.clone(),
                    message: e.to_string(),
                });
            }
        };
        raw::decode_table(&text).map_err(|e| Error::Parse {
            path: self.path.clone(),
            line: e.line(),
            col: e.column(),
            message: e.to_string(),
        })
    }

    /// Load the table, falling back to an empty one on any failure.
    pub fn load(&self) -> HotkeyTable {
        match self.try_load() {
            Ok(table) => {
                info!(path = %self.path.display(), bindings = table.len(), "config_loaded");
                table
            }
            Err(e) => {
                warn!(error = %e, "config_load_failed; starting empty");
                HotkeyTable::new()
            }
        }
    }

    /// Persist the table as pretty-printed JSON.
    ///
    /// Writes a sibling temporary file and renames it over the target, so a
    /// failed write never leaves a truncated document behind.
    pub fn save(&self, table: &HotkeyTable) -> Result<()> {
        let err = |message: String| Error::Write {
            path: self.path.clone(),
            message,
        };
        let mut text = serde_json::to_string_pretty(table).map_err(|e| err(e.to_string()))?;
        text.push('\n');
        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        fs::write(&tmp, text).map_err(|e| err(e.to_string()))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(err(e.to_string()));
        }
        debug!(path = %self.path.display(), bindings = table.len(), "config_saved");
        Ok(())
    }

    /// Copy external image files referenced by `actions` into [`Self::images_dir`].
    pub fn import_images(&self, actions: &mut [Action]) -> Vec<PathBuf> {
        images::import_images(&self.images_dir(), actions, SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env, process,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;
    use crate::{ActionKind, HotkeyBinding};

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let dir = env::temp_dir().join(format!(
            "quickpaste-store-{label}-{}-{nanos}",
            process::id()
        ));
        fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = temp_dir("missing");
        let store = ConfigStore::new(dir.join("config.json"));
        assert!(store.try_load().expect("load").is_empty());
        assert!(store.load().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_empty_but_strict_load_reports() {
        let dir = temp_dir("corrupt");
        let path = dir.join("config.json");
        fs::write(&path, "{\n  \"ctrl+1\": ").expect("write");
        let store = ConfigStore::new(&path);
        assert!(store.load().is_empty());
        match store.try_load() {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = temp_dir("roundtrip");
        let store = ConfigStore::new(dir.join("config.json"));
        let mut table = HotkeyTable::new();
        table.add_or_replace(
            "shift+ctrl+a",
            HotkeyBinding::new(
                "greet",
                vec![Action::text("hi", 0.3), Action::key("enter", 0.1)],
            ),
        );
        table.add_or_replace("", HotkeyBinding::untagged(vec![Action::text("draft", 0.3)]));
        store.save(&table).expect("save");

        assert_eq!(store.try_load().expect("load"), table);
        assert!(!dir.join("config.json.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn saved_document_uses_current_schema() {
        let dir = temp_dir("schema");
        let store = ConfigStore::new(dir.join("config.json"));
        let mut table = HotkeyTable::new();
        table.add_or_replace("alt+x", HotkeyBinding::new("t", vec![Action::key("tab", 0.1)]));
        store.save(&table).expect("save");

        let text = fs::read_to_string(store.path()).expect("read");
        let doc: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(
            doc,
            serde_json::json!({
                "alt+x": { "tag": "t", "actions": [ { "type": "key", "value": "tab", "delay": 0.1 } ] }
            })
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn legacy_document_is_migrated_on_load() {
        let dir = temp_dir("legacy");
        let path = dir.join("config.json");
        fs::write(
            &path,
            r#"{ "Ctrl+1": "hello", "ctrl+2": { "type": "key", "value": "esc" } }"#,
        )
        .expect("write");
        let table = ConfigStore::new(&path).load();
        assert_eq!(table.keys(), vec!["ctrl+1", "ctrl+2"]);
        let b = table.get("ctrl+2").expect("binding");
        assert_eq!(b.actions[0].kind, ActionKind::Key);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn images_dir_is_next_to_config() {
        let store = ConfigStore::new("/srv/qp/config.json");
        assert_eq!(store.images_dir(), PathBuf::from("/srv/qp/images"));
        let relative = ConfigStore::new("config.json");
        assert_eq!(relative.images_dir(), PathBuf::from("images"));
    }
}
