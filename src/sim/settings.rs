/// Player preferences and the local key-value store that keeps them.
///
/// The store is a flat JSON object of string keys to string values, kept in
/// `storage.json` in the data directory. Settings live under one key as a
/// JSON document, merged over the defaults on load so older files missing a
/// field still work and unknown fields are ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SETTINGS_KEY: &str = "sudokuProSettings";
pub const STORE_FILE: &str = "storage.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub animations: bool,
    #[serde(rename = "autoCheck")]
    pub auto_check: bool,
    pub sound: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: Theme::Light,
            animations: true,
            auto_check: true,
            sound: true,
        }
    }
}

/// Rows of the settings form, top to bottom.
pub const SETTING_ROWS: usize = 4;

impl Settings {
    /// Flip the value on form row `row`.
    pub fn toggle_row(&mut self, row: usize) {
        match row {
            0 => self.theme = self.theme.toggled(),
            1 => self.animations = !self.animations,
            2 => self.auto_check = !self.auto_check,
            3 => self.sound = !self.sound,
            _ => {}
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode store: {0}")]
    Json(#[from] serde_json::Error),
}

// ── LocalStore ──

#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    /// Open the store in `dir`. A missing or unreadable file is an empty store.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(STORE_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "store unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        LocalStore { path, entries }
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set and flush to disk.
    pub fn set_item(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn flush(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        let io = |source| StoreError::Io { path: self.path.clone(), source };
        std::fs::write(&tmp, text).map_err(io)?;
        std::fs::rename(&tmp, &self.path).map_err(io)
    }
}

pub fn load_settings(store: &LocalStore) -> Settings {
    let Some(raw) = store.get_item(SETTINGS_KEY) else {
        return Settings::default();
    };
    serde_json::from_str(raw).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "saved settings unreadable, using defaults");
        Settings::default()
    })
}

pub fn save_settings(store: &mut LocalStore, settings: &Settings) -> Result<(), StoreError> {
    let raw = serde_json::to_string(settings)?;
    store.set_item(SETTINGS_KEY, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open(dir.path());
        let settings = Settings {
            theme: Theme::Dark,
            animations: false,
            ..Settings::default()
        };
        save_settings(&mut store, &settings).unwrap();

        let reopened = LocalStore::open(dir.path());
        let loaded = load_settings(&reopened);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn stored_document_uses_camel_case_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open(dir.path());
        save_settings(&mut store, &Settings::default()).unwrap();
        let raw = store.get_item(SETTINGS_KEY).unwrap();
        assert!(raw.contains("\"autoCheck\":true"));
        assert!(raw.contains("\"theme\":\"light\""));
    }

    #[test]
    fn partial_document_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open(dir.path());
        store
            .set_item(SETTINGS_KEY, r#"{"sound": false, "fontSize": 3}"#.to_string())
            .unwrap();
        let s = load_settings(&store);
        assert!(!s.sound);
        assert_eq!(s.theme, Theme::Light);
        assert!(s.animations);
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STORE_FILE), "{not json").unwrap();
        let store = LocalStore::open(dir.path());
        assert_eq!(load_settings(&store), Settings::default());
    }

    #[test]
    fn toggle_rows_flip_each_field() {
        let mut s = Settings::default();
        for row in 0..SETTING_ROWS {
            s.toggle_row(row);
        }
        assert_eq!(
            s,
            Settings { theme: Theme::Dark, animations: false, auto_check: false, sound: false }
        );
    }
}
