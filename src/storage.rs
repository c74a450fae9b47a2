//! Settings persistence
//!
//! Reads and writes the preferences document under a single key of a
//! string key-value store. Loading never fails: missing or malformed data
//! yields defaults. Save failures are logged and swallowed by callers, the
//! in-memory preferences stay authoritative for the session.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::{DefaultsConfig, StorageConfig};
use crate::error::AppError;
use crate::preferences::{Preferences, PreferencesError};

/// Synchronous string key-value storage (browser `localStorage` or memory)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferencesError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PreferencesError>;
}

/// In-memory store, used when persistent storage is unavailable
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferencesError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferencesError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Whether panel geometry survives across sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryPersistence {
    Retain,
    Discard,
}

impl GeometryPersistence {
    pub fn from_config(config: &StorageConfig) -> Self {
        if config.persist_geometry {
            GeometryPersistence::Retain
        } else {
            GeometryPersistence::Discard
        }
    }
}

/// Loads and saves [`Preferences`] through a [`KeyValueStore`]
pub struct SettingsStore {
    store: Box<dyn KeyValueStore>,
    key: String,
    geometry: GeometryPersistence,
    defaults: DefaultsConfig,
}

impl SettingsStore {
    pub fn new(
        store: Box<dyn KeyValueStore>,
        config: &StorageConfig,
        defaults: DefaultsConfig,
    ) -> Self {
        Self {
            store,
            key: config.key.clone(),
            geometry: GeometryPersistence::from_config(config),
            defaults,
        }
    }

    /// Load preferences, falling back to defaults
    pub fn load(&self) -> Preferences {
        let defaults = Preferences::from_defaults(&self.defaults);

        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("No stored preferences, using defaults");
                return defaults;
            }
            Err(e) => {
                warn!("{}", AppError::SettingsLoadCorrupt(e.to_string()));
                return defaults;
            }
        };

        let mut prefs = match Preferences::from_json_with_defaults(&raw, &self.defaults) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("{}", AppError::SettingsLoadCorrupt(e.to_string()));
                return defaults;
            }
        };

        prefs.validate(&self.defaults);
        if self.geometry == GeometryPersistence::Discard {
            prefs.box_geometry = None;
        }
        info!("Loaded preferences (version {})", prefs.version);
        prefs
    }

    /// Serialize and write preferences
    pub fn save(&self, prefs: &Preferences) -> Result<(), PreferencesError> {
        let json = match self.geometry {
            GeometryPersistence::Retain => prefs.to_json()?,
            GeometryPersistence::Discard => Preferences {
                box_geometry: None,
                ..prefs.clone()
            }
            .to_json()?,
        };
        self.store.set(&self.key, &json)
    }

    /// Save, logging instead of propagating failures
    pub fn save_or_log(&self, prefs: &Preferences) {
        if let Err(e) = self.save(prefs) {
            warn!("{}", AppError::SettingsSaveFailed(e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::BoxGeometry;
    use crate::testing::{FailingStore, SharedStore};
    use std::rc::Rc;

    fn settings(store: &Rc<MemoryStore>, geometry: GeometryPersistence) -> SettingsStore {
        let config = StorageConfig {
            persist_geometry: geometry == GeometryPersistence::Retain,
            ..StorageConfig::default()
        };
        SettingsStore::new(
            Box::new(SharedStore(store.clone())),
            &config,
            DefaultsConfig::default(),
        )
    }

    fn sample() -> Preferences {
        Preferences {
            script_text: "one two three".to_string(),
            scroll_speed_wpm: 42,
            text_size_px: 48,
            is_text_rotated: true,
            box_geometry: Some(BoxGeometry {
                left: 10.0,
                top: 20.0,
                width: 300.0,
                height: 200.0,
            }),
            ..Preferences::default()
        }
    }

    #[test]
    fn test_roundtrip_retains_geometry() {
        let store = Rc::new(MemoryStore::new());
        settings(&store, GeometryPersistence::Retain)
            .save(&sample())
            .unwrap();

        let loaded = settings(&store, GeometryPersistence::Retain).load();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_roundtrip_discards_geometry() {
        let store = Rc::new(MemoryStore::new());
        settings(&store, GeometryPersistence::Discard)
            .save(&sample())
            .unwrap();

        let raw = store.get("teleprompterSettings").unwrap().unwrap();
        assert!(raw.contains("\"boxGeometry\":null"));

        let loaded = settings(&store, GeometryPersistence::Discard).load();
        assert_eq!(
            loaded,
            Preferences {
                box_geometry: None,
                ..sample()
            }
        );
    }

    #[test]
    fn test_discard_ignores_previously_stored_geometry() {
        let store = Rc::new(MemoryStore::new());
        settings(&store, GeometryPersistence::Retain)
            .save(&sample())
            .unwrap();

        let loaded = settings(&store, GeometryPersistence::Discard).load();
        assert!(loaded.box_geometry.is_none());
        assert_eq!(loaded.scroll_speed_wpm, 42);
    }

    #[test]
    fn test_missing_key_yields_defaults() {
        let store = Rc::new(MemoryStore::new());
        let loaded = settings(&store, GeometryPersistence::Retain).load();
        assert_eq!(loaded, Preferences::default());
    }

    #[test]
    fn test_corrupt_blob_yields_defaults() {
        let store = Rc::new(MemoryStore::new());
        store.set("teleprompterSettings", "{\"scriptText\": ").unwrap();
        let loaded = settings(&store, GeometryPersistence::Retain).load();
        assert_eq!(loaded, Preferences::default());
    }

    #[test]
    fn test_invalid_fields_replaced_on_load() {
        let store = Rc::new(MemoryStore::new());
        store
            .set(
                "teleprompterSettings",
                r#"{"version":1,"scriptText":"hi","scrollSpeedWPM":0,"textSizePx":16}"#,
            )
            .unwrap();
        let loaded = settings(&store, GeometryPersistence::Retain).load();
        assert_eq!(loaded.script_text, "hi");
        assert_eq!(loaded.scroll_speed_wpm, 10);
        assert_eq!(loaded.text_size_px, 16);
    }

    #[test]
    fn test_partial_document_takes_configured_defaults() {
        let store = Rc::new(MemoryStore::new());
        store
            .set("teleprompterSettings", r#"{"scrollSpeedWPM":50}"#)
            .unwrap();
        let defaults = crate::config::AppConfig::embedded().defaults.clone();
        let settings = SettingsStore::new(
            Box::new(SharedStore(store.clone())),
            &StorageConfig::default(),
            defaults.clone(),
        );

        let loaded = settings.load();
        assert_eq!(loaded.scroll_speed_wpm, 50);
        assert_eq!(loaded.script_text, defaults.script_text);
        assert!(loaded.script_text.starts_with("Paste your script here"));
        assert_eq!(loaded.text_size_px, defaults.text_size_px);
    }

    #[test]
    fn test_non_object_document_yields_defaults() {
        let store = Rc::new(MemoryStore::new());
        store.set("teleprompterSettings", "[1, 2]").unwrap();
        let loaded = settings(&store, GeometryPersistence::Retain).load();
        assert_eq!(loaded, Preferences::default());
    }

    #[test]
    fn test_unreadable_store_yields_defaults() {
        let settings = SettingsStore::new(
            Box::new(FailingStore),
            &StorageConfig::default(),
            DefaultsConfig::default(),
        );
        assert_eq!(settings.load(), Preferences::default());
    }

    #[test]
    fn test_save_failure_is_reported_and_swallowable() {
        let settings = SettingsStore::new(
            Box::new(FailingStore),
            &StorageConfig::default(),
            DefaultsConfig::default(),
        );
        assert!(settings.save(&sample()).is_err());
        settings.save_or_log(&sample());
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = StorageConfig::default();
        assert_eq!(
            GeometryPersistence::from_config(&config),
            GeometryPersistence::Retain
        );
        config.persist_geometry = false;
        assert_eq!(
            GeometryPersistence::from_config(&config),
            GeometryPersistence::Discard
        );
    }
}
