//! File-backed hotstring store: one pretty-printed JSON database holding
//! ordered bundles, engine config and usage statistics.
//!
//! The engine only reads it through the [`HotstringStore`] trait at index
//! rebuild time; the CLI edits it between rebuilds.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::warn;

use klex_core::config::get_db_file_path;
use klex_core::{
    Bundle, EngineConfig, HotstringStore, KlexError, Result, StatisticsSink, StoredHotstring,
    TriggerClass, UsageStats,
};

pub const DEFAULT_BUNDLE: &str = "Default";

/// Everything persisted on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub stats: UsageStats,
    #[serde(default)]
    pub bundles: Vec<Bundle>,
}

impl Database {
    pub fn bundle_mut(&mut self, name: &str) -> Option<&mut Bundle> {
        self.bundles.iter_mut().find(|b| b.name == name)
    }
}

/// JSON store rooted at the config-dir database file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new() -> JsonStore {
        JsonStore {
            path: get_db_file_path(),
        }
    }

    pub fn at(path: PathBuf) -> JsonStore {
        JsonStore { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Database file modification time, for the change watcher.
    pub fn mtime(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    pub fn load(&self) -> Result<Database> {
        if !self.path.exists() {
            return Err(KlexError::DatabaseNotFound(
                self.path.to_string_lossy().to_string(),
            ));
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Database::default());
        }
        serde_json::from_str(&content).map_err(|e| e.into())
    }

    pub fn save(&self, db: &Database) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(db)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }

    /// Create the database with the seeded default bundle if missing.
    pub fn ensure_initialized(&self) -> Result<Database> {
        match self.load() {
            Ok(db) if !db.bundles.is_empty() => Ok(db),
            Ok(mut db) => {
                db.bundles.push(Bundle::new(DEFAULT_BUNDLE));
                self.save(&db)?;
                Ok(db)
            }
            Err(KlexError::DatabaseNotFound(_)) => {
                let mut db = Database::default();
                db.bundles.push(Bundle::new(DEFAULT_BUNDLE));
                self.save(&db)?;
                Ok(db)
            }
            Err(e) => Err(e),
        }
    }

    /// Add a hotstring to a bundle (created on first use). Replaces any
    /// existing definition of the same identity within that bundle.
    pub fn add_hotstring(
        &self,
        bundle: &str,
        display: &str,
        replacement: &str,
        triggers: &[TriggerClass],
    ) -> Result<()> {
        if display.is_empty() {
            return Err(KlexError::Other("hotstring text must be non-empty".into()));
        }
        if triggers.is_empty() {
            return Err(KlexError::Other(
                "hotstring needs at least one trigger class".into(),
            ));
        }
        let entry = StoredHotstring::new(display, replacement, triggers);

        let mut db = self.ensure_initialized()?;
        if db.bundle_mut(bundle).is_none() {
            db.bundles.push(Bundle::new(bundle));
        }
        let target = db.bundle_mut(bundle).expect("bundle just inserted");
        target.hotstrings.retain(|hs| hs.id != entry.id);
        target.hotstrings.push(entry);
        self.save(&db)
    }

    /// Delete a hotstring by display text, across all bundles.
    pub fn delete_hotstring(&self, display: &str) -> Result<()> {
        let id = klex_core::codec::encode(display);
        let mut db = self.load()?;
        let before: usize = db.bundles.iter().map(|b| b.hotstrings.len()).sum();
        for bundle in &mut db.bundles {
            bundle.hotstrings.retain(|hs| hs.id != id);
        }
        let after: usize = db.bundles.iter().map(|b| b.hotstrings.len()).sum();
        if before == after {
            return Err(KlexError::Other(format!(
                "hotstring '{}' not found",
                display
            )));
        }
        self.save(&db)
    }

    /// Update the replacement of an existing hotstring.
    pub fn update_hotstring(&self, display: &str, replacement: &str) -> Result<()> {
        let id = klex_core::codec::encode(display);
        let mut db = self.load()?;
        let mut updated = false;
        for bundle in &mut db.bundles {
            for hs in &mut bundle.hotstrings {
                if hs.id == id {
                    hs.replacement = replacement.to_string();
                    updated = true;
                }
            }
        }
        if !updated {
            return Err(KlexError::Other(format!(
                "hotstring '{}' not found",
                display
            )));
        }
        self.save(&db)
    }

    pub fn set_bundle_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let mut db = self.load()?;
        match db.bundle_mut(name) {
            Some(bundle) => {
                bundle.enabled = enabled;
                self.save(&db)
            }
            None => Err(KlexError::Other(format!("bundle '{}' not found", name))),
        }
    }
}

impl Default for JsonStore {
    fn default() -> Self {
        JsonStore::new()
    }
}

impl HotstringStore for JsonStore {
    fn enabled_bundles(&self) -> Vec<String> {
        match self.load() {
            Ok(db) => db
                .bundles
                .iter()
                .filter(|b| b.enabled)
                .map(|b| b.name.clone())
                .collect(),
            Err(err) => {
                warn!(error = %err, "could not list bundles, serving none");
                Vec::new()
            }
        }
    }

    fn hotstrings_in(&self, bundle: &str) -> Result<Vec<StoredHotstring>> {
        let db = self
            .load()
            .map_err(|e| KlexError::BundleUnavailable(bundle.to_string(), e.to_string()))?;
        db.bundles
            .iter()
            .find(|b| b.name == bundle)
            .map(|b| b.hotstrings.clone())
            .ok_or_else(|| {
                KlexError::BundleUnavailable(bundle.to_string(), "no such bundle".to_string())
            })
    }
}

impl StatisticsSink for JsonStore {
    fn record_expansion(&mut self, chars_saved: u64) -> Result<()> {
        let mut db = self.load()?;
        db.stats.expanded += 1;
        db.stats.chars_saved += chars_saved;
        self.save(&db)
    }
}
