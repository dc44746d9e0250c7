//! Region stores: in-memory, and a JSON file at ~/.transit-regions/regions.json.
//!
//! A missing or unreadable file loads as an empty store. Every mutation is
//! written through to disk immediately.

use super::types::{Region, StoreError};
use super::RegionStore;
use crate::sync::lock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    regions: Vec<Region>,
    #[serde(default)]
    current_region_id: Option<u64>,
    #[serde(default = "default_auto_select")]
    automatically_select_region: bool,
    #[serde(default)]
    fetched_at: Option<DateTime<Utc>>,
}

fn default_auto_select() -> bool {
    true
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            current_region_id: None,
            automatically_select_region: default_auto_select(),
            fetched_at: None,
        }
    }
}

impl StoreDocument {
    fn current_region(&self) -> Option<Region> {
        let id = self.current_region_id?;
        self.regions.iter().find(|r| r.id == id).cloned()
    }
}

// ─── In-memory store ────────────────────────────────────────────

/// A store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryRegionStore {
    doc: Mutex<StoreDocument>,
}

impl MemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_regions(regions: Vec<Region>) -> Self {
        Self {
            doc: Mutex::new(StoreDocument {
                regions,
                ..Default::default()
            }),
        }
    }
}

impl RegionStore for MemoryRegionStore {
    fn regions(&self) -> Vec<Region> {
        lock(&self.doc).regions.clone()
    }

    fn replace_regions(&self, regions: Vec<Region>) -> Result<(), StoreError> {
        let mut doc = lock(&self.doc);
        doc.regions = regions;
        doc.fetched_at = Some(Utc::now());
        Ok(())
    }

    fn fetched_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.doc).fetched_at
    }

    fn current_region(&self) -> Option<Region> {
        lock(&self.doc).current_region()
    }

    fn set_current_region(&self, region: Option<&Region>) -> Result<(), StoreError> {
        lock(&self.doc).current_region_id = region.map(|r| r.id);
        Ok(())
    }

    fn automatically_select_region(&self) -> bool {
        lock(&self.doc).automatically_select_region
    }

    fn set_automatically_select_region(&self, enabled: bool) -> Result<(), StoreError> {
        lock(&self.doc).automatically_select_region = enabled;
        Ok(())
    }
}

// ─── File store ─────────────────────────────────────────────────

/// A store persisted as pretty-printed JSON.
pub struct FileRegionStore {
    path: PathBuf,
    doc: Mutex<StoreDocument>,
}

impl FileRegionStore {
    /// Load from the default location (~/.transit-regions/regions.json).
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load from a specific path.
    pub fn load_from(path: PathBuf) -> Self {
        let doc = Self::read_file(&path).unwrap_or_default();
        debug!(path = %path.display(), regions = doc.regions.len(), "Loaded region store");
        Self {
            path,
            doc: Mutex::new(doc),
        }
    }

    pub fn default_path() -> PathBuf {
        crate::config::data_dir().join("regions.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Option<StoreDocument> {
        let data = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable region store");
                None
            }
        }
    }

    /// Apply `change` to a copy of the document, persist it, and only then
    /// commit it in memory. A failed write leaves both untouched.
    fn update<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoreDocument),
    {
        let mut doc = lock(&self.doc);
        let mut next = doc.clone();
        change(&mut next);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&next)?;
        fs::write(&self.path, json)?;

        *doc = next;
        Ok(())
    }
}

impl RegionStore for FileRegionStore {
    fn regions(&self) -> Vec<Region> {
        lock(&self.doc).regions.clone()
    }

    fn replace_regions(&self, regions: Vec<Region>) -> Result<(), StoreError> {
        self.update(|doc| {
            doc.regions = regions;
            doc.fetched_at = Some(Utc::now());
        })
    }

    fn fetched_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.doc).fetched_at
    }

    fn current_region(&self) -> Option<Region> {
        lock(&self.doc).current_region()
    }

    fn set_current_region(&self, region: Option<&Region>) -> Result<(), StoreError> {
        let id = region.map(|r| r.id);
        self.update(|doc| doc.current_region_id = id)
    }

    fn automatically_select_region(&self) -> bool {
        lock(&self.doc).automatically_select_region
    }

    fn set_automatically_select_region(&self, enabled: bool) -> Result<(), StoreError> {
        self.update(|doc| doc.automatically_select_region = enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (FileRegionStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("regions.json");
        (FileRegionStore::load_from(path), dir)
    }

    #[test]
    fn test_empty_by_default() {
        let (store, _dir) = test_store();
        assert!(store.regions().is_empty());
        assert!(store.fetched_at().is_none());
        assert!(store.current_region().is_none());
        assert!(store.automatically_select_region());
    }

    #[test]
    fn test_replace_and_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("regions.json");

        {
            let store = FileRegionStore::load_from(path.clone());
            store
                .replace_regions(vec![Region::new(1, "Puget Sound"), Region::new(2, "Tampa Bay")])
                .unwrap();
            store.set_current_region(Some(&Region::new(2, "Tampa Bay"))).unwrap();
            store.set_automatically_select_region(false).unwrap();
        }

        let store = FileRegionStore::load_from(path);
        let names: Vec<_> = store.regions().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Puget Sound", "Tampa Bay"]);
        assert_eq!(store.current_region().unwrap().id, 2);
        assert!(!store.automatically_select_region());
        assert!(store.fetched_at().is_some());
    }

    #[test]
    fn test_current_region_must_exist() {
        let (store, _dir) = test_store();
        store.replace_regions(vec![Region::new(1, "A")]).unwrap();
        store.set_current_region(Some(&Region::new(7, "Gone"))).unwrap();
        assert!(store.current_region().is_none());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("regions.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileRegionStore::load_from(path);
        assert!(store.regions().is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("regions.json");
        fs::write(&path, r#"{"regions": [{"id": 3, "regionName": "Atlanta"}]}"#).unwrap();

        let store = FileRegionStore::load_from(path);
        let regions = store.regions();
        assert_eq!(regions.len(), 1);
        assert!(regions[0].active);
        assert!(store.automatically_select_region());
    }

    #[test]
    fn test_failed_write_keeps_memory_state() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the write fail.
        let path = dir.path().join("regions.json");
        fs::create_dir_all(&path).unwrap();

        let store = FileRegionStore::load_from(path);
        assert!(store.replace_regions(vec![Region::new(1, "A")]).is_err());
        assert!(store.regions().is_empty());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryRegionStore::with_regions(vec![Region::new(1, "A")]);
        assert_eq!(store.regions().len(), 1);
        assert!(store.fetched_at().is_none());
        store.set_current_region(Some(&Region::new(1, "A"))).unwrap();
        assert_eq!(store.current_region().unwrap().id, 1);
        store.replace_regions(vec![]).unwrap();
        assert!(store.current_region().is_none());
        assert!(store.fetched_at().is_some());
    }
}
