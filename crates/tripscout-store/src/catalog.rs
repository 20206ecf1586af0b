//! Catalog store — the full place list in one JSON file.
//!
//! The file is loaded whole at startup and held in memory; every append
//! rewrites it via write-then-rename so readers never see a partial file.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::Place;
use tripscout_core::{Error, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    places: Vec<Place>,
}

/// Read access plus append-on-add over the place list.
pub struct CatalogStore {
    path: PathBuf,
    places: RwLock<Vec<Place>>,
}

impl CatalogStore {
    /// Open the catalog file, or start empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let places = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            let file: CatalogFile = serde_json::from_str(&data)?;
            info!("Loaded catalog: {} places from {}", file.places.len(), path.display());
            file.places
        } else {
            info!("No catalog file at {}, starting empty", path.display());
            Vec::new()
        };

        Ok(Self {
            path,
            places: RwLock::new(places),
        })
    }

    /// Snapshot of all places in insertion order.
    pub fn list(&self) -> Vec<Place> {
        self.places.read().clone()
    }

    pub fn len(&self) -> usize {
        self.places.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Place> {
        self.places.read().iter().find(|p| p.id == id).cloned()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.places.read().iter().any(|p| p.id == id)
    }

    /// Number of places still waiting for feature extraction.
    pub fn pending_count(&self) -> usize {
        self.places.read().iter().filter(|p| p.pending_features).count()
    }

    /// Highest numeric id currently in the catalog, if any.
    pub fn max_numeric_id(&self) -> Option<u64> {
        self.places
            .read()
            .iter()
            .filter_map(|p| p.id.parse::<u64>().ok())
            .max()
    }

    /// Append one place and persist. The in-memory list is only updated
    /// after the file write succeeds, so a failed append leaves no trace.
    pub fn append(&self, place: Place) -> Result<()> {
        let id = place.id.clone();
        let mut places = self.places.write();

        if places.iter().any(|p| p.id == id) {
            return Err(Error::StoreWrite {
                id,
                reason: "duplicate place id".into(),
            });
        }

        let mut next = places.clone();
        next.push(place);
        self.save(&next).map_err(|e| Error::StoreWrite {
            id,
            reason: e.to_string(),
        })?;

        *places = next;
        Ok(())
    }

    /// Flip the pending-features flag for one place and persist.
    pub fn set_pending_features(&self, id: &str, pending: bool) -> Result<()> {
        let mut places = self.places.write();

        let mut next = places.clone();
        let place = next
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("place {}", id)))?;

        if place.pending_features == pending {
            return Ok(());
        }
        place.pending_features = pending;

        self.save(&next).map_err(|e| Error::StoreWrite {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

        *places = next;
        Ok(())
    }

    /// Write the full list to a temp file and rename it over the live one.
    fn save(&self, places: &[Place]) -> Result<()> {
        let file = CatalogFile {
            places: places.to_vec(),
        };
        let data = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!("Catalog rename failed, cleaning up temp file: {}", e);
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: &str, name: &str) -> Place {
        Place {
            id: id.into(),
            name: name.into(),
            location: "somewhere".into(),
            description: "a place".into(),
            tags: vec![],
            photo: None,
            pending_features: false,
        }
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(dir.path().join("catalog.json")).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.max_numeric_id(), None);
    }

    #[test]
    fn test_append_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let store = CatalogStore::open(&path).unwrap();
        store.append(place("100001", "Tower")).unwrap();
        store.append(place("100002", "Bridge")).unwrap();
        assert_eq!(store.len(), 2);

        // Reopen from disk — appends must have been durable
        let reopened = CatalogStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("100002").unwrap().name, "Bridge");
        assert_eq!(reopened.max_numeric_id(), Some(100002));
    }

    #[test]
    fn test_append_rejects_duplicate_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(dir.path().join("catalog.json")).unwrap();
        store.append(place("100001", "Tower")).unwrap();

        let err = store.append(place("100001", "Other")).unwrap_err();
        match err {
            tripscout_core::Error::StoreWrite { id, .. } => assert_eq!(id, "100001"),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_pending_flag_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let store = CatalogStore::open(&path).unwrap();
        let mut p = place("100001", "Tower");
        p.pending_features = true;
        store.append(p).unwrap();
        assert_eq!(store.pending_count(), 1);

        store.set_pending_features("100001", false).unwrap();
        assert_eq!(store.pending_count(), 0);

        let reopened = CatalogStore::open(&path).unwrap();
        assert!(!reopened.get("100001").unwrap().pending_features);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(dir.path().join("catalog.json")).unwrap();
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            store.append(place(&format!("10000{}", i), name)).unwrap();
        }
        let names: Vec<_> = store.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
