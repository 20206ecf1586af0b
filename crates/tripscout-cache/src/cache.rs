//! The feature cache proper: in-memory map + durable JSON file.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::Array1;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tripscout_core::{Error, Result};

/// An independent feature-extraction channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Modality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Modality::Text),
            "image" => Ok(Modality::Image),
            other => Err(Error::InvalidParameter(format!("unknown modality: {}", other))),
        }
    }
}

/// One persisted vector with the encoder version that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    vector: Vec<f32>,
    encoder_version: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    entries: HashMap<String, CacheEntry>,
}

/// Per-modality mapping from place id to feature vector.
///
/// Reads are lock-free beyond an `RwLock` read guard; writes to the same
/// place id are serialized through a per-id lock table so two concurrent
/// extractions never race on the cache file.
pub struct FeatureCache {
    path: PathBuf,
    modality: Modality,
    dimension: usize,
    encoder_version: String,
    entries: RwLock<HashMap<String, CacheEntry>>,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    persist_lock: Mutex<()>,
    skip_list: RwLock<Vec<String>>,
}

impl FeatureCache {
    /// Open the cache file for one modality.
    ///
    /// An unreadable file or an entry with the wrong dimension counts as
    /// cache corruption: the cache starts empty and callers re-extract,
    /// rather than the error propagating into ranking.
    pub fn open(
        path: impl AsRef<Path>,
        modality: Modality,
        dimension: usize,
        encoder_version: impl Into<String>,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        let encoder_version = encoder_version.into();

        let entries = match Self::load_file(&path, dimension) {
            Ok(entries) => {
                if !entries.is_empty() {
                    info!(
                        "Loaded {} cache: {} entries from {}",
                        modality,
                        entries.len(),
                        path.display()
                    );
                }
                entries
            }
            Err(e) => {
                warn!(
                    "{} cache unreadable ({}), starting empty and re-extracting",
                    modality, e
                );
                HashMap::new()
            }
        };

        Self {
            path,
            modality,
            dimension,
            encoder_version,
            entries: RwLock::new(entries),
            write_locks: Mutex::new(HashMap::new()),
            persist_lock: Mutex::new(()),
            skip_list: RwLock::new(Vec::new()),
        }
    }

    fn load_file(path: &Path, dimension: usize) -> Result<HashMap<String, CacheEntry>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let data = std::fs::read_to_string(path)?;
        let file: CacheFile = serde_json::from_str(&data)
            .map_err(|e| Error::CacheCorruption(format!("unparseable cache file: {}", e)))?;

        for (id, entry) in &file.entries {
            if entry.vector.len() != dimension {
                return Err(Error::CacheCorruption(format!(
                    "vector for {} has dimension {}, expected {}",
                    id,
                    entry.vector.len(),
                    dimension
                )));
            }
        }
        Ok(file.entries)
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn encoder_version(&self) -> &str {
        &self.encoder_version
    }

    /// Fetch the vector for one place. Entries recorded under a different
    /// encoder version are stale and read as absent — never served as
    /// valid.
    pub fn get(&self, place_id: &str) -> Option<Array1<f32>> {
        let entries = self.entries.read();
        let entry = entries.get(place_id)?;
        if entry.encoder_version != self.encoder_version {
            return None;
        }
        Some(Array1::from_vec(entry.vector.clone()))
    }

    /// Whether a current-version vector exists for this place.
    pub fn contains(&self, place_id: &str) -> bool {
        let entries = self.entries.read();
        entries
            .get(place_id)
            .map(|e| e.encoder_version == self.encoder_version)
            .unwrap_or(false)
    }

    /// Store a vector, overwriting any previous entry, and persist
    /// durably before returning. Writers to the same id are serialized.
    pub fn put(&self, place_id: &str, vector: &Array1<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::CacheCorruption(format!(
                "vector for {} has dimension {}, expected {}",
                place_id,
                vector.len(),
                self.dimension
            )));
        }

        let id_lock = self.lock_for(place_id);
        let _guard = id_lock.lock();

        {
            let mut entries = self.entries.write();
            entries.insert(
                place_id.to_string(),
                CacheEntry {
                    vector: vector.to_vec(),
                    encoder_version: self.encoder_version.clone(),
                },
            );
        }
        self.persist()
    }

    /// Number of current-version entries.
    pub fn coverage(&self) -> usize {
        let entries = self.entries.read();
        entries
            .values()
            .filter(|e| e.encoder_version == self.encoder_version)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Record ids whose encoder calls failed during the last extraction.
    /// These are reported, not silently dropped.
    pub fn record_failures(&self, ids: &[String]) {
        *self.skip_list.write() = ids.to_vec();
    }

    /// Ids skipped by the last extraction run.
    pub fn failed_ids(&self) -> Vec<String> {
        self.skip_list.read().clone()
    }

    fn lock_for(&self, place_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock();
        locks
            .entry(place_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Serialize the whole map to a temp file and rename it over the live
    /// one, so a reader never sees a partial file.
    ///
    /// The persist lock orders snapshot, write, and rename across all
    /// writers: concurrent puts for different ids share the temp path,
    /// and without it a stale snapshot could be renamed over a newer one.
    fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock();
        let file = CacheFile {
            entries: self.entries.read().clone(),
        };
        let data = serde_json::to_string(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cache_at(dir: &Path, version: &str) -> FeatureCache {
        FeatureCache::open(dir.join("text_features.json"), Modality::Text, 3, version)
    }

    #[test]
    fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_at(dir.path(), "v1");

        assert!(cache.get("100001").is_none());
        cache.put("100001", &array![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(cache.get("100001").unwrap(), array![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = cache_at(dir.path(), "v1");
            cache.put("100001", &array![1.0, 2.0, 3.0]).unwrap();
        }
        let reopened = cache_at(dir.path(), "v1");
        assert_eq!(reopened.get("100001").unwrap(), array![1.0, 2.0, 3.0]);
        assert_eq!(reopened.coverage(), 1);
    }

    #[test]
    fn test_stale_encoder_version_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = cache_at(dir.path(), "v1");
            cache.put("100001", &array![1.0, 2.0, 3.0]).unwrap();
        }
        let upgraded = cache_at(dir.path(), "v2");
        assert!(upgraded.get("100001").is_none());
        assert!(!upgraded.contains("100001"));
        assert_eq!(upgraded.coverage(), 0);
        // The raw entry is still there until re-extraction overwrites it
        assert_eq!(upgraded.len(), 1);
    }

    #[test]
    fn test_dimension_mismatch_rejected_on_put() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_at(dir.path(), "v1");
        let err = cache.put("100001", &array![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::CacheCorruption(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text_features.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = cache_at(dir.path(), "v1");
        assert!(cache.is_empty());

        // And the cache is usable again after the first write
        cache.put("100001", &array![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(cache.coverage(), 1);
    }

    #[test]
    fn test_wrong_dimension_on_disk_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        {
            let four_dim = FeatureCache::open(
                dir.path().join("text_features.json"),
                Modality::Text,
                4,
                "v1",
            );
            four_dim.put("100001", &array![1.0, 2.0, 3.0, 4.0]).unwrap();
        }
        let cache = cache_at(dir.path(), "v1");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_overwrite_replaces_whole_vector() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_at(dir.path(), "v1");
        cache.put("100001", &array![1.0, 1.0, 1.0]).unwrap();
        cache.put("100001", &array![2.0, 2.0, 2.0]).unwrap();
        assert_eq!(cache.get("100001").unwrap(), array![2.0, 2.0, 2.0]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_puts_to_distinct_ids_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_at(dir.path(), "v1");

        // Writers to different ids share the cache file; every put must
        // succeed and every entry must survive a reopen.
        std::thread::scope(|scope| {
            for i in 0..16 {
                let cache = &cache;
                scope.spawn(move || {
                    let id = format!("1000{:02}", i);
                    cache.put(&id, &array![i as f32, 0.0, 0.0]).unwrap();
                });
            }
        });

        assert_eq!(cache.coverage(), 16);

        let reopened = cache_at(dir.path(), "v1");
        assert_eq!(reopened.coverage(), 16);
        assert_eq!(reopened.get("100007").unwrap(), array![7.0, 0.0, 0.0]);
    }

    #[test]
    fn test_failure_skip_list() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_at(dir.path(), "v1");
        cache.record_failures(&["100007".to_string()]);
        assert_eq!(cache.failed_ids(), vec!["100007".to_string()]);
    }
}
