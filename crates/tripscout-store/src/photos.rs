//! Photo store — catalog photos saved under place ids, plus the pool of
//! sample query images offered to the frontend.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tracing::debug;

use tripscout_core::{Error, Result};

/// File-backed photo storage.
pub struct PhotoStore {
    photo_dir: PathBuf,
    sample_dir: PathBuf,
}

impl PhotoStore {
    pub fn new(photo_dir: impl AsRef<Path>, sample_dir: impl AsRef<Path>) -> Self {
        Self {
            photo_dir: photo_dir.as_ref().to_path_buf(),
            sample_dir: sample_dir.as_ref().to_path_buf(),
        }
    }

    /// Save photo bytes under the given place id. Returns the stored filename.
    pub fn save(&self, id: &str, bytes: &[u8]) -> Result<String> {
        let filename = format!("{}.jpg", id);
        let path = self.photo_dir.join(&filename);

        let tmp = path.with_extension("jpg.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| Error::StoreWrite {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Error::StoreWrite {
                id: id.to_string(),
                reason: e.to_string(),
            }
        })?;

        debug!("Saved photo {} ({} bytes)", filename, bytes.len());
        Ok(filename)
    }

    /// Full path of a stored catalog photo, if it exists.
    pub fn photo_path(&self, filename: &str) -> Option<PathBuf> {
        let path = self.photo_dir.join(sanitize_filename(filename));
        path.is_file().then_some(path)
    }

    /// Pick up to `n` random filenames from the sample image pool.
    pub fn sample(&self, n: usize) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.sample_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                    .filter_map(|e| e.file_name().into_string().ok())
                    .collect()
            })
            .unwrap_or_default();

        let mut rng = rand::thread_rng();
        names.shuffle(&mut rng);
        names.truncate(n);
        names
    }

    /// Full path of a sample image by name.
    pub fn sample_path(&self, name: &str) -> Option<PathBuf> {
        let path = self.sample_dir.join(sanitize_filename(name));
        path.is_file().then_some(path)
    }
}

/// Strip directory components to prevent path traversal.
fn sanitize_filename(name: &str) -> String {
    let name = name.replace('/', "").replace('\\', "").replace("..", "");
    std::path::Path::new(&name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (PhotoStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let photos = dir.path().join("photos");
        let samples = dir.path().join("samples");
        std::fs::create_dir_all(&photos).unwrap();
        std::fs::create_dir_all(&samples).unwrap();
        (PhotoStore::new(photos, samples), dir)
    }

    #[test]
    fn test_save_and_lookup() {
        let (store, _dir) = store();
        let filename = store.save("100001", b"jpegbytes").unwrap();
        assert_eq!(filename, "100001.jpg");

        let path = store.photo_path(&filename).expect("photo should exist");
        assert_eq!(std::fs::read(path).unwrap(), b"jpegbytes");
    }

    #[test]
    fn test_sample_bounded_by_pool_size() {
        let (store, dir) = store();
        for i in 0..3 {
            std::fs::write(dir.path().join("samples").join(format!("s{}.jpg", i)), b"x").unwrap();
        }
        assert_eq!(store.sample(2).len(), 2);
        assert_eq!(store.sample(10).len(), 3);
    }

    #[test]
    fn test_sanitize_blocks_traversal() {
        let (store, _dir) = store();
        assert!(store.sample_path("../../etc/passwd").is_none());
        assert!(store.photo_path("..%2f..").is_none());
    }
}
