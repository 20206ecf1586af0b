//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all TripScout data directories and files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Catalog photos, one file per place id (`data/photos/`).
    pub photos: PathBuf,
    /// Sample query images offered to the frontend (`data/sample-images/`).
    pub sample_images: PathBuf,
    /// Feature cache files, one per modality (`data/features/`).
    pub features: PathBuf,
    /// Encoder model files (`data/models/`).
    pub models: PathBuf,
    /// The catalog file holding the full place list (`data/catalog.json`).
    pub catalog_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            photos: root.join("photos"),
            sample_images: root.join("sample-images"),
            features: root.join("features"),
            models: root.join("models"),
            catalog_file: root.join("catalog.json"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    /// Create all required directories.
    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.photos)?;
        std::fs::create_dir_all(&self.sample_images)?;
        std::fs::create_dir_all(&self.features)?;
        std::fs::create_dir_all(&self.models)?;
        Ok(())
    }

    /// Cache file for one modality, e.g. `features/text_features.json`.
    pub fn feature_file(&self, modality: &str) -> PathBuf {
        self.features.join(format!("{}_features.json", modality))
    }
}

/// Top-level TripScout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripScoutConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Text embedding dimension (768 for BERT-base class models).
    pub text_dim: usize,
    /// Image embedding dimension (768 for ViT-base class models).
    pub image_dim: usize,
    /// Hard cap on how many results a ranking may return.
    pub max_results: usize,
    /// How many sample query images to offer at once.
    pub sample_image_count: usize,
    /// Worker pool size for batch feature extraction.
    pub extract_workers: usize,
}

impl TripScoutConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3110);

        let extract_workers = std::env::var("TRIPSCOUT_EXTRACT_WORKERS")
            .ok()
            .and_then(|w| w.parse().ok())
            .unwrap_or(8);

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            text_dim: 768,
            image_dim: 768,
            max_results: 20,
            sample_image_count: 6,
            extract_workers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_file_naming() {
        let paths = DataPaths {
            root: PathBuf::from("/tmp/x"),
            photos: PathBuf::from("/tmp/x/photos"),
            sample_images: PathBuf::from("/tmp/x/sample-images"),
            features: PathBuf::from("/tmp/x/features"),
            models: PathBuf::from("/tmp/x/models"),
            catalog_file: PathBuf::from("/tmp/x/catalog.json"),
        };
        assert_eq!(
            paths.feature_file("text"),
            PathBuf::from("/tmp/x/features/text_features.json")
        );
    }
}
