//! Error types for TripScout.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Query carries neither text nor image.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Parameter outside its allowed range (e.g. blend weight > 100).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Encoder inference failed for one input. Isolated per item.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Unreadable cache file or vector dimension mismatch.
    /// Handled by forced re-extraction, never propagated from ranking.
    #[error("Cache corruption: {0}")]
    CacheCorruption(String),

    /// Catalog or cache persistence failed. Carries the place id so the
    /// caller can retry without creating a duplicate.
    #[error("Store write failed for place {id}: {reason}")]
    StoreWrite { id: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
