//! TripScout Cache — durable per-modality feature vectors.
//!
//! One cache file per modality maps place id → vector plus the encoder
//! version that produced it. Entries from an older encoder read back as
//! absent and are lazily regenerated; writes go through write-then-rename
//! so readers never observe a partial file.

pub mod cache;
pub mod extract;

pub use cache::{FeatureCache, Modality};
pub use extract::{extract_missing, ExtractionReport};
