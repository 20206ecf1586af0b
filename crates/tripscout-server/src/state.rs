//! Shared application state.

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use tripscout_cache::{FeatureCache, Modality};
use tripscout_core::TripScoutConfig;
use tripscout_infer::{ImageEncoder, TextEncoder};
use tripscout_rank::SimilarityEngine;
use tripscout_store::{CatalogStore, PhotoStore};

/// Shared application state accessible from all route handlers.
/// Constructed once at startup; no ambient singletons.
pub struct AppState {
    pub config: TripScoutConfig,
    pub catalog: CatalogStore,
    pub photos: PhotoStore,
    pub text_encoder: Arc<dyn TextEncoder>,
    pub image_encoder: Arc<dyn ImageEncoder>,
    pub text_cache: Arc<FeatureCache>,
    pub image_cache: Arc<FeatureCache>,
    pub engine: SimilarityEngine,
    /// Process-wide id counter for new places. Per-request counters
    /// would let overlapping ingestions mint the same id.
    pub next_place_id: AtomicU64,
    /// Cooperative stop flag for a running cache rebuild. Set by the
    /// abort endpoint, cleared when the next rebuild starts.
    pub rebuild_abort: AtomicBool,
}

impl AppState {
    pub fn new(
        config: TripScoutConfig,
        catalog: CatalogStore,
        photos: PhotoStore,
        text_encoder: Arc<dyn TextEncoder>,
        image_encoder: Arc<dyn ImageEncoder>,
    ) -> Self {
        let text_cache = Arc::new(FeatureCache::open(
            config.data_paths.feature_file("text"),
            Modality::Text,
            config.text_dim,
            text_encoder.version(),
        ));
        let image_cache = Arc::new(FeatureCache::open(
            config.data_paths.feature_file("image"),
            Modality::Image,
            config.image_dim,
            image_encoder.version(),
        ));

        let engine = SimilarityEngine::new(
            text_encoder.clone(),
            image_encoder.clone(),
            text_cache.clone(),
            image_cache.clone(),
            config.max_results,
        );

        let next_place_id = tripscout_ingest::seed_id_counter(&catalog);

        Self {
            config,
            catalog,
            photos,
            text_encoder,
            image_encoder,
            text_cache,
            image_cache,
            engine,
            next_place_id,
            rebuild_abort: AtomicBool::new(false),
        }
    }

    /// Cache handle for one modality.
    pub fn cache_for(&self, modality: Modality) -> &Arc<FeatureCache> {
        match modality {
            Modality::Text => &self.text_cache,
            Modality::Image => &self.image_cache,
        }
    }
}
