//! The similarity engine: query → encode → score → rank.

use std::sync::Arc;

use ndarray::Array1;
use tracing::{debug, warn};

use crate::similarity::cosine_similarity;
use crate::types::{Query, RankResult, ScoredResult};
use tripscout_cache::FeatureCache;
use tripscout_core::{Error, Result};
use tripscout_infer::{ImageEncoder, TextEncoder};
use tripscout_store::CatalogStore;

/// The context object holding every handle ranking needs. Constructed
/// once at startup and passed into each call; no ambient singletons.
pub struct SimilarityEngine {
    text_encoder: Arc<dyn TextEncoder>,
    image_encoder: Arc<dyn ImageEncoder>,
    text_cache: Arc<FeatureCache>,
    image_cache: Arc<FeatureCache>,
    max_results: usize,
}

impl SimilarityEngine {
    pub fn new(
        text_encoder: Arc<dyn TextEncoder>,
        image_encoder: Arc<dyn ImageEncoder>,
        text_cache: Arc<FeatureCache>,
        image_cache: Arc<FeatureCache>,
        max_results: usize,
    ) -> Self {
        Self {
            text_encoder,
            image_encoder,
            text_cache,
            image_cache,
            max_results,
        }
    }

    pub fn text_cache(&self) -> &Arc<FeatureCache> {
        &self.text_cache
    }

    pub fn image_cache(&self) -> &Arc<FeatureCache> {
        &self.image_cache
    }

    /// Rank the catalog against a query and return the top `top_n`
    /// results (bounded by the configured maximum).
    ///
    /// Scoring policy: w = 0 is a pure text pass-through (a supplied
    /// image is ignored), w = 100 the reverse; for 1..=99 the weighted
    /// sum runs literally, so a modality that was not requested or
    /// failed contributes 0 and drags the combined score down.
    pub fn rank(&self, catalog: &CatalogStore, query: &Query, top_n: usize) -> Result<RankResult> {
        // Validation happens before any encoder call.
        if query.weight > 100 {
            return Err(Error::InvalidParameter(format!(
                "blend weight {} outside 0-100",
                query.weight
            )));
        }
        if !query.has_text() && !query.has_image() {
            return Err(Error::InvalidQuery(
                "query must carry text, an image, or both".into(),
            ));
        }

        let places = catalog.list();
        let total_found = places.len();
        if places.is_empty() {
            return Ok(RankResult {
                results: Vec::new(),
                total_found: 0,
            });
        }

        let use_text = query.weight < 100 && query.has_text();
        let use_image = query.weight > 0 && query.has_image();

        let query_text_vec = if use_text {
            self.encode_query_text(query.text.as_deref().unwrap_or_default())
        } else {
            None
        };
        let query_image_vec = if use_image {
            self.encode_query_image(query.image.as_deref().unwrap_or_default())
        } else {
            None
        };

        let w = query.weight as f32 / 100.0;

        let mut scored: Vec<ScoredResult> = places
            .into_iter()
            .map(|place| {
                let (text_similarity, text_vector_missing) =
                    modality_score(&query_text_vec, self.text_cache.get(&place.id));
                let (image_similarity, image_vector_missing) =
                    modality_score(&query_image_vec, self.image_cache.get(&place.id));

                let combined_similarity = match query.weight {
                    0 => text_similarity,
                    100 => image_similarity,
                    _ => (1.0 - w) * text_similarity + w * image_similarity,
                };

                ScoredResult {
                    place,
                    text_similarity,
                    image_similarity,
                    combined_similarity,
                    text_vector_missing,
                    image_vector_missing,
                }
            })
            .collect();

        // Stable sort: equal scores keep catalog insertion order, so
        // identical inputs always produce identical output.
        scored.sort_by(|a, b| {
            b.combined_similarity
                .partial_cmp(&a.combined_similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_n.min(self.max_results));

        debug!(
            "Ranked {} places (weight={}, returned {})",
            total_found,
            query.weight,
            scored.len()
        );

        Ok(RankResult {
            results: scored,
            total_found,
        })
    }

    /// Encode the query text. A failure here degrades to similarity 0
    /// for every place rather than failing the whole ranking.
    fn encode_query_text(&self, text: &str) -> Option<Array1<f32>> {
        match self.text_encoder.encode(text) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Query text encoding failed, text similarities default to 0: {}", e);
                None
            }
        }
    }

    fn encode_query_image(&self, bytes: &[u8]) -> Option<Array1<f32>> {
        match self.image_encoder.encode(bytes) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Query image encoding failed, image similarities default to 0: {}", e);
                None
            }
        }
    }
}

/// Score one modality for one place. Missing cached vectors are flagged
/// and default to 0, never a fault.
fn modality_score(
    query_vec: &Option<Array1<f32>>,
    place_vec: Option<Array1<f32>>,
) -> (f32, bool) {
    match (query_vec, place_vec) {
        (Some(q), Some(v)) => (cosine_similarity(q, &v), false),
        (Some(_), None) => (0.0, true),
        (None, _) => (0.0, false),
    }
}
