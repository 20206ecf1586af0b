//! Query and result types for ranking.

use serde::Serialize;

use tripscout_store::Place;

/// One ranking request. Transient, scoped to a single search.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub text: Option<String>,
    pub image: Option<Vec<u8>>,
    /// Blend weight: 0 = text only, 100 = image only, 1-99 = weighted
    /// combination. Values above 100 are rejected, never clamped.
    pub weight: u8,
}

impl Query {
    pub fn has_text(&self) -> bool {
        self.text.as_deref().map(|t| !t.trim().is_empty()).unwrap_or(false)
    }

    pub fn has_image(&self) -> bool {
        self.image.as_deref().map(|b| !b.is_empty()).unwrap_or(false)
    }
}

/// One ranked place with its diagnostic scores.
///
/// `combined_similarity` is the ranking key; the per-modality scores and
/// missing-vector flags are diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredResult {
    #[serde(flatten)]
    pub place: Place,
    pub text_similarity: f32,
    pub image_similarity: f32,
    pub combined_similarity: f32,
    /// True when the query asked for this modality but the place had no
    /// cached vector (similarity defaulted to 0).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub text_vector_missing: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub image_vector_missing: bool,
}

/// Result of one ranking call.
#[derive(Debug, Clone, Serialize)]
pub struct RankResult {
    pub results: Vec<ScoredResult>,
    /// Places considered, i.e. the catalog size — not the truncated count.
    pub total_found: usize,
}
