//! TripScout Rank — the multi-modal similarity engine.
//!
//! Turns a text and/or image query plus the cached catalog vectors into
//! an ordered, score-annotated result list. The blend weight w ∈ [0,100]
//! selects text-only (0), image-only (100), or a literal weighted sum.

pub mod engine;
pub mod similarity;
pub mod types;

pub use engine::SimilarityEngine;
pub use similarity::cosine_similarity;
pub use types::{Query, RankResult, ScoredResult};
