//! Stats and health routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/health", get(health))
}

/// GET /api/stats — catalog size, cache coverage, pending extractions.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "total_places": state.catalog.len(),
        "cache_coverage": {
            "text": state.text_cache.coverage(),
            "image": state.image_cache.coverage(),
        },
        "pending_extractions": state.catalog.pending_count(),
        "failed_extractions": {
            "text": state.text_cache.failed_ids(),
            "image": state.image_cache.failed_ids(),
        },
        "encoders": {
            "text": {
                "version": state.text_encoder.version(),
                "available": state.text_encoder.is_available(),
            },
            "image": {
                "version": state.image_encoder.version(),
                "available": state.image_encoder.is_available(),
            },
        },
    }))
}

/// GET /api/health — liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
