//! Cache administration routes — batch rebuild and abort.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, warn};

use crate::state::AppState;
use tripscout_cache::{extract_missing, ExtractionReport, Modality};
use tripscout_core::Error;
use tripscout_ingest::embed_place_text;
use tripscout_store::Place;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cache/rebuild", post(rebuild))
        .route("/cache/rebuild", delete(abort_rebuild))
}

#[derive(Debug, Deserialize)]
struct RebuildRequest {
    modality: Modality,
    #[serde(default)]
    force: bool,
}

/// POST /api/cache/rebuild — extract features for every place missing a
/// current-version vector (all places with `force`). Runs on the
/// blocking pool; one failing place never aborts the batch.
async fn rebuild(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RebuildRequest>,
) -> impl IntoResponse {
    state.rebuild_abort.store(false, Ordering::Relaxed);
    info!("Cache rebuild requested: {} (force={})", req.modality, req.force);

    let report = tokio::task::spawn_blocking(move || {
        let report = run_extraction(&state, req.modality, req.force);
        clear_settled_pending_flags(&state);
        report
    })
    .await;

    match report {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "modality": req.modality,
                "updated": report.updated,
                "skipped": report.skipped,
                "failed": report.failed,
            })),
        ),
        Err(e) => {
            warn!("Rebuild task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "rebuild failed" })),
            )
        }
    }
}

/// DELETE /api/cache/rebuild — signal a running rebuild to stop after
/// the items currently in flight.
async fn abort_rebuild(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.rebuild_abort.store(true, Ordering::Relaxed);
    (StatusCode::OK, Json(serde_json::json!({ "aborting": true })))
}

fn run_extraction(state: &AppState, modality: Modality, force: bool) -> ExtractionReport {
    let places = state.catalog.list();
    let workers = state.config.extract_workers;
    let abort = &state.rebuild_abort;

    match modality {
        Modality::Text => extract_missing(
            &state.text_cache,
            &places,
            force,
            workers,
            abort,
            |place| embed_place_text(state.text_encoder.as_ref(), place),
        ),
        Modality::Image => {
            // Only places that actually have a photo take part.
            let with_photos: Vec<Place> =
                places.into_iter().filter(|p| p.photo.is_some()).collect();
            extract_missing(
                &state.image_cache,
                &with_photos,
                force,
                workers,
                abort,
                |place| {
                    let filename = place
                        .photo
                        .as_deref()
                        .ok_or_else(|| Error::Encoding(format!("place {} has no photo", place.id)))?;
                    let path = state.photos.photo_path(filename).ok_or_else(|| {
                        Error::Encoding(format!("photo file {} missing for {}", filename, place.id))
                    })?;
                    let bytes = std::fs::read(path)?;
                    state.image_encoder.encode(&bytes)
                },
            )
        }
    }
}

/// Drop the pending-features flag for places that now have every vector
/// their record calls for.
fn clear_settled_pending_flags(state: &AppState) {
    for place in state.catalog.list() {
        if !place.pending_features {
            continue;
        }
        let text_done = state.text_cache.contains(&place.id);
        let image_done = match &place.photo {
            Some(_) => state.image_cache.contains(&place.id),
            None => true,
        };
        if text_done && image_done {
            if let Err(e) = state.catalog.set_pending_features(&place.id, false) {
                warn!("Could not clear pending flag for {}: {}", place.id, e);
            }
        }
    }
}
