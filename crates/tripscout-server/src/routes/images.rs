//! Image serving routes — sample query images and catalog photos.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sample-images", get(list_sample_images))
        .route("/sample-images/{name}", get(get_sample_image))
        .route("/photos/{filename}", get(get_photo))
}

/// GET /api/sample-images — a random handful of sample query images.
async fn list_sample_images(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let images = state.photos.sample(state.config.sample_image_count);
    Json(serde_json::json!({ "images": images }))
}

/// GET /api/sample-images/:name — one sample image's bytes.
async fn get_sample_image(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.photos.sample_path(&name) {
        Some(path) => serve_image(&path),
        None => not_found("sample image"),
    }
}

/// GET /api/photos/:filename — one catalog photo's bytes.
async fn get_photo(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> impl IntoResponse {
    match state.photos.photo_path(&filename) {
        Some(path) => serve_image(&path),
        None => not_found("photo"),
    }
}

fn serve_image(path: &std::path::Path) -> axum::response::Response {
    match std::fs::read(path) {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

fn not_found(what: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("{} not found", what) })),
    )
        .into_response()
}
