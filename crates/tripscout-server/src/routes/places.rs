//! Place ingestion route.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tracing::warn;

use crate::routes::error_response;
use crate::state::AppState;
use tripscout_core::{Error, Result};
use tripscout_ingest::{Ingester, NewPlaceFields};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/places", post(add_place))
}

/// POST /api/places — add one place to the catalog.
///
/// Multipart fields: `name`, `location`, `description` (required),
/// `tags` (comma-separated, optional), `image` (optional file). The
/// record is durable even when feature extraction fails; the response
/// says whether extraction is still pending.
async fn add_place(State(state): State<Arc<AppState>>, multipart: Multipart) -> impl IntoResponse {
    let (fields, image) = match parse_place_form(multipart).await {
        Ok(parsed) => parsed,
        Err(e) => return error_response(e),
    };

    let outcome = tokio::task::spawn_blocking(move || {
        let ingester = Ingester::new(
            &state.catalog,
            &state.photos,
            &state.text_encoder,
            &state.image_encoder,
            &state.text_cache,
            &state.image_cache,
            &state.next_place_id,
        );
        ingester.add_place(fields, image.as_deref())
    })
    .await;

    match outcome {
        Ok(Ok(outcome)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": outcome.id,
                "features_pending": outcome.features_pending,
            })),
        ),
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            warn!("Ingestion task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "ingestion failed" })),
            )
        }
    }
}

async fn parse_place_form(mut multipart: Multipart) -> Result<(NewPlaceFields, Option<Vec<u8>>)> {
    let mut name = String::new();
    let mut location = String::new();
    let mut description = String::new();
    let mut tags: Vec<String> = Vec::new();
    let mut image: Option<Vec<u8>> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = read_text(field, "name").await?,
            "location" => location = read_text(field, "location").await?,
            "description" => description = read_text(field, "description").await?,
            "tags" => {
                let raw = read_text(field, "tags").await?;
                tags = raw
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            "image" => {
                image = field.bytes().await.ok().map(|b| b.to_vec());
            }
            _ => {}
        }
    }

    Ok((
        NewPlaceFields {
            name,
            location,
            description,
            tags,
        },
        image,
    ))
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| Error::InvalidQuery(format!("unreadable {} field: {}", name, e)))
}
