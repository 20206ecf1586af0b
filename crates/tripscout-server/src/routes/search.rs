//! Search route — multimodal similarity ranking over the catalog.

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
use tripscout_rank::Query;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/search", post(search))
}

/// POST /api/search — rank the catalog against a text and/or image query.
///
/// Multipart fields: `text` (optional), `image` (optional file), `weight`
/// (required, 0-100), `top_n` (optional). At least one of text/image must
/// be present.
async fn search(State(state): State<Arc<AppState>>, multipart: Multipart) -> impl IntoResponse {
    let (query, top_n) = match parse_search_form(multipart).await {
        Ok(parsed) => parsed,
        Err(e) => return error_response(e),
    };

    let weight = query.weight;
    let engine_state = state.clone();
    let ranked = tokio::task::spawn_blocking(move || {
        engine_state
            .engine
            .rank(&engine_state.catalog, &query, top_n)
    })
    .await;

    let ranked = match ranked {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => return error_response(e),
        Err(e) => {
            warn!("Ranking task panicked: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "ranking failed" })),
            );
        }
    };

    // Annotate each result with the URL its photo is served from.
    let results: Vec<serde_json::Value> = ranked
        .results
        .iter()
        .map(|r| {
            let mut value = serde_json::to_value(r).unwrap_or_default();
            if let Some(photo) = value.get("photo").and_then(|p| p.as_str()) {
                let url = format!("/api/photos/{}", photo);
                value["photo_url"] = serde_json::Value::String(url);
            }
            value
        })
        .collect();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "weight": weight,
            "results": results,
            "total_found": ranked.total_found,
        })),
    )
}

async fn parse_search_form(mut multipart: Multipart) -> Result<(Query, usize)> {
    let mut text: Option<String> = None;
    let mut image: Option<Vec<u8>> = None;
    let mut weight: Option<u8> = None;
    let mut top_n: Option<usize> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => {
                text = field.text().await.ok();
            }
            "image" => {
                image = field.bytes().await.ok().map(|b| b.to_vec());
            }
            "weight" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| Error::InvalidQuery(format!("unreadable weight field: {}", e)))?;
                weight = Some(parse_weight(&raw)?);
            }
            "top_n" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| Error::InvalidQuery(format!("unreadable top_n field: {}", e)))?;
                top_n = Some(raw.trim().parse().map_err(|_| {
                    Error::InvalidParameter(format!("top_n must be a positive integer, got {:?}", raw))
                })?);
            }
            _ => {}
        }
    }

    let weight = weight.ok_or_else(|| Error::InvalidQuery("missing weight field".into()))?;

    Ok((
        Query {
            text,
            image,
            weight,
        },
        top_n.unwrap_or(usize::MAX),
    ))
}

/// Parse the blend weight. Out-of-range values are rejected here so the
/// caller gets a 400 before any encoder runs.
fn parse_weight(raw: &str) -> Result<u8> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::InvalidParameter(format!("weight must be an integer, got {:?}", raw)))?;
    if !(0..=100).contains(&value) {
        return Err(Error::InvalidParameter(format!(
            "blend weight {} outside 0-100",
            value
        )));
    }
    Ok(value as u8)
}
