//! HTTP route handlers.

pub mod cache;
pub mod images;
pub mod places;
pub mod search;
pub mod stats;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::state::AppState;
use tripscout_core::Error;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(search::routes())
        .merge(places::routes())
        .merge(images::routes())
        .merge(cache::routes())
        .merge(stats::routes())
}

/// Map a domain error to its HTTP status and JSON body. Bad input is the
/// caller's fault; everything else is ours.
pub(crate) fn error_response(err: Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        Error::InvalidQuery(_) | Error::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let (status, _) = error_response(Error::InvalidQuery("empty query".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(Error::InvalidParameter("weight 150".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(Error::NotFound("place 1".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = error_response(Error::Encoding("model died".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.0["error"].as_str().unwrap().contains("model died"));
    }
}
