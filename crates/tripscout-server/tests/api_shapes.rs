//! API shape tests — validates that response bodies carry the field
//! names and types the frontend consumes.

/// Search response: { weight, results, total_found } with per-result
/// similarity diagnostics and a photo URL when the place has a photo.
#[test]
fn test_search_response_shape() {
    let response = serde_json::json!({
        "weight": 40,
        "results": [
            {
                "id": "100001",
                "name": "Fort Lookout",
                "location": "Harbor district",
                "description": "Star-shaped fortress with a view",
                "tags": ["history", "view"],
                "photo": "100001.jpg",
                "photo_url": "/api/photos/100001.jpg",
                "text_similarity": 0.83,
                "image_similarity": 0.41,
                "combined_similarity": 0.662,
            },
        ],
        "total_found": 12,
    });

    assert!(response["weight"].is_number());
    assert!(response["total_found"].is_number());
    assert!(response["results"].is_array());

    let result = &response["results"][0];
    assert!(result["id"].is_string());
    assert!(result["name"].is_string());
    assert!(result["combined_similarity"].is_number());
    assert!(result["text_similarity"].is_number());
    assert!(result["image_similarity"].is_number());
    assert!(result["photo_url"].as_str().unwrap().starts_with("/api/photos/"));
}

/// Add-place response: { id, features_pending }.
#[test]
fn test_add_place_response_shape() {
    let response = serde_json::json!({
        "id": "100013",
        "features_pending": false,
    });

    assert!(response["id"].is_string());
    assert!(response["features_pending"].is_boolean());
}

/// Stats response: totals plus per-modality coverage and encoder info.
#[test]
fn test_stats_response_shape() {
    let response = serde_json::json!({
        "total_places": 12,
        "cache_coverage": { "text": 12, "image": 9 },
        "pending_extractions": 0,
        "failed_extractions": { "text": [], "image": ["100007"] },
        "encoders": {
            "text": { "version": "bert-base-768", "available": true },
            "image": { "version": "vit-base-768", "available": true },
        },
    });

    assert!(response["total_places"].is_number());
    assert!(response["cache_coverage"]["text"].is_number());
    assert!(response["cache_coverage"]["image"].is_number());
    assert!(response["pending_extractions"].is_number());
    assert!(response["failed_extractions"]["image"].is_array());
    assert!(response["encoders"]["text"]["available"].is_boolean());
}

/// Rebuild response: { modality, updated, skipped, failed }.
#[test]
fn test_rebuild_response_shape() {
    let response = serde_json::json!({
        "modality": "text",
        "updated": 3,
        "skipped": 9,
        "failed": ["100007"],
    });

    assert!(response["modality"].is_string());
    assert!(response["updated"].is_number());
    assert!(response["skipped"].is_number());
    assert!(response["failed"].is_array());
}

/// Sample image listing: { images } of filename strings.
#[test]
fn test_sample_images_response_shape() {
    let response = serde_json::json!({
        "images": ["harbor.jpg", "ropeway.jpg"],
    });

    assert!(response["images"].is_array());
    assert!(response["images"][0].is_string());
}

/// Error responses always carry { error }.
#[test]
fn test_error_response_shape() {
    let response = serde_json::json!({
        "error": "invalid parameter: blend weight 150 outside 0-100",
    });

    assert!(response["error"].is_string());
}
