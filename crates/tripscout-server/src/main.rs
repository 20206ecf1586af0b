//! TripScout — multimodal tourist destination recommendation server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("TRIPSCOUT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = tripscout_core::TripScoutConfig::from_env(&data_dir)?;
    let port = config.port;

    let catalog = tripscout_store::CatalogStore::open(&config.data_paths.catalog_file)
        .map_err(|e| anyhow::anyhow!("Failed to open catalog: {}", e))?;
    let photos = tripscout_store::PhotoStore::new(
        &config.data_paths.photos,
        &config.data_paths.sample_images,
    );

    // ONNX encoders if models are present, noop fallbacks otherwise
    let text_encoder =
        tripscout_infer::create_text_encoder(&config.data_paths.models, config.text_dim);
    let image_encoder =
        tripscout_infer::create_image_encoder(&config.data_paths.models, config.image_dim);

    let state = Arc::new(AppState::new(
        config,
        catalog,
        photos,
        text_encoder,
        image_encoder,
    ));

    let pending = state.catalog.pending_count();
    if pending > 0 {
        info!(
            "{} places are awaiting feature extraction; POST /api/cache/rebuild to extract",
            pending
        );
    }

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("TripScout server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
