//! TripScout Infer — encoder adapters and the query-embedding cache.
//!
//! The `TextEncoder` and `ImageEncoder` traits wrap pretrained embedding
//! models as pure input → vector functions. With the `onnx` feature and
//! model files present, ONNX Runtime backends are used; otherwise the
//! noop encoders report themselves unavailable and every encode fails
//! with a typed encoding error.

pub mod encoder;
pub mod onnx_image;
pub mod onnx_text;
pub mod query_cache;
pub mod tokens;

pub use encoder::{ImageEncoder, NoopImageEncoder, NoopTextEncoder, TextEncoder};
pub use query_cache::QueryCache;

#[cfg(feature = "onnx")]
pub use onnx_image::OnnxImageEncoder;
#[cfg(feature = "onnx")]
pub use onnx_text::OnnxTextEncoder;

use std::path::Path;
use std::sync::Arc;

/// Create the best available text encoder for the given model directory.
///
/// Tries ONNX first (feature enabled and `text/model.onnx` present),
/// falls back to the noop encoder.
pub fn create_text_encoder(model_dir: &Path, dim: usize) -> Arc<dyn TextEncoder> {
    #[cfg(feature = "onnx")]
    {
        match OnnxTextEncoder::load(&model_dir.join("text")) {
            Ok(encoder) => {
                tracing::info!("Using ONNX text encoder (dim={})", encoder.dimension());
                return Arc::new(encoder);
            }
            Err(e) => {
                tracing::warn!("ONNX text encoder unavailable: {}", e);
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    let _ = model_dir;

    Arc::new(NoopTextEncoder::new(dim))
}

/// Create the best available image encoder for the given model directory.
pub fn create_image_encoder(model_dir: &Path, dim: usize) -> Arc<dyn ImageEncoder> {
    #[cfg(feature = "onnx")]
    {
        match OnnxImageEncoder::load(&model_dir.join("image")) {
            Ok(encoder) => {
                tracing::info!("Using ONNX image encoder (dim={})", encoder.dimension());
                return Arc::new(encoder);
            }
            Err(e) => {
                tracing::warn!("ONNX image encoder unavailable: {}", e);
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    let _ = model_dir;

    Arc::new(NoopImageEncoder::new(dim))
}
