//! Encoder adapter traits and noop fallbacks.
//!
//! Each modality gets its own trait so query text and image bytes cannot
//! be fed to the wrong model. Implementations are pure input → vector
//! functions; failures surface as `Error::Encoding` per input, never as
//! panics. Timeouts on model calls are the adapter's responsibility.

use ndarray::Array1;

use tripscout_core::{Error, Result};

/// Trait for text embedding backends.
pub trait TextEncoder: Send + Sync {
    /// Embed a text string. The adapter applies its own tokenizer
    /// preprocessing before inference.
    fn encode(&self, text: &str) -> Result<Array1<f32>>;

    /// Output dimension, constant for the lifetime of the encoder.
    fn dimension(&self) -> usize;

    /// Model identifier recorded next to each cached vector. A cache
    /// entry tagged with a different version is treated as stale.
    fn version(&self) -> &str;

    /// Whether a model is actually loaded.
    fn is_available(&self) -> bool {
        true
    }
}

/// Trait for image embedding backends.
pub trait ImageEncoder: Send + Sync {
    /// Embed raw image bytes (JPEG/PNG).
    fn encode(&self, bytes: &[u8]) -> Result<Array1<f32>>;

    fn dimension(&self) -> usize;

    fn version(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }
}

/// Placeholder text encoder used when no model is loaded.
pub struct NoopTextEncoder {
    dim: usize,
}

impl NoopTextEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl TextEncoder for NoopTextEncoder {
    fn encode(&self, _text: &str) -> Result<Array1<f32>> {
        Err(Error::Encoding("no text model loaded".into()))
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn version(&self) -> &str {
        "text-unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Placeholder image encoder used when no model is loaded.
pub struct NoopImageEncoder {
    dim: usize,
}

impl NoopImageEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl ImageEncoder for NoopImageEncoder {
    fn encode(&self, _bytes: &[u8]) -> Result<Array1<f32>> {
        Err(Error::Encoding("no image model loaded".into()))
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn version(&self) -> &str {
        "image-unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_encoders_fail_typed() {
        let text = NoopTextEncoder::new(768);
        assert!(!text.is_available());
        match text.encode("anything") {
            Err(Error::Encoding(_)) => {}
            other => panic!("expected encoding error, got {:?}", other.map(|_| ())),
        }

        let image = NoopImageEncoder::new(768);
        assert!(!image.is_available());
        assert!(image.encode(b"bytes").is_err());
    }
}
