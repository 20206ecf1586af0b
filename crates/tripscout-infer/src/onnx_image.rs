//! ONNX image encoder — ViT-class image embeddings.
//!
//! Decodes JPEG/PNG bytes, resizes to the model's input resolution,
//! normalizes, and runs the vision model. The pooled (or CLS-token)
//! output becomes the place/query image vector. Requires the `onnx`
//! feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;
    use std::sync::Arc;

    use image::imageops::FilterType;
    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tracing::info;

    use crate::encoder::ImageEncoder;
    use tripscout_core::{Error, Result};

    /// Model input resolution (ViT-base patch16).
    const INPUT_SIZE: u32 = 224;

    /// Default embedding dimension (ViT-base).
    const DEFAULT_DIM: usize = 768;

    /// Channel normalization: (pixel/255 - mean) / std, mean = std = 0.5.
    const NORM_MEAN: f32 = 0.5;
    const NORM_STD: f32 = 0.5;

    /// ONNX vision embedding engine.
    pub struct OnnxImageEncoder {
        session: Arc<Mutex<Session>>,
        dimension: usize,
        version: String,
    }

    impl OnnxImageEncoder {
        /// Load an ONNX vision model from the given directory.
        ///
        /// Expects `model_dir/model.onnx` and an optional
        /// `model_dir/VERSION` identifier (defaults to `vit-base-768`).
        pub fn load(model_dir: &Path) -> std::result::Result<Self, String> {
            let model_path = model_dir.join("model.onnx");
            if !model_path.exists() {
                return Err(format!("Model not found: {}", model_path.display()));
            }

            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| format!("Failed to create session builder: {}", e))?
                .with_intra_threads(2)
                .map_err(|e| format!("Failed to set threads: {}", e))?
                .commit_from_file(&model_path)
                .map_err(|e| format!("Failed to load ONNX model: {}", e))?;

            let version = std::fs::read_to_string(model_dir.join("VERSION"))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "vit-base-768".to_string());

            info!(
                "ONNX image encoder loaded: dim={}, version={}, model={}",
                DEFAULT_DIM,
                version,
                model_path.display()
            );

            Ok(Self {
                session: Arc::new(Mutex::new(session)),
                dimension: DEFAULT_DIM,
                version,
            })
        }

        /// Decode, resize, and normalize into an NCHW float tensor.
        fn preprocess(bytes: &[u8]) -> Result<Vec<f32>> {
            let img = image::load_from_memory(bytes)
                .map_err(|e| Error::Encoding(format!("image decode failed: {}", e)))?;

            let resized = img
                .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
                .to_rgb8();

            let side = INPUT_SIZE as usize;
            let mut data = vec![0f32; 3 * side * side];
            for (x, y, pixel) in resized.enumerate_pixels() {
                let (x, y) = (x as usize, y as usize);
                for c in 0..3 {
                    let value = pixel.0[c] as f32 / 255.0;
                    data[c * side * side + y * side + x] = (value - NORM_MEAN) / NORM_STD;
                }
            }
            Ok(data)
        }
    }

    impl ImageEncoder for OnnxImageEncoder {
        fn encode(&self, bytes: &[u8]) -> Result<Array1<f32>> {
            if bytes.is_empty() {
                return Err(Error::Encoding("empty image".into()));
            }

            let pixels = Self::preprocess(bytes)?;
            let side = INPUT_SIZE as usize;

            let pixel_tensor = Tensor::from_array(([1usize, 3, side, side], pixels))
                .map_err(|e| Error::Encoding(format!("pixel tensor: {}", e)))?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![pixel_tensor])
                .map_err(|e| Error::Encoding(format!("inference failed: {}", e)))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Encoding(format!("output tensor: {}", e)))?;

            let shape_dims: Vec<i64> = shape.iter().copied().collect();

            // [1, tokens, dim] → CLS token (first row); [1, dim] → pooled.
            let embedding = if shape_dims.len() == 3 {
                let dim = shape_dims[2] as usize;
                Array1::from_vec(data[..dim].to_vec())
            } else if shape_dims.len() == 2 {
                let dim = shape_dims[1] as usize;
                Array1::from_vec(data[..dim].to_vec())
            } else {
                return Err(Error::Encoding(format!(
                    "unexpected output shape: {:?}",
                    shape_dims
                )));
            };

            Ok(embedding)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn version(&self) -> &str {
            &self.version
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxImageEncoder;
