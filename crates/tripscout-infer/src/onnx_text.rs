//! ONNX text encoder — BERT-class sentence embeddings.
//!
//! Loads an ONNX model plus a HuggingFace tokenizer and produces
//! 768-dimensional float32 vectors. Query text goes through the
//! content-word filter first, and repeated queries are served from the
//! LRU cache. Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;
    use std::sync::Arc;

    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::info;

    use crate::encoder::TextEncoder;
    use crate::query_cache::QueryCache;
    use crate::tokens::filter_query;
    use tripscout_core::{Error, Result};

    /// Maximum sequence length for the model.
    const MAX_SEQ_LEN: usize = 512;

    /// Default embedding dimension (BERT-base).
    const DEFAULT_DIM: usize = 768;

    /// ONNX text embedding engine.
    pub struct OnnxTextEncoder {
        session: Arc<Mutex<Session>>,
        tokenizer: Tokenizer,
        cache: QueryCache,
        dimension: usize,
        version: String,
    }

    impl OnnxTextEncoder {
        /// Load an ONNX model and tokenizer from the given directory.
        ///
        /// Expects:
        /// - `model_dir/model.onnx` — the ONNX model file
        /// - `model_dir/tokenizer.json` — the HuggingFace tokenizer
        /// - `model_dir/VERSION` — optional model identifier (defaults to
        ///   `bert-base-768`); recorded next to every cached vector
        pub fn load(model_dir: &Path) -> std::result::Result<Self, String> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(format!("Model not found: {}", model_path.display()));
            }
            if !tokenizer_path.exists() {
                return Err(format!("Tokenizer not found: {}", tokenizer_path.display()));
            }

            // With load-dynamic, ORT_DYLIB_PATH must point to libonnxruntime.so
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| format!("Failed to create session builder: {}", e))?
                .with_intra_threads(2)
                .map_err(|e| format!("Failed to set threads: {}", e))?
                .commit_from_file(&model_path)
                .map_err(|e| format!("Failed to load ONNX model: {}", e))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| format!("Failed to load tokenizer: {}", e))?;

            let version = std::fs::read_to_string(model_dir.join("VERSION"))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "bert-base-768".to_string());

            info!(
                "ONNX text encoder loaded: dim={}, version={}, model={}",
                DEFAULT_DIM,
                version,
                model_path.display()
            );

            Ok(Self {
                session: Arc::new(Mutex::new(session)),
                tokenizer,
                cache: QueryCache::default_cache(),
                dimension: DEFAULT_DIM,
                version,
            })
        }

        fn infer(&self, text: &str) -> Result<Array1<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| Error::Encoding(format!("tokenization failed: {}", e)))?;

            let input_ids = encoding.get_ids();
            let attention_mask = encoding.get_attention_mask();

            let seq_len = input_ids.len().min(MAX_SEQ_LEN);
            let input_ids = &input_ids[..seq_len];
            let attention_mask = &attention_mask[..seq_len];

            let ids_data: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
            let mask_data: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();
            let type_ids_data: Vec<i64> = vec![0i64; seq_len];

            let ids_tensor = Tensor::from_array(([1usize, seq_len], ids_data))
                .map_err(|e| Error::Encoding(format!("ids tensor: {}", e)))?;
            let mask_tensor = Tensor::from_array(([1usize, seq_len], mask_data))
                .map_err(|e| Error::Encoding(format!("mask tensor: {}", e)))?;
            let type_ids_tensor = Tensor::from_array(([1usize, seq_len], type_ids_data))
                .map_err(|e| Error::Encoding(format!("type_ids tensor: {}", e)))?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_ids_tensor])
                .map_err(|e| Error::Encoding(format!("inference failed: {}", e)))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Encoding(format!("output tensor: {}", e)))?;

            let shape_dims: Vec<i64> = shape.iter().copied().collect();

            // Either [1, seq_len, dim] token embeddings (mean-pooled with
            // the attention mask) or an already pooled [1, dim].
            let embedding = if shape_dims.len() == 3 {
                let dim = shape_dims[2] as usize;
                let mask_f32: Vec<f32> = attention_mask.iter().map(|&m| m as f32).collect();
                let mask_sum: f32 = mask_f32.iter().sum();
                if mask_sum < 1e-9 {
                    return Err(Error::Encoding("empty attention mask".into()));
                }

                let mut pooled = Array1::zeros(dim);
                for (i, &m) in mask_f32.iter().enumerate() {
                    if m > 0.0 {
                        let offset = i * dim;
                        for d in 0..dim {
                            pooled[d] += data[offset + d] * m;
                        }
                    }
                }
                pooled / mask_sum
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
    }

    impl TextEncoder for OnnxTextEncoder {
        fn encode(&self, text: &str) -> Result<Array1<f32>> {
            let filtered = filter_query(text);
            if filtered.is_empty() {
                return Err(Error::Encoding("empty query text".into()));
            }

            if let Some(cached) = self.cache.get(&filtered) {
                return Ok(cached);
            }

            let embedding = self.infer(&filtered)?;
            self.cache.put(filtered, embedding.clone());
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
pub use inner::OnnxTextEncoder;
