//! Local embedding backend: in-process sentence-transformer inference.
//!
//! Loads an ONNX export plus its HuggingFace fast-tokenizer file from the
//! configured model directory. The model must accept `input_ids`,
//! `attention_mask`, and `token_type_ids` as i64 tensors and emit
//! token-level embeddings `[batch, seq_len, hidden_dim]`; masked mean
//! pooling and L2 normalization produce the final vector.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ort::session::Session;
use ort::value::TensorRef;
use tokenizers::Tokenizer;

use recall_core::error::{RecallError, Result};
use recall_core::traits::Embedder;

use crate::EMBED_TASK_PREFIX;

pub struct OnnxEmbedder {
    encoder: Option<OnnxEncoder>,
    model: String,
}

struct OnnxEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
}

// ort::Session is internally reference-counted; the Mutex serializes runs.
unsafe impl Send for OnnxEncoder {}
unsafe impl Sync for OnnxEncoder {}

impl OnnxEmbedder {
    /// Load `model.onnx` + `tokenizer.json` from `model_dir`. A missing or
    /// broken model logs a warning and leaves the backend unavailable.
    pub fn new(model_dir: &str, model: &str) -> Self {
        let encoder = match OnnxEncoder::load(Path::new(model_dir)) {
            Ok(enc) => {
                tracing::info!(
                    "Embedding model loaded from {} ({} dims)",
                    model_dir,
                    enc.dimension
                );
                Some(enc)
            }
            Err(e) => {
                tracing::warn!("Embedding model not loaded: {e}");
                None
            }
        };
        Self {
            encoder,
            model: model.to_string(),
        }
    }
}

impl OnnxEncoder {
    fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        if !model_path.exists() {
            return Err(RecallError::ProviderUnavailable(format!(
                "ONNX model not found at {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(RecallError::ProviderUnavailable(format!(
                "tokenizer not found at {}",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| RecallError::Provider(format!("ONNX session builder: {e}")))?
            .with_intra_threads(1)
            .map_err(|e| RecallError::Provider(format!("ONNX set threads: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| RecallError::Provider(format!("ONNX load model: {e}")))?;

        // Sentence-transformer output is [batch, seq_len, hidden_dim].
        let dimension = session
            .outputs()
            .first()
            .and_then(|out| out.dtype().tensor_shape())
            .and_then(|shape| shape.last().copied())
            .map(|d| if d > 0 { d as usize } else { 768 })
            .unwrap_or(768);

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| RecallError::Provider(format!("Failed to load tokenizer: {e}")))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimension,
        })
    }

    /// Tokenize, run inference, mean-pool, normalize.
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| RecallError::Provider(format!("tokenization failed: {e}")))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding
            .get_type_ids()
            .iter()
            .map(|&t| t as i64)
            .collect();

        let seq_len = input_ids.len();
        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(|e| RecallError::Provider(format!("input_ids array: {e}")))?;
        let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .map_err(|e| RecallError::Provider(format!("attention_mask array: {e}")))?;
        let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(|e| RecallError::Provider(format!("token_type_ids array: {e}")))?;

        let ids_ref = TensorRef::from_array_view(&ids_array)
            .map_err(|e| RecallError::Provider(format!("TensorRef input_ids: {e}")))?;
        let mask_ref = TensorRef::from_array_view(&mask_array)
            .map_err(|e| RecallError::Provider(format!("TensorRef attention_mask: {e}")))?;
        let type_ref = TensorRef::from_array_view(&type_array)
            .map_err(|e| RecallError::Provider(format!("TensorRef token_type_ids: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| RecallError::Provider(format!("session lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![ids_ref, mask_ref, type_ref])
            .map_err(|e| RecallError::Provider(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecallError::Provider(format!("extract embeddings: {e}")))?;

        let shape_dims: Vec<i64> = shape.iter().copied().collect();
        if shape_dims.len() < 2 {
            return Err(RecallError::Provider(format!(
                "unexpected output shape: {shape_dims:?}"
            )));
        }
        let hidden_dim = *shape_dims.last().unwrap() as usize;

        // Masked mean pooling over the sequence dimension.
        let mut pooled = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;
        for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
            if mask_val > 0 {
                let offset = tok_idx * hidden_dim;
                for dim in 0..hidden_dim {
                    pooled[dim] += data[offset + dim];
                }
                count += 1.0;
            }
        }
        if count > 0.0 {
            for val in &mut pooled {
                *val /= count;
            }
        }

        let norm: f32 = pooled.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut pooled {
                *val /= norm;
            }
        }

        Ok(pooled)
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoder = self.encoder.as_ref().ok_or_else(|| {
            RecallError::ProviderUnavailable(
                "no local embedding model loaded; set embed.model_dir or EMBED_MODE=remote".into(),
            )
        })?;
        encoder.encode(&format!("{EMBED_TASK_PREFIX}{text}"))
    }

    fn is_available(&self) -> bool {
        self.encoder.is_some()
    }

    fn model_identity(&self) -> String {
        if self.encoder.is_some() {
            format!("{}-local", self.model)
        } else {
            "none".into()
        }
    }

    fn dimension(&self) -> usize {
        self.encoder.as_ref().map(|e| e.dimension).unwrap_or(0)
    }
}
