//! Sentence embeddings from a local BERT-family model using Hugging Face Candle
//!
//! Loads a MiniLM or BGE style checkpoint from a directory holding
//! `config.json`, `tokenizer.json` and `model.safetensors`, runs it on the
//! best available device and mean-pools the last hidden state.

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use serde::Deserialize;
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};

use crate::embeddings::{l2_normalize, EmbedError, Embedder};

/// Longest token sequence fed to the model
pub const MAX_SEQ_LEN: usize = 512;

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

impl From<candle_core::Error> for EmbedError {
    fn from(e: candle_core::Error) -> Self {
        EmbedError::Backend(e.to_string())
    }
}

#[derive(Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

/// Mean-pooled, unit-length BERT sentence embeddings
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl BertEmbedder {
    /// Load the model files from `model_dir`
    pub fn load(model_dir: &Path) -> Result<Self, EmbedError> {
        let device = if candle_core::utils::cuda_is_available() {
            Device::new_cuda(0)?
        } else if candle_core::utils::metal_is_available() {
            Device::new_metal(0)?
        } else {
            Device::Cpu
        };
        tracing::info!("Loading embedding model on device: {:?}", device);

        let config_path = required_file(model_dir, CONFIG_FILE)?;
        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| EmbedError::Model(format!("{}: {}", config_path.display(), e)))?;
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| EmbedError::Model(format!("Failed to parse config.json: {}", e)))?;
        let HiddenSize { hidden_size } = serde_json::from_str(&config_str)
            .map_err(|e| EmbedError::Model(format!("Failed to parse config.json: {}", e)))?;

        let tokenizer_path = required_file(model_dir, TOKENIZER_FILE)?;
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedError::Model(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| EmbedError::Model(format!("Failed to configure tokenizer: {}", e)))?;

        let weights_path = required_file(model_dir, WEIGHTS_FILE)?;
        tracing::info!("Loading model weights from {}", weights_path.display());
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        tracing::info!("Embedding model loaded, {} dimensions", hidden_size);
        Ok(Self {
            model,
            tokenizer,
            device,
            dimension: hidden_size,
        })
    }
}

fn required_file(dir: &Path, name: &str) -> Result<std::path::PathBuf, EmbedError> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(EmbedError::Model(format!("{} not found", path.display())))
    }
}

impl Embedder for BertEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbedError::Backend(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        // (1, seq, hidden)
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // mean over unmasked tokens
        let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?.squeeze(0)?;

        let mut vector: Vec<f32> = pooled.to_vec1()?;
        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
