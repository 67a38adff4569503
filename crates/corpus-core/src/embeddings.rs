//! Text embedding seam
//!
//! The retriever only needs "text in, fixed-size vector out". [`Embedder`] is
//! that contract; [`HashingEmbedder`] is a deterministic implementation that
//! needs no model download, hashing character unigrams and bigrams into a fixed
//! number of buckets. CJK text has no word boundaries, so character n-grams are
//! the natural unit. With the `candle` feature a local sentence-embedding
//! model is used instead when one is configured, see [`load_embedder`].

use std::sync::Arc;
use thiserror::Error;

use crate::config::CorpusConfig;

/// Output size of the all-MiniLM-L6-v2 sentence-embedding model
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbedError {
    #[error("Embedding dimension must be positive")]
    ZeroDimension,

    #[error("Embedding backend failed: {0}")]
    Backend(String),

    #[error("Embedding model unavailable: {0}")]
    Model(String),
}

/// Produces a fixed-dimension vector for a piece of text
///
/// Implementations must be safe to share across worker threads; the model is
/// loaded once at startup and only read afterwards.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    fn dimension(&self) -> usize;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Feature-hashing embedder over character unigrams and bigrams
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbedError> {
        if dimension == 0 {
            return Err(EmbedError::ZeroDimension);
        }
        Ok(Self { dimension })
    }

    fn bucket(&self, feature: &[char]) -> usize {
        let mut hash = FNV_OFFSET;
        for ch in feature {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).as_bytes() {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
            // separator so ("ab") and ("a","b") hash differently
            hash ^= 0xff;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        (hash % self.dimension as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_EMBEDDING_DIM,
        }
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.split_whitespace() {
            let chars: Vec<char> = token.to_lowercase().chars().collect();
            for ch in &chars {
                vector[self.bucket(std::slice::from_ref(ch))] += 1.0;
            }
            for pair in chars.windows(2) {
                vector[self.bucket(pair)] += 1.0;
            }
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// The embedder a corpus configuration asks for
///
/// A configured `model_dir` selects the Candle model when the crate is built
/// with the `candle` feature; otherwise the hashing embedder is used.
pub fn load_embedder(config: &CorpusConfig) -> Result<Arc<dyn Embedder>, EmbedError> {
    if let Some(model_dir) = &config.model_dir {
        #[cfg(feature = "candle")]
        {
            let embedder = crate::bert::BertEmbedder::load(model_dir)?;
            if embedder.dimension() != config.embedding_dim {
                tracing::warn!(
                    "Model {} embeds to {} dimensions, configured {}",
                    model_dir.display(),
                    embedder.dimension(),
                    config.embedding_dim
                );
            }
            return Ok(Arc::new(embedder));
        }
        #[cfg(not(feature = "candle"))]
        tracing::warn!(
            "Ignoring model {}: built without the candle feature, using hashing embedder",
            model_dir.display()
        );
    }

    Ok(Arc::new(HashingEmbedder::new(config.embedding_dim)?))
}

/// Scale to unit length in place; an all-zero vector is left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_embedding_dimension() {
        let embedder = HashingEmbedder::default();
        assert_eq!(embedder.dimension(), DEFAULT_EMBEDDING_DIM);
        assert_eq!(embedder.embed("房屋租赁").unwrap().len(), 384);
    }

    #[test]
    fn test_rejects_zero_dimension() {
        assert_eq!(HashingEmbedder::new(0).unwrap_err(), EmbedError::ZeroDimension);
    }

    #[test]
    fn test_embedding_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64).unwrap();
        let a = embedder.embed("二手房 买卖 合同").unwrap();
        let b = embedder.embed("二手房 买卖 合同").unwrap();
        assert_eq!(a, b);
        assert!((norm(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16).unwrap();
        assert!(embedder.embed("   ").unwrap().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_similar_text_is_closer() {
        let embedder = HashingEmbedder::new(256).unwrap();
        let query = embedder.embed("房屋 租赁").unwrap();
        let lease = embedder.embed("房屋 租赁 合同 押金").unwrap();
        let cargo = embedder.embed("货物 运输 物流").unwrap();
        let dist = |a: &[f32], b: &[f32]| -> f32 {
            a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
        };
        assert!(dist(&query, &lease) < dist(&query, &cargo));
    }

    #[test]
    fn test_load_embedder_defaults_to_hashing() {
        let config = CorpusConfig {
            embedding_dim: 48,
            ..CorpusConfig::default()
        };
        assert_eq!(load_embedder(&config).unwrap().dimension(), 48);

        let zero = CorpusConfig {
            embedding_dim: 0,
            ..config
        };
        assert!(matches!(load_embedder(&zero), Err(EmbedError::ZeroDimension)));
    }

    #[cfg(not(feature = "candle"))]
    #[test]
    fn test_model_dir_ignored_without_candle() {
        let config = CorpusConfig {
            model_dir: Some("/nonexistent/all-MiniLM-L6-v2".into()),
            ..CorpusConfig::default()
        };
        assert_eq!(load_embedder(&config).unwrap().dimension(), DEFAULT_EMBEDDING_DIM);
    }

    #[cfg(feature = "candle")]
    #[test]
    fn test_missing_model_is_an_error() {
        let config = CorpusConfig {
            model_dir: Some("/nonexistent/all-MiniLM-L6-v2".into()),
            ..CorpusConfig::default()
        };
        assert!(matches!(load_embedder(&config), Err(EmbedError::Model(_))));
    }
}
