//! Corpus Core - Retrieval and ranking over per-type contract template corpora
//!
//! This crate provides:
//! - Exact L2 vector index with binary persistence
//! - Template category maps
//! - Contract-type detection, vector retrieval and category reranking
//! - Score adjustment and confidence tiers
//! - Embedding seam with a deterministic hashing embedder, and a local
//!   Candle BERT embedder behind the `candle` feature
//! - Corpus catalog loading and index building
//! - Configuration management

#[cfg(feature = "candle")]
pub mod bert;
pub mod catalog;
pub mod category;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod search;
pub mod text;

// Re-export commonly used types
pub use catalog::{build_corpus, CatalogError, ContractCorpus, CorpusCatalog};
pub use category::{CategoryMap, TemplateRecord};
pub use config::CorpusConfig;
#[cfg(feature = "candle")]
pub use bert::BertEmbedder;
pub use embeddings::{load_embedder, EmbedError, Embedder, HashingEmbedder};
pub use index::{EmbeddingIndex, IndexError, Neighbor};
pub use search::{
    ConfidenceTier, ContractTypeExtractor, Query, RankedResult, RerankMode, RetrievalError,
    Retriever, ScoreAdjuster, SearchCandidate,
};
pub use text::{clean_text, clean_text_for_legal};
