//! Configuration management for the template corpus
//!
//! Resolves where per-type indices, filename sidecars and keyword files live.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::embeddings::DEFAULT_EMBEDDING_DIM;

/// File name of the per-type vector index inside `rag_dir/{type}`
pub const INDEX_FILE_NAME: &str = "knowledge_base.index";

/// File name of the identifier sidecar inside `rag_dir/{type}`
pub const FILENAMES_FILE_NAME: &str = "filenames.txt";

/// Directory holding per-template keyword files inside `template_dir/{type}`
pub const KEYWORDS_DIR_NAME: &str = "关键词";

/// Precomputed identifier -> category file inside the keywords directory
pub const CATEGORY_FILE_NAME: &str = "_contract_categories.json";

/// Corpus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Root holding one subdirectory per contract type with index + sidecar
    pub rag_dir: PathBuf,
    /// Root holding one subdirectory per contract type with keyword files
    pub template_dir: PathBuf,
    /// Output size of the embedding model
    pub embedding_dim: usize,
    /// Local sentence-embedding model directory, used with the `candle` feature
    pub model_dir: Option<PathBuf>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self::under(Path::new("contracts"))
    }
}

impl CorpusConfig {
    /// Standard layout below a contracts root directory
    pub fn under(root: &Path) -> Self {
        Self {
            rag_dir: root.join("RAG"),
            template_dir: root.join("template"),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            model_dir: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - CONTRACTS_DIR: contracts root (default: "contracts")
    /// - CONTRACT_RAG_DIR: override for the index root
    /// - CONTRACT_TEMPLATE_DIR: override for the keyword root
    /// - EMBEDDING_DIM: embedding dimension (default: 384)
    /// - EMBEDDING_MODEL_PATH: local embedding model directory (optional)
    pub fn from_env() -> Result<Self> {
        let root = std::env::var("CONTRACTS_DIR").unwrap_or_else(|_| "contracts".to_string());
        let mut config = Self::under(Path::new(&root));

        if let Ok(dir) = std::env::var("CONTRACT_RAG_DIR") {
            config.rag_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("CONTRACT_TEMPLATE_DIR") {
            config.template_dir = PathBuf::from(dir);
        }
        if let Ok(dim) = std::env::var("EMBEDDING_DIM") {
            config.embedding_dim = dim
                .parse()
                .with_context(|| format!("Invalid EMBEDDING_DIM: {}", dim))?;
        }
        if let Ok(dir) = std::env::var("EMBEDDING_MODEL_PATH") {
            config.model_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Load configuration from a TOML file; missing fields take defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn type_dir(&self, contract_type: &str) -> PathBuf {
        self.rag_dir.join(contract_type)
    }

    pub fn index_path(&self, contract_type: &str) -> PathBuf {
        self.type_dir(contract_type).join(INDEX_FILE_NAME)
    }

    pub fn filenames_path(&self, contract_type: &str) -> PathBuf {
        self.type_dir(contract_type).join(FILENAMES_FILE_NAME)
    }

    pub fn keywords_dir(&self, contract_type: &str) -> PathBuf {
        self.template_dir.join(contract_type).join(KEYWORDS_DIR_NAME)
    }
}
