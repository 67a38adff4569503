//! Service configuration
//!
//! Extends the corpus layout with the template, output and language-model
//! settings the pipelines need.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use corpus_core::{CorpusConfig, RerankMode};

pub const DEFAULT_MODEL: &str = "qwen-turbo";
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Number of candidates the recommend pipeline asks the retriever for
pub const DEFAULT_TOP_K: usize = 5;

/// Hosted language-model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// No key means no model calls; every analysis degrades to neutral
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub corpus: CorpusConfig,
    /// Fillable template documents and their placeholder files
    pub tran_template_dir: PathBuf,
    /// Where generated contracts are written
    pub generated_dir: PathBuf,
    pub llm: LlmSettings,
    pub rerank_mode: RerankMode,
    pub top_k: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::under(Path::new("contracts"))
    }
}

impl ServiceConfig {
    /// Standard layout below a contracts root directory
    pub fn under(root: &Path) -> Self {
        Self {
            corpus: CorpusConfig::under(root),
            tran_template_dir: root.join("tran_template"),
            generated_dir: root.join("generated"),
            llm: LlmSettings::default(),
            rerank_mode: RerankMode::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - CONTRACTS_DIR plus the CONTRACT_*_DIR overrides (see `CorpusConfig`)
    /// - CONTRACT_TRAN_TEMPLATE_DIR: fillable template root
    /// - CONTRACT_GENERATED_DIR: output directory
    /// - DASHSCOPE_API_KEY: language-model key (optional)
    /// - LLM_MODEL_NAME: model name (default: "qwen-turbo")
    /// - LLM_BASE_URL: OpenAI-compatible endpoint root
    pub fn from_env() -> Result<Self> {
        let root = std::env::var("CONTRACTS_DIR").unwrap_or_else(|_| "contracts".to_string());
        let mut config = Self::under(Path::new(&root));
        config.corpus = CorpusConfig::from_env()?;

        if let Ok(dir) = std::env::var("CONTRACT_TRAN_TEMPLATE_DIR") {
            config.tran_template_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("CONTRACT_GENERATED_DIR") {
            config.generated_dir = PathBuf::from(dir);
        }
        if let Ok(key) = std::env::var("DASHSCOPE_API_KEY") {
            if !key.trim().is_empty() {
                config.llm.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("LLM_MODEL_NAME") {
            config.llm.model = model;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_layout() {
        let config = ServiceConfig::default();
        assert_eq!(config.tran_template_dir, PathBuf::from("contracts/tran_template"));
        assert_eq!(config.generated_dir, PathBuf::from("contracts/generated"));
        assert_eq!(config.corpus.rag_dir, PathBuf::from("contracts/RAG"));
        assert_eq!(config.llm.model, "qwen-turbo");
        assert_eq!(config.llm.api_key, None);
        assert_eq!(config.rerank_mode, RerankMode::MatchedFirst);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"
generated_dir = "/tmp/out"
rerank_mode = "interleaved"

[corpus]
rag_dir = "/srv/rag"

[llm]
model = "qwen-plus"
"#,
        )
        .unwrap();

        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.generated_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.rerank_mode, RerankMode::Interleaved);
        assert_eq!(config.corpus.rag_dir, PathBuf::from("/srv/rag"));
        assert_eq!(config.corpus.template_dir, PathBuf::from("contracts/template"));
        assert_eq!(config.llm.model, "qwen-plus");
        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.tran_template_dir, PathBuf::from("contracts/tran_template"));
    }

    #[test]
    fn test_from_missing_file() {
        assert!(ServiceConfig::from_file(Path::new("/nonexistent/contract.toml")).is_err());
    }
}
