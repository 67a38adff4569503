//! Per-contract-type corpora loaded once at startup
//!
//! Every subdirectory of the RAG root that holds a filename sidecar is a
//! contract type. Each type owns its template identifiers, its vector index
//! and its category map; all of it is read-only after loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::category::CategoryMap;
use crate::config::{CorpusConfig, FILENAMES_FILE_NAME};
use crate::embeddings::{EmbedError, Embedder};
use crate::index::{read_filenames, write_filenames, EmbeddingIndex, IndexError};
use crate::text::clean_text;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown contract type: {0}")]
    UnknownType(String),

    #[error("No keyword files found in {}", .0.display())]
    EmptyCorpus(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Embedding error: {0}")]
    Embed(#[from] EmbedError),
}

/// Everything retrieval needs for one contract type
#[derive(Debug, Clone)]
pub struct ContractCorpus {
    pub contract_type: String,
    /// Template identifiers without extension, in index insertion order
    pub templates: Vec<String>,
    pub index: EmbeddingIndex,
    pub categories: CategoryMap,
}

impl ContractCorpus {
    /// Load index, sidecar and categories of one type
    pub fn load(config: &CorpusConfig, contract_type: &str) -> Result<Self, CatalogError> {
        let filenames_path = config.filenames_path(contract_type);
        let filenames = read_filenames(&filenames_path).map_err(|source| CatalogError::Io {
            path: filenames_path.clone(),
            source,
        })?;
        let index = EmbeddingIndex::read_from(&config.index_path(contract_type))?;
        let categories = CategoryMap::load(&config.keywords_dir(contract_type));

        let corpus = Self {
            contract_type: contract_type.to_string(),
            templates: filenames.iter().map(|f| strip_extension(f)).collect(),
            index,
            categories,
        };
        corpus.check_consistency();

        tracing::info!(
            "Loaded contract type {}: {} templates, {} categories",
            contract_type,
            corpus.templates.len(),
            corpus.categories.len()
        );
        Ok(corpus)
    }

    /// Whether the index holds exactly one vector per template identifier
    ///
    /// A mismatch is logged; searches stay bounds-checked either way.
    pub fn check_consistency(&self) -> bool {
        let consistent = self.index.len() == self.templates.len();
        if !consistent {
            tracing::warn!(
                "Index size ({}) does not match template count ({}) for {}",
                self.index.len(),
                self.templates.len(),
                self.contract_type
            );
        }
        consistent
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// All contract types known at startup
#[derive(Debug, Clone, Default)]
pub struct CorpusCatalog {
    corpora: BTreeMap<String, ContractCorpus>,
}

impl CorpusCatalog {
    /// Scan the RAG root and load every contract type found
    ///
    /// Types that fail to load are skipped with a warning. A missing root
    /// yields an empty catalog.
    pub fn load(config: &CorpusConfig) -> Self {
        let entries = match fs::read_dir(&config.rag_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("RAG directory {} unavailable: {}", config.rag_dir.display(), e);
                return Self::default();
            }
        };

        let mut types: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().join(FILENAMES_FILE_NAME).is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        types.sort();

        let mut catalog = Self::default();
        for contract_type in types {
            match ContractCorpus::load(config, &contract_type) {
                Ok(corpus) => catalog.insert(corpus),
                Err(e) => tracing::warn!("Skipping contract type {}: {}", contract_type, e),
            }
        }
        catalog
    }

    pub fn insert(&mut self, corpus: ContractCorpus) {
        self.corpora.insert(corpus.contract_type.clone(), corpus);
    }

    /// Contract type names, sorted
    pub fn types(&self) -> Vec<&str> {
        self.corpora.keys().map(String::as_str).collect()
    }

    pub fn get(&self, contract_type: &str) -> Result<&ContractCorpus, CatalogError> {
        self.corpora
            .get(contract_type)
            .ok_or_else(|| CatalogError::UnknownType(contract_type.to_string()))
    }

    /// Template identifiers of one type, in index order
    pub fn templates_for(&self, contract_type: &str) -> Result<&[String], CatalogError> {
        Ok(&self.get(contract_type)?.templates)
    }

    pub fn len(&self) -> usize {
        self.corpora.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpora.is_empty()
    }
}

/// Build and persist the index of one contract type from its keyword files
///
/// Reads every non-empty `.txt` file of the type's keywords directory (files
/// starting with `_` excluded) in file-name order, cleans and embeds the text,
/// then writes the index and filename sidecar under the RAG root.
pub fn build_corpus(
    config: &CorpusConfig,
    contract_type: &str,
    embedder: &dyn Embedder,
) -> Result<ContractCorpus, CatalogError> {
    let keywords_dir = config.keywords_dir(contract_type);
    let documents = read_keyword_documents(&keywords_dir)?;
    if documents.is_empty() {
        return Err(CatalogError::EmptyCorpus(keywords_dir));
    }

    let texts: Vec<&str> = documents.iter().map(|(_, text)| text.as_str()).collect();
    let vectors = embedder.embed_batch(&texts)?;
    let index = EmbeddingIndex::build(&vectors)?;

    let filenames: Vec<String> = documents.into_iter().map(|(name, _)| name).collect();
    index.write_to(&config.index_path(contract_type))?;
    let filenames_path = config.filenames_path(contract_type);
    write_filenames(&filenames_path, &filenames).map_err(|source| CatalogError::Io {
        path: filenames_path,
        source,
    })?;

    tracing::info!(
        "Built index for {} with {} templates (dimension {})",
        contract_type,
        filenames.len(),
        index.dimension()
    );

    Ok(ContractCorpus {
        contract_type: contract_type.to_string(),
        templates: filenames.iter().map(|f| strip_extension(f)).collect(),
        index,
        categories: CategoryMap::load(&keywords_dir),
    })
}

fn read_keyword_documents(dir: &Path) -> Result<Vec<(String, String)>, CatalogError> {
    let entries = fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut documents = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".txt") || name.starts_with('_') {
            continue;
        }

        let content = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;
        let cleaned = clean_text(&content);
        if cleaned.is_empty() {
            tracing::debug!("Skipping empty keyword file {}", path.display());
            continue;
        }
        documents.push((name.to_string(), cleaned));
    }

    documents.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(documents)
}

/// Identifier of a sidecar entry: the name with its last extension removed
pub fn strip_extension(filename: &str) -> String {
    let trimmed = filename.trim();
    Path::new(trimmed)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use pretty_assertions::assert_eq;

    fn write_keywords(config: &CorpusConfig, contract_type: &str, files: &[(&str, &str)]) {
        let dir = config.keywords_dir(contract_type);
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("房屋租赁合同.docx"), "房屋租赁合同");
        assert_eq!(strip_extension(" a.b.txt "), "a.b");
        assert_eq!(strip_extension("无扩展名"), "无扩展名");
    }

    #[test]
    fn test_build_then_load() {
        let root = tempfile::tempdir().unwrap();
        let config = CorpusConfig::under(root.path());
        write_keywords(
            &config,
            "民事",
            &[
                ("房屋租赁合同.txt", "租赁合同;房屋、租金，押金"),
                ("汽车买卖合同.txt", "买卖合同;汽车 过户"),
                ("空白.txt", "  ；  "),
                ("_contract_categories.json", "{}"),
            ],
        );
        let embedder = HashingEmbedder::new(32).unwrap();

        let built = build_corpus(&config, "民事", &embedder).unwrap();
        assert_eq!(built.templates, vec!["房屋租赁合同", "汽车买卖合同"]);
        assert_eq!(built.index.len(), 2);

        let catalog = CorpusCatalog::load(&config);
        assert_eq!(catalog.types(), vec!["民事"]);
        let corpus = catalog.get("民事").unwrap();
        assert!(corpus.check_consistency());
        assert_eq!(corpus.templates, built.templates);
        assert_eq!(corpus.index, built.index);
    }

    #[test]
    fn test_build_without_keywords_fails() {
        let root = tempfile::tempdir().unwrap();
        let config = CorpusConfig::under(root.path());
        write_keywords(&config, "空", &[("_only.txt", "x")]);
        let embedder = HashingEmbedder::new(8).unwrap();
        assert!(matches!(
            build_corpus(&config, "空", &embedder),
            Err(CatalogError::EmptyCorpus(_))
        ));
    }

    #[test]
    fn test_inconsistent_corpus_still_loads() {
        let root = tempfile::tempdir().unwrap();
        let config = CorpusConfig::under(root.path());
        EmbeddingIndex::build(&[vec![0.0, 1.0]])
            .unwrap()
            .write_to(&config.index_path("劳动"))
            .unwrap();
        write_filenames(
            &config.filenames_path("劳动"),
            &["a.txt".to_string(), "b.txt".to_string()],
        )
        .unwrap();

        let corpus = ContractCorpus::load(&config, "劳动").unwrap();
        assert!(!corpus.check_consistency());
        assert_eq!(corpus.len(), 2);
        assert!(corpus.categories.is_empty());
    }

    #[test]
    fn test_catalog_skips_broken_types_and_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let config = CorpusConfig::under(root.path());
        assert!(CorpusCatalog::load(&config).is_empty());

        // sidecar without an index file
        write_filenames(&config.filenames_path("坏"), &["a.txt".to_string()]).unwrap();
        fs::create_dir_all(config.type_dir("无sidecar")).unwrap();
        let catalog = CorpusCatalog::load(&config);
        assert!(catalog.is_empty());
        assert!(matches!(
            catalog.get("坏"),
            Err(CatalogError::UnknownType(_))
        ));
    }
}
