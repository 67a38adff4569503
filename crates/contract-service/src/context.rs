//! Service context
//!
//! Built once at startup and shared read-only by every request. Each
//! recommend or generate call creates its own query, candidates and
//! placeholder map, so concurrent callers need no locking.

use std::sync::Arc;

use analysis_engine::{AnalysisEngine, LlmClient, UnconfiguredClient};
use corpus_core::{build_corpus, load_embedder, CorpusCatalog, Embedder, Retriever, ScoreAdjuster};
use template_engine::{TemplateFiller, TemplateInfo, TemplateStore};

use crate::config::{LlmSettings, ServiceConfig};
use crate::error::ServiceError;

pub struct ContractService {
    pub(crate) config: ServiceConfig,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) catalog: CorpusCatalog,
    pub(crate) analysis: AnalysisEngine,
    pub(crate) retriever: Retriever,
    pub(crate) scorer: ScoreAdjuster,
    pub(crate) filler: TemplateFiller,
    pub(crate) templates: TemplateStore,
}

impl ContractService {
    /// Load every corpus under the configured RAG root
    pub fn new(config: ServiceConfig, embedder: Arc<dyn Embedder>, llm: Arc<dyn LlmClient>) -> Self {
        let catalog = CorpusCatalog::load(&config.corpus);
        tracing::info!(
            "Loaded {} contract types: {:?}",
            catalog.len(),
            catalog.types()
        );
        Self::with_catalog(config, embedder, llm, catalog)
    }

    pub fn with_catalog(
        config: ServiceConfig,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LlmClient>,
        catalog: CorpusCatalog,
    ) -> Self {
        let retriever = Retriever::new(Arc::clone(&embedder)).with_mode(config.rerank_mode);
        let templates = TemplateStore::new(config.tran_template_dir.clone());
        Self {
            config,
            embedder,
            catalog,
            analysis: AnalysisEngine::new(llm),
            retriever,
            scorer: ScoreAdjuster::new(),
            filler: TemplateFiller::new(),
            templates,
        }
    }

    /// The configured embedder plus the language-model client the settings allow
    pub fn from_config(config: ServiceConfig) -> Result<Self, ServiceError> {
        let embedder = load_embedder(&config.corpus)?;
        let llm = llm_client(&config.llm);
        Ok(Self::new(config, embedder, llm))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CorpusCatalog {
        &self.catalog
    }

    pub fn contract_types(&self) -> Vec<&str> {
        self.catalog.types()
    }

    pub fn templates_for(&self, contract_type: &str) -> Result<&[String], ServiceError> {
        Ok(self.catalog.templates_for(contract_type)?)
    }

    /// Fillable templates of one type with their placeholder keys
    pub fn list_templates(&self, contract_type: &str) -> Vec<TemplateInfo> {
        self.templates.list_templates(contract_type)
    }

    /// Rebuild and persist the index of one type from its keyword files
    ///
    /// The loaded catalog is not updated; the new index is picked up by the
    /// next service started on the same directories.
    pub fn build_index(&self, contract_type: &str) -> Result<usize, ServiceError> {
        let corpus = build_corpus(&self.config.corpus, contract_type, self.embedder.as_ref())?;
        Ok(corpus.len())
    }
}

#[cfg(feature = "dashscope")]
fn llm_client(settings: &LlmSettings) -> Arc<dyn LlmClient> {
    use analysis_engine::dashscope::{DashScopeClient, DashScopeConfig};

    let Some(api_key) = settings.api_key.clone() else {
        tracing::warn!("No language-model API key configured; analysis will be neutral");
        return Arc::new(UnconfiguredClient);
    };
    let config = DashScopeConfig {
        api_key,
        model: settings.model.clone(),
        base_url: settings.base_url.clone(),
    };
    match DashScopeClient::new(config) {
        Ok(client) => {
            tracing::info!("Using language model {}", settings.model);
            Arc::new(client)
        }
        Err(e) => {
            tracing::warn!("Language-model client unavailable: {}", e);
            Arc::new(UnconfiguredClient)
        }
    }
}

#[cfg(not(feature = "dashscope"))]
fn llm_client(settings: &LlmSettings) -> Arc<dyn LlmClient> {
    if settings.api_key.is_some() {
        tracing::warn!("API key ignored: built without the dashscope feature");
    }
    Arc::new(UnconfiguredClient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_empty_directories() {
        let dir = TempDir::new().unwrap();
        let service = ContractService::from_config(ServiceConfig::under(dir.path())).unwrap();

        assert!(service.contract_types().is_empty());
        assert!(matches!(
            service.templates_for("租赁"),
            Err(ServiceError::Catalog(_))
        ));
        assert!(service.list_templates("租赁").is_empty());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut config = ServiceConfig::default();
        config.corpus.embedding_dim = 0;
        assert!(matches!(
            ContractService::from_config(config),
            Err(ServiceError::Embedder(_))
        ));
    }

    #[test]
    fn test_build_index_then_load() {
        let dir = TempDir::new().unwrap();
        let config = ServiceConfig::under(dir.path());
        let keywords = config.corpus.keywords_dir("租赁");
        std::fs::create_dir_all(&keywords).unwrap();
        std::fs::write(keywords.join("房屋租赁合同.txt"), "租赁合同;房屋 出租 租金").unwrap();
        std::fs::write(keywords.join("车辆租赁合同.txt"), "租赁合同;车辆 租车 押金").unwrap();

        let builder = ContractService::from_config(config.clone()).unwrap();
        assert_eq!(builder.build_index("租赁").unwrap(), 2);
        assert!(builder.contract_types().is_empty());

        let service = ContractService::from_config(config).unwrap();
        assert_eq!(service.contract_types(), vec!["租赁"]);
        assert_eq!(
            service.templates_for("租赁").unwrap(),
            &["房屋租赁合同".to_string(), "车辆租赁合同".to_string()]
        );
    }
}
