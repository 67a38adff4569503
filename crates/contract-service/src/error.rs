//! Errors surfaced by the pipelines
//!
//! Retrieval and language-model failures never appear here; they degrade to
//! neutral results inside the engines.

use thiserror::Error;

use corpus_core::{CatalogError, EmbedError};
use template_engine::TemplateError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Embedder unavailable: {0}")]
    Embedder(#[from] EmbedError),

    #[error("No template name given")]
    EmptyTemplateName,

    #[error("Failed to start worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Worker exited without reporting a result")]
    WorkerLost,
}
