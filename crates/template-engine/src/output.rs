//! Generated document naming and persistence

use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::TemplateError;
use shared_types::Document;

/// Prefix of every generated file name
pub const GENERATED_PREFIX: &str = "generated";

/// Hex characters of the random id kept in a generated file name
const SHORT_ID_LEN: usize = 8;

/// `generated_{YYYYMMDDHHMMSS}_{8 hex}_{name}.{ext}`
pub fn generated_file_name(
    template_name: &str,
    extension: &str,
    timestamp: NaiveDateTime,
    id: Uuid,
) -> String {
    let hex = id.simple().to_string();
    format!(
        "{}_{}_{}_{}.{}",
        GENERATED_PREFIX,
        timestamp.format("%Y%m%d%H%M%S"),
        &hex[..SHORT_ID_LEN],
        template_name,
        extension
    )
}

/// Name for a new output file using the local clock and a random id
pub fn new_generated_file_name(template_name: &str, extension: &str) -> String {
    generated_file_name(
        template_name,
        extension,
        Local::now().naive_local(),
        Uuid::new_v4(),
    )
}

pub fn load_document(path: &Path) -> Result<Document, TemplateError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| TemplateError::InvalidTemplate {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write rendered output into `dir`, creating the directory when needed
pub fn save_rendered(bytes: &[u8], dir: &Path, file_name: &str) -> Result<PathBuf, TemplateError> {
    let path = dir.join(file_name);

    std::fs::create_dir_all(dir).map_err(|source| TemplateError::Save {
        path: dir.to_path_buf(),
        source,
    })?;
    std::fs::write(&path, bytes).map_err(|source| TemplateError::Save {
        path: path.clone(),
        source,
    })?;

    tracing::info!("Saved generated document to {}", path.display());
    Ok(path)
}
