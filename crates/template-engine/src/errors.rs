//! Error types for template loading and output persistence

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Placeholder file not found: {}", .0.display())]
    PlaceholderFileNotFound(PathBuf),

    #[error("Invalid placeholder file {}: {reason}", .path.display())]
    InvalidPlaceholderFile { path: PathBuf, reason: String },

    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Invalid template document {}: {reason}", .path.display())]
    InvalidTemplate { path: PathBuf, reason: String },

    #[error("Invalid docx template: {0}")]
    InvalidDocx(String),

    #[error("Docx archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to save {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
