//! Template store and placeholder files
//!
//! Layout below the store root:
//!
//! ```text
//! {type}/{name}.docx          template document (preferred)
//! {type}/{name}.json          template document tree as JSON
//! {type}/占位符/{name}.json    placeholder file: {"placeholders": ["甲方", ...]}
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::docx::DocxTemplate;
use crate::errors::TemplateError;
use shared_types::Document;

/// Directory holding placeholder files inside each type directory
pub const PLACEHOLDER_DIR_NAME: &str = "占位符";

/// On-disk template formats, in lookup order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    Docx,
    Json,
}

impl TemplateFormat {
    pub const ALL: [TemplateFormat; 2] = [TemplateFormat::Docx, TemplateFormat::Json];

    /// File extension, also used for generated output
    pub fn extension(self) -> &'static str {
        match self {
            TemplateFormat::Docx => "docx",
            TemplateFormat::Json => "json",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

#[derive(Debug, Clone)]
enum TemplateSource {
    Json,
    Docx(DocxTemplate),
}

/// A loaded template document and the means to write a filled copy back
#[derive(Debug, Clone)]
pub struct Template {
    pub document: Document,
    source: TemplateSource,
}

impl Template {
    pub fn format(&self) -> TemplateFormat {
        match self.source {
            TemplateSource::Json => TemplateFormat::Json,
            TemplateSource::Docx(_) => TemplateFormat::Docx,
        }
    }

    /// Serialize a filled copy of this template in its own format
    pub fn render(&self, filled: &Document) -> Result<Vec<u8>, TemplateError> {
        match &self.source {
            TemplateSource::Json => Ok(serde_json::to_vec_pretty(filled)?),
            TemplateSource::Docx(docx) => docx.render(filled),
        }
    }
}

/// Contents of a placeholder file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderFile {
    pub placeholders: Vec<String>,
}

/// Information about a fillable template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    /// Template name without extension
    pub name: String,
    /// Contract type directory the template lives in
    pub contract_type: String,
    /// Keys the template expects, empty when no placeholder file exists
    pub placeholders: Vec<String>,
}

/// Read-only access to template documents and their placeholder files
#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn template_path(&self, contract_type: &str, name: &str, format: TemplateFormat) -> PathBuf {
        self.root
            .join(contract_type)
            .join(format!("{}.{}", name, format.extension()))
    }

    /// Existing template file, `.docx` before `.json`
    pub fn find_template(&self, contract_type: &str, name: &str) -> Option<(PathBuf, TemplateFormat)> {
        TemplateFormat::ALL
            .into_iter()
            .map(|format| (self.template_path(contract_type, name, format), format))
            .find(|(path, _)| path.is_file())
    }

    pub fn placeholder_path(&self, contract_type: &str, name: &str) -> PathBuf {
        self.root
            .join(contract_type)
            .join(PLACEHOLDER_DIR_NAME)
            .join(format!("{}.json", name))
    }

    /// Load the key list a template expects
    pub fn load_placeholders(
        &self,
        contract_type: &str,
        name: &str,
    ) -> Result<Vec<String>, TemplateError> {
        let path = self.placeholder_path(contract_type, name);
        if !path.is_file() {
            return Err(TemplateError::PlaceholderFileNotFound(path));
        }

        let content = std::fs::read_to_string(&path)?;
        let file: PlaceholderFile =
            serde_json::from_str(&content).map_err(|e| TemplateError::InvalidPlaceholderFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            "Loaded {} placeholders from {}",
            file.placeholders.len(),
            path.display()
        );
        Ok(file.placeholders)
    }

    pub fn load_template(&self, contract_type: &str, name: &str) -> Result<Template, TemplateError> {
        let Some((path, format)) = self.find_template(contract_type, name) else {
            return Err(TemplateError::TemplateNotFound(self.template_path(
                contract_type,
                name,
                TemplateFormat::Docx,
            )));
        };
        tracing::debug!("Loading {:?} template {}", format, path.display());

        match format {
            TemplateFormat::Json => Ok(Template {
                document: crate::output::load_document(&path)?,
                source: TemplateSource::Json,
            }),
            TemplateFormat::Docx => {
                let docx = DocxTemplate::open(&path)?;
                let document = docx.document().map_err(|e| TemplateError::InvalidTemplate {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Template {
                    document,
                    source: TemplateSource::Docx(docx),
                })
            }
        }
    }

    /// List fillable templates of one contract type, sorted by name
    pub fn list_templates(&self, contract_type: &str) -> Vec<TemplateInfo> {
        let dir = self.root.join(contract_type);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot read template directory {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut templates: Vec<TemplateInfo> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && TemplateFormat::from_path(path).is_some())
            .filter_map(|path| {
                let name = path.file_stem()?.to_str()?.to_string();
                let placeholders = self
                    .load_placeholders(contract_type, &name)
                    .unwrap_or_default();
                Some(TemplateInfo {
                    name,
                    contract_type: contract_type.to_string(),
                    placeholders,
                })
            })
            .collect();

        templates.sort_by(|a, b| a.name.cmp(&b.name));
        // a name with both formats is listed once
        templates.dedup_by(|a, b| a.name == b.name);
        templates
    }
}
