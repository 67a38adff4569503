//! Template identifier -> category tag mapping
//!
//! Loaded from `_contract_categories.json` when present, otherwise rebuilt
//! from the per-template keyword files, whose first `;`-delimited segment is
//! the template's category.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::config::CATEGORY_FILE_NAME;

/// A template identifier paired with its category tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub identifier: String,
    pub category_tag: String,
}

impl TemplateRecord {
    /// First `;`-delimited segment of the tag
    pub fn canonical_category(&self) -> &str {
        first_segment(&self.category_tag)
    }
}

/// Per-contract-type category lookup, keyed by identifier without extension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap(HashMap<String, String>);

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a keywords directory
    ///
    /// A readable, valid category file wins. Otherwise every `.txt` file not
    /// starting with `_` contributes one entry. A missing directory yields an
    /// empty map; unreadable individual files are skipped.
    pub fn load(keywords_dir: &Path) -> Self {
        let category_path = keywords_dir.join(CATEGORY_FILE_NAME);
        if category_path.is_file() {
            match fs::read_to_string(&category_path)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_json::from_str::<CategoryMap>(&s).map_err(|e| e.to_string()))
            {
                Ok(map) => {
                    tracing::debug!(
                        "Loaded {} categories from {}",
                        map.len(),
                        category_path.display()
                    );
                    return map;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to load category file {}: {}",
                        category_path.display(),
                        e
                    );
                }
            }
        }

        tracing::info!(
            "{} not found, rebuilding categories from keyword files",
            CATEGORY_FILE_NAME
        );
        Self::from_keyword_files(keywords_dir)
    }

    /// Rebuild from the `.txt` keyword files of a directory
    pub fn from_keyword_files(keywords_dir: &Path) -> Self {
        let entries = match fs::read_dir(keywords_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Keywords directory {} unavailable: {}",
                    keywords_dir.display(),
                    e
                );
                return Self::default();
            }
        };

        let mut map = Self::default();
        for entry in entries.flatten() {
            let path = entry.path();
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            if ext != "txt" || stem.starts_with('_') {
                continue;
            }

            match fs::read_to_string(&path) {
                Ok(content) => {
                    let record = TemplateRecord {
                        identifier: stem.to_string(),
                        category_tag: content.trim().to_string(),
                    };
                    map.insert_record(&record);
                }
                Err(e) => {
                    tracing::warn!("Failed to read keyword file {}: {}", path.display(), e);
                }
            }
        }

        tracing::info!("Rebuilt {} categories from keyword files", map.len());
        map
    }

    pub fn insert(&mut self, identifier: impl Into<String>, category: impl Into<String>) {
        self.0.insert(identifier.into(), category.into());
    }

    /// Category tag of a template, empty when unknown
    pub fn get(&self, identifier: &str) -> &str {
        self.0.get(identifier).map(String::as_str).unwrap_or("")
    }

    /// Store a record under its canonical category
    pub fn insert_record(&mut self, record: &TemplateRecord) {
        self.insert(record.identifier.as_str(), record.canonical_category());
    }

    /// True when the template's tag contains any of the labels as a substring
    pub fn matches_any(&self, identifier: &str, labels: &BTreeSet<String>) -> bool {
        let tag = self.get(identifier);
        !tag.is_empty() && labels.iter().any(|label| tag.contains(label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn first_segment(content: &str) -> &str {
    match content.split_once(';') {
        Some((head, _)) => head.trim(),
        None => content,
    }
}
