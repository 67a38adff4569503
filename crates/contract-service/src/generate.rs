//! Generate pipeline: fill a chosen template from the user's description

use std::path::PathBuf;

use shared_types::Document;
use template_engine::{new_generated_file_name, save_rendered, TemplateFormat};

use crate::context::ContractService;
use crate::error::ServiceError;
use crate::progress::{Progress, ProgressFn};

/// A filled contract, already written to the output directory
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContract {
    pub file_name: String,
    pub path: PathBuf,
    /// Format of the source template and of the saved file
    pub format: TemplateFormat,
    pub document: Document,
}

/// Template name without a template extension
fn template_stem(name: &str) -> &str {
    let name = name.trim();
    TemplateFormat::ALL
        .into_iter()
        .find_map(|format| {
            name.strip_suffix(format.extension())
                .and_then(|rest| rest.strip_suffix('.'))
        })
        .unwrap_or(name)
}

impl ContractService {
    /// Extract values for the template's placeholders, fill and save it
    ///
    /// A missing placeholder file or template document, or a failed save,
    /// is returned as an error. Extraction failures leave fields blank.
    pub fn generate(
        &self,
        input: &str,
        contract_type: &str,
        template_name: &str,
        progress: ProgressFn<'_>,
    ) -> Result<GeneratedContract, ServiceError> {
        progress(Progress::new("started", 5));

        let name = template_stem(template_name);
        if name.is_empty() {
            return Err(ServiceError::EmptyTemplateName);
        }

        let keys = self.templates.load_placeholders(contract_type, name)?;
        let values = self.analysis.extract_placeholder_values(input, &keys);
        tracing::info!(
            "Extracted {} of {} placeholder values for {}",
            values.len(),
            keys.len(),
            name
        );
        progress(Progress::new("placeholders extracted", 80));

        let template = self.templates.load_template(contract_type, name)?;
        let mut document = template.document.clone();
        progress(Progress::new("template loaded", 85));

        let report = self.filler.fill_with_report(&mut document, &values);
        tracing::debug!(
            "Filled {}: {} substitutions, {} blanked",
            name,
            report.substitutions,
            report.residual_tokens.len()
        );
        progress(Progress::new("template filled", 95));

        let format = template.format();
        let rendered = template.render(&document)?;
        let file_name = new_generated_file_name(name, format.extension());
        let path = save_rendered(&rendered, &self.config.generated_dir, &file_name)?;
        progress(Progress::new("saved", 100));

        Ok(GeneratedContract {
            file_name,
            path,
            format,
            document,
        })
    }
}
