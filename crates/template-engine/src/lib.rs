//! Template Engine - Placeholder filling for contract templates
//!
//! Loads template documents (`.docx` or JSON) and their placeholder lists,
//! fills `{key}` tokens without touching run formatting, and persists the
//! generated result in the template's own format.

pub mod docx;
pub mod errors;
pub mod filler;
pub mod output;
pub mod templates;

pub use errors::TemplateError;
pub use filler::{FillReport, TemplateFiller, BLANK, NO_CONTENT_SENTINEL};
pub use docx::DocxTemplate;
pub use output::{generated_file_name, load_document, new_generated_file_name, save_rendered};
pub use templates::{Template, TemplateFormat, TemplateInfo, TemplateStore, PLACEHOLDER_DIR_NAME};
