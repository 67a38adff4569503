pub mod document;
pub mod placeholder;
pub mod types;

pub use document::{Alignment, Cell, Document, Paragraph, Row, Run, RunFormat, Table};
pub use placeholder::PlaceholderMap;
pub use types::{NeedsAnalysis, Relevance, NOT_APPLICABLE, NO_RELEVANT_CONTRACT};
