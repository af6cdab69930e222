// src/extractors/mod.rs
pub mod document;
pub mod metadata;
pub mod payload;
pub mod ranking;
pub mod section;
pub mod tabs;

use crate::table::Table;

// Re-export key extraction types for convenience
pub use document::Document;
pub use metadata::ReportMetadata;
pub use ranking::RankingExtractor;
pub use section::{SectionHeading, SectionNavigator};
pub use tabs::TabExtractor;

/// A finished dataset and the identifier it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    pub dataset_id: String,
    pub table: Table,
}
