// src/config.rs
use std::path::PathBuf;

use crate::utils::AppError;

pub const DEFAULT_DATABASE: &str = "data_lake__ncl";
pub const DEFAULT_SCHEMA: &str = "cancer__cosd_html";
pub const DEFAULT_EXTENSION: &str = "html";

/// Tab datasets matching any of these fragments are archived as CSV but never uploaded.
pub const DEFAULT_UPLOAD_BLOCKLIST: [&str; 1] = ["stage_by_cancer_group_in_"];

/// Everything one batch run needs, resolved up front and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the unprocessed report files.
    pub data_dir: PathBuf,
    /// Destination for archived HTML and CSV mirrors; `None` disables archiving.
    pub archive_dir: Option<PathBuf>,
    pub database: String,
    pub schema: String,
    pub file_extension: String,
    pub process_tabs: bool,
    pub process_ranking: bool,
    /// Mirror every extracted table as CSV under the archive directory.
    pub mirror_csv: bool,
    pub upload_blocklist: Vec<String>,
    /// Replace destination table contents instead of appending.
    pub replace: bool,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            archive_dir: None,
            database: DEFAULT_DATABASE.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            file_extension: DEFAULT_EXTENSION.to_string(),
            process_tabs: true,
            process_ranking: true,
            mirror_csv: true,
            upload_blocklist: DEFAULT_UPLOAD_BLOCKLIST.iter().map(|s| s.to_string()).collect(),
            replace: false,
        }
    }

    pub fn with_archive_dir(mut self, archive_dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(archive_dir.into());
        self
    }

    /// Checks the settings that would otherwise fail halfway through a batch.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.data_dir.is_dir() {
            return Err(AppError::Config(format!(
                "data directory {} does not exist",
                self.data_dir.display()
            )));
        }
        if !self.process_tabs && !self.process_ranking {
            return Err(AppError::Config(
                "nothing to do: both tab and ranking extraction are disabled".to_string(),
            ));
        }
        if self.database.trim().is_empty() || self.schema.trim().is_empty() {
            return Err(AppError::Config("destination database and schema must be set".to_string()));
        }
        Ok(())
    }

    pub fn is_blocked(&self, dataset_id: &str) -> bool {
        self.upload_blocklist
            .iter()
            .any(|fragment| !fragment.is_empty() && dataset_id.contains(fragment.as_str()))
    }
}
