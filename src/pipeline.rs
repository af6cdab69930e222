// src/pipeline.rs
use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::extractors::{Document, ExtractedTable, RankingExtractor, ReportMetadata, TabExtractor};
use crate::storage::{ArchiveOutcome, StorageManager};
use crate::utils::AppError;
use crate::warehouse::{table_description, ColumnInfo, Destination, UploadGateway};

pub const TIMESTAMP_COLUMN: &str = "TIMESTAMP";

/// Lifecycle of one report file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Parsing,
    Extracting,
    Uploading,
    Archiving,
    Done,
    Failed,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileState::Parsing => "parsing",
            FileState::Extracting => "extracting",
            FileState::Uploading => "uploading",
            FileState::Archiving => "archiving",
            FileState::Done => "done",
            FileState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Every table uploaded and the report moved to the archive.
    Archived,
    /// Every table uploaded; the archive already held this report.
    AlreadyArchived,
    /// Every table uploaded; archiving is switched off.
    Uploaded,
    /// Some uploads failed, so the report stays put for the next run.
    UploadFailed { failed: usize },
    /// Parsing, extraction or archiving failed.
    Failed { state: FileState, error: String },
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Archived | FileOutcome::AlreadyArchived | FileOutcome::Uploaded)
    }
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub file_name: String,
    pub tables: usize,
    pub outcome: FileOutcome,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<FileReport>,
}

impl BatchSummary {
    pub fn success_count(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.reports.len() - self.success_count()
    }
}

/// Everything pulled out of one report, metadata already stamped.
#[derive(Debug)]
pub struct FileExtraction {
    pub metadata: ReportMetadata,
    pub ranking: Option<ExtractedTable>,
    pub tabs: Vec<ExtractedTable>,
}

impl FileExtraction {
    /// Tables paired with their destination table names, ranking first.
    pub fn uploads(&self) -> Vec<(&ExtractedTable, String)> {
        let ranking = self
            .ranking
            .iter()
            .map(|t| (t, ranking_table_name(&t.dataset_id)));
        let tabs = self.tabs.iter().map(|t| (t, t.dataset_id.clone()));
        ranking.chain(tabs).collect()
    }

    pub fn table_count(&self) -> usize {
        self.tabs.len() + usize::from(self.ranking.is_some())
    }
}

/// The ranking dataset id starts with its section number token, which is
/// dropped from the destination name.
pub fn ranking_table_name(dataset_id: &str) -> String {
    match dataset_id.split_once('_') {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => dataset_id.to_string(),
    }
}

/// Report files in the data directory, sorted by name.
pub fn list_source_files(config: &Config) -> Result<Vec<String>, AppError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(&config.data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(config.file_extension.as_str()) {
                files.push(name.to_string());
            }
        }
    }

    if files.is_empty() {
        return Err(AppError::Config(format!("No files were found in {}", config.data_dir.display())));
    }

    files.sort();
    Ok(files)
}

/// Parses a report and extracts every configured table from it.
pub fn extract_file(config: &Config, file_name: &str, bytes: &[u8]) -> Result<FileExtraction, AppError> {
    let metadata = ReportMetadata::from_file_name(file_name)?;
    let document = Document::parse(bytes)?;
    extract_document(config, metadata, &document)
}

/// Extracts the configured tables from an already parsed report. Tab tables
/// get all metadata columns; the ranking table only gets DATE_DATA.
pub fn extract_document(config: &Config, metadata: ReportMetadata, document: &Document) -> Result<FileExtraction, AppError> {
    let mut ranking = if config.process_ranking {
        Some(RankingExtractor::new().extract(document)?)
    } else {
        None
    };
    let mut tabs = if config.process_tabs {
        TabExtractor::new().extract_all(document)?
    } else {
        Vec::new()
    };

    if let Some(extracted) = ranking.as_mut() {
        metadata.stamp_date(&mut extracted.table);
    }
    for extracted in tabs.iter_mut() {
        metadata.stamp(&mut extracted.table);
    }

    Ok(FileExtraction { metadata, ranking, tabs })
}

/// Processes report files one at a time against an upload gateway.
pub struct Pipeline<'a, G: UploadGateway> {
    config: &'a Config,
    gateway: &'a mut G,
    storage: Option<StorageManager>,
}

impl<'a, G: UploadGateway> Pipeline<'a, G> {
    pub fn new(config: &'a Config, gateway: &'a mut G) -> Result<Self, AppError> {
        let storage = match &config.archive_dir {
            Some(dir) => Some(StorageManager::new(dir)?),
            None => None,
        };
        Ok(Self { config, gateway, storage })
    }

    pub fn run(&mut self, files: &[String]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for file_name in files {
            tracing::info!("Processing: {}...", file_name);
            let report = self.process_file(file_name);
            match &report.outcome {
                FileOutcome::Failed { state, error } => {
                    tracing::error!("{} failed while {}: {}", file_name, state, error)
                }
                FileOutcome::UploadFailed { failed } => {
                    tracing::warn!("{}: {} uploads failed, leaving file for re-run", file_name, failed)
                }
                outcome => tracing::info!("{}: {:?} ({} tables)", file_name, outcome, report.tables),
            }
            summary.reports.push(report);
        }
        summary
    }

    pub fn process_file(&mut self, file_name: &str) -> FileReport {
        let mut state = FileState::Parsing;
        let mut tables = 0;

        let outcome = match self.run_states(file_name, &mut state, &mut tables) {
            Ok(outcome) => {
                advance(file_name, &mut state, FileState::Done);
                outcome
            }
            Err(e) => {
                let failed_in = state;
                advance(file_name, &mut state, FileState::Failed);
                FileOutcome::Failed { state: failed_in, error: e.to_string() }
            }
        };

        FileReport { file_name: file_name.to_string(), tables, outcome }
    }

    fn run_states(&mut self, file_name: &str, state: &mut FileState, tables: &mut usize) -> Result<FileOutcome, AppError> {
        let bytes = fs::read(self.config.data_dir.join(file_name))?;
        let metadata = ReportMetadata::from_file_name(file_name)?;
        let document = Document::parse(&bytes)?;

        advance(file_name, state, FileState::Extracting);
        let extraction = extract_document(self.config, metadata, &document)?;
        *tables = extraction.table_count();

        advance(file_name, state, FileState::Uploading);
        let failed = self.upload_all(file_name, &extraction);
        if failed > 0 {
            return Ok(FileOutcome::UploadFailed { failed });
        }

        let Some(storage) = &self.storage else {
            return Ok(FileOutcome::Uploaded);
        };

        advance(file_name, state, FileState::Archiving);
        match storage.archive_html(&self.config.data_dir, file_name, &extraction.metadata.org_code)? {
            ArchiveOutcome::Moved(_) => Ok(FileOutcome::Archived),
            ArchiveOutcome::AlreadyArchived(_) => Ok(FileOutcome::AlreadyArchived),
        }
    }

    /// Attempts every upload, returning how many failed.
    fn upload_all(&mut self, file_name: &str, extraction: &FileExtraction) -> usize {
        let file_stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();
        let user = self.gateway.current_user();
        let mut failed = 0;

        for (extracted, table_name) in extraction.uploads() {
            let mut table = extracted.table.clone();
            table.set_column(TIMESTAMP_COLUMN, &timestamp);

            if let (true, Some(storage)) = (self.config.mirror_csv, &self.storage) {
                if let Err(e) = storage.mirror_csv(file_stem, &extraction.metadata.org_code, &extracted.dataset_id, &table) {
                    tracing::warn!("Failed to save CSV copy of {}: {}", extracted.dataset_id, e);
                }
            }

            if self.config.is_blocked(&extracted.dataset_id) {
                tracing::debug!("Skipping upload of blocklisted dataset {}", extracted.dataset_id);
                continue;
            }

            tracing::info!("\t{}", extracted.dataset_id);
            let destination = Destination::new(&self.config.database, &self.config.schema, &table_name);
            let description = table_description(&extracted.dataset_id, &user);

            if let Err(e) = self
                .gateway
                .ensure_destination(&destination, &ColumnInfo::from_table(&table), &description)
            {
                tracing::error!("Could not prepare {}: {}", destination.qualified(), e);
                failed += 1;
                continue;
            }

            if !self.gateway.upload(&destination, &table, self.config.replace) {
                failed += 1;
            }
        }

        failed
    }
}

fn advance(file_name: &str, state: &mut FileState, next: FileState) {
    tracing::debug!("{}: {} -> {}", file_name, state, next);
    *state = next;
}
