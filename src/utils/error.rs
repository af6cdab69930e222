// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("HTML parsing error: {0}")]
    Parse(String),

    #[error("Malformed section: {0}")]
    MalformedSection(String),

    #[error("Section heading missing or empty: {0}")]
    HeadingFormat(String),

    #[error("Embedded payload not found or unreadable: {0}")]
    PayloadNotFound(String),

    #[error("Unsupported chart type '{chart_type}' in {section_id}")]
    UnsupportedChart { section_id: String, chart_type: String },

    #[error("Series shape mismatch: {0}")]
    SeriesShape(String),

    #[error("Hover field format error: {0}")]
    HoverFieldFormat(String),

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("The overall ranking table was not found under {0}")]
    RankingTableNotFound(String),

    #[error("Column count mismatch: {names} column names but {columns} data columns")]
    ColumnCountMismatch { names: usize, columns: usize },

    #[error("Invalid report date in file name: {0}")]
    DateFormat(String),

    #[error("File name does not follow YEAR_MONTH_ORGCODE_ORGNAME: {0}")]
    FileName(String),
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Row has {found} cells but table has {expected} columns")]
    RowArity { expected: usize, found: usize },

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Table {0} does not exist")]
    MissingTable(String),

    #[error("Columns of {table} are {expected:?}, upload has {found:?}")]
    ColumnMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
