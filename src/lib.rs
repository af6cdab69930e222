// src/lib.rs
//! Extracts the chart series and overall ranking tables embedded in COSD
//! HTML reports and loads them into a warehouse.
pub mod config;
pub mod extractors;
pub mod pipeline;
pub mod storage;
pub mod table;
pub mod utils;
pub mod warehouse;

pub use config::Config;
pub use pipeline::{BatchSummary, FileOutcome, Pipeline};
pub use utils::AppError;
