// src/main.rs
use std::path::PathBuf;

use clap::Parser;
use cosd_extractor::config::{Config, DEFAULT_DATABASE, DEFAULT_EXTENSION, DEFAULT_SCHEMA, DEFAULT_UPLOAD_BLOCKLIST};
use cosd_extractor::pipeline::{self, Pipeline};
use cosd_extractor::utils::{self, AppError};
use cosd_extractor::warehouse::CsvWarehouse;

/// Command Line Interface for the COSD HTML report extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the unprocessed HTML reports
    #[arg(short, long, env = "COSD_DATA_DIR")]
    data_dir: PathBuf,

    /// Directory to move processed reports and CSV copies into (optional)
    #[arg(short, long, env = "COSD_ARCHIVE_DIR")]
    archive_dir: Option<PathBuf>,

    /// Root directory of the local warehouse
    #[arg(short, long, env = "COSD_WAREHOUSE_DIR", default_value = "./warehouse")]
    warehouse_dir: PathBuf,

    /// Destination database
    #[arg(long, env = "DESTINATION_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    /// Destination schema
    #[arg(long, env = "DESTINATION_SCHEMA", default_value = DEFAULT_SCHEMA)]
    schema: String,

    /// User recorded as the contact on created tables
    #[arg(long, env = "WAREHOUSE_USER", default_value = "unknown")]
    user: String,

    /// Only process files with this extension
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Skip the per-tab chart data
    #[arg(long)]
    skip_tabs: bool,

    /// Skip the overall ranking table
    #[arg(long)]
    skip_ranking: bool,

    /// Don't save CSV copies of the extracted tables in the archive
    #[arg(long)]
    no_csv: bool,

    /// Dataset id fragments that are never uploaded (repeatable)
    #[arg(long = "block", value_name = "FRAGMENT")]
    blocklist: Vec<String>,

    /// Replace destination table contents instead of appending
    #[arg(long)]
    replace: bool,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let upload_blocklist = if args.blocklist.is_empty() {
            DEFAULT_UPLOAD_BLOCKLIST.iter().map(|s| s.to_string()).collect()
        } else {
            args.blocklist
        };

        Config {
            data_dir: args.data_dir,
            archive_dir: args.archive_dir,
            database: args.database,
            schema: args.schema,
            file_extension: args.extension,
            process_tabs: !args.skip_tabs,
            process_ranking: !args.skip_ranking,
            mirror_csv: !args.no_csv,
            upload_blocklist,
            replace: args.replace,
        }
    }
}

fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(if args.verbose { "debug" } else { "info" });
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Resolve configuration
    let warehouse_dir = args.warehouse_dir.clone();
    let user = args.user.clone();
    let config = Config::from(args);
    config.validate()?;

    // 4. Find the reports to process
    let files = pipeline::list_source_files(&config)?;
    tracing::info!("Found {} report files in {}", files.len(), config.data_dir.display());

    // 5. Open the warehouse and process each file in turn
    let mut warehouse = CsvWarehouse::open(&warehouse_dir, &user)?;
    let summary = Pipeline::new(&config, &mut warehouse)?.run(&files);

    let (success_count, failure_count) = (summary.success_count(), summary.failure_count());
    tracing::info!("Processing finished. Success: {}, Failures: {}", success_count, failure_count);

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!("Failed to process any of {} report files", failure_count)));
    }

    Ok(())
}
