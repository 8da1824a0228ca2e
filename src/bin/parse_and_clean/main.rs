//! Parse/clean stage - reads the trade spreadsheet, extracts description fields,
//! cleans numbers and dates, derives financials, and writes CSV and/or the database

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use trade_etl::config::{LoadConfig, LoadMode, LoadOverrides};
use trade_etl::error::EtlError;
use trade_etl::ingestion::patterns::PatternLibrary;
use trade_etl::ingestion::write::LoadTable;
use trade_etl::ingestion::{clean, fetch, write, RawData};
use trade_etl::logging::init_tracing;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "parse-and-clean",
    version,
    about = "Parse goods descriptions and clean trade shipment records",
    after_help = "At least one output target is required: --output and/or --db."
)]
struct Cli {
    /// Input spreadsheet (first sheet is read) or delimited text file
    #[arg(long)]
    input: PathBuf,

    /// Processed CSV to write (overwritten if present)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also load the cleaned table into this PostgreSQL database
    #[arg(long)]
    db: Option<String>,

    /// Target table for --db
    #[arg(long)]
    table: Option<String>,

    /// What to do when the target table exists
    #[arg(long, value_enum)]
    mode: Option<LoadMode>,

    /// Rows per INSERT batch
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    // Validate output targets before any parsing work
    if cli.output.is_none() && cli.db.is_none() {
        return Err(EtlError::NoOutputTarget.into());
    }
    if let Some(ref output) = cli.output {
        write::check_output_path(output)?;
    }

    let load_config = match cli.db {
        Some(ref url) => Some(LoadConfig::from_env(LoadOverrides {
            database_url: Some(url.clone()),
            table: cli.table.clone(),
            mode: cli.mode,
            batch_size: cli.batch_size,
        })?),
        None => None,
    };

    let db = match load_config {
        Some(ref config) => Some(write::connect(&config.database_url).await?),
        None => None,
    };

    let result = run(&cli, db.as_ref().zip(load_config.as_ref())).await;

    if let Some(db) = db {
        db.close().await;
    }

    result
}

async fn run(cli: &Cli, sink: Option<(&sqlx::PgPool, &LoadConfig)>) -> Result<()> {
    info!("🚀 Starting parse/clean stage");

    info!("Step 1/3: Reading {:?}...", cli.input);
    let raw = fetch::read_table(&RawData::File(cli.input.clone()))?;
    info!("✓ Rows read: {}", raw.len());

    info!("Step 2/3: Parsing and cleaning...");
    let (cleaned, stats) = clean::clean_table(PatternLibrary::global(), &raw);
    info!("✓ Cleaned {} rows ({} passed parsing)", cleaned.len(), stats.parsing_pass);

    info!("Step 3/3: Writing outputs...");
    if let Some(ref output) = cli.output {
        let written = write::write_csv(&cleaned, output)?;
        info!("✓ Wrote {} rows to {:?}", written, output);
    }

    if let Some((db, config)) = sink {
        let load = LoadTable::from_cleaned(&cleaned);
        let stats = write::load_table(db, &load, config).await?;
        info!("✓ Loaded into {}: {}", config.table, stats);
    }

    info!("🎉 Done");

    Ok(())
}
