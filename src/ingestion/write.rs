//! Write functions - persist the cleaned table to CSV and/or PostgreSQL

use crate::config::{LoadConfig, LoadMode};
use crate::ingestion::fetch::read_table;
use crate::ingestion::types::{CleanedRecord, CleanedTable, RawData, WriteStats, DERIVED_COLUMNS};
use crate::ingestion::utils::{parse_day_first_date, quote_column, quote_ident};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::path::Path;
use tracing::{debug, info};

/// Postgres caps a single statement at 65535 bind parameters
const MAX_BIND_PARAMS: usize = 65_535;

/// Headers and text cells of the cleaned table, in output order
/// Original columns whose names collide with a derived column are dropped
pub fn to_text_rows(table: &CleanedTable) -> (Vec<String>, Vec<Vec<Option<String>>>) {
    let kept: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !DERIVED_COLUMNS.contains(&h.as_str()))
        .map(|(idx, _)| idx)
        .collect();

    let mut headers: Vec<String> = kept.iter().map(|&i| table.headers[i].clone()).collect();
    headers.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));

    let rows = table
        .records
        .iter()
        .map(|record| {
            let mut row: Vec<Option<String>> = kept
                .iter()
                .map(|&i| record.original.get(i).cloned().flatten())
                .collect();
            row.extend(derived_cells(record));
            row
        })
        .collect();

    (headers, rows)
}

/// Derived cells in the order of `DERIVED_COLUMNS`
fn derived_cells(record: &CleanedRecord) -> [Option<String>; 19] {
    let parsed = &record.parsed;
    let float = |v: Option<f64>| v.map(|f| f.to_string());

    [
        Some(record.raw_description.clone()),
        parsed.model_name.clone(),
        parsed.model_number.clone(),
        parsed.capacity_spec.clone(),
        parsed.material.clone(),
        parsed.embedded_quantity.map(|q| q.to_string()),
        float(parsed.original_unit_price_usd),
        Some(parsed.parsing_confidence.to_string()),
        record.unit_standard.clone(),
        float(record.unit_price_num),
        float(record.total_value_num),
        float(record.duty_paid_num),
        float(record.quantity_num),
        record.date.map(|d| d.format("%Y-%m-%d").to_string()),
        record.year.map(|y| y.to_string()),
        record.month.map(|m| m.to_string()),
        Some(record.grand_total.to_string()),
        float(record.landed_cost_per_unit),
        Some(record.parsing_pass.to_string()),
    ]
}

/// Fail before any processing when the output file cannot be created
pub fn check_output_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        return Err(anyhow::anyhow!("Output path {:?} is not a file path", path));
    }

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => Err(
            anyhow::anyhow!("Output directory {:?} does not exist", parent),
        ),
        _ => Ok(()),
    }
}

/// Write the cleaned table to a CSV file, overwriting it if present
pub fn write_csv(table: &CleanedTable, path: &Path) -> Result<usize> {
    info!("Writing {} rows to {:?}", table.len(), path);

    let (headers, rows) = to_text_rows(table);
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;

    writer.write_record(&headers)?;
    for row in &rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;

    info!("CSV write complete: {} rows", rows.len());

    Ok(rows.len())
}

/// SQL column types for the load table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Float,
    Integer,
    Boolean,
    Date,
}

impl ColumnType {
    /// Derived columns are typed; everything from the input stays text
    pub fn for_column(name: &str) -> Self {
        match name {
            "embedded_quantity" | "Year" | "Month" => ColumnType::Integer,
            "original_unit_price_usd"
            | "parsing_confidence"
            | "Unit Price (INR)_num"
            | "Total Value (INR)_num"
            | "Duty Paid (INR)_num"
            | "Quantity_num"
            | "Grand Total (INR)"
            | "Landed Cost per Unit (INR)" => ColumnType::Float,
            "parsing_pass" => ColumnType::Boolean,
            "Date" => ColumnType::Date,
            _ => ColumnType::Text,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Integer => "BIGINT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
        }
    }
}

/// Typed cell; values that do not fit the column type load as NULL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Float(Option<f64>),
    Integer(Option<i64>),
    Boolean(Option<bool>),
    Date(Option<NaiveDate>),
}

impl SqlValue {
    pub fn coerce(column_type: ColumnType, raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());

        match column_type {
            ColumnType::Text => SqlValue::Text(raw.map(str::to_string)),
            ColumnType::Float => {
                SqlValue::Float(raw.and_then(|s| s.parse::<f64>().ok()).filter(|f| f.is_finite()))
            }
            ColumnType::Integer => SqlValue::Integer(raw.and_then(parse_integer)),
            ColumnType::Boolean => SqlValue::Boolean(raw.and_then(parse_bool)),
            ColumnType::Date => SqlValue::Date(parse_day_first_date(raw)),
        }
    }
}

/// Accepts "24" as well as "24.0"
fn parse_integer(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Table ready for the database sink
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadTable {
    pub columns: Vec<(String, ColumnType)>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl LoadTable {
    pub fn from_text(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let columns: Vec<(String, ColumnType)> = headers
            .into_iter()
            .map(|h| {
                let ty = ColumnType::for_column(&h);
                (h, ty)
            })
            .collect();

        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, (_, ty))| {
                        SqlValue::coerce(*ty, row.get(i).and_then(|c| c.as_deref()))
                    })
                    .collect()
            })
            .collect();

        LoadTable { columns, rows }
    }

    pub fn from_cleaned(table: &CleanedTable) -> Self {
        let (headers, rows) = to_text_rows(table);
        Self::from_text(headers, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn create_statement(&self, table: &str, if_not_exists: bool) -> String {
        let columns = self
            .columns
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_column(name), ty.sql()))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "CREATE TABLE {}{} ({})",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            quote_ident(table),
            columns
        )
    }

    /// Rows per INSERT, capped by the bind parameter limit
    fn rows_per_batch(&self, batch_size: usize) -> usize {
        let width = self.columns.len().max(1);
        batch_size.min(MAX_BIND_PARAMS / width).max(1)
    }
}

/// Read a processed CSV back into a typed load table
pub fn read_processed_csv(path: &Path) -> Result<LoadTable> {
    let raw = read_table(&RawData::File(path.to_path_buf()))
        .with_context(|| format!("Failed to read processed CSV {:?}", path))?;
    Ok(LoadTable::from_text(raw.headers, raw.rows))
}

/// Connect and verify the server answers before any work starts
pub async fn connect(database_url: &str) -> Result<PgPool> {
    info!("Connecting to database at {}", redact_url(database_url));

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("Database pre-flight check failed")?;

    info!("Database connected");

    Ok(pool)
}

/// Load the table inside a single transaction
/// A failed batch rolls back everything, including the drop in replace mode
pub async fn load_table(db: &PgPool, table: &LoadTable, config: &LoadConfig) -> Result<WriteStats> {
    info!(
        "Loading {} rows into {} (mode: {})",
        table.len(),
        config.table,
        config.mode
    );

    let target = quote_ident(&config.table);
    let mut tx = db.begin().await.context("Failed to begin transaction")?;

    match config.mode {
        LoadMode::Replace => {
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", target))
                .execute(&mut *tx)
                .await
                .context("Failed to drop existing table")?;
            sqlx::query(&table.create_statement(&config.table, false))
                .execute(&mut *tx)
                .await
                .context("Failed to create table")?;
        }
        LoadMode::Append => {
            sqlx::query(&table.create_statement(&config.table, true))
                .execute(&mut *tx)
                .await
                .context("Failed to create table")?;
        }
        LoadMode::Fail => {
            sqlx::query(&table.create_statement(&config.table, false))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Table {} could not be created (does it already exist?)", config.table))?;
        }
    }

    let column_list = table
        .columns
        .iter()
        .map(|(name, _)| quote_column(name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stats = WriteStats::default();

    for chunk in table.rows.chunks(table.rows_per_batch(config.batch_size)) {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", target, column_list));

        query.push_values(chunk, |mut b, row| {
            for value in row {
                match value {
                    SqlValue::Text(v) => b.push_bind(v.clone()),
                    SqlValue::Float(v) => b.push_bind(*v),
                    SqlValue::Integer(v) => b.push_bind(*v),
                    SqlValue::Boolean(v) => b.push_bind(*v),
                    SqlValue::Date(v) => b.push_bind(*v),
                };
            }
        });

        let result = query
            .build()
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert batch {}", stats.batches + 1))?;

        stats.batches += 1;
        stats.inserted += result.rows_affected() as usize;
        debug!("Inserted batch {} ({} rows)", stats.batches, chunk.len());
    }

    tx.commit().await.context("Failed to commit transaction")?;

    info!("Load complete: {}", stats);

    Ok(stats)
}

/// Hide the password in a connection URL before it reaches the logs
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];

    let Some(at) = rest.find('@') else {
        return url.to_string();
    };
    let userinfo = &rest[..at];

    match userinfo.find(':') {
        Some(colon) => format!(
            "{}{}:***{}",
            &url[..scheme_end + 3],
            &userinfo[..colon],
            &rest[at..]
        ),
        None => url.to_string(),
    }
}
