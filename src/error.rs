//! Fatal, user-facing configuration errors
//! Everything row-level degrades to nulls instead of landing here

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("no output target supplied: pass --output <CSV path> and/or --db <connection URL>")]
    NoOutputTarget,

    #[error("no database connection target: pass --db or set the DATABASE_URL environment variable")]
    MissingDatabaseUrl,

    #[error("invalid table name {0:?}: use letters, digits and underscores, optionally schema-qualified")]
    InvalidTableName(String),

    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("unknown load mode {0:?}: expected replace, append or fail")]
    InvalidLoadMode(String),

    #[error("{path:?} is neither a readable spreadsheet nor a delimited text file")]
    UnreadableInput { path: PathBuf },
}
