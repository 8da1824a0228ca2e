//! Configuration for the load stage
//! Resolution order: explicit CLI flag, then environment variable, then default

use crate::error::EtlError;
use anyhow::Result;
use clap::ValueEnum;
use std::env;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TABLE: &str = "trade_clean";
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// What to do when the target table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LoadMode {
    /// Drop and recreate the table
    #[default]
    Replace,
    /// Create the table if missing, then insert
    Append,
    /// Create the table; error if it already exists
    Fail,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Replace => write!(f, "replace"),
            LoadMode::Append => write!(f, "append"),
            LoadMode::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for LoadMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(LoadMode::Replace),
            "append" => Ok(LoadMode::Append),
            "fail" => Ok(LoadMode::Fail),
            other => Err(EtlError::InvalidLoadMode(other.to_string())),
        }
    }
}

/// Database sink settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    pub database_url: String,
    pub table: String,
    pub mode: LoadMode,
    pub batch_size: usize,
}

/// Overrides coming from the command line; `None` falls through to the environment
#[derive(Debug, Clone, Default)]
pub struct LoadOverrides {
    pub database_url: Option<String>,
    pub table: Option<String>,
    pub mode: Option<LoadMode>,
    pub batch_size: Option<usize>,
}

impl LoadConfig {
    pub fn from_env(overrides: LoadOverrides) -> Result<Self> {
        Self::resolve(overrides, |key| env::var(key).ok())
    }

    /// Resolve settings against an arbitrary variable lookup
    pub fn resolve<F>(overrides: LoadOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = overrides
            .database_url
            .or_else(|| lookup("DATABASE_URL"))
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or(EtlError::MissingDatabaseUrl)?;

        let table = overrides
            .table
            .or_else(|| lookup("TRADE_TABLE"))
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        validate_table_name(&table)?;

        let mode = match overrides.mode {
            Some(mode) => mode,
            None => match lookup("TRADE_LOAD_MODE") {
                Some(raw) => raw.parse::<LoadMode>()?,
                None => LoadMode::default(),
            },
        };

        let batch_size = match overrides.batch_size {
            Some(size) => size,
            None => lookup("TRADE_BATCH_SIZE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_BATCH_SIZE),
        };
        if batch_size == 0 {
            return Err(EtlError::InvalidBatchSize.into());
        }

        Ok(LoadConfig {
            database_url,
            table,
            mode,
            batch_size,
        })
    }
}

/// Table names are interpolated into DDL, so only plain identifiers pass
pub fn validate_table_name(name: &str) -> Result<(), EtlError> {
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    };

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() <= 2 && parts.iter().all(|p| valid_part(p)) {
        Ok(())
    } else {
        Err(EtlError::InvalidTableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_env_url() {
        let config = LoadConfig::resolve(
            LoadOverrides::default(),
            lookup(&[("DATABASE_URL", "postgres://localhost/trade")]),
        )
        .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/trade");
        assert_eq!(config.table, "trade_clean");
        assert_eq!(config.mode, LoadMode::Replace);
        assert_eq!(config.batch_size, 1000);
    }

    #[test]
    fn test_explicit_url_wins_over_env() {
        let overrides = LoadOverrides {
            database_url: Some("postgres://cli/db".to_string()),
            ..Default::default()
        };
        let config =
            LoadConfig::resolve(overrides, lookup(&[("DATABASE_URL", "postgres://env/db")]))
                .unwrap();

        assert_eq!(config.database_url, "postgres://cli/db");
    }

    #[test]
    fn test_missing_url_fails() {
        let err = LoadConfig::resolve(LoadOverrides::default(), lookup(&[])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::MissingDatabaseUrl)
        ));

        // Blank counts as missing
        let err = LoadConfig::resolve(LoadOverrides::default(), lookup(&[("DATABASE_URL", "  ")]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::MissingDatabaseUrl)
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = LoadConfig::resolve(
            LoadOverrides::default(),
            lookup(&[
                ("DATABASE_URL", "postgres://env/db"),
                ("TRADE_TABLE", "staging.trade"),
                ("TRADE_LOAD_MODE", "Append"),
                ("TRADE_BATCH_SIZE", "250"),
            ]),
        )
        .unwrap();

        assert_eq!(config.table, "staging.trade");
        assert_eq!(config.mode, LoadMode::Append);
        assert_eq!(config.batch_size, 250);
    }

    #[test]
    fn test_invalid_mode_and_batch_size() {
        let err = LoadConfig::resolve(
            LoadOverrides::default(),
            lookup(&[("DATABASE_URL", "x"), ("TRADE_LOAD_MODE", "upsert")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("upsert"));

        let overrides = LoadOverrides {
            batch_size: Some(0),
            ..Default::default()
        };
        assert!(LoadConfig::resolve(overrides, lookup(&[("DATABASE_URL", "x")])).is_err());
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("trade_clean").is_ok());
        assert!(validate_table_name("public.trade_clean").is_ok());
        assert!(validate_table_name("_t1").is_ok());

        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1trade").is_err());
        assert!(validate_table_name("trade; DROP TABLE x").is_err());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("trade-clean").is_err());
    }
}
