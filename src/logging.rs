use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Load `.env`, then initialize the fmt subscriber
/// `RUST_LOG` (from the environment or `.env`) overrides the default `info` level
pub fn init_tracing() {
    let filter = env_filter(|| {
        dotenvy::dotenv().ok();
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();
}

/// Build the filter after `load_env` has populated the environment
fn env_filter(load_env: impl FnOnce()) -> EnvFilter {
    load_env();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn test_dotenv_rust_log_reaches_filter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "RUST_LOG=debug\n").unwrap();

        env::remove_var("RUST_LOG");
        let filter = env_filter(|| {
            dotenvy::from_path(&path).unwrap();
        });
        env::remove_var("RUST_LOG");

        assert_eq!(filter.to_string(), "debug");
    }
}
