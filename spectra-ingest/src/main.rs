//! spectra-ingest - batch spectral fingerprint ingest
//!
//! Fingerprints every file in the sounds directory that is not already in the
//! database, then records each new key in the key index.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use spectra_common::config::{LoggingConfig, Settings};
use spectra_common::{SqliteStore, Store};
use spectra_ingest::services::{FileScanner, IngestConfig, IngestPool};
use spectra_ingest::utils::SymphoniaDecoder;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for spectra-ingest
#[derive(Parser, Debug)]
#[command(name = "spectra-ingest")]
#[command(about = "Compute and store spectral fingerprints for a directory of sounds")]
struct Args {
    /// Directory of sound files (default: ./sounds)
    sounds_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings =
        Settings::resolve(args.sounds_dir.as_deref()).context("Failed to load configuration")?;

    init_logging(&settings.logging)?;

    info!("Starting spectra-ingest v{}", env!("CARGO_PKG_VERSION"));
    match &settings.config_file {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }
    info!("Sounds directory: {}", settings.sounds_dir.display());
    info!("Database: {}", settings.database_path.display());

    let store = SqliteStore::open(&settings.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", settings.database_path.display()))?;

    let items = FileScanner::new()
        .list(&settings.sounds_dir)
        .with_context(|| format!("Failed to list {}", settings.sounds_dir.display()))?;

    let store = Arc::new(store);
    let pool = IngestPool::new(
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::new(SymphoniaDecoder),
        IngestConfig::from(&settings),
    );

    let summary = pool.run(items).await.context("Ingest run failed")?;
    summary.log();

    store.close().await;
    Ok(())
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides the configured level. With a log file configured,
/// output goes to both stderr and the file.
fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level {:?}", config.level))?;

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sounds_dir_is_optional_positional() {
        let args = Args::try_parse_from(["spectra-ingest"]).unwrap();
        assert_eq!(args.sounds_dir, None);

        let args = Args::try_parse_from(["spectra-ingest", "/music/sounds"]).unwrap();
        assert_eq!(args.sounds_dir, Some(PathBuf::from("/music/sounds")));
    }

    #[test]
    fn test_no_flags_besides_help() {
        assert!(Args::try_parse_from(["spectra-ingest", "--version"]).is_err());
        assert!(Args::try_parse_from(["spectra-ingest", "a", "b"]).is_err());
    }
}
