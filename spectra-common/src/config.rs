//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (sounds directory only)
//! 2. Environment variables (`SPECTRA_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: compiled defaults are used. A TOML
//! file that exists but cannot be parsed is fatal.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "SPECTRA_CONFIG";
pub const ENV_SOUNDS_DIR: &str = "SPECTRA_SOUNDS_DIR";
pub const ENV_DATABASE: &str = "SPECTRA_DATABASE";
pub const ENV_WINDOW_SIZE: &str = "SPECTRA_WINDOW_SIZE";
pub const ENV_WORKERS: &str = "SPECTRA_WORKERS";
pub const ENV_INDEX_CAPACITY: &str = "SPECTRA_INDEX_CAPACITY";

/// Config file looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "spectra.toml";

/// How multi-channel audio is reduced to one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownmixMode {
    /// Arithmetic mean of all channels per frame
    #[default]
    Average,
    /// Keep only the first channel
    FirstChannel,
}

/// What the key indexer does when the stored key index cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptIndexPolicy {
    /// Start over from an empty index, discarding the unreadable record
    #[default]
    Reset,
    /// Leave the unreadable record untouched and report the key as unindexed
    Preserve,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Configuration as written in the TOML file
///
/// Every field is optional in the file; absent fields take compiled defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Directory whose files are fingerprinted
    pub sounds_dir: PathBuf,

    /// SQLite database file holding fingerprints and the key index
    pub database_path: PathBuf,

    /// Samples per analysis window
    pub window_size: usize,

    /// Worker count (defaults to available CPUs)
    pub workers: Option<usize>,

    /// Capacity of the channel feeding the key indexer
    pub index_channel_capacity: usize,

    pub downmix: DownmixMode,

    pub corrupt_index: CorruptIndexPolicy,

    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            sounds_dir: PathBuf::from("./sounds"),
            database_path: PathBuf::from("./database/spectra.db"),
            window_size: 1024,
            workers: None,
            index_channel_capacity: 100,
            downmix: DownmixMode::default(),
            corrupt_index: CorruptIndexPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Fully resolved settings for one ingest run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Config file the settings were read from, if any
    pub config_file: Option<PathBuf>,
    pub sounds_dir: PathBuf,
    pub database_path: PathBuf,
    pub window_size: usize,
    pub workers: usize,
    pub index_channel_capacity: usize,
    pub downmix: DownmixMode,
    pub corrupt_index: CorruptIndexPolicy,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Resolve settings from every source
    ///
    /// `cli_sounds_dir` wins over all other sources for the sounds directory.
    pub fn resolve(cli_sounds_dir: Option<&Path>) -> Result<Self> {
        let config_file = config_file_path();
        let toml_config = match &config_file {
            Some(path) => load_toml_config(path)?,
            None => TomlConfig::default(),
        };

        let mut settings = Self::from_toml(toml_config);
        settings.config_file = config_file;
        settings.apply_env()?;

        if let Some(dir) = cli_sounds_dir {
            settings.sounds_dir = dir.to_path_buf();
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Build settings from a parsed TOML config, filling runtime defaults
    pub fn from_toml(config: TomlConfig) -> Self {
        Self {
            config_file: None,
            sounds_dir: config.sounds_dir,
            database_path: config.database_path,
            window_size: config.window_size,
            workers: config.workers.unwrap_or_else(num_cpus::get),
            index_channel_capacity: config.index_channel_capacity,
            downmix: config.downmix,
            corrupt_index: config.corrupt_index,
            logging: config.logging,
        }
    }

    /// Override fields from `SPECTRA_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var(ENV_SOUNDS_DIR) {
            self.sounds_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var(ENV_DATABASE) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(size) = env_usize(ENV_WINDOW_SIZE)? {
            self.window_size = size;
        }
        if let Some(workers) = env_usize(ENV_WORKERS)? {
            self.workers = workers;
        }
        if let Some(capacity) = env_usize(ENV_INDEX_CAPACITY)? {
            self.index_channel_capacity = capacity;
        }
        Ok(())
    }

    /// Reject settings no run can proceed with
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(Error::Config("window_size must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.index_channel_capacity == 0 {
            return Err(Error::Config(
                "index_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse an optional unsigned integer environment variable
fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid {}={:?}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Locate the config file
///
/// `SPECTRA_CONFIG` first, then `./spectra.toml`, then the platform config
/// directory (`~/.config/spectra/config.toml` on Linux). Only existing files
/// are returned; a `SPECTRA_CONFIG` naming a missing file falls back to
/// compiled defaults.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG) {
        return Some(PathBuf::from(path)).filter(|path| path.exists());
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join("spectra").join("config.toml"))
        .filter(|path| path.exists())
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}
