use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the configuration injected into the pronoun store
/// and the catalog cache, including loading, validating and saving it.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Backing store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Relational backing store configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Path of the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Number of pooled connections
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            pool_size: default_pool_size(),
        }
    }
}

/// Remote pronoun catalog configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Operator switch for talking to the catalog service at all
    #[serde(default = "default_true")]
    pub sync_enabled: bool,

    /// Catalog service URL, used for both GET and POST
    #[serde(default = "default_catalog_endpoint")]
    pub endpoint: String,

    /// Local snapshot file
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    /// Request timeout in seconds
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,

    /// Client name reported on submission
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Client version reported on submission
    #[serde(default = "default_client_version")]
    pub client_version: String,

    /// Hosting platform reported on submission
    #[serde(default = "default_platform")]
    pub platform: String,
}

impl CatalogConfig {
    /// Identifies this client to the catalog service, e.g. `pronouns 0.1.0 (standalone)`
    pub fn source_tag(&self) -> String {
        format!("{} {} ({})", self.client_name, self.client_version, self.platform)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sync_enabled: default_true(),
            endpoint: default_catalog_endpoint(),
            cache_file: default_cache_file(),
            timeout_secs: default_catalog_timeout_secs(),
            client_name: default_client_name(),
            client_version: default_client_version(),
            platform: default_platform(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map to the `log` crate's filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    PathBuf::from("pronouns.db")
}

fn default_pool_size() -> usize {
    4
}

fn default_catalog_endpoint() -> String {
    "https://pn.lucypoulton.net/api/".to_string()
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("cloud.json")
}

fn default_catalog_timeout_secs() -> u64 {
    3
}

fn default_client_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_platform() -> String {
    "standalone".to_string()
}

impl Config {
    /// Load the configuration from a JSON file, writing the defaults there if it is absent
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!("Config file not found at {:?}, creating default config.", path);
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {:?}", path))?;

        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_path.as_os_str().is_empty() {
            return Err(anyhow!("Storage database path must not be empty"));
        }

        if self.storage.pool_size == 0 {
            return Err(anyhow!("Storage pool size must be at least 1"));
        }

        url::Url::parse(&self.catalog.endpoint)
            .with_context(|| format!("Invalid catalog endpoint: {}", self.catalog.endpoint))?;

        if self.catalog.timeout_secs == 0 {
            return Err(anyhow!("Catalog timeout must be at least 1 second"));
        }

        if self.catalog.cache_file.as_os_str().is_empty() {
            return Err(anyhow!("Catalog cache file path must not be empty"));
        }

        Ok(())
    }
}
