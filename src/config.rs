//! Configuration module for NewsHub.

use serde::Deserialize;
use std::path::Path;

use crate::{NewsHubError, Result};

/// Feed fetching configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// Maximum number of entries consumed from a single source per cycle.
    #[serde(default = "default_max_entries_per_source")]
    pub max_entries_per_source: usize,
    /// Number of sources fetched concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_max_entries_per_source() -> usize {
    20
}

fn default_concurrency() -> usize {
    8
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_entries_per_source: default_max_entries_per_source(),
            concurrency: default_concurrency(),
        }
    }
}

/// Aggregation cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Minimum interval between successive refreshes, in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Cap on the total number of cached items.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_refresh_interval() -> u64 {
    300
}

fn default_max_items() -> usize {
    500
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            max_items: default_max_items(),
        }
    }
}

/// Query view configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Maximum number of sources shown in per-source stats.
    #[serde(default = "default_stats_limit")]
    pub stats_limit: usize,
}

fn default_page_size() -> usize {
    10
}

fn default_stats_limit() -> usize {
    20
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            stats_limit: default_stats_limit(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file (selection store).
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Path to the saved-articles JSON file.
    #[serde(default = "default_saved_articles_path")]
    pub saved_articles_path: String,
}

fn default_database_path() -> String {
    "data/newshub.db".to_string()
}

fn default_saved_articles_path() -> String {
    "data/saved/articles.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            saved_articles_path: default_saved_articles_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/newshub.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Source selection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Sources used when the persisted selection is empty.
    #[serde(default = "default_selected")]
    pub default_selected: Vec<String>,
}

fn default_selected() -> Vec<String> {
    vec!["lenta".to_string(), "ria".to_string(), "bbc".to_string()]
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            default_selected: default_selected(),
        }
    }
}

/// Top-level configuration for NewsHub.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Feed fetching settings.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Aggregation cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Query view settings.
    #[serde(default)]
    pub view: ViewConfig,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Source selection settings.
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| NewsHubError::Config(e.to_string()))
    }
}
