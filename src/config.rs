use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub coursetrack: CoursetrackConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Core application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CoursetrackConfig {
    /// Path to the SQLite database holding the library, progress and tree cache
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Tree cache tuning
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Cached trees older than this are rescanned from the filesystem
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_max_age_hours(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_max_age_hours() -> i64 {
    24
}

fn default_http_port() -> u16 {
    8633
}

fn default_allowed_origins() -> Vec<String> {
    // Default empty — the server binds to localhost and allows any origin then
    vec![]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in COURSETRACK_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("COURSETRACK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.cache.max_age_hours <= 0 {
            anyhow::bail!("cache.max_age_hours must be greater than 0");
        }

        if self.http_server.port == 0 {
            anyhow::bail!("http_server.port must be greater than 0");
        }

        // The database directory must exist (or be creatable) before first open
        if let Some(parent) = self.coursetrack.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.coursetrack.db_path
    }

    /// Get the cache staleness threshold in hours
    pub fn max_cache_age_hours(&self) -> i64 {
        self.cache.max_age_hours
    }
}
