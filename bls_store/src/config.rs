//! `bls-store` configuration.
//!
//! One TOML file holds both the client sections understood by
//! [`bls_ingestor::config::IngestorConfig`] and the store sections below:
//!
//! ```toml
//! [database]
//! url = "sqlite://bls_data.db"
//!
//! [cache]
//! enabled = true
//! max_age_hours = 24
//!
//! [api]
//! workers = 5
//! ```
//!
//! `DATABASE_URL`, when set, overrides `[database] url`.

use std::path::Path;

use anyhow::{Context, bail};
use bls_ingestor::config::IngestorConfig;
use serde::{Deserialize, Serialize};
use shared_utils::env::get_env_var;

use crate::cache::DEFAULT_MAX_AGE_HOURS;

/// Environment variable that overrides the configured database URL.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub ingestor: IngestorConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://bls_data.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Series extracted longer ago than this are re-fetched.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_age_hours() -> i64 {
    DEFAULT_MAX_AGE_HOURS
}

impl StoreConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.ingestor.validate()?;
        if self.cache.max_age_hours <= 0 {
            bail!("cache.max_age_hours must be positive, got {}", self.cache.max_age_hours);
        }
        if self.database.url.trim().is_empty() {
            bail!("database.url must not be empty");
        }
        Ok(())
    }
}

/// Parses and validates a TOML document. No environment overrides are applied.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<StoreConfig> {
    let cfg: StoreConfig = toml::from_str(toml_str).context("invalid config TOML")?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads `path` (defaults when `None`), then applies `DATABASE_URL`.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<StoreConfig> {
    let mut cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).with_context(|| format!("read config {}", p.display()))?;
            load_config_str(&text)?
        }
        None => StoreConfig::default(),
    };
    if let Ok(url) = get_env_var(DATABASE_URL_VAR) {
        if !url.trim().is_empty() {
            cfg.database.url = url;
        }
    }
    Ok(cfg)
}
