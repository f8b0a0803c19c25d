//! Client-side configuration: API endpoint and limits, retry policy, mapping
//! and catalog locations, log level.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! [api]
//! series_limit = 50
//! years_limit = 20
//! workers = 5
//!
//! [retry]
//! max_retries = 5
//! backoff_factor = 1.2
//!
//! [mapping]
//! path = "code_mapping.csv"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    errors::Error,
    providers::bls_rest::{BLS_V2_URL, RetryPolicy, keys::DEFAULT_KEY_PREFIX},
};

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IngestorConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

/// Endpoint, per-request limits and concurrency.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Maximum series codes per request.
    #[serde(default = "default_series_limit")]
    pub series_limit: usize,
    /// Maximum years (inclusive span) per request.
    #[serde(default = "default_years_limit")]
    pub years_limit: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Environment prefix of registration-key variables.
    #[serde(default = "default_key_env_prefix")]
    pub key_env_prefix: String,
    /// Requests in flight for the parallel fetch.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            series_limit: default_series_limit(),
            years_limit: default_years_limit(),
            timeout_secs: default_timeout_secs(),
            key_env_prefix: default_key_env_prefix(),
            workers: default_workers(),
        }
    }
}

fn default_url() -> String {
    BLS_V2_URL.to_string()
}
fn default_series_limit() -> usize {
    50
}
fn default_years_limit() -> u32 {
    20
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_key_env_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}
fn default_workers() -> usize {
    5
}

/// Where to look for the alias mapping file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    /// Explicit mapping file; disables the fallback search when set.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Directories searched for the fallback file names.
    #[serde(default = "default_search_dirs")]
    pub search_dirs: Vec<PathBuf>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            path: None,
            search_dirs: default_search_dirs(),
        }
    }
}

fn default_search_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

/// Location of the CPI master list used for `CU:` filter tokens.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub master_list: Option<PathBuf>,
}

/// Default log level when `RUST_LOG` is unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl IngestorConfig {
    /// Rejects limits that would make chunking or the worker pool degenerate.
    pub fn validate(&self) -> Result<(), Error> {
        if self.api.series_limit == 0 {
            return Err(Error::Config("api.series_limit must be at least 1".into()));
        }
        if self.api.years_limit == 0 {
            return Err(Error::Config("api.years_limit must be at least 1".into()));
        }
        if self.api.workers == 0 {
            return Err(Error::Config("api.workers must be at least 1".into()));
        }
        if self.retry.backoff_factor.is_nan() || self.retry.backoff_factor < 0.0 {
            return Err(Error::Config("retry.backoff_factor must be >= 0".into()));
        }
        Ok(())
    }
}

/// Parse and validate a config from a TOML string.
pub fn load_config_str(toml_str: &str) -> Result<IngestorConfig, Error> {
    let cfg: IngestorConfig =
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("invalid config TOML: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Read a config file from disk; a missing path yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<IngestorConfig, Error> {
    match path {
        None => Ok(IngestorConfig::default()),
        Some(p) => {
            let text = std::fs::read_to_string(p)?;
            load_config_str(&text)
        }
    }
}
