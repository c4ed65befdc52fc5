//! Configuration management
//!
//! Settings are resolved from (lowest to highest precedence):
//! `.env` file, process environment, optional TOML file, CLI overrides.
//! Everything is validated before a run starts; any problem is a
//! `ConfigError` and aborts the run.
//!
//! Created: 2026-10-18

use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default Etherscan-compatible endpoint
pub const DEFAULT_API_URL: &str = "https://api.etherscan.io/api";
/// Token traced at depth 0 when none is configured
pub const DEFAULT_TRACKED_SYMBOL: &str = "MCO2";
pub const DEFAULT_OUTPUT_PATH: &str = "data/result.csv";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Fully resolved tracer configuration
#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub api_key: String,
    pub api_url: String,
    /// Depth bound: events are captured only at layers `< max_depth`
    pub max_depth: u32,
    /// Per-address, per-call acceptance cap
    pub tx_count_threshold: usize,
    pub tracked_token_symbol: String,
    /// Lowercased seed addresses
    pub seed_addresses: Vec<String>,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub output_path: PathBuf,
}

/// Optional TOML overlay. Every key is optional; present keys override env.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlTraceConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub max_depth: Option<u32>,
    pub tx_count_threshold: Option<usize>,
    pub tracked_token_symbol: Option<String>,
    pub seed_addresses: Option<Vec<String>>,
    pub request_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub backoff_ms: Option<u64>,
    pub output_path: Option<String>,
}

impl TomlTraceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Flatten into env-style key/value pairs
    fn into_vars(self) -> Vec<(&'static str, String)> {
        let mut vars = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(v) = value {
                vars.push((key, v));
            }
        };
        push("ETHERSCAN_API_KEY", self.api_key);
        push("EXPLORER_API_URL", self.api_url);
        push("MAX_DEPTH", self.max_depth.map(|v| v.to_string()));
        push("TX_COUNT_THRESHOLD", self.tx_count_threshold.map(|v| v.to_string()));
        push("TRACKED_TOKEN_SYMBOL", self.tracked_token_symbol);
        push("SEED_ADDRESSES", self.seed_addresses.map(|s| s.join(",")));
        push("REQUEST_TIMEOUT_SECS", self.request_timeout_secs.map(|v| v.to_string()));
        push("FETCH_MAX_RETRIES", self.max_retries.map(|v| v.to_string()));
        push("FETCH_BACKOFF_MS", self.backoff_ms.map(|v| v.to_string()));
        push("OUTPUT_PATH", self.output_path);
        vars
    }
}

/// Key/value view over configuration sources
#[derive(Debug, Clone, Default)]
pub struct ConfigVars {
    vars: HashMap<String, String>,
}

impl ConfigVars {
    /// Snapshot of the process environment (non-UTF-8 entries are ignored)
    pub fn from_env() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(key.to_string(), value.into());
    }

    pub fn overlay_toml(&mut self, toml: TomlTraceConfig) {
        for (key, value) in toml.into_vars() {
            self.set(key, value);
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parse_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => parse_value(key, raw),
            None => Ok(default),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: format!("{:?}: {}", raw, e),
    })
}

fn positive<T: FromStr + Default + PartialOrd>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    let value: T = parse_value(key, raw)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be a positive integer".to_string(),
        });
    }
    Ok(value)
}

/// Split, validate and normalize a comma-separated seed list
pub fn parse_seed_addresses(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut seeds: Vec<String> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        Address::from_str(part).map_err(|e| ConfigError::Invalid {
            key: "SEED_ADDRESSES",
            reason: format!("{:?} is not an address: {}", part, e),
        })?;
        let normalized = part.to_lowercase();
        if !seeds.contains(&normalized) {
            seeds.push(normalized);
        }
    }
    if seeds.is_empty() {
        return Err(ConfigError::Invalid {
            key: "SEED_ADDRESSES",
            reason: "at least one seed address is required".to_string(),
        });
    }
    Ok(seeds)
}

impl TraceConfig {
    /// Build and validate a configuration from resolved key/value pairs
    pub fn from_vars(vars: &ConfigVars) -> Result<Self, ConfigError> {
        let api_key = vars.require("ETHERSCAN_API_KEY")?.to_string();
        let max_depth = positive("MAX_DEPTH", vars.require("MAX_DEPTH")?)?;
        let tx_count_threshold = positive("TX_COUNT_THRESHOLD", vars.require("TX_COUNT_THRESHOLD")?)?;
        let seed_addresses = parse_seed_addresses(vars.require("SEED_ADDRESSES")?)?;

        let api_url = vars.get("EXPLORER_API_URL").unwrap_or(DEFAULT_API_URL).to_string();
        reqwest::Url::parse(&api_url).map_err(|e| ConfigError::Invalid {
            key: "EXPLORER_API_URL",
            reason: e.to_string(),
        })?;

        Ok(Self {
            api_key,
            api_url,
            max_depth,
            tx_count_threshold,
            tracked_token_symbol: vars
                .get("TRACKED_TOKEN_SYMBOL")
                .unwrap_or(DEFAULT_TRACKED_SYMBOL)
                .to_string(),
            seed_addresses,
            request_timeout: Duration::from_secs(vars.parse_or("REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
            max_retries: vars.parse_or("FETCH_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            initial_backoff: Duration::from_millis(vars.parse_or("FETCH_BACKOFF_MS", DEFAULT_BACKOFF_MS)?),
            output_path: PathBuf::from(vars.get("OUTPUT_PATH").unwrap_or(DEFAULT_OUTPUT_PATH)),
        })
    }
}
