//! Client configuration, resolved once at start-up.
//!
//! Every key is taken from the first source that sets it:
//! 1. Command-line flag
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use reqwest::Url;
use serde::Deserialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::aggregator::BatchSettings;
use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3030/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BATCH_SIZE: usize = 1;
pub const DEFAULT_BATCH_DELAY_MS: u64 = 200;

pub const ENV_API_URL: &str = "STUDIONAVI_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "STUDIONAVI_TIMEOUT_SECS";
pub const ENV_BATCH_SIZE: &str = "STUDIONAVI_BATCH_SIZE";
pub const ENV_BATCH_DELAY_MS: &str = "STUDIONAVI_BATCH_DELAY_MS";

/// Contents of `config.toml`. All keys optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub batch_size: Option<usize>,
    pub batch_delay_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the named file, or the platform default location if it exists.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                debug!("Using config file {}", path.display());
                Self::load(&path)
            }
            _ => Ok(FileConfig::default()),
        }
    }
}

/// `<config_dir>/studionavi/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("studionavi").join("config.toml"))
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub batch_size: Option<usize>,
    pub batch_delay_ms: Option<u64>,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Always absolute http(s) and ending in `/`.
    pub base_url: Url,
    pub timeout: Duration,
    pub batch: BatchSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: Url::parse(DEFAULT_BASE_URL).unwrap_or_else(|_| unreachable!("default URL is valid")),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            batch: BatchSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Resolve from the command line, the process environment and the config file.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let file = FileConfig::discover(overrides.config_path.as_deref())?;
        Self::resolve_with(overrides, |key| std::env::var(key).ok(), &file)
    }

    pub fn resolve_with(
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
        file: &FileConfig,
    ) -> Result<Self, ConfigError> {
        let base_url = overrides
            .api_url
            .clone()
            .or_else(|| env(ENV_API_URL).filter(|v| !v.trim().is_empty()))
            .or_else(|| file.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        let timeout_secs = pick(ENV_TIMEOUT_SECS, overrides.timeout_secs, env(ENV_TIMEOUT_SECS), file.timeout_secs)?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let batch_size = pick(ENV_BATCH_SIZE, overrides.batch_size, env(ENV_BATCH_SIZE), file.batch_size)?
            .unwrap_or(DEFAULT_BATCH_SIZE);
        let batch_delay_ms = pick(
            ENV_BATCH_DELAY_MS,
            overrides.batch_delay_ms,
            env(ENV_BATCH_DELAY_MS),
            file.batch_delay_ms,
        )?
        .unwrap_or(DEFAULT_BATCH_DELAY_MS);

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs",
                value: "0".to_string(),
            });
        }
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "batch_size",
                value: "0".to_string(),
            });
        }

        Ok(ClientConfig {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            batch: BatchSettings {
                batch_size,
                batch_delay: Duration::from_millis(batch_delay_ms),
            },
        })
    }
}

fn pick<T>(key: &'static str, cli: Option<T>, env: Option<String>, file: Option<T>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    if cli.is_some() {
        return Ok(cli);
    }
    if let Some(raw) = env.filter(|v| !v.trim().is_empty()) {
        return raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw });
    }
    Ok(file)
}

/// Validate a base URL and bring it into the form endpoint paths join onto.
///
/// `//host/api` becomes `https://host/api/`.
pub fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }
    let candidate = match trimmed.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => trimmed.to_string(),
    };

    let mut url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not contain a query or fragment"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
