// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! User configuration.
//!
//! Configuration is stored in `<config_dir>/td/config.toml` and includes:
//! - `data_dir`: where the item cache and log file live
//! - `[remote]`: the backend to sync with (absent means local-only mode)
//! - `[retry]`: backoff parameters for deferred remote calls

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use td_core::BackoffPolicy;
use td_sync::HttpConfig;

use crate::error::{Error, Result};

const APP_DIR_NAME: &str = "td";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "items.db";
const LOG_FILE_NAME: &str = "td.log";

/// Configuration stored in `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the item cache and log file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Remote sync configuration (optional - if absent, runs in local-only mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Remote backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the list API, e.g. `https://example.com/todo`.
    pub url: String,
    /// Bearer token.
    pub token: String,
    /// Per-request timeout in seconds (default: 15).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Identifier sent as `last_updated_by` (default: "td").
    #[serde(default = "default_device_id")]
    pub device_id: String,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_device_id() -> String {
    APP_DIR_NAME.to_string()
}

impl RemoteConfig {
    /// Validates that the URL uses HTTP(S).
    ///
    /// Returns an error message if the URL is invalid.
    pub fn validate_url(&self) -> Option<String> {
        let url = &self.url;
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"));
        match rest {
            Some(host) if !host.is_empty() => None,
            Some(_) => Some(format!("remote URL '{}' has no host", url)),
            None => Some(format!(
                "invalid remote URL '{}': must start with http:// or https://",
                url
            )),
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            base_url: self.url.clone(),
            token: self.token.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            device_id: self.device_id.clone(),
        }
    }
}

/// Backoff parameters, in milliseconds where applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
    pub jitter: f64,
    /// Retries per operation before giving up. Unlimited when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        RetryConfig {
            min_delay_ms: duration_ms(policy.min_delay),
            max_delay_ms: duration_ms(policy.max_delay),
            factor: policy.factor,
            jitter: policy.jitter,
            max_attempts: policy.max_attempts,
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl RetryConfig {
    fn validate(&self) -> Option<String> {
        if self.min_delay_ms > self.max_delay_ms {
            return Some("retry.min_delay_ms must not exceed retry.max_delay_ms".to_string());
        }
        if self.factor.is_nan() || self.factor < 1.0 {
            return Some("retry.factor must be at least 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Some("retry.jitter must be between 0 and 1".to_string());
        }
        None
    }

    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            factor: self.factor,
            jitter: self.jitter,
            max_attempts: self.max_attempts,
        }
    }
}

impl Config {
    /// Default config file location: `<config_dir>/td/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads and validates the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(msg) = self.remote.as_ref().and_then(RemoteConfig::validate_url) {
            return Err(Error::Config(msg));
        }
        if let Some(msg) = self.retry.validate() {
            return Err(Error::Config(msg));
        }
        Ok(())
    }

    /// The configured data directory, or `<data_dir>/td`.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or_else(|| Error::Config("cannot determine data directory".to_string())),
        }
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(DB_FILE_NAME))
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(LOG_FILE_NAME))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
