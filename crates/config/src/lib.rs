#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for lobup
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/lobup/config.toml)
//! - Environment variables
//! - CLI flags (applied by the caller)

use lobup_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// Application registry endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// HTTP client tuning shared by registry and storage traffic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_secs: u64,
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// What to do when the storage URI cannot be renewed mid-upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenewalFailure {
    /// Log the failure and keep uploading with the previous URI
    #[default]
    Continue,
    /// Fail the upload
    Abort,
}

/// Chunked upload tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_large_file_threshold")]
    pub large_file_threshold: u64,
    #[serde(default = "default_large_file_chunk_size")]
    pub large_file_chunk_size: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    #[serde(default = "default_max_attempts")]
    pub max_chunk_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_jitter")]
    pub retry_jitter: f64,
    #[serde(default = "default_chunk_timeout_base")]
    pub chunk_timeout_base_secs: u64,
    #[serde(default = "default_final_chunk_timeout")]
    pub final_chunk_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub commit_attempts: u32,
    #[serde(default = "default_renewal_threshold")]
    pub renewal_threshold_secs: u64,
    #[serde(default)]
    pub renewal_failure: RenewalFailure,
}

/// Upload-state polling cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_negotiation_interval")]
    pub negotiation_interval_secs: u64,
    #[serde(default = "default_negotiation_unknown_interval")]
    pub negotiation_unknown_interval_secs: u64,
    #[serde(default = "default_processing_interval")]
    pub processing_interval_secs: u64,
    #[serde(default = "default_processing_unknown_interval")]
    pub processing_unknown_interval_secs: u64,
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub scratch_root: Option<PathBuf>,
}

// Default implementations

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            pool_idle_timeout_secs: default_pool_idle_timeout(),
            pool_max_idle_per_host: default_pool_max_idle(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            large_file_threshold: default_large_file_threshold(),
            large_file_chunk_size: default_large_file_chunk_size(),
            chunk_size: default_chunk_size(),
            max_chunk_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_jitter: default_retry_jitter(),
            chunk_timeout_base_secs: default_chunk_timeout_base(),
            final_chunk_timeout_secs: default_final_chunk_timeout(),
            commit_attempts: default_max_attempts(),
            renewal_threshold_secs: default_renewal_threshold(),
            renewal_failure: RenewalFailure::default(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            negotiation_interval_secs: default_negotiation_interval(),
            negotiation_unknown_interval_secs: default_negotiation_unknown_interval(),
            processing_interval_secs: default_processing_interval(),
            processing_unknown_interval_secs: default_processing_unknown_interval(),
            max_attempts: default_poll_attempts(),
        }
    }
}

// Default value functions for serde
fn default_base_url() -> String {
    "https://graph.microsoft.com/beta".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_pool_idle_timeout() -> u64 {
    90
}

fn default_pool_max_idle() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("lobup/{}", env!("CARGO_PKG_VERSION"))
}

fn default_large_file_threshold() -> u64 {
    5 * GIB
}

fn default_large_file_chunk_size() -> u64 {
    4 * MIB
}

fn default_chunk_size() -> u64 {
    6 * MIB
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_retry_jitter() -> f64 {
    1.0
}

fn default_chunk_timeout_base() -> u64 {
    300 // 5 minutes, plus one minute per attempt
}

fn default_final_chunk_timeout() -> u64 {
    900
}

fn default_renewal_threshold() -> u64 {
    420 // 7 minutes
}

fn default_negotiation_interval() -> u64 {
    10
}

fn default_negotiation_unknown_interval() -> u64 {
    15
}

fn default_processing_interval() -> u64 {
    5
}

fn default_processing_unknown_interval() -> u64 {
    10
}

fn default_poll_attempts() -> u32 {
    120
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("lobup").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // LOBUP_REGISTRY_URL
        if let Ok(url) = std::env::var("LOBUP_REGISTRY_URL") {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "LOBUP_REGISTRY_URL".to_string(),
                    value: url,
                }
                .into());
            }
            self.registry.base_url = url;
        }

        // LOBUP_CHUNK_SIZE
        if let Ok(size) = std::env::var("LOBUP_CHUNK_SIZE") {
            self.upload.chunk_size = size.parse().map_err(|_| ConfigError::InvalidValue {
                field: "LOBUP_CHUNK_SIZE".to_string(),
                value: size,
            })?;
        }

        // LOBUP_RENEWAL_FAILURE
        if let Ok(policy) = std::env::var("LOBUP_RENEWAL_FAILURE") {
            self.upload.renewal_failure = match policy.as_str() {
                "continue" => RenewalFailure::Continue,
                "abort" => RenewalFailure::Abort,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "LOBUP_RENEWAL_FAILURE".to_string(),
                        value: policy,
                    }
                    .into())
                }
            };
        }

        // LOBUP_SCRATCH_DIR
        if let Ok(dir) = std::env::var("LOBUP_SCRATCH_DIR") {
            self.paths.scratch_root = Some(PathBuf::from(dir));
        }

        self.validate()
    }

    /// Reject values that would make the pipeline misbehave
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for zero chunk sizes, zero attempt
    /// budgets, or a jitter factor outside `0.0..=1.0`.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |field: &str, value: String| -> Error {
            ConfigError::InvalidValue {
                field: field.to_string(),
                value,
            }
            .into()
        };

        if self.upload.chunk_size == 0 {
            return Err(invalid("upload.chunk_size", "0".into()));
        }
        if self.upload.large_file_chunk_size == 0 {
            return Err(invalid("upload.large_file_chunk_size", "0".into()));
        }
        if self.upload.max_chunk_attempts == 0 {
            return Err(invalid("upload.max_chunk_attempts", "0".into()));
        }
        if self.upload.commit_attempts == 0 {
            return Err(invalid("upload.commit_attempts", "0".into()));
        }
        if !(0.0..=1.0).contains(&self.upload.retry_jitter) {
            return Err(invalid(
                "upload.retry_jitter",
                self.upload.retry_jitter.to_string(),
            ));
        }
        if self.polling.max_attempts == 0 {
            return Err(invalid("polling.max_attempts", "0".into()));
        }
        Ok(())
    }

    /// Directory under which per-run scratch directories are created
    #[must_use]
    pub fn scratch_root(&self) -> PathBuf {
        self.paths
            .scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl RegistryConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl UploadConfig {
    /// Chunk size for a payload of `file_size` bytes
    #[must_use]
    pub fn chunk_size_for(&self, file_size: u64) -> u64 {
        if file_size > self.large_file_threshold {
            self.large_file_chunk_size
        } else {
            self.chunk_size
        }
    }
}
