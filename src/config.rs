//! Configuration management for the rate limiter.

use serde::{Deserialize, Serialize};

use crate::error::{RateLimitError, Result};
use crate::ratelimit::Policy;

/// Prefix of environment variables overriding file configuration.
///
/// Nested fields are separated by `__`, e.g. `RATE_LIMIT__POLICY__WINDOW_SECONDS`.
pub const ENV_PREFIX: &str = "RATE_LIMIT";

/// Main configuration for a rate limiter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Rate limit policy
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis connection URL
    #[serde(default = "default_url")]
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

fn default_url() -> String {
    "redis://localhost:6379".to_string()
}

/// Rate limit policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Hits allowed per tracker within one window
    #[serde(default = "default_max_allowed_hits")]
    pub max_allowed_hits: u64,

    /// Window length in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_allowed_hits: default_max_allowed_hits(),
            window_seconds: default_window_seconds(),
        }
    }
}

fn default_max_allowed_hits() -> u64 {
    5
}

fn default_window_seconds() -> u64 {
    10
}

impl PolicyConfig {
    /// Validate this configuration into a [`Policy`].
    pub fn to_policy(&self) -> Result<Policy> {
        Policy::new(self.max_allowed_hits, self.window_seconds)
    }
}

impl LimiterConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RateLimitError::Config(format!("Failed to read {}: {}", path, e)))?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RateLimitError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Load configuration from an optional file, overridden by `RATE_LIMIT__*`
    /// environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }

        builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| RateLimitError::Config(format!("Failed to load configuration: {}", e)))
    }
}
