//! Configuration types and loading
//!
//! Defaults first, then environment overrides.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Marketplace REST API connection
    pub api: ApiConfig,

    /// Upload batch limits
    pub uploads: UploadLimits,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the marketplace API; a path prefix is kept, a trailing `/` is trimmed
    pub base_url: String,
    /// Bearer token sent with upload and delete calls
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct UploadLimits {
    /// Longest file name accepted, in characters
    pub max_filename_length: usize,
    /// Default max count for single-slot collections (logos)
    pub single_slot_max: usize,
    /// Default max count for multi-slot collections
    pub multi_slot_max: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_filename_length: 100,
            single_slot_max: 1,
            multi_slot_max: 10,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                access_token: None,
                timeout_seconds: 30,
            },
            uploads: UploadLimits::default(),
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MARKETPLACE_API_URL") {
            let trimmed = url.trim_end_matches('/');
            if trimmed.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "MARKETPLACE_API_URL".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            config.api.base_url = trimmed.to_string();
        }
        if let Ok(token) = std::env::var("MARKETPLACE_ACCESS_TOKEN") {
            if !token.is_empty() {
                config.api.access_token = Some(token);
            }
        }
        if let Ok(timeout) = std::env::var("MARKETPLACE_API_TIMEOUT") {
            config.api.timeout_seconds = parse_number("MARKETPLACE_API_TIMEOUT", &timeout)?;
        }

        if let Ok(len) = std::env::var("MARKETPLACE_MAX_FILENAME_LENGTH") {
            config.uploads.max_filename_length =
                parse_number("MARKETPLACE_MAX_FILENAME_LENGTH", &len)?;
        }
        if let Ok(max) = std::env::var("MARKETPLACE_MAX_IMAGES") {
            config.uploads.multi_slot_max = parse_number("MARKETPLACE_MAX_IMAGES", &max)?;
        }

        Ok(config)
    }

    /// Access token, failing when one is required but missing
    pub fn require_access_token(&self) -> Result<&str, ConfigError> {
        self.api
            .access_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("MARKETPLACE_ACCESS_TOKEN".to_string()))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected a number, got {:?}", value),
    })
}
