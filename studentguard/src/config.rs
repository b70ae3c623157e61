//! Configuration for the remote pipeline client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::ConfigError;

/// Environment variable overriding the service base URL.
pub const ENV_API_URL: &str = "STUDENTGUARD_API_URL";

/// Environment variable setting the request timeout in seconds.
pub const ENV_TIMEOUT_SECONDS: &str = "STUDENTGUARD_TIMEOUT_SECONDS";

/// Configuration for talking to the pipeline service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API, including the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-request timeout in seconds. `None` waits indefinitely.
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    /// Connection timeout in seconds. `None` uses the transport default.
    #[serde(default)]
    pub connect_timeout_seconds: Option<f64>,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Maximum preview records kept in a summary.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Largest file accepted for upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_user_agent() -> String {
    concat!("studentguard/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_preview_rows() -> usize {
    10
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024 // 16MB
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
            connect_timeout_seconds: None,
            user_agent: default_user_agent(),
            headers: HashMap::new(),
            preview_rows: default_preview_rows(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration document and validates it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is malformed or invalid.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from defaults overridden by the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration using `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECONDS) {
            let seconds = raw.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_TIMEOUT_SECONDS,
                value: raw.clone(),
            })?;
            config.timeout_seconds = Some(seconds);
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, seconds: f64) -> Self {
        self.connect_timeout_seconds = Some(seconds);
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the preview cap.
    #[must_use]
    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Sets the upload size limit.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Gets the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs_f64)
    }

    /// Gets the connection timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_seconds.map(Duration::from_secs_f64)
    }

    /// Joins an endpoint path onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        let rest = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"));
        if rest.map_or(true, |host| host.is_empty() || host.starts_with('/')) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }

        for (name, value) in [
            ("timeout_seconds", self.timeout_seconds),
            ("connect_timeout_seconds", self.connect_timeout_seconds),
        ] {
            if let Some(seconds) = value {
                if !(seconds.is_finite() && seconds > 0.0) {
                    return Err(ConfigError::InvalidTimeout {
                        name,
                        value: seconds,
                    });
                }
            }
        }

        Ok(())
    }
}
