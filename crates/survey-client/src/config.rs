//! Configuration for the survey client

use crate::error::{ClientError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Production endpoint (spreadsheet-backed script deployment)
pub const DEFAULT_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbwNwkG9baa5nU1HJKFhRZdM7toMbDmTOmT2j79WZEfhnT3PpPq6TKek1-rUctdvOqX1/exec";

/// Default session file location
pub fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("survey")
        .join("session.json")
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Remote endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds; unset leaves the transport default
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Concurrent per-panchayat village lookups (0 = unbounded)
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,

    /// Where the logged-in user record is kept
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_concurrent_lookups() -> usize {
    8
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: None,
            max_concurrent_lookups: default_max_concurrent_lookups(),
            session_file: default_session_file(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at a specific endpoint, other fields defaulted
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parsed endpoint URL
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint).map_err(|e| ClientError::InvalidEndpoint {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::InvalidEndpoint {
                url: self.endpoint.clone(),
                reason: format!("unsupported scheme {}", other),
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;
        if self.timeout_secs == Some(0) {
            return Err(ClientError::Config(
                "timeout_secs must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.timeout_secs.is_none());
        assert_eq!(config.max_concurrent_lookups, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ClientConfig = toml::from_str("endpoint = \"http://localhost:9000/exec\"").unwrap();
        assert_eq!(config.endpoint, "http://localhost:9000/exec");
        assert_eq!(config.max_concurrent_lookups, 8);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("survey.toml");

        let mut config = ClientConfig::with_endpoint("http://localhost:9000/exec");
        config.timeout_secs = Some(20);
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded.endpoint, "http://localhost:9000/exec");
        assert_eq!(loaded.timeout_secs, Some(20));
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(ClientConfig::with_endpoint("not a url").validate().is_err());
        assert!(ClientConfig::with_endpoint("ftp://host/exec").validate().is_err());
    }
}
