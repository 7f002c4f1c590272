//! Error types for the survey client

use thiserror::Error;

/// Local client failures (configuration, session file, media files).
///
/// Network and parse failures of a remote call are never reported here; they
/// are values of [`CallOutcome`](crate::CallOutcome).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Endpoint URL could not be parsed
    #[error("Invalid endpoint URL {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for ClientError {
    fn from(e: toml::de::Error) -> Self {
        ClientError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(e: toml::ser::Error) -> Self {
        ClientError::Config(e.to_string())
    }
}

/// Strict view of a call that did not yield the expected shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Server was reachable but the body was not valid JSON
    #[error("Unparsable response (HTTP {status}): {text}")]
    Parse { status: u16, text: String },

    /// No response reached the client
    #[error("Network error: {message}")]
    Transport { message: String },

    /// Server answered `{success: false, message}`
    #[error("{message}")]
    Application { message: String },

    /// Valid JSON of the wrong shape (e.g. an object where a list was expected)
    #[error("Unexpected response shape: expected {expected}")]
    UnexpectedShape { expected: &'static str },
}

/// Login failures
#[derive(Debug, Error)]
pub enum LoginError {
    /// Username or password missing
    #[error("Please enter username and password")]
    MissingCredentials,

    /// Server refused the credentials
    #[error("Login failed: {0}")]
    Rejected(String),

    /// Call did not complete
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Session could not be persisted
    #[error("Session error: {0}")]
    Session(#[from] ClientError),
}

/// Enterprise record failures
#[derive(Debug, Error)]
pub enum EnterpriseError {
    /// Draft failed validation
    #[error("Enterprise name required")]
    MissingName,

    /// Server answered but did not confirm the write
    #[error("Save failed: {0}")]
    Rejected(String),

    /// Call did not complete
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Result type for local client operations
pub type Result<T> = std::result::Result<T, ClientError>;
