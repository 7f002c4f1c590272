//! Media upload payloads
//!
//! Images are base64-encoded on the client and sent in the `upload_media`
//! payload as `{filename, mimeType, dataBase64}` entries.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{FetchError, Result};
use crate::outcome::CallOutcome;

/// MIME type used when nothing better is known
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// One file in an upload payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub filename: String,
    pub mime_type: String,
    pub data_base64: String,
}

impl MediaFile {
    /// Encode raw bytes
    pub fn from_bytes(filename: impl Into<String>, mime_type: impl Into<String>, data: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    /// Read and encode a local file.
    ///
    /// The MIME type falls back to a guess from the extension.
    pub async fn from_path<P: AsRef<Path>>(path: P, mime_type: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(default_filename);
        let mime_type = mime_type
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime_type(path).to_string());

        Ok(Self::from_bytes(filename, mime_type, &data))
    }
}

/// `img_<unix-millis>.jpg`
pub fn default_filename() -> String {
    format!("img_{}.jpg", chrono::Utc::now().timestamp_millis())
}

/// MIME type from a file extension, [`DEFAULT_MIME_TYPE`] when unknown.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// Per-file upload result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `upload_media` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub results: Vec<UploadResult>,
}

impl UploadResponse {
    /// Interpret an `upload_media` outcome; a body without `results` fails.
    pub fn from_outcome(outcome: CallOutcome) -> std::result::Result<Self, FetchError> {
        let body = outcome.into_result()?;
        match body.get("results") {
            Some(Value::Array(_)) => serde_json::from_value(body)
                .map_err(|_| FetchError::UnexpectedShape { expected: "upload results" }),
            _ => Err(FetchError::UnexpectedShape { expected: "upload results" }),
        }
    }

    /// URL of the first file that uploaded successfully.
    pub fn first_url(&self) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.success)
            .and_then(|r| r.url.as_deref())
    }
}
