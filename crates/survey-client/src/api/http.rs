//! HTTP client for the survey endpoint

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::traits::SurveyApi;
use crate::action::{build_get_url, build_post_body, select_transport, Params, Transport};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::outcome::CallOutcome;

/// Logged prefix of an outgoing POST body
const POST_LOG_CHARS: usize = 2000;

/// Logged prefix of a response body
const RESPONSE_LOG_CHARS: usize = 1000;

/// Reqwest-backed [`SurveyApi`].
///
/// Stateless between calls: no retries, no caching, no deduplication.
///
/// # Example
///
/// ```rust,no_run
/// use survey_client::{ClientConfig, RemoteClient, SurveyApi, CallOutcome};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RemoteClient::new(ClientConfig::with_endpoint("http://localhost:8080/exec"))?;
///
/// match client.list("Panchayat").await {
///     CallOutcome::Ok(value) => println!("{}", value),
///     CallOutcome::ParseFailure { status, text } => eprintln!("HTTP {}: {}", status, text),
///     CallOutcome::TransportFailure { message } => eprintln!("offline: {}", message),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RemoteClient {
    endpoint: Url,
    client: Client,
}

impl RemoteClient {
    /// Create a client for the configured endpoint
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint_url()?;

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::HttpClient(e.to_string()))?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, action: &str, params: &Params) -> CallOutcome {
        let body = build_post_body(action, params);
        debug!(
            action,
            body = %truncate_chars(&redacted(&body).to_string(), POST_LOG_CHARS),
            "POST"
        );

        let sent = self
            .client
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await;

        self.finish(action, sent).await
    }

    async fn get(&self, action: &str, params: &Params) -> CallOutcome {
        let url = build_get_url(&self.endpoint, action, params);
        debug!(action, url = %url, "GET");

        let sent = self.client.get(url).send().await;
        self.finish(action, sent).await
    }

    async fn finish(
        &self,
        action: &str,
        sent: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> CallOutcome {
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                debug!(action, error = %e, "request failed");
                return CallOutcome::TransportFailure {
                    message: describe(&e),
                };
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                debug!(action, status, error = %e, "response body unreadable");
                return CallOutcome::TransportFailure {
                    message: describe(&e),
                };
            }
        };

        debug!(
            action,
            status,
            raw = %truncate_chars(&text, RESPONSE_LOG_CHARS),
            "response"
        );

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => CallOutcome::Ok(value),
            Err(_) => CallOutcome::ParseFailure { status, text },
        }
    }
}

#[async_trait]
impl SurveyApi for RemoteClient {
    async fn call(&self, action: &str, params: Params) -> CallOutcome {
        match select_transport(action, &params) {
            Transport::Post => self.post(action, &params).await,
            Transport::Get => self.get(action, &params).await,
        }
    }
}

/// Human-readable message for a transport error, including its causes.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Copy of a request body safe to log.
fn redacted(body: &Value) -> Value {
    let mut body = body.clone();
    if let Some(object) = body.as_object_mut() {
        if object.contains_key("password") {
            object.insert("password".to_string(), Value::String("***".to_string()));
        }
    }
    body
}

/// First `max` characters of `text`, cut on a character boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = RemoteClient::new(ClientConfig::with_endpoint("http://localhost:9000/exec")).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:9000/exec");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = RemoteClient::new(ClientConfig::with_endpoint("::nope")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_password_redacted() {
        let body = json!({"action": "login", "username": "crp1", "password": "secret"});
        let logged = redacted(&body);
        assert_eq!(logged["password"], "***");
        assert_eq!(logged["username"], "crp1");
        assert_eq!(body["password"], "secret");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("पंचायत", 2), "पं");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
