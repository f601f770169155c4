//! Reqwest-backed record transport adapter.
//!
//! This adapter owns transport details only: one GET per call, an explicit
//! timeout, and classification of the status, `Retry-After` header, and body
//! into a [`FetchOutcome`]. It never sleeps or retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, StatusCode, Url};

use super::dto::ErrorBodyDto;
use crate::domain::ports::{FetchOutcome, RecordTransport};

const DEFAULT_USER_AGENT: &str = concat!("harvester/", env!("CARGO_PKG_VERSION"));

/// Outbound identity sent with every request.
pub struct HttpIdentity {
    /// HTTP user-agent header value.
    pub user_agent: String,
}

impl Default for HttpIdentity {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// Transport adapter issuing HTTPS GET requests through reqwest.
pub struct ReqwestRecordTransport {
    client: Client,
    user_agent: String,
}

impl ReqwestRecordTransport {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let transport = ReqwestRecordTransport::new(Duration::from_secs(30))?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_identity(timeout, HttpIdentity::default())
    }

    /// Build an adapter with an explicit outbound identity.
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_identity(
        timeout: Duration,
        identity: HttpIdentity,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            user_agent: identity.user_agent,
        })
    }
}

#[async_trait]
impl RecordTransport for ReqwestRecordTransport {
    async fn send(&self, url: &Url) -> FetchOutcome {
        let response = match self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return transport_failure(&error),
        };

        let status = response.status();
        let retry_after = response.headers().get(RETRY_AFTER).cloned();
        match response.bytes().await {
            Ok(body) => classify_response(status, retry_after.as_ref(), body.as_ref()),
            Err(error) => transport_failure(&error),
        }
    }
}

/// Classify one response. Pure, so every branch is testable without a socket.
pub(crate) fn classify_response(
    status: StatusCode,
    retry_after: Option<&HeaderValue>,
    body: &[u8],
) -> FetchOutcome {
    match status {
        StatusCode::OK => parse_record(body),
        StatusCode::TOO_MANY_REQUESTS => match parse_retry_after(retry_after) {
            Ok(retry_after_seconds) => FetchOutcome::RateLimited {
                retry_after_seconds,
            },
            Err(reason) => FetchOutcome::Malformed { reason },
        },
        StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => {
            FetchOutcome::ServerError {
                status: status.as_u16(),
            }
        }
        _ => FetchOutcome::ClientError {
            status: status.as_u16(),
            message: error_message(body),
        },
    }
}

fn parse_record(body: &[u8]) -> FetchOutcome {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(record)) => FetchOutcome::Success(record),
        Ok(other) => FetchOutcome::Malformed {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        },
        Err(error) => FetchOutcome::Malformed {
            reason: format!("invalid JSON payload: {error}"),
        },
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Result<u64, String> {
    let header = header.ok_or_else(|| "429 response without Retry-After header".to_owned())?;
    let raw = header
        .to_str()
        .map_err(|_| "Retry-After header is not visible ASCII".to_owned())?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| format!("Retry-After header `{raw}` is not a whole number of seconds"))
}

fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBodyDto>(body)
        .ok()
        .and_then(ErrorBodyDto::into_message)
        .or_else(|| Some(body_preview(body)).filter(|preview| !preview.is_empty()))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn transport_failure(error: &reqwest::Error) -> FetchOutcome {
    let reason = if error.is_timeout() {
        format!("request timed out: {error}")
    } else {
        format!("transport failed: {error}")
    };
    FetchOutcome::Malformed { reason }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
