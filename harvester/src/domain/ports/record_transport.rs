//! Driven port for issuing one GET and classifying the response.
//!
//! Adapters report facts only: no sleeping, counting, or retrying happens
//! behind this port. Each call is independent of the previous one.

use async_trait::async_trait;
use url::Url;

use crate::domain::Record;

/// Classified result of one transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// HTTP 200 with a JSON object body.
    Success(Record),
    /// HTTP 429; the server asked for a pause of this many whole seconds.
    RateLimited {
        /// Value of the `Retry-After` header.
        retry_after_seconds: u64,
    },
    /// HTTP 500 or 503.
    ServerError {
        /// Response status code.
        status: u16,
    },
    /// Any other non-200 status; the item is abandoned.
    ClientError {
        /// Response status code.
        status: u16,
        /// Descriptive message from the server body, when one was served.
        message: Option<String>,
    },
    /// Transport, header, or body parse failure.
    Malformed {
        /// Human-readable failure description.
        reason: String,
    },
}

impl FetchOutcome {
    /// Label for this outcome without its payload.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::RateLimited { .. } => OutcomeKind::RateLimited,
            Self::ServerError { .. } => OutcomeKind::ServerError,
            Self::ClientError { .. } => OutcomeKind::ClientError,
            Self::Malformed { .. } => OutcomeKind::Malformed,
        }
    }
}

/// Payload-free label for a [`FetchOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// See [`FetchOutcome::Success`].
    Success,
    /// See [`FetchOutcome::RateLimited`].
    RateLimited,
    /// See [`FetchOutcome::ServerError`].
    ServerError,
    /// See [`FetchOutcome::ClientError`].
    ClientError,
    /// See [`FetchOutcome::Malformed`].
    Malformed,
}

impl OutcomeKind {
    /// Stable snake-case label used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::ClientError => "client_error",
            Self::Malformed => "malformed",
        }
    }
}

/// Port for fetching one record from a fully-formed URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordTransport: Send + Sync {
    /// Issue one GET and classify the response.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use harvester::domain::ports::{FetchOutcome, RecordTransport};
    ///
    /// let outcome = transport.send(&url).await;
    /// if let FetchOutcome::RateLimited { retry_after_seconds } = outcome {
    ///     println!("pause for {retry_after_seconds}s");
    /// }
    /// ```
    async fn send(&self, url: &Url) -> FetchOutcome;
}
