//! Observation port for the fetch loop.
//!
//! The loop never logs directly. Every decision it takes is reported here so
//! adapters can turn it into logs or metrics, and tests can assert on it.

use std::time::Duration;

use uuid::Uuid;

use super::OutcomeKind;
use crate::domain::{ArgumentSet, EndpointId, FetchReport};

/// Fetch loop state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Issuing requests.
    Running,
    /// Backing off after a transient failure.
    Sleeping,
    /// Finished; no further requests are issued.
    Terminated,
}

impl FetchState {
    /// Stable snake-case label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Terminated => "terminated",
        }
    }
}

/// Periodic progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Run correlation identifier.
    pub run_id: Uuid,
    /// Records accepted so far.
    pub accepted: u64,
    /// Result cap for the run.
    pub target: u64,
}

impl ProgressUpdate {
    /// Completion percentage, `0.0` when the target is zero.
    ///
    /// # Examples
    /// ```
    /// use harvester::domain::ports::ProgressUpdate;
    /// use uuid::Uuid;
    ///
    /// let update = ProgressUpdate { run_id: Uuid::nil(), accepted: 25, target: 200 };
    /// assert_eq!(update.percent(), 12.5);
    /// ```
    pub fn percent(&self) -> f64 {
        if self.target == 0 {
            return 0.0;
        }
        #[expect(clippy::cast_precision_loss, reason = "percentages are advisory")]
        let ratio = self.accepted as f64 / self.target as f64;
        ratio * 100.0
    }
}

/// Why the loop is about to sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffReason {
    /// HTTP 429 with `Retry-After`.
    RateLimited,
    /// HTTP 500 or 503.
    ServerError,
    /// Malformed response under a retry policy.
    Malformed,
}

impl BackoffReason {
    /// Stable snake-case label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::Malformed => "malformed",
        }
    }
}

/// Emitted before every backoff sleep.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffNotice {
    /// Run correlation identifier.
    pub run_id: Uuid,
    /// Endpoint being fetched.
    pub endpoint: EndpointId,
    /// Arguments of the failed attempt.
    pub arguments: ArgumentSet,
    /// Failure that triggered the pause.
    pub reason: BackoffReason,
    /// Sleep length.
    pub delay: Duration,
    /// Whether the item will be retried after the pause.
    pub will_retry: bool,
    /// Consecutive failed attempts for this item, including this one.
    pub consecutive_failures: u32,
}

/// Why an item was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Non-retryable HTTP status such as 404.
    ClientError {
        /// Response status code.
        status: u16,
        /// Server-provided message, if any.
        message: Option<String>,
    },
    /// Malformed response that will not be retried.
    Malformed {
        /// Failure description.
        reason: String,
    },
    /// The configured ceiling on consecutive transient failures was exceeded.
    TransientRetriesExhausted {
        /// Consecutive failed attempts.
        attempts: u32,
    },
}

impl SkipReason {
    /// Stable snake-case label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClientError { .. } => "client_error",
            Self::Malformed { .. } => "malformed",
            Self::TransientRetriesExhausted { .. } => "transient_retries_exhausted",
        }
    }
}

/// Emitted when an item is permanently abandoned.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipNotice {
    /// Run correlation identifier.
    pub run_id: Uuid,
    /// Endpoint being fetched.
    pub endpoint: EndpointId,
    /// Arguments of the abandoned item.
    pub arguments: ArgumentSet,
    /// Why it was abandoned.
    pub reason: SkipReason,
}

/// What the loop does with a malformed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedDecision {
    /// Move on without retrying.
    Skip,
    /// Roll back and try the same item again.
    Retry {
        /// Retry number about to be attempted, starting at 1.
        attempt: u32,
        /// Configured retry budget.
        max_retries: u32,
    },
}

/// Emitted for every malformed response.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedNotice {
    /// Run correlation identifier.
    pub run_id: Uuid,
    /// Endpoint being fetched.
    pub endpoint: EndpointId,
    /// Arguments of the failed attempt.
    pub arguments: ArgumentSet,
    /// Failure description from the transport.
    pub reason: String,
    /// Decision taken by the loop.
    pub decision: MalformedDecision,
}

/// Receives fetch loop events. Every method defaults to a no-op.
pub trait FetchObserver: Send + Sync {
    /// The loop moved to `state`.
    fn on_state_change(&self, _run_id: Uuid, _state: FetchState) {}

    /// A transport call returned an outcome of `kind`.
    fn on_outcome(&self, _run_id: Uuid, _kind: OutcomeKind) {}

    /// A record passed every filter and reached the sinks.
    fn on_record_accepted(&self, _run_id: Uuid, _accepted: u64) {}

    /// A record failed at least one filter.
    fn on_record_filtered(&self, _run_id: Uuid) {}

    /// Periodic progress, every configured interval and once at the end.
    fn on_progress(&self, _update: &ProgressUpdate) {}

    /// The loop is about to sleep.
    fn on_backoff(&self, _notice: &BackoffNotice) {}

    /// An item was abandoned.
    fn on_skip(&self, _notice: &SkipNotice) {}

    /// A malformed response was received.
    fn on_malformed(&self, _notice: &MalformedNotice) {}

    /// The loop finished normally.
    fn on_terminated(&self, _report: &FetchReport) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {}
