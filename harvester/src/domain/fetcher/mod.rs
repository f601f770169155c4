//! Sequenced fetch loop.
//!
//! The [`Fetcher`] drives one [`Sequencer`] through a transport, applies the
//! filter chain, and forwards accepted records to every sink until the result
//! cap is met or the sequence is exhausted. Rate limits and server errors roll
//! the sequencer back and sleep before retrying the same item. Client errors
//! abandon the item. Malformed responses follow [`MalformedPolicy`].
//!
//! The loop is strictly sequential: at most one transport call or sleep is in
//! flight at any time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::ports::{
    BackoffNotice, BackoffReason, EndpointCatalog, EndpointCatalogError, FetchObserver,
    FetchOutcome, FetchState, MalformedDecision, MalformedNotice, ProgressUpdate, RecordFilter,
    RecordSink, RecordSinkError, RecordTransport, SkipNotice, SkipReason,
};
use crate::domain::{Record, SequenceStep, Sequencer, SequencerError};

mod runtime;

pub use runtime::{FetcherPorts, FetcherRuntime, TokioSleeper};

/// What to do with a malformed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Move on to the next item without retrying.
    #[default]
    Skip,
    /// Retry the same item up to `max_retries` consecutive times, then skip.
    Retry {
        /// Retry budget per item.
        max_retries: u32,
    },
}

/// Fetch loop configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Number of accepted records wanted.
    pub result_cap: u64,
    /// Emit a progress update every this many accepted records.
    pub update_interval: Option<u64>,
    /// Pause after a server error or a retried malformed response.
    pub server_error_backoff: Duration,
    /// Handling of malformed responses.
    pub malformed_policy: MalformedPolicy,
    /// Abandon an item after this many consecutive transient failures.
    /// `None` retries forever.
    pub max_transient_retries: Option<u32>,
}

impl FetcherConfig {
    /// Default server error pause.
    pub const DEFAULT_SERVER_ERROR_BACKOFF: Duration = Duration::from_millis(500);

    /// Configuration with default policies and the given result cap.
    pub fn new(result_cap: u64) -> Self {
        Self {
            result_cap,
            update_interval: None,
            server_error_backoff: Self::DEFAULT_SERVER_ERROR_BACKOFF,
            malformed_policy: MalformedPolicy::default(),
            max_transient_retries: None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `result_cap` records were accepted.
    ResultCapReached,
    /// The sequencer ran out of items or hit its request cap.
    SequenceExhausted,
}

impl Termination {
    /// Stable snake-case label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResultCapReached => "result_cap_reached",
            Self::SequenceExhausted => "sequence_exhausted",
        }
    }
}

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Correlation identifier shared with every observer event.
    pub run_id: Uuid,
    /// Loop start.
    pub started_at: DateTime<Utc>,
    /// Loop end.
    pub finished_at: DateTime<Utc>,
    /// Records that passed every filter.
    pub number_of_results: u64,
    /// Transport calls issued.
    pub amount_of_requests: u64,
    /// Sequencer `next` invocations.
    pub call_count: u64,
    /// Items abandoned without a record.
    pub skipped: u64,
    /// Records rejected by at least one filter.
    pub filtered_out: u64,
    /// Why the loop stopped.
    pub termination: Termination,
}

impl FetchReport {
    /// Wall-clock run duration.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Fatal errors that abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The endpoint or its arguments cannot be turned into a URL.
    #[error(transparent)]
    Endpoint(#[from] EndpointCatalogError),
    /// The sequencer was driven out of order.
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    /// A sink failed to store records.
    #[error(transparent)]
    Sink(#[from] RecordSinkError),
}

/// Async clock-independent sleeping abstraction for backoff.
#[async_trait]
pub trait FetchSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    ///
    /// ```rust,no_run
    /// use async_trait::async_trait;
    /// use harvester::domain::FetchSleeper;
    /// use std::sync::{Arc, Mutex};
    /// use std::time::Duration;
    /// #[derive(Default)]
    /// struct TotalSleeper {
    ///     total: Arc<Mutex<Duration>>,
    /// }
    /// #[async_trait]
    /// impl FetchSleeper for TotalSleeper {
    ///     async fn sleep(&self, duration: Duration) {
    ///         *self.total.lock().expect("total mutex") += duration;
    ///     }
    /// }
    /// # async fn demo() {
    /// let sleeper = TotalSleeper::default();
    /// sleeper.sleep(Duration::from_secs(2)).await;
    /// assert_eq!(*sleeper.total.lock().expect("total mutex"), Duration::from_secs(2));
    /// # }
    /// ```
    async fn sleep(&self, duration: Duration);
}

/// Counters accumulated during a run.
#[derive(Debug, Default)]
struct RunStats {
    number_of_results: u64,
    amount_of_requests: u64,
    skipped: u64,
    filtered_out: u64,
}

/// Consecutive failures for the item currently being retried.
#[derive(Debug, Default)]
struct ItemFailures {
    transient: u32,
    malformed: u32,
}

/// Sequenced fetch loop.
pub struct Fetcher {
    sequencer: Sequencer,
    transport: Arc<dyn RecordTransport>,
    catalog: Arc<dyn EndpointCatalog>,
    observer: Arc<dyn FetchObserver>,
    sleeper: Arc<dyn FetchSleeper>,
    clock: Arc<dyn Clock>,
    filters: Vec<Box<dyn RecordFilter>>,
    sinks: Vec<Box<dyn RecordSink>>,
    config: FetcherConfig,
}

impl Fetcher {
    /// Build a fetcher using the Tokio sleeper and the system clock.
    ///
    /// Fails when the catalog cannot build a URL for the first argument set.
    /// ```rust,ignore
    /// let fetcher = Fetcher::new(sequencer, ports, FetcherConfig::new(50))?;
    /// ```
    pub fn new(
        sequencer: Sequencer,
        ports: FetcherPorts,
        config: FetcherConfig,
    ) -> Result<Self, FetchError> {
        Self::with_runtime(sequencer, ports, FetcherRuntime::default(), config)
    }

    /// Build a fetcher with injected time sources.
    /// ```rust,ignore
    /// let fetcher = Fetcher::with_runtime(sequencer, ports, runtime, config)?;
    /// ```
    pub fn with_runtime(
        sequencer: Sequencer,
        ports: FetcherPorts,
        runtime: FetcherRuntime,
        config: FetcherConfig,
    ) -> Result<Self, FetchError> {
        ports
            .catalog
            .build_url(sequencer.endpoint(), &sequencer.current_arguments())?;

        Ok(Self {
            sequencer,
            transport: ports.transport,
            catalog: ports.catalog,
            observer: ports.observer,
            sleeper: runtime.sleeper,
            clock: runtime.clock,
            filters: Vec::new(),
            sinks: Vec::new(),
            config,
        })
    }

    /// Add a filter. A record is accepted only if every filter accepts it.
    pub fn register_filter(&mut self, filter: impl RecordFilter + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// Add a sink. Every accepted record is forwarded to every sink in
    /// acceptance order.
    pub fn register_sink(&mut self, sink: impl RecordSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Run the loop to completion.
    ///
    /// Sinks are closed once, whether the loop ended normally or on a fatal
    /// error.
    pub async fn run(mut self) -> Result<FetchReport, FetchError> {
        let run_id = Uuid::new_v4();
        let started_at = self.clock.utc();
        let mut stats = RunStats::default();

        self.observer.on_state_change(run_id, FetchState::Running);
        let driven = self.drive(run_id, &mut stats).await;
        let closed = self.close_sinks();
        self.observer.on_state_change(run_id, FetchState::Terminated);

        let termination = driven?;
        closed?;

        if self.config.update_interval.is_some() {
            self.report_progress(run_id, stats.number_of_results);
        }

        let report = FetchReport {
            run_id,
            started_at,
            finished_at: self.clock.utc(),
            number_of_results: stats.number_of_results,
            amount_of_requests: stats.amount_of_requests,
            call_count: self.sequencer.call_count(),
            skipped: stats.skipped,
            filtered_out: stats.filtered_out,
            termination,
        };
        self.observer.on_terminated(&report);
        Ok(report)
    }

    async fn drive(
        &mut self,
        run_id: Uuid,
        stats: &mut RunStats,
    ) -> Result<Termination, FetchError> {
        let mut failures = ItemFailures::default();

        while stats.number_of_results < self.config.result_cap {
            let Some(step) = self.sequencer.next() else {
                return Ok(Termination::SequenceExhausted);
            };
            let url = self.catalog.build_url(&step.endpoint, &step.arguments)?;
            let outcome = self.transport.send(&url).await;
            stats.amount_of_requests = stats.amount_of_requests.saturating_add(1);
            self.observer.on_outcome(run_id, outcome.kind());

            match outcome {
                FetchOutcome::Success(record) => {
                    failures = ItemFailures::default();
                    self.deliver(run_id, &record, stats)?;
                }
                FetchOutcome::RateLimited {
                    retry_after_seconds,
                } => {
                    let delay = Duration::from_secs(retry_after_seconds);
                    self.back_off_transient(
                        run_id,
                        &step,
                        BackoffReason::RateLimited,
                        delay,
                        &mut failures,
                        stats,
                    )
                    .await?;
                }
                FetchOutcome::ServerError { .. } => {
                    let delay = self.config.server_error_backoff;
                    self.back_off_transient(
                        run_id,
                        &step,
                        BackoffReason::ServerError,
                        delay,
                        &mut failures,
                        stats,
                    )
                    .await?;
                }
                FetchOutcome::ClientError { status, message } => {
                    failures = ItemFailures::default();
                    self.skip(run_id, step, SkipReason::ClientError { status, message }, stats);
                }
                FetchOutcome::Malformed { reason } => {
                    self.handle_malformed(run_id, step, reason, &mut failures, stats)
                        .await?;
                }
            }
        }

        Ok(Termination::ResultCapReached)
    }

    fn deliver(
        &mut self,
        run_id: Uuid,
        record: &Record,
        stats: &mut RunStats,
    ) -> Result<(), FetchError> {
        let accepted = self
            .filters
            .iter()
            .fold(true, |acc, filter| filter.accepts(record) & acc);
        if !accepted {
            stats.filtered_out = stats.filtered_out.saturating_add(1);
            self.observer.on_record_filtered(run_id);
            return Ok(());
        }

        for sink in &mut self.sinks {
            sink.accept(record)?;
        }
        stats.number_of_results = stats.number_of_results.saturating_add(1);
        self.observer.on_record_accepted(run_id, stats.number_of_results);

        let on_interval = self
            .config
            .update_interval
            .filter(|interval| *interval > 0)
            .is_some_and(|interval| stats.number_of_results % interval == 0);
        if on_interval {
            self.report_progress(run_id, stats.number_of_results);
        }
        Ok(())
    }

    async fn back_off_transient(
        &mut self,
        run_id: Uuid,
        step: &SequenceStep,
        reason: BackoffReason,
        delay: Duration,
        failures: &mut ItemFailures,
        stats: &mut RunStats,
    ) -> Result<(), FetchError> {
        failures.transient = failures.transient.saturating_add(1);
        let attempts = failures.transient;
        let will_retry = self
            .config
            .max_transient_retries
            .is_none_or(|max| attempts <= max);
        if will_retry {
            self.sequencer.rollback()?;
        }

        self.sleep(run_id, step, reason, delay, will_retry, attempts)
            .await;

        if !will_retry {
            *failures = ItemFailures::default();
            self.skip(
                run_id,
                step.clone(),
                SkipReason::TransientRetriesExhausted { attempts },
                stats,
            );
        }
        Ok(())
    }

    async fn handle_malformed(
        &mut self,
        run_id: Uuid,
        step: SequenceStep,
        reason: String,
        failures: &mut ItemFailures,
        stats: &mut RunStats,
    ) -> Result<(), FetchError> {
        let decision = match self.config.malformed_policy {
            MalformedPolicy::Retry { max_retries } if failures.malformed < max_retries => {
                failures.malformed = failures.malformed.saturating_add(1);
                MalformedDecision::Retry {
                    attempt: failures.malformed,
                    max_retries,
                }
            }
            MalformedPolicy::Skip | MalformedPolicy::Retry { .. } => MalformedDecision::Skip,
        };

        self.observer.on_malformed(&MalformedNotice {
            run_id,
            endpoint: step.endpoint.clone(),
            arguments: step.arguments.clone(),
            reason: reason.clone(),
            decision,
        });

        match decision {
            MalformedDecision::Retry { attempt, .. } => {
                self.sequencer.rollback()?;
                let delay = self.config.server_error_backoff;
                self.sleep(run_id, &step, BackoffReason::Malformed, delay, true, attempt)
                    .await;
            }
            MalformedDecision::Skip => {
                *failures = ItemFailures::default();
                self.skip(run_id, step, SkipReason::Malformed { reason }, stats);
            }
        }
        Ok(())
    }

    async fn sleep(
        &self,
        run_id: Uuid,
        step: &SequenceStep,
        reason: BackoffReason,
        delay: Duration,
        will_retry: bool,
        consecutive_failures: u32,
    ) {
        self.observer.on_backoff(&BackoffNotice {
            run_id,
            endpoint: step.endpoint.clone(),
            arguments: step.arguments.clone(),
            reason,
            delay,
            will_retry,
            consecutive_failures,
        });
        self.observer.on_state_change(run_id, FetchState::Sleeping);
        self.sleeper.sleep(delay).await;
        self.observer.on_state_change(run_id, FetchState::Running);
    }

    fn skip(&self, run_id: Uuid, step: SequenceStep, reason: SkipReason, stats: &mut RunStats) {
        stats.skipped = stats.skipped.saturating_add(1);
        self.observer.on_skip(&SkipNotice {
            run_id,
            endpoint: step.endpoint,
            arguments: step.arguments,
            reason,
        });
    }

    fn report_progress(&self, run_id: Uuid, accepted: u64) {
        self.observer.on_progress(&ProgressUpdate {
            run_id,
            accepted,
            target: self.config.result_cap,
        });
    }

    fn close_sinks(&mut self) -> Result<(), FetchError> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(err) = sink.close() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), |err| Err(err.into()))
    }
}
