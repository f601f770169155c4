//! Prometheus adapter for fetch loop counters.
//!
//! Counts outcomes, accepted records, backoffs and skips, then forwards every
//! event to an inner observer so logging keeps working alongside metrics.

use std::sync::Arc;

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use uuid::Uuid;

use crate::domain::FetchReport;
use crate::domain::ports::{
    BackoffNotice, FetchObserver, FetchState, MalformedNotice, NoopObserver, OutcomeKind,
    ProgressUpdate, SkipNotice,
};

/// Prometheus-backed fetch observer.
pub struct PrometheusFetchObserver {
    outcomes_total: IntCounterVec,
    records_accepted_total: IntCounter,
    backoffs_total: IntCounterVec,
    skips_total: IntCounterVec,
    inner: Arc<dyn FetchObserver>,
}

impl PrometheusFetchObserver {
    /// Create and register counters with the provided registry.
    ///
    /// # Errors
    ///
    /// Returns an error when Prometheus rejects metric registration.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        Self::wrapping(registry, Arc::new(NoopObserver))
    }

    /// Register counters and forward every event to `inner`.
    ///
    /// # Errors
    ///
    /// Returns an error when Prometheus rejects metric registration.
    pub fn wrapping(
        registry: &Registry,
        inner: Arc<dyn FetchObserver>,
    ) -> Result<Self, prometheus::Error> {
        let outcomes_total = IntCounterVec::new(
            Opts::new("harvest_outcomes_total", "Transport calls by outcome"),
            &["outcome"],
        )?;
        let records_accepted_total = IntCounter::with_opts(Opts::new(
            "harvest_records_accepted_total",
            "Records that passed every filter",
        ))?;
        let backoffs_total = IntCounterVec::new(
            Opts::new("harvest_backoffs_total", "Backoff sleeps by reason"),
            &["reason"],
        )?;
        let skips_total = IntCounterVec::new(
            Opts::new("harvest_skips_total", "Abandoned items by reason"),
            &["reason"],
        )?;
        registry.register(Box::new(outcomes_total.clone()))?;
        registry.register(Box::new(records_accepted_total.clone()))?;
        registry.register(Box::new(backoffs_total.clone()))?;
        registry.register(Box::new(skips_total.clone()))?;
        Ok(Self {
            outcomes_total,
            records_accepted_total,
            backoffs_total,
            skips_total,
            inner,
        })
    }
}

impl FetchObserver for PrometheusFetchObserver {
    fn on_state_change(&self, run_id: Uuid, state: FetchState) {
        self.inner.on_state_change(run_id, state);
    }

    fn on_outcome(&self, run_id: Uuid, kind: OutcomeKind) {
        self.outcomes_total.with_label_values(&[kind.as_str()]).inc();
        self.inner.on_outcome(run_id, kind);
    }

    fn on_record_accepted(&self, run_id: Uuid, accepted: u64) {
        self.records_accepted_total.inc();
        self.inner.on_record_accepted(run_id, accepted);
    }

    fn on_record_filtered(&self, run_id: Uuid) {
        self.inner.on_record_filtered(run_id);
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        self.inner.on_progress(update);
    }

    fn on_backoff(&self, notice: &BackoffNotice) {
        self.backoffs_total
            .with_label_values(&[notice.reason.as_str()])
            .inc();
        self.inner.on_backoff(notice);
    }

    fn on_skip(&self, notice: &SkipNotice) {
        self.skips_total
            .with_label_values(&[notice.reason.as_str()])
            .inc();
        self.inner.on_skip(notice);
    }

    fn on_malformed(&self, notice: &MalformedNotice) {
        self.inner.on_malformed(notice);
    }

    fn on_terminated(&self, report: &FetchReport) {
        self.inner.on_terminated(report);
    }
}
