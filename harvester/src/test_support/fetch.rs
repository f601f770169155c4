//! Shared test doubles for fetch loop tests.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use url::Url;
use uuid::Uuid;

use crate::domain::ports::{
    BackoffNotice, EndpointCatalog, EndpointCatalogError, FetchObserver, FetchOutcome,
    FetchState, MalformedNotice, OutcomeKind, ProgressUpdate, RecordSink, RecordSinkError,
    RecordTransport, SkipNotice,
};
use crate::domain::{ArgumentSet, EndpointId, FetchReport, FetchSleeper, Record};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{name} mutex"),
    }
}

/// Build a [`Record`] from a JSON object literal.
pub fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *lock(&self.0, "clock") += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0, "clock")
    }
}

/// Sleeper that returns at once, for runs against real servers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSleeper;

#[async_trait]
impl FetchSleeper for ImmediateSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Records every requested pause and, when given a clock, advances it.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
    clock: Option<Arc<MutableClock>>,
}

impl RecordingSleeper {
    pub fn with_clock(clock: Arc<MutableClock>) -> Self {
        Self {
            sleeps: Mutex::default(),
            clock: Some(clock),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps, "sleeper").clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps().into_iter().sum()
    }
}

#[async_trait]
impl FetchSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps, "sleeper").push(duration);
        if let Some(clock) = &self.clock {
            clock.advance(duration);
        }
    }
}

/// Transport that replays a fixed list of outcomes and records each URL.
///
/// Once the script runs dry every call answers 404.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<FetchOutcome>>,
    requests: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: impl IntoIterator<Item = FetchOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<Url> {
        lock(&self.requests, "requests").clone()
    }

    /// Value of query parameter `name` for every request, in order.
    pub fn query_values(&self, name: &str) -> Vec<Option<String>> {
        self.requests()
            .iter()
            .map(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
            })
            .collect()
    }
}

#[async_trait]
impl RecordTransport for ScriptedTransport {
    async fn send(&self, url: &Url) -> FetchOutcome {
        lock(&self.requests, "requests").push(url.clone());
        lock(&self.script, "script")
            .pop_front()
            .unwrap_or(FetchOutcome::ClientError {
                status: 404,
                message: Some("script exhausted".to_owned()),
            })
    }
}

/// Catalog producing `https://records.test/<endpoint>?<arguments>`.
#[derive(Debug, Clone, Default)]
pub struct EchoCatalog {
    unknown: BTreeSet<String>,
    required: Vec<String>,
}

impl EchoCatalog {
    /// Treat `endpoint` as unregistered.
    #[must_use]
    pub fn rejecting(mut self, endpoint: &str) -> Self {
        self.unknown.insert(endpoint.to_owned());
        self
    }

    /// Require `parameter` on every endpoint.
    #[must_use]
    pub fn requiring(mut self, parameter: &str) -> Self {
        self.required.push(parameter.to_owned());
        self
    }
}

impl EndpointCatalog for EchoCatalog {
    fn build_url(
        &self,
        endpoint: &EndpointId,
        arguments: &ArgumentSet,
    ) -> Result<Url, EndpointCatalogError> {
        if self.unknown.contains(endpoint.as_str()) {
            return Err(EndpointCatalogError::unknown_endpoint(endpoint.as_str()));
        }
        if let Some(missing) = self.required.iter().find(|name| !arguments.contains(name)) {
            return Err(EndpointCatalogError::missing_argument(
                endpoint.as_str(),
                missing.as_str(),
            ));
        }
        let raw = format!("https://records.test/{endpoint}");
        let mut url = Url::parse(&raw)
            .map_err(|err| EndpointCatalogError::invalid_url(raw.as_str(), err.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in arguments.iter() {
                query.append_pair(name, &value.to_string());
            }
        }
        Ok(url)
    }
}

#[derive(Debug, Default)]
pub struct MemorySinkState {
    pub records: Vec<Record>,
    pub flushes: usize,
    pub closes: usize,
}

/// In-memory sink; inspect it through the returned handle.
#[derive(Debug)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
    fail_on_accept: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MemorySinkHandle(Arc<Mutex<MemorySinkState>>);

impl MemorySinkHandle {
    pub fn records(&self) -> Vec<Record> {
        lock(&self.0, "sink").records.clone()
    }

    pub fn flushes(&self) -> usize {
        lock(&self.0, "sink").flushes
    }

    pub fn closes(&self) -> usize {
        lock(&self.0, "sink").closes
    }
}

impl MemorySink {
    pub fn new() -> (Self, MemorySinkHandle) {
        let state = Arc::new(Mutex::new(MemorySinkState::default()));
        (
            Self {
                state: Arc::clone(&state),
                fail_on_accept: None,
            },
            MemorySinkHandle(state),
        )
    }

    /// Sink whose `accept` always fails with `message`.
    pub fn failing(message: &str) -> (Self, MemorySinkHandle) {
        let (mut sink, handle) = Self::new();
        sink.fail_on_accept = Some(message.to_owned());
        (sink, handle)
    }
}

impl RecordSink for MemorySink {
    fn accept(&mut self, record: &Record) -> Result<(), RecordSinkError> {
        if let Some(message) = &self.fail_on_accept {
            return Err(RecordSinkError::write(message.as_str()));
        }
        lock(&self.state, "sink").records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RecordSinkError> {
        lock(&self.state, "sink").flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecordSinkError> {
        let mut state = lock(&self.state, "sink");
        state.flushes += 1;
        state.closes += 1;
        Ok(())
    }
}

/// One observer callback, captured for assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    State(FetchState),
    Outcome(OutcomeKind),
    Accepted(u64),
    Filtered,
    Progress(ProgressUpdate),
    Backoff(BackoffNotice),
    Skip(SkipNotice),
    Malformed(MalformedNotice),
    Terminated(FetchReport),
}

#[derive(Debug, Default)]
pub struct RecordingObserver(Mutex<Vec<ObservedEvent>>);

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObservedEvent> {
        lock(&self.0, "observer").clone()
    }

    pub fn states(&self) -> Vec<FetchState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn backoffs(&self) -> Vec<BackoffNotice> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Backoff(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn skips(&self) -> Vec<SkipNotice> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Skip(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn malformed(&self) -> Vec<MalformedNotice> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Malformed(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<ProgressUpdate> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Progress(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        lock(&self.0, "observer").push(event);
    }
}

impl FetchObserver for RecordingObserver {
    fn on_state_change(&self, _run_id: Uuid, state: FetchState) {
        self.push(ObservedEvent::State(state));
    }

    fn on_outcome(&self, _run_id: Uuid, kind: OutcomeKind) {
        self.push(ObservedEvent::Outcome(kind));
    }

    fn on_record_accepted(&self, _run_id: Uuid, accepted: u64) {
        self.push(ObservedEvent::Accepted(accepted));
    }

    fn on_record_filtered(&self, _run_id: Uuid) {
        self.push(ObservedEvent::Filtered);
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        self.push(ObservedEvent::Progress(update.clone()));
    }

    fn on_backoff(&self, notice: &BackoffNotice) {
        self.push(ObservedEvent::Backoff(notice.clone()));
    }

    fn on_skip(&self, notice: &SkipNotice) {
        self.push(ObservedEvent::Skip(notice.clone()));
    }

    fn on_malformed(&self, notice: &MalformedNotice) {
        self.push(ObservedEvent::Malformed(notice.clone()));
    }

    fn on_terminated(&self, report: &FetchReport) {
        self.push(ObservedEvent::Terminated(report.clone()));
    }
}
