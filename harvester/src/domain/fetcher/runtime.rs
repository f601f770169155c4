//! Port and runtime dependency bundles for the fetch loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};

use crate::domain::ports::{EndpointCatalog, FetchObserver, NoopObserver, RecordTransport};

use super::FetchSleeper;

/// Port bundle required by the fetch loop.
pub struct FetcherPorts {
    /// Outbound HTTP transport.
    pub transport: Arc<dyn RecordTransport>,
    /// URL builder for the endpoint.
    pub catalog: Arc<dyn EndpointCatalog>,
    /// Event observer; [`NoopObserver`] unless replaced.
    pub observer: Arc<dyn FetchObserver>,
}

impl FetcherPorts {
    /// Build a port bundle with a no-op observer.
    pub fn new(transport: Arc<dyn RecordTransport>, catalog: Arc<dyn EndpointCatalog>) -> Self {
        Self {
            transport,
            catalog,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replace the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Time sources used by the loop.
pub struct FetcherRuntime {
    /// Async sleep implementation used for backoff.
    pub sleeper: Arc<dyn FetchSleeper>,
    /// Clock used for run timestamps.
    pub clock: Arc<dyn Clock>,
}

impl Default for FetcherRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(DefaultClock),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl FetchSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
