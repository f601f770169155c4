//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **http**: reqwest transport classifying responses into fetch outcomes
//! - **endpoint_catalog**: URL templates, including the Riot API preset
//! - **ndjson_sink**: buffered newline-delimited JSON output through `cap_std`
//! - **tracing_observer**: structured logging of fetch loop events
//! - **metrics**: Prometheus counters (feature-gated)
//!
//! Adapters are thin translators between domain types and infrastructure.
//! They contain no retry or sequencing logic.

pub mod endpoint_catalog;
pub mod http;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod ndjson_sink;
pub mod tracing_observer;
