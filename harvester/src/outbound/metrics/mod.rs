//! Outbound adapters for metrics exporting.
//!
//! Prometheus-backed observers live here, behind the `metrics` feature.

mod prometheus_fetch;

pub use prometheus_fetch::PrometheusFetchObserver;
