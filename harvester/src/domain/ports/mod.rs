//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod endpoint_catalog;
mod fetch_observer;
mod record_filter;
mod record_sink;
mod record_transport;

#[cfg(test)]
pub use endpoint_catalog::MockEndpointCatalog;
pub use endpoint_catalog::{EndpointCatalog, EndpointCatalogError};
pub use fetch_observer::{
    BackoffNotice, BackoffReason, FetchObserver, FetchState, MalformedDecision, MalformedNotice,
    NoopObserver, ProgressUpdate, SkipNotice, SkipReason,
};
pub use record_filter::RecordFilter;
#[cfg(test)]
pub use record_sink::MockRecordSink;
pub use record_sink::{RecordSink, RecordSinkError};
#[cfg(test)]
pub use record_transport::MockRecordTransport;
pub use record_transport::{FetchOutcome, OutcomeKind, RecordTransport};
