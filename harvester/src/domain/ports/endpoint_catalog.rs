//! Driven port for turning an endpoint and argument set into a URL.

use url::Url;

use super::define_port_error;
use crate::domain::{ArgumentSet, EndpointId};

define_port_error! {
    /// Errors raised while building a request URL. All of them are fatal for
    /// the run.
    pub enum EndpointCatalogError {
        /// No template is registered for the endpoint.
        UnknownEndpoint { endpoint: String } =>
            "unknown endpoint `{endpoint}`",
        /// A parameter required by the endpoint template is not bound.
        MissingArgument { endpoint: String, parameter: String } =>
            "endpoint `{endpoint}` requires argument `{parameter}`",
        /// The configured region is not a known platform.
        UnknownRegion { region: String } =>
            "unknown region `{region}`",
        /// A template has unbalanced or empty placeholders.
        InvalidTemplate { template: String, message: String } =>
            "invalid endpoint template `{template}`: {message}",
        /// Substitution produced something that is not a URL.
        InvalidUrl { url: String, message: String } =>
            "invalid request url `{url}`: {message}",
    }
}

/// Port for building endpoint URLs.
#[cfg_attr(test, mockall::automock)]
pub trait EndpointCatalog: Send + Sync {
    /// Build the URL for one request.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use harvester::domain::{ArgumentSet, EndpointId};
    ///
    /// let url = catalog.build_url(
    ///     &EndpointId::new("match")?,
    ///     &ArgumentSet::new().with("matchId", 2_000_i64),
    /// )?;
    /// ```
    fn build_url(
        &self,
        endpoint: &EndpointId,
        arguments: &ArgumentSet,
    ) -> Result<Url, EndpointCatalogError>;
}
