//! Harvest settings loaded via OrthoConfig.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "euw";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BATCH_SIZE: usize = 100;

/// Connection and output settings shared by every run.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "HARVEST")]
pub struct HarvestSettings {
    /// API key appended to every request.
    pub api_key: String,
    /// Platform region, for example `euw` or `na`.
    pub region: Option<String>,
    /// Base URL template override, for example `http://127.0.0.1:8080`.
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Records buffered before the output file is written.
    pub batch_size: Option<usize>,
    /// User agent override.
    pub user_agent: Option<String>,
}

impl HarvestSettings {
    /// Return the configured region, falling back to the default.
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Return the configured request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Return the configured output batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }
}
