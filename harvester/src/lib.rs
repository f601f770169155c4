//! Sequenced fetch-retry engine for rate-limited JSON HTTP APIs.
//!
//! The crate follows a hexagonal layout:
//! - `domain` holds argument progression, the fetch loop, and the driven
//!   ports it talks through.
//! - `outbound` holds adapters for HTTP, URL templates, files, and telemetry.
//! - `inbound` holds the command-line and configuration surface.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

pub mod domain;
pub mod inbound;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
