//! Inbound adapters that translate operator input into domain values.
//!
//! The command-line surface lives under [`cli`]; it builds sequencers, loop
//! configuration and filters without touching any outbound adapter.

pub mod cli;
