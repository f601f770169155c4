//! Reqwest-backed record transport.

mod dto;
mod transport;

pub use transport::{HttpIdentity, ReqwestRecordTransport};
