//! Remote signing authority adapter.
//!
//! Sends the 51-byte `DigestInfo` to a signing service that holds the private
//! key and returns the raw signature value.

pub mod client;
pub mod protocol;

pub use client::{GatewayConfig, HttpSigningGateway};
