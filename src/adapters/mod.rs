//! Adapter layer modules for external system integration.
//!
//! Provides adapters for:
//! - Remote signing authority (JSON over HTTPS)
//! - HTTP timestamp authority communication with retry logic
//! - CRL download from configured URLs or distribution points
//! - OCSP queries against the certificates' AIA responders
//! - File-backed documents with a hex signature placeholder

pub mod collaborators;
pub mod container;
pub mod crl_http_client;
pub mod ocsp_http_client;
pub mod remote;
pub mod timestamp_http_client;

pub use collaborators::{
    DocumentContainer, RemoteSigningGateway, RevocationResponder, TimestampAuthorityClient,
};
pub use container::{ByteRangeContainer, PlaceholderHandle};
pub use crl_http_client::{CrlHttpClient, CrlHttpConfig};
pub use ocsp_http_client::{OcspHttpClient, OcspHttpConfig};
pub use remote::{GatewayConfig, HttpSigningGateway};
pub use timestamp_http_client::{TimestampHttpClient, TimestampHttpConfig};
