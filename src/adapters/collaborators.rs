//! Interfaces of the external collaborators the signing core talks to.
//!
//! The core never knows how a remote signer authenticates, how revocation data
//! is fetched, or how a document stores its signature; it only sees these
//! narrow traits. Concrete HTTP and file-backed implementations live next to
//! this module.

use std::io::Read;

use async_trait::async_trait;

use crate::domain::crypto::{Certificate, DigestInfoBlob, RawSignature};
use crate::domain::pkcs7::{FinalizedSignature, TimestampToken};
use crate::infra::error::SigningResult;

/// Remote key holder that signs a `DigestInfo` without exposing its key.
#[async_trait]
pub trait RemoteSigningGateway: Send + Sync {
    /// Sign the 51-byte SHA-256 `DigestInfo`.
    ///
    /// # Errors
    ///
    /// Returns `SigningError::RemoteDenied` carrying the gateway's own status
    /// and message when the request is refused.
    async fn sign(&self, digest_info: &DigestInfoBlob) -> SigningResult<RawSignature>;
}

/// CRL or OCSP source for one certificate.
#[async_trait]
pub trait RevocationResponder: Send + Sync {
    /// Fetch encoded revocation data for `certificate`.
    ///
    /// # Arguments
    ///
    /// * `certificate` - The certificate whose status is wanted
    /// * `issuer` - Its issuer, when known (OCSP needs it, CRL sources may ignore it)
    ///
    /// # Errors
    ///
    /// Any error is treated as "no evidence" by the collector.
    async fn get_encoded(
        &self,
        certificate: &Certificate,
        issuer: Option<&Certificate>,
    ) -> SigningResult<Option<Vec<u8>>>;
}

/// RFC 3161 time-stamping authority.
#[async_trait]
pub trait TimestampAuthorityClient: Send + Sync {
    /// Obtain a token whose message imprint is the SHA-256 of `signature`.
    ///
    /// # Errors
    ///
    /// Returns `SigningError::TimestampError` when no token could be obtained.
    async fn get_timestamp_token(&self, signature: &[u8]) -> SigningResult<TimestampToken>;
}

/// Artifact that can hold a fixed-size signature placeholder.
pub trait DocumentContainer {
    /// Identifies a reserved placeholder between the two phases.
    type Handle;

    /// Commit `size` bytes of signature space to the document layout.
    fn reserve_signature_placeholder(&mut self, size: usize) -> SigningResult<Self::Handle>;

    /// Stream the bytes covered by the signature (everything but the placeholder).
    fn read_signable_bytes(&self, handle: &Self::Handle) -> SigningResult<Box<dyn Read + '_>>;

    /// Place `signature` into the reserved space and persist the document.
    ///
    /// # Errors
    ///
    /// Fails without touching the output when the signature does not fit.
    fn write_final_signature(
        &mut self,
        handle: Self::Handle,
        signature: &FinalizedSignature,
    ) -> SigningResult<()>;
}
