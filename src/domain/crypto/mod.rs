//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for cryptographic artifacts including:
//! - SHA-256 digests and the fixed-layout `DigestInfo` sent to the remote signer
//! - Certificate representations and ordered chains
//! - Raw signature values returned by the remote signer
//!
//! These types keep byte-level invariants in one place so the service layer
//! only ever handles validated values.

mod cert;
mod digest;
mod signature;

#[cfg(test)]
pub(crate) use cert::test_certs;
pub use cert::{Certificate, CertificateChain, SubjectField};
pub use digest::{DigestInfoBlob, Sha256Digest};
pub use signature::RawSignature;
