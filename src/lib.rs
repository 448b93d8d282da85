//! Remote CMS Signer Library
//!
//! Coordinates detached, two-phase signing against a remote signing authority
//! that never releases its private key. The prepare phase reserves signature
//! space in a document, hashes the signable bytes and commits to the signed
//! attributes; the finalize phase weaves the returned raw signature, the
//! revocation evidence and an optional RFC 3161 timestamp into a detached
//! CMS `SignedData`.
//!
//! Layers:
//! - [`domain`]: value types, DER encoding, certificates, attributes
//! - [`services`]: the signing protocol (builder, estimator, injector, session)
//! - [`adapters`]: collaborator interfaces and their HTTP/file implementations
//! - [`pipelines`]: end-to-end orchestration
//! - [`infra`]: errors and configuration

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use adapters::collaborators::{
    DocumentContainer, RemoteSigningGateway, RevocationResponder, TimestampAuthorityClient,
};
pub use domain::crypto::{Certificate, CertificateChain, DigestInfoBlob, RawSignature, Sha256Digest};
pub use domain::pkcs7::{AttributesContext, FinalizedSignature, TimestampToken};
pub use domain::policy::SignaturePolicy;
pub use domain::revocation::{CrlBlob, OcspBlob, RevocationEvidence};
pub use domain::session::{SessionSnapshot, SessionState};
pub use infra::error::{SigningError, SigningResult};
pub use pipelines::{PendingDocument, SigningCoordinator};
pub use services::{
    AwaitingSignature, PlaceholderSizeEstimator, PreparedSession, RevocationEvidenceCollector,
    SignatureInjector, SigningSession, SigningSessionBuilder,
};
