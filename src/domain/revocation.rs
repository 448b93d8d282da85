//! Revocation evidence gathered for a chain before signing.
//!
//! `None` on either collection means the matching responder was not
//! configured (or, for OCSP, not applicable); `Some(vec![])` means it was
//! asked and returned nothing. The two must stay distinguishable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// DER `CertificateList` bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrlBlob(#[serde(with = "crate::domain::b64")] Vec<u8>);

/// DER `BasicOCSPResponse` bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OcspBlob(#[serde(with = "crate::domain::b64")] Vec<u8>);

impl CrlBlob {
    #[must_use]
    pub fn new(der: Vec<u8>) -> Self {
        Self(der)
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl OcspBlob {
    #[must_use]
    pub fn new(der: Vec<u8>) -> Self {
        Self(der)
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for CrlBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CrlBlob(len={})", self.0.len())
    }
}
impl fmt::Debug for OcspBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OcspBlob(len={})", self.0.len())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEvidence {
    pub crls: Option<Vec<CrlBlob>>,
    pub ocsp: Option<Vec<OcspBlob>>,
}

impl RevocationEvidence {
    /// No responder configured at all.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether an OCSP responder took part, which is what the placeholder
    /// estimate keys on (even when it returned nothing).
    #[must_use]
    pub fn has_ocsp(&self) -> bool {
        self.ocsp.is_some()
    }

    #[must_use]
    pub fn crl_lengths(&self) -> Vec<usize> {
        self.crls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(CrlBlob::len)
            .collect()
    }

    #[must_use]
    pub fn crl_blobs(&self) -> &[CrlBlob] {
        self.crls.as_deref().unwrap_or_default()
    }
    #[must_use]
    pub fn ocsp_blobs(&self) -> &[OcspBlob] {
        self.ocsp.as_deref().unwrap_or_default()
    }

    /// True when there is at least one blob worth archiving.
    #[must_use]
    pub fn has_blobs(&self) -> bool {
        !self.crl_blobs().is_empty() || !self.ocsp_blobs().is_empty()
    }
}
