//! CMS `SignedData` domain wrappers.

use std::fmt;

pub mod attributes;
pub mod timestamp; // RFC3161 TimestampToken colocated with the CMS domain

/// Complete DER `ContentInfo(SignedData)` ready to be placed in the
/// reserved placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct FinalizedSignature {
    der: Vec<u8>,
}

impl FinalizedSignature {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
    #[must_use]
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.der.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.der.is_empty()
    }
}

impl fmt::Debug for FinalizedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FinalizedSignature(len={})", self.der.len())
    }
}

pub use attributes::{AttributesContext, SignedAttributeLogical, SignedAttributesCanonical};
pub use timestamp::TimestampToken;
