//! Signature policy referenced by the `signaturePolicyIdentifier` attribute.

use der::asn1::ObjectIdentifier;

use super::constants::{DEFAULT_POLICY_OID, DEFAULT_POLICY_URI};
use super::crypto::Sha256Digest;
use crate::{SigningError, SigningResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignaturePolicy {
    oid: ObjectIdentifier,
    uri: String,
}

impl SignaturePolicy {
    pub fn new(oid: &str, uri: &str) -> SigningResult<Self> {
        let oid = ObjectIdentifier::new(oid).map_err(|e| {
            SigningError::ConfigurationError(format!("invalid signature policy OID '{oid}': {e}"))
        })?;
        if uri.is_empty() || !uri.is_ascii() {
            return Err(SigningError::ConfigurationError(
                "signature policy URI must be a non-empty ASCII string".into(),
            ));
        }
        Ok(Self {
            oid,
            uri: uri.to_string(),
        })
    }

    #[must_use]
    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Digest carried in `sigPolicyHash`: SHA-256 over the dotted OID text.
    #[must_use]
    pub fn hash(&self) -> Sha256Digest {
        Sha256Digest::compute(self.oid.to_string().as_bytes())
    }
}

impl Default for SignaturePolicy {
    fn default() -> Self {
        Self {
            oid: ObjectIdentifier::new_unwrap(DEFAULT_POLICY_OID),
            uri: DEFAULT_POLICY_URI.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = SignaturePolicy::default();
        assert_eq!(policy.oid().to_string(), "2.16.620.2.1.2.2");
        assert_eq!(
            policy.hash(),
            Sha256Digest::compute(b"2.16.620.2.1.2.2")
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(SignaturePolicy::new("not-an-oid", "https://x").is_err());
        assert!(SignaturePolicy::new("1.2.3", "").is_err());
        assert!(SignaturePolicy::new("1.2.3", "https://exämple").is_err());
        assert!(SignaturePolicy::new("1.2.3", "https://example.org/p.pdf").is_ok());
    }
}
