//! Prepare phase: digest the document and commit to the signed attributes.

use std::io::Read;

use crate::domain::{
    crypto::{CertificateChain, DigestInfoBlob, Sha256Digest},
    pkcs7::AttributesContext,
    policy::SignaturePolicy,
    revocation::RevocationEvidence,
};
use crate::services::signed_attributes_builder::SignedAttributesBuilder;
use crate::SigningResult;

/// Output of the prepare phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedAttributes {
    /// What the remote signer receives.
    pub digest_info: DigestInfoBlob,
    /// SHA-256 of the signable document bytes.
    pub naked_hash: Sha256Digest,
    /// The exact attribute SET the signature will cover.
    pub context: AttributesContext,
}

/// Builds `PreparedAttributes`; a pure function of its inputs.
pub struct SigningSessionBuilder {
    attributes: SignedAttributesBuilder,
    policy: Option<SignaturePolicy>,
}

impl Default for SigningSessionBuilder {
    fn default() -> Self {
        Self::new(Some(SignaturePolicy::default()))
    }
}

impl SigningSessionBuilder {
    #[must_use]
    pub fn new(policy: Option<SignaturePolicy>) -> Self {
        Self {
            attributes: SignedAttributesBuilder::new(),
            policy,
        }
    }

    #[must_use]
    pub fn policy(&self) -> Option<&SignaturePolicy> {
        self.policy.as_ref()
    }

    /// Stream the signable bytes through SHA-256 and build the attributes.
    pub fn prepare<R: Read + ?Sized>(
        &self,
        document: &mut R,
        chain: &CertificateChain,
        evidence: &RevocationEvidence,
    ) -> SigningResult<PreparedAttributes> {
        let (naked_hash, total) = Sha256Digest::compute_reader(document)?;
        log::debug!("Hashed {total} signable bytes: {}", naked_hash.to_hex());
        self.prepare_from_digest(naked_hash, chain, evidence)
    }

    /// Same as [`Self::prepare`] when the document digest is already known.
    pub fn prepare_from_digest(
        &self,
        naked_hash: Sha256Digest,
        chain: &CertificateChain,
        evidence: &RevocationEvidence,
    ) -> SigningResult<PreparedAttributes> {
        let canonical =
            self.attributes
                .build(&naked_hash, chain.leaf(), evidence, self.policy.as_ref())?;
        let context = AttributesContext::from_canonical(&canonical);
        let digest_info = context.digest_info();
        log::debug!(
            "Signed attributes: {} attribute(s), {} bytes",
            canonical.ordered().len(),
            context.as_der().len()
        );
        Ok(PreparedAttributes {
            digest_info,
            naked_hash,
            context,
        })
    }
}
