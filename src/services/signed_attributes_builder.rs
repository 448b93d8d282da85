//! Service for constructing and canonicalizing signed attributes.
//!
//! Produces the authenticated attributes of a detached CMS signature: content
//! type, message digest, signing certificate reference, signature policy and
//! archived revocation evidence. No signing time is included, so the same
//! inputs always yield the same bytes.

use crate::domain::{
    asn1::{self, Tlv},
    constants,
    crypto::{Certificate, Sha256Digest},
    pkcs7::{SignedAttributeLogical, SignedAttributesCanonical},
    policy::SignaturePolicy,
    revocation::RevocationEvidence,
};
use crate::{SigningError, SigningResult};

pub struct SignedAttributesBuilder; // stateless

impl Default for SignedAttributesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SignedAttributesBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the canonical attribute set for one document.
    pub fn build(
        &self,
        naked_hash: &Sha256Digest,
        signer: &Certificate,
        evidence: &RevocationEvidence,
        policy: Option<&SignaturePolicy>,
    ) -> SigningResult<SignedAttributesCanonical> {
        let mut attrs = vec![
            self.content_type(),
            self.message_digest(naked_hash),
            self.signing_certificate_v2(signer),
        ];
        if let Some(policy) = policy {
            attrs.push(self.signature_policy(policy));
        }
        if let Some(archival) = self.revocation_info_archival(evidence)? {
            attrs.push(archival);
        }
        Ok(self.canonicalize(attrs))
    }

    /// Build canonical attributes given already assembled Attribute SEQUENCE DER blobs.
    #[must_use]
    pub fn canonicalize(
        &self,
        raw_attributes: Vec<SignedAttributeLogical>,
    ) -> SignedAttributesCanonical {
        SignedAttributesCanonical::new(raw_attributes)
    }

    #[must_use]
    pub fn content_type(&self) -> SignedAttributeLogical {
        SignedAttributeLogical::single(
            constants::OID_CONTENT_TYPE,
            asn1::oid(&constants::OID_DATA),
        )
    }

    #[must_use]
    pub fn message_digest(&self, naked_hash: &Sha256Digest) -> SignedAttributeLogical {
        SignedAttributeLogical::single(
            constants::OID_MESSAGE_DIGEST,
            asn1::octet_string(naked_hash.as_bytes()),
        )
    }

    /// `SigningCertificateV2 { certs SEQUENCE OF ESSCertIDv2 }` with a single
    /// SHA-256 cert hash; the algorithm is omitted because SHA-256 is the DEFAULT.
    #[must_use]
    pub fn signing_certificate_v2(&self, signer: &Certificate) -> SignedAttributeLogical {
        let ess_cert_id = asn1::sequence(&[&asn1::octet_string(signer.fingerprint().as_bytes())]);
        let certs = asn1::sequence(&[&ess_cert_id]);
        SignedAttributeLogical::single(
            constants::OID_SIGNING_CERTIFICATE_V2,
            asn1::sequence(&[&certs]),
        )
    }

    /// `SignaturePolicyId { sigPolicyId, sigPolicyHash, sigPolicyQualifiers }`.
    #[must_use]
    pub fn signature_policy(&self, policy: &SignaturePolicy) -> SignedAttributeLogical {
        let hash = asn1::sequence(&[
            &asn1::algorithm_identifier(&constants::OID_SHA256),
            &asn1::octet_string(policy.hash().as_bytes()),
        ]);
        let qualifier = asn1::sequence(&[
            &asn1::oid(&constants::OID_SPQ_ETS_URI),
            &asn1::ia5_string(policy.uri()),
        ]);
        let value = asn1::sequence(&[
            &asn1::oid(policy.oid()),
            &hash,
            &asn1::sequence(&[&qualifier]),
        ]);
        SignedAttributeLogical::single(constants::OID_SIGNATURE_POLICY_ID, value)
    }

    /// `RevocationInfoArchival { [0] crl, [1] ocsp }`; `None` when there is
    /// nothing to archive.
    pub fn revocation_info_archival(
        &self,
        evidence: &RevocationEvidence,
    ) -> SigningResult<Option<SignedAttributeLogical>> {
        if !evidence.has_blobs() {
            return Ok(None);
        }
        let mut fields = Vec::new();
        if !evidence.crl_blobs().is_empty() {
            let mut crls = Vec::new();
            for (index, crl) in evidence.crl_blobs().iter().enumerate() {
                let element = Tlv::parse(crl.as_der()).map_err(|e| {
                    SigningError::RevocationError(format!("CRL #{index} is not a single DER element: {e}"))
                })?;
                crls.extend_from_slice(element.raw());
            }
            fields.push(asn1::context(0, &asn1::tlv(constants::ASN1_SEQUENCE_TAG, &crls)));
        }
        if !evidence.ocsp_blobs().is_empty() {
            let mut responses = Vec::new();
            for (index, basic) in evidence.ocsp_blobs().iter().enumerate() {
                Tlv::parse(basic.as_der()).map_err(|e| {
                    SigningError::RevocationError(format!(
                        "OCSP response #{index} is not a single DER element: {e}"
                    ))
                })?;
                responses.extend_from_slice(&Self::ocsp_response(basic.as_der()));
            }
            fields.push(asn1::context(
                1,
                &asn1::tlv(constants::ASN1_SEQUENCE_TAG, &responses),
            ));
        }
        let value = asn1::tlv(constants::ASN1_SEQUENCE_TAG, &fields.concat());
        Ok(Some(SignedAttributeLogical::single(
            constants::OID_ADBE_REVOCATION_INFO_ARCHIVAL,
            value,
        )))
    }

    /// `OCSPResponse { successful, [0] ResponseBytes { id-pkix-ocsp-basic, OCTET STRING } }`
    fn ocsp_response(basic_response: &[u8]) -> Vec<u8> {
        let response_bytes = asn1::sequence(&[
            &asn1::oid(&constants::OID_OCSP_BASIC),
            &asn1::octet_string(basic_response),
        ]);
        asn1::sequence(&[
            &constants::OCSP_RESPONSE_SUCCESSFUL,
            &asn1::context(0, &response_bytes),
        ])
    }
}
