//! Inspection of a finished `SignedData`.
//!
//! Parses the structure back into the parts a verifier looks at first. This
//! is a structural check: it does not verify the RSA signature or the chain.

use der::asn1::ObjectIdentifier;

use crate::domain::{
    asn1::{self, Tlv},
    constants,
    crypto::{DigestInfoBlob, Sha256Digest},
    pkcs7::{attributes::attribute_values, AttributesContext, TimestampToken},
};
use crate::{SigningError, SigningResult};

/// What the inspector recovered from a `SignedData`.
#[derive(Debug, Clone)]
pub struct SignatureSummary {
    pub signed_attributes: AttributesContext,
    pub message_digest: Sha256Digest,
    pub attribute_oids: Vec<ObjectIdentifier>,
    pub certificates: Vec<Vec<u8>>,
    pub signer_identifier: Vec<u8>,
    pub signature_algorithm: ObjectIdentifier,
    pub signature: Vec<u8>,
    pub timestamp: Option<TimestampToken>,
}

impl SignatureSummary {
    #[must_use]
    pub fn certificate_count(&self) -> usize {
        self.certificates.len()
    }

    #[must_use]
    pub fn has_timestamp(&self) -> bool {
        self.timestamp.is_some()
    }

    /// The `DigestInfo` the remote signer must have signed.
    #[must_use]
    pub fn expected_digest_info(&self) -> DigestInfoBlob {
        self.signed_attributes.digest_info()
    }

    /// Check the signed attributes commit to `document_digest`.
    pub fn verify_document_digest(&self, document_digest: &Sha256Digest) -> SigningResult<()> {
        if self.message_digest != *document_digest {
            return Err(SigningError::ValidationError(format!(
                "messageDigest {} does not match document digest {}",
                self.message_digest.to_hex(),
                document_digest.to_hex()
            )));
        }
        Ok(())
    }
}

pub struct SignedDataInspector;

impl SignedDataInspector {
    pub fn inspect(der: &[u8]) -> SigningResult<SignatureSummary> {
        let content_info = Tlv::parse(der)?
            .expect_tag(constants::ASN1_SEQUENCE_TAG, "ContentInfo")?
            .children()?;
        if asn1::child(&content_info, 0, "contentType")?.as_oid()? != constants::OID_SIGNED_DATA {
            return Err(SigningError::Pkcs7Error("content is not SignedData".into()));
        }
        let explicit = asn1::child(&content_info, 1, "content")?
            .expect_tag(constants::ASN1_CONTEXT_0_TAG, "content")?
            .children()?;
        let fields = asn1::child(&explicit, 0, "SignedData")?
            .expect_tag(constants::ASN1_SEQUENCE_TAG, "SignedData")?
            .children()?;

        let encap = asn1::child(&fields, 2, "encapContentInfo")?.children()?;
        if encap.len() != 1 {
            return Err(SigningError::Pkcs7Error(
                "SignedData is not detached (eContent present)".into(),
            ));
        }

        // Optional [0] certificates and [1] crls sit between encapContentInfo and signerInfos.
        let mut certificates = Vec::new();
        let mut next = 3;
        while let Some(field) = fields.get(next) {
            match field.tag() {
                constants::ASN1_CONTEXT_0_TAG => {
                    certificates = field.children()?.iter().map(|c| c.raw().to_vec()).collect();
                }
                constants::ASN1_CONTEXT_1_TAG => {}
                _ => break,
            }
            next += 1;
        }

        let signer_infos = asn1::child(&fields, next, "signerInfos")?
            .expect_tag(constants::ASN1_SET_TAG, "signerInfos")?
            .children()?;
        if signer_infos.len() != 1 {
            return Err(SigningError::Pkcs7Error(format!(
                "expected one SignerInfo, found {}",
                signer_infos.len()
            )));
        }
        Self::inspect_signer_info(signer_infos[0], certificates)
    }

    fn inspect_signer_info(
        signer_info: Tlv<'_>,
        certificates: Vec<Vec<u8>>,
    ) -> SigningResult<SignatureSummary> {
        let si = signer_info.children()?;
        let signer_identifier = asn1::child(&si, 1, "sid")?.raw().to_vec();
        let signed = asn1::child(&si, 3, "signedAttrs")?
            .expect_tag(constants::ASN1_CONTEXT_0_TAG, "signedAttrs")?;
        let signed_attributes =
            AttributesContext::from_der(asn1::retag(signed.raw(), constants::ASN1_SET_TAG)?)?;
        let signature_algorithm = asn1::child(&si, 4, "signatureAlgorithm")?.children()?;
        let signature_algorithm = asn1::child(&signature_algorithm, 0, "signatureAlgorithm OID")?.as_oid()?;
        let signature = asn1::child(&si, 5, "signature")?
            .expect_tag(constants::ASN1_OCTET_STRING_TAG, "signature")?
            .value()
            .to_vec();

        let timestamp = match si.get(6) {
            Some(unsigned) => Self::find_timestamp(unsigned.raw())?,
            None => None,
        };

        Ok(SignatureSummary {
            message_digest: signed_attributes.message_digest()?,
            attribute_oids: signed_attributes.attribute_oids()?,
            signed_attributes,
            certificates,
            signer_identifier,
            signature_algorithm,
            signature,
            timestamp,
        })
    }

    fn find_timestamp(unsigned_attrs: &[u8]) -> SigningResult<Option<TimestampToken>> {
        for (oid, values) in attribute_values(unsigned_attrs)? {
            if oid == constants::OID_TIMESTAMP_TOKEN {
                let set = Tlv::parse(&values)?;
                let token = asn1::child(&set.children()?, 0, "timeStampToken")?.raw().to_vec();
                return TimestampToken::from_der(token).map(Some);
            }
        }
        Ok(None)
    }
}
