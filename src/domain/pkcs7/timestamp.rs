//! RFC3161 Timestamp token domain type.
//!
//! Located under `domain::pkcs7` because the timestamp token is an unsigned
//! attribute adjunct to a CMS/PKCS#7 `SignedData` structure.

use der::asn1::ObjectIdentifier;

use crate::domain::{
    asn1::{self, Tlv},
    constants,
};
use crate::{SigningError, SigningResult};

const GENERALIZED_TIME_TAG: u8 = 0x18;

/// RFC3161 `TimeStampToken` (a `ContentInfo` wrapping `SignedData` over
/// `TSTInfo`), with the fields needed to check what it covers.
#[derive(Debug, Clone)]
pub struct TimestampToken {
    der: Vec<u8>,
    imprint_algorithm: ObjectIdentifier,
    message_imprint: Vec<u8>,
    policy: ObjectIdentifier,
    gen_time: String,
}

impl TimestampToken {
    /// Parse and validate an RFC3161 timestamp token from DER bytes.
    pub fn from_der(der_bytes: Vec<u8>) -> SigningResult<Self> {
        let fields = Self::parse_tst_info(&der_bytes).map_err(|e| match e {
            SigningError::TimestampError(_) => e,
            other => SigningError::TimestampError(format!("malformed timestamp token: {other}")),
        })?;
        let (imprint_algorithm, message_imprint, policy, gen_time) = fields;
        Ok(Self {
            der: der_bytes,
            imprint_algorithm,
            message_imprint,
            policy,
            gen_time,
        })
    }

    /// `ContentInfo { id-signedData, [0] SignedData { .., encapContentInfo {
    /// id-ct-TSTInfo, [0] OCTET STRING TSTInfo }, .. } }`
    fn parse_tst_info(
        der: &[u8],
    ) -> SigningResult<(ObjectIdentifier, Vec<u8>, ObjectIdentifier, String)> {
        let content_info = Tlv::parse(der)?
            .expect_tag(constants::ASN1_SEQUENCE_TAG, "ContentInfo")?
            .children()?;
        if asn1::child(&content_info, 0, "contentType")?.as_oid()? != constants::OID_SIGNED_DATA {
            return Err(SigningError::TimestampError(
                "timestamp token is not a SignedData".into(),
            ));
        }
        let explicit = asn1::child(&content_info, 1, "content")?
            .expect_tag(constants::ASN1_CONTEXT_0_TAG, "content")?
            .children()?;
        let signed_data = asn1::child(&explicit, 0, "SignedData")?
            .expect_tag(constants::ASN1_SEQUENCE_TAG, "SignedData")?
            .children()?;
        let encap = asn1::child(&signed_data, 2, "encapContentInfo")?
            .expect_tag(constants::ASN1_SEQUENCE_TAG, "encapContentInfo")?
            .children()?;
        if asn1::child(&encap, 0, "eContentType")?.as_oid()? != constants::OID_CT_TST_INFO {
            return Err(SigningError::TimestampError(
                "timestamp token does not encapsulate TSTInfo".into(),
            ));
        }
        let econtent = asn1::child(&encap, 1, "eContent")?
            .expect_tag(constants::ASN1_CONTEXT_0_TAG, "eContent")?
            .children()?;
        let octets = asn1::child(&econtent, 0, "eContent octets")?
            .expect_tag(constants::ASN1_OCTET_STRING_TAG, "eContent octets")?;

        // TSTInfo ::= SEQUENCE { version, policy, messageImprint, serialNumber, genTime, .. }
        let tst_info = Tlv::parse(octets.value())?
            .expect_tag(constants::ASN1_SEQUENCE_TAG, "TSTInfo")?
            .children()?;
        let policy = asn1::child(&tst_info, 1, "policy")?.as_oid()?;
        let imprint = asn1::child(&tst_info, 2, "messageImprint")?
            .expect_tag(constants::ASN1_SEQUENCE_TAG, "messageImprint")?
            .children()?;
        let algorithm = asn1::child(&imprint, 0, "hashAlgorithm")?
            .expect_tag(constants::ASN1_SEQUENCE_TAG, "hashAlgorithm")?
            .children()?;
        let algorithm = asn1::child(&algorithm, 0, "hashAlgorithm OID")?.as_oid()?;
        let hashed = asn1::child(&imprint, 1, "hashedMessage")?
            .expect_tag(constants::ASN1_OCTET_STRING_TAG, "hashedMessage")?;
        let gen_time = asn1::child(&tst_info, 4, "genTime")?
            .expect_tag(GENERALIZED_TIME_TAG, "genTime")?;

        Ok((
            algorithm,
            hashed.value().to_vec(),
            policy,
            String::from_utf8_lossy(gen_time.value()).into_owned(),
        ))
    }

    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }
    #[must_use]
    pub fn message_imprint_hash(&self) -> &[u8] {
        &self.message_imprint
    }
    #[must_use]
    pub fn imprint_algorithm(&self) -> &ObjectIdentifier {
        &self.imprint_algorithm
    }
    #[must_use]
    pub fn policy(&self) -> &ObjectIdentifier {
        &self.policy
    }
    /// `genTime` as the raw GeneralizedTime text, e.g. `20240101120000Z`.
    #[must_use]
    pub fn gen_time(&self) -> &str {
        &self.gen_time
    }

    /// Check the token's imprint is the SHA-256 `signature_hash`.
    pub fn validate_message_imprint(&self, signature_hash: &[u8]) -> SigningResult<()> {
        if signature_hash.is_empty() {
            return Err(SigningError::TimestampError(
                "Empty signature hash provided for validation".into(),
            ));
        }
        if self.imprint_algorithm != constants::OID_SHA256 {
            return Err(SigningError::TimestampError(format!(
                "Unexpected message imprint algorithm {}",
                self.imprint_algorithm
            )));
        }
        if self.message_imprint != signature_hash {
            return Err(SigningError::TimestampError(
                "Message imprint hash does not match signature hash".into(),
            ));
        }
        log::debug!("Message imprint validation passed");
        Ok(())
    }
}
