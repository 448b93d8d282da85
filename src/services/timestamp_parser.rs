//! Timestamp response parser & validator service.

use crate::domain::{
    asn1::{self, Tlv},
    constants,
    crypto::Sha256Digest,
    pkcs7::timestamp::TimestampToken,
};
use crate::{infra::error::SigningError, infra::error::SigningResult};

/// Service responsible for parsing raw timestamp response bytes and validating
/// the message imprint against the signature it should cover.
pub struct TimestampParserService;

impl TimestampParserService {
    /// Parse a `TimeStampResp` and return its token.
    ///
    /// ```text
    /// TimeStampResp ::= SEQUENCE {
    ///     status          PKIStatusInfo,
    ///     timeStampToken  TimeStampToken OPTIONAL }
    /// ```
    /// Only `granted(0)` and `grantedWithMods(1)` are accepted.
    pub fn parse_response(response_der: &[u8]) -> SigningResult<Vec<u8>> {
        let fields = Tlv::parse(response_der)
            .and_then(|t| t.expect_tag(constants::ASN1_SEQUENCE_TAG, "TimeStampResp"))
            .and_then(|t| t.children())
            .map_err(|e| SigningError::TimestampError(format!("malformed timestamp response: {e}")))?;

        let status_info = asn1::child(&fields, 0, "PKIStatusInfo")
            .and_then(|t| t.children())
            .map_err(|e| SigningError::TimestampError(e.to_string()))?;
        let status = asn1::child(&status_info, 0, "PKIStatus")
            .and_then(|t| t.expect_tag(constants::ASN1_INTEGER_TAG, "PKIStatus"))
            .map_err(|e| SigningError::TimestampError(e.to_string()))?;

        match status.value() {
            [0] | [1] => {}
            other => {
                let code = other.last().copied().unwrap_or_default();
                return Err(SigningError::TimestampError(format!(
                    "timestamp authority rejected the request (status {code})"
                )));
            }
        }

        let token = fields.get(1).ok_or_else(|| {
            SigningError::TimestampError("granted response carries no token".into())
        })?;
        Ok(token.raw().to_vec())
    }

    /// Parse a timestamp token DER and validate the message imprint hash.
    pub fn parse_and_validate(
        token_der: Vec<u8>,
        signature_hash: &[u8],
    ) -> SigningResult<TimestampToken> {
        let token = TimestampToken::from_der(token_der)?;
        token
            .validate_message_imprint(signature_hash)
            .map_err(|e| SigningError::TimestampError(format!("imprint validation failed: {e}")))?;
        Ok(token)
    }

    /// Response bytes to a validated token over `signature`.
    pub fn token_for_signature(response_der: &[u8], signature: &[u8]) -> SigningResult<TimestampToken> {
        let token_der = Self::parse_response(response_der)?;
        Self::parse_and_validate(token_der, Sha256Digest::compute(signature).as_bytes())
    }
}
