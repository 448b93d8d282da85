//! Timestamp request builder service.
//!
//! Service for building RFC3161 timestamp requests from signature bytes.

use rand::RngCore;

use crate::domain::{asn1, constants, crypto::Sha256Digest};
use crate::SigningError;

/// Nonce size in bytes (before the sign-protecting zero byte).
const NONCE_LEN: usize = 8;

/// Service for building RFC3161 timestamp requests.
pub struct TimestampRequestBuilder;

impl TimestampRequestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build an RFC3161 timestamp request for the given signature bytes.
    ///
    /// ```text
    /// TimeStampReq ::= SEQUENCE {
    ///     version          INTEGER { v1(1) },
    ///     messageImprint   MessageImprint,
    ///     nonce            INTEGER OPTIONAL,
    ///     certReq          BOOLEAN DEFAULT FALSE }
    /// ```
    pub fn build_request(&self, signature_bytes: &[u8]) -> Result<Vec<u8>, SigningError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);
        self.build_request_with_nonce(signature_bytes, &nonce)
    }

    /// Same as [`Self::build_request`] with a caller-chosen nonce.
    pub fn build_request_with_nonce(
        &self,
        signature_bytes: &[u8],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>, SigningError> {
        if signature_bytes.is_empty() {
            return Err(SigningError::TimestampError(
                "Cannot create timestamp request for empty signature".into(),
            ));
        }

        let imprint = Sha256Digest::compute(signature_bytes);
        let message_imprint = asn1::sequence(&[
            &asn1::algorithm_identifier(&constants::OID_SHA256),
            &asn1::octet_string(imprint.as_bytes()),
        ]);

        // Leading zero keeps the INTEGER positive.
        let mut nonce_value = vec![0x00];
        nonce_value.extend_from_slice(nonce);
        let nonce_der = asn1::tlv(constants::ASN1_INTEGER_TAG, &nonce_value);

        let request = asn1::sequence(&[
            &constants::ASN1_INTEGER_ONE,
            &message_imprint,
            &nonce_der,
            &constants::CERT_REQ_TRUE,
        ]);

        log::debug!(
            "Built RFC3161 timestamp request: {} bytes for signature: {} bytes",
            request.len(),
            signature_bytes.len()
        );
        Ok(request)
    }
}

impl Default for TimestampRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
