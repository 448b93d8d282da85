//! Protocol definitions for the remote signing gateway.
//!
//! Defines the JSON message format exchanged with the signing authority.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// API version for protocol compatibility checks.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Request to sign a SHA-256 `DigestInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequest {
    /// Protocol version for compatibility checking.
    pub version: String,
    /// Application identifier assigned by the signing authority.
    pub application_id: String,
    /// Document name shown to the signer.
    pub document_name: String,
    /// Base64-encoded 51-byte `DigestInfo`.
    pub digest_info_b64: String,
}

/// Response containing the raw signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignResponse {
    /// Protocol version.
    pub version: String,
    /// Base64-encoded signature bytes.
    pub signature_b64: String,
}

/// Request for the signer's certificate chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateChainRequest {
    /// Protocol version.
    pub version: String,
    /// Application identifier assigned by the signing authority.
    pub application_id: String,
}

/// Certificate chain as a PEM bundle ordered from signer to root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateChainResponse {
    /// Protocol version.
    pub version: String,
    /// Concatenated PEM certificates.
    pub certificate_chain_pem: String,
}

/// Error body returned on denial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status code reported by the authority.
    pub status: String,
    /// Human-readable error message.
    pub message: String,
}

impl SignRequest {
    #[must_use]
    pub fn new(digest_info: &[u8], application_id: &str, document_name: &str) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            application_id: application_id.to_string(),
            document_name: document_name.to_string(),
            digest_info_b64: base64::engine::general_purpose::STANDARD.encode(digest_info),
        }
    }

    /// Decode the `DigestInfo` from base64.
    ///
    /// # Errors
    /// Returns error if base64 decoding fails.
    pub fn decode_digest_info(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.digest_info_b64)
    }
}

impl SignResponse {
    #[must_use]
    pub fn new(signature: &[u8]) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            signature_b64: base64::engine::general_purpose::STANDARD.encode(signature),
        }
    }

    /// Decode the signature from base64.
    ///
    /// # Errors
    /// Returns error if base64 decoding fails.
    pub fn decode_signature(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.signature_b64)
    }
}

impl ErrorResponse {
    #[must_use]
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }
}
