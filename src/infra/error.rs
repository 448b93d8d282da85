//! Error types for remote signing operations.
//! Error handling types and result definitions for the prepare and finalize phases.

use thiserror::Error;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Comprehensive error types for signing operations
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    #[error("Remote signing denied [{status}]: {message}")]
    #[diagnostic(help("re-run the whole prepare/finalize cycle once the cause is fixed"))]
    RemoteDenied { status: String, message: String },

    #[error("Timestamp error: {0}")]
    TimestampError(String),

    #[error("Signature needs {required} bytes but only {reserved} were reserved")]
    #[diagnostic(help("prepare the document again with a larger placeholder margin"))]
    CapacityExceeded { required: usize, reserved: usize },

    #[error("Session desynchronized: {0}")]
    Desynchronized(String),

    #[error("Certificate error: {0}")]
    CertificateError(String),

    #[error("Revocation evidence error: {0}")]
    RevocationError(String),

    #[error("Document container error: {0}")]
    ContainerError(String),

    #[error("Cryptographic error: {0}")]
    CryptographicError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("ASN.1 encoding/decoding error: {0}")]
    Asn1Error(String),

    #[error("PKCS#7 structure error: {0}")]
    Pkcs7Error(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<der::Error> for SigningError {
    fn from(error: der::Error) -> Self {
        SigningError::Asn1Error(error.to_string())
    }
}

impl From<reqwest::Error> for SigningError {
    fn from(error: reqwest::Error) -> Self {
        SigningError::NetworkError(error.to_string())
    }
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::IoError(error.to_string())
    }
}

impl From<base64::DecodeError> for SigningError {
    fn from(error: base64::DecodeError) -> Self {
        SigningError::InvalidInput(format!("invalid base64: {error}"))
    }
}

impl From<serde_json::Error> for SigningError {
    fn from(error: serde_json::Error) -> Self {
        SigningError::InvalidInput(format!("invalid JSON: {error}"))
    }
}
