//! HTTP client for the remote signing authority.
//!
//! All connection settings arrive in one `GatewayConfig` value handed to the
//! constructor; there is no process-wide client state.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::protocol::{
    CertificateChainRequest, CertificateChainResponse, ErrorResponse, SignRequest, SignResponse,
    PROTOCOL_VERSION,
};
use crate::adapters::collaborators::RemoteSigningGateway;
use crate::domain::crypto::{CertificateChain, DigestInfoBlob, RawSignature};
use crate::infra::error::{SigningError, SigningResult};

/// Configuration for connecting to the signing authority.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the service (e.g., `https://sign.example.com/api/v1`).
    pub base_url: String,
    /// Application identifier assigned by the authority.
    pub application_id: String,
    /// Basic authentication user name.
    pub username: String,
    /// Basic authentication password.
    pub password: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates (should be true in production).
    pub verify_tls: bool,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, application_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            application_id: application_id.into(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 30,
            verify_tls: true,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Disable TLS verification (for testing only!).
    #[must_use]
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("application_id", &self.application_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

/// JSON-over-HTTPS signing gateway.
pub struct HttpSigningGateway {
    config: GatewayConfig,
    document_name: String,
    client: reqwest::Client,
}

impl HttpSigningGateway {
    /// Create a new gateway client.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(config: GatewayConfig) -> SigningResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| {
                SigningError::NetworkError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            document_name: "document".to_string(),
            client,
        })
    }

    /// Name shown to the signer for the next requests.
    #[must_use]
    pub fn with_document_name(mut self, name: impl Into<String>) -> Self {
        self.document_name = name.into();
        self
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Retrieve the signer's certificate chain (signer first).
    ///
    /// # Errors
    /// Returns error if the chain cannot be retrieved or parsed.
    pub async fn get_certificate_chain(&self) -> SigningResult<CertificateChain> {
        let request = CertificateChainRequest {
            version: PROTOCOL_VERSION.to_string(),
            application_id: self.config.application_id.clone(),
        };
        let response: CertificateChainResponse = self.post("certificate", &request).await?;
        CertificateChain::from_pem(response.certificate_chain_pem.as_bytes())
    }

    async fn post<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> SigningResult<Resp> {
        let url = self.config.endpoint(path);
        log::debug!("POST {url}");
        let mut builder = self.client.post(&url).json(request);
        if !self.config.username.is_empty() {
            builder = builder.basic_auth(&self.config.username, Some(&self.config.password));
        }
        let response = builder.send().await.map_err(|e| {
            SigningError::NetworkError(format!("Failed to reach signing service: {e}"))
        })?;
        Self::handle_response(response).await
    }

    /// Handle HTTP response and parse JSON body.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> SigningResult<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| SigningError::NetworkError(format!("Failed to parse response: {e}")))
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(Self::denial(status.as_u16(), &error_text))
        }
    }

    /// Surface the authority's own status and message when it sent them.
    fn denial(http_status: u16, body: &str) -> SigningError {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(error) => SigningError::RemoteDenied {
                status: error.status,
                message: error.message,
            },
            Err(_) => SigningError::RemoteDenied {
                status: http_status.to_string(),
                message: body.trim().to_string(),
            },
        }
    }
}

#[async_trait]
impl RemoteSigningGateway for HttpSigningGateway {
    async fn sign(&self, digest_info: &DigestInfoBlob) -> SigningResult<RawSignature> {
        let request = SignRequest::new(
            digest_info.as_bytes(),
            &self.config.application_id,
            &self.document_name,
        );
        let response: SignResponse = self.post("sign", &request).await?;
        let signature = response.decode_signature().map_err(|e| {
            SigningError::CryptographicError(format!("Failed to decode signature: {e}"))
        })?;
        log::info!("Remote signature received ({} bytes)", signature.len());
        RawSignature::new(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = GatewayConfig::new("https://sign.example.com/api/", "app")
            .with_credentials("user", "secret")
            .with_timeout(60)
            .with_insecure_tls();

        assert_eq!(config.endpoint("sign"), "https://sign.example.com/api/sign");
        assert_eq!(config.username, "user");
        assert_eq!(config.timeout_secs, 60);
        assert!(!config.verify_tls);
        assert!(!format!("{config:?}").contains("secret"));
    }

    #[test]
    fn test_denial_mapping() {
        match HttpSigningGateway::denial(400, r#"{"status":"802","message":"invalid PIN"}"#) {
            SigningError::RemoteDenied { status, message } => {
                assert_eq!(status, "802");
                assert_eq!(message, "invalid PIN");
            }
            other => panic!("Wrong error type: {other:?}"),
        }
        match HttpSigningGateway::denial(503, "unavailable\n") {
            SigningError::RemoteDenied { status, message } => {
                assert_eq!(status, "503");
                assert_eq!(message, "unavailable");
            }
            other => panic!("Wrong error type: {other:?}"),
        }
    }
}
