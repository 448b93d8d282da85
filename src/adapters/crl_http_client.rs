//! CRL download adapter.
//!
//! Fetches a certificate's CRL either from a fixed list of URLs or from the
//! distribution points named in the certificate itself.

use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::collaborators::RevocationResponder;
use crate::domain::asn1::Tlv;
use crate::domain::constants;
use crate::domain::crypto::Certificate;
use crate::infra::error::{SigningError, SigningResult};

/// Settings for [`CrlHttpClient`].
#[derive(Debug, Clone)]
pub struct CrlHttpConfig {
    /// URLs tried before the certificate's own distribution points.
    pub urls: Vec<String>,
    pub timeout: Duration,
}

impl Default for CrlHttpConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            timeout: Duration::from_secs(20),
        }
    }
}

pub struct CrlHttpClient {
    cfg: CrlHttpConfig,
    http: reqwest::Client,
}

impl CrlHttpClient {
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(cfg: CrlHttpConfig) -> SigningResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent(concat!("remote-cms-signer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SigningError::NetworkError(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { cfg, http })
    }

    fn candidate_urls(&self, certificate: &Certificate) -> Vec<String> {
        let mut urls = self.cfg.urls.clone();
        urls.extend(
            certificate
                .crl_distribution_uris()
                .into_iter()
                .filter(|u| u.starts_with("http://") || u.starts_with("https://")),
        );
        urls
    }

    async fn fetch(&self, url: &str) -> SigningResult<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SigningError::RevocationError(format!("CRL download from {url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(SigningError::RevocationError(format!(
                "HTTP {} from {url}",
                resp.status()
            )));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| SigningError::RevocationError(format!("Read body failed: {e}")))?;
        decode_crl(&body)
    }
}

/// Accept DER or PEM encoded CRLs and return the DER form.
pub fn decode_crl(body: &[u8]) -> SigningResult<Vec<u8>> {
    let der = if body.starts_with(b"-----BEGIN") {
        let (label, der) = der::pem::decode_vec(body)
            .map_err(|e| SigningError::RevocationError(format!("invalid PEM CRL: {e}")))?;
        if label != "X509 CRL" {
            return Err(SigningError::RevocationError(format!(
                "unexpected PEM label {label}"
            )));
        }
        der
    } else {
        body.to_vec()
    };
    Tlv::parse(&der)
        .and_then(|t| t.expect_tag(constants::ASN1_SEQUENCE_TAG, "CertificateList"))
        .map_err(|e| SigningError::RevocationError(format!("CRL is not DER: {e}")))?;
    Ok(der)
}

#[async_trait]
impl RevocationResponder for CrlHttpClient {
    async fn get_encoded(
        &self,
        certificate: &Certificate,
        _issuer: Option<&Certificate>,
    ) -> SigningResult<Option<Vec<u8>>> {
        let urls = self.candidate_urls(certificate);
        if urls.is_empty() {
            log::debug!("no CRL location for {}", certificate.subject());
            return Ok(None);
        }
        let mut last_err = None;
        for url in &urls {
            match self.fetch(url).await {
                Ok(crl) => {
                    log::info!("CRL fetched from {url} ({} bytes)", crl.len());
                    return Ok(Some(crl));
                }
                Err(e) => {
                    log::warn!("{e}");
                    last_err = Some(e);
                }
            }
        }
        last_err.map_or(Ok(None), Err)
    }
}
