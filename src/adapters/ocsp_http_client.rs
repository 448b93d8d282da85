//! OCSP lookup adapter.
//!
//! Asks the responder named in the certificate's Authority Information Access
//! extension (or a fixed URL) about one certificate and returns the
//! `BasicOCSPResponse`, which is what gets archived in the signature.

use std::time::Duration;

use async_trait::async_trait;
use sha1::{Digest, Sha1};

use crate::adapters::collaborators::RevocationResponder;
use crate::domain::asn1::{self, child, Tlv};
use crate::domain::constants;
use crate::domain::crypto::Certificate;
use crate::infra::error::{SigningError, SigningResult};

pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";
pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";

/// Settings for [`OcspHttpClient`].
#[derive(Debug, Clone)]
pub struct OcspHttpConfig {
    /// Responder used instead of the certificate's AIA entry.
    pub url: Option<String>,
    pub timeout: Duration,
}

impl Default for OcspHttpConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(20),
        }
    }
}

pub struct OcspHttpClient {
    cfg: OcspHttpConfig,
    http: reqwest::Client,
}

impl OcspHttpClient {
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(cfg: OcspHttpConfig) -> SigningResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent(concat!("remote-cms-signer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SigningError::NetworkError(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { cfg, http })
    }

    fn candidate_urls(&self, certificate: &Certificate) -> Vec<String> {
        if let Some(url) = &self.cfg.url {
            return vec![url.clone()];
        }
        certificate
            .ocsp_responder_uris()
            .into_iter()
            .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
            .collect()
    }

    async fn query(&self, url: &str, request: &[u8]) -> SigningResult<Vec<u8>> {
        let resp = self
            .http
            .post(url)
            .header("Content-Type", OCSP_REQUEST_CONTENT_TYPE)
            .header("Accept", OCSP_RESPONSE_CONTENT_TYPE)
            .body(request.to_vec())
            .send()
            .await
            .map_err(|e| SigningError::RevocationError(format!("OCSP request to {url}: {e}")))?;
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
        basic_response(&body)
    }
}

/// DER `OCSPRequest` for `certificate`, identified through its issuer.
///
/// ```text
/// OCSPRequest ::= SEQUENCE { tbsRequest SEQUENCE { requestList SEQUENCE OF
///     Request ::= SEQUENCE { reqCert CertID } } }
/// CertID ::= SEQUENCE { hashAlgorithm, issuerNameHash, issuerKeyHash, serialNumber }
/// ```
pub fn build_request(certificate: &Certificate, issuer: &Certificate) -> SigningResult<Vec<u8>> {
    let name_hash = Sha1::digest(issuer.subject_der()?);
    let key_hash = Sha1::digest(issuer.public_key_bits());
    let cert_id = asn1::sequence(&[
        &asn1::algorithm_identifier(&constants::OID_SHA1),
        &asn1::octet_string(&name_hash),
        &asn1::octet_string(&key_hash),
        &certificate.serial_der()?,
    ]);
    let request = asn1::sequence(&[&cert_id]);
    let request_list = asn1::sequence(&[&request]);
    let tbs_request = asn1::sequence(&[&request_list]);
    Ok(asn1::sequence(&[&tbs_request]))
}

/// Unwrap an `OCSPResponse` down to its `BasicOCSPResponse`.
///
/// Anything but `successful(0)` with `id-pkix-ocsp-basic` bytes is an error.
pub fn basic_response(body: &[u8]) -> SigningResult<Vec<u8>> {
    let malformed = |e: SigningError| SigningError::RevocationError(format!("bad OCSP response: {e}"));

    let response = Tlv::parse(body)
        .and_then(|t| t.expect_tag(constants::ASN1_SEQUENCE_TAG, "OCSPResponse"))
        .map_err(malformed)?;
    let fields = response.children().map_err(malformed)?;
    let status = child(&fields, 0, "OCSPResponse")
        .and_then(|t| t.expect_tag(constants::ASN1_ENUMERATED_TAG, "responseStatus"))
        .map_err(malformed)?;
    if status.value() != [0x00] {
        return Err(SigningError::RevocationError(format!(
            "OCSP responder refused the request (status {:?})",
            status.value()
        )));
    }

    let wrapped = child(&fields, 1, "OCSPResponse")
        .and_then(|t| t.expect_tag(constants::ASN1_CONTEXT_0_TAG, "responseBytes"))
        .and_then(|t| Tlv::parse(t.value()))
        .and_then(|t| t.expect_tag(constants::ASN1_SEQUENCE_TAG, "ResponseBytes"))
        .map_err(malformed)?;
    let parts = wrapped.children().map_err(malformed)?;
    let kind = child(&parts, 0, "ResponseBytes")
        .and_then(|t| t.as_oid())
        .map_err(malformed)?;
    if kind != constants::OID_OCSP_BASIC {
        return Err(SigningError::RevocationError(format!(
            "unsupported OCSP response type {kind}"
        )));
    }
    let basic = child(&parts, 1, "ResponseBytes")
        .and_then(|t| t.expect_tag(constants::ASN1_OCTET_STRING_TAG, "response"))
        .map_err(malformed)?;
    Tlv::parse(basic.value())
        .and_then(|t| t.expect_tag(constants::ASN1_SEQUENCE_TAG, "BasicOCSPResponse"))
        .map_err(malformed)?;
    Ok(basic.value().to_vec())
}

#[async_trait]
impl RevocationResponder for OcspHttpClient {
    async fn get_encoded(
        &self,
        certificate: &Certificate,
        issuer: Option<&Certificate>,
    ) -> SigningResult<Option<Vec<u8>>> {
        let Some(issuer) = issuer else {
            log::debug!("no issuer for {}, OCSP skipped", certificate.subject());
            return Ok(None);
        };
        let urls = self.candidate_urls(certificate);
        if urls.is_empty() {
            log::debug!("no OCSP responder for {}", certificate.subject());
            return Ok(None);
        }
        let request = build_request(certificate, issuer)?;
        let mut last_err = None;
        for url in &urls {
            match self.query(url, &request).await {
                Ok(basic) => {
                    log::info!("OCSP response from {url} ({} bytes)", basic.len());
                    return Ok(Some(basic));
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
