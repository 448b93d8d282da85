//! HTTP client adapter for RFC3161 timestamp authority requests.
//! Provides retry and failover over a list of timestamp servers.

use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::collaborators::TimestampAuthorityClient;
use crate::domain::pkcs7::TimestampToken;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::{TimestampParserService, TimestampRequestBuilder};

/// Default public TSA.
pub const DEFAULT_TIMESTAMP_URL: &str = "https://freetsa.org/tsr";

/// Configuration for timestamp HTTP operations.
#[derive(Debug, Clone)]
pub struct TimestampHttpConfig {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub timeout: Duration,
    pub retries_per_server: usize,
    pub retry_delay: Duration,
}

impl TimestampHttpConfig {
    #[must_use]
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn servers(&self) -> Vec<&str> {
        std::iter::once(self.primary.as_str())
            .chain(self.fallbacks.iter().map(String::as_str))
            .collect()
    }
}

impl Default for TimestampHttpConfig {
    fn default() -> Self {
        Self {
            primary: DEFAULT_TIMESTAMP_URL.to_string(),
            fallbacks: Vec::new(),
            timeout: Duration::from_secs(30),
            retries_per_server: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// HTTP adapter performing RFC3161 POST exchanges.
pub struct TimestampHttpClient {
    cfg: TimestampHttpConfig,
    http: reqwest::Client,
    requests: TimestampRequestBuilder,
}

impl TimestampHttpClient {
    /// Create a new client from config.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(cfg: TimestampHttpConfig) -> SigningResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent(concat!("remote-cms-signer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SigningError::NetworkError(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            cfg,
            http,
            requests: TimestampRequestBuilder::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &TimestampHttpConfig {
        &self.cfg
    }

    /// Attempt to obtain a timestamp response body for the given request DER.
    pub async fn post_request(&self, ts_request_der: &[u8]) -> SigningResult<Vec<u8>> {
        let mut last_err: Option<SigningError> = None;
        for (idx, server) in self.cfg.servers().into_iter().enumerate() {
            log::info!("timestamp server attempt {}: {}", idx + 1, server);
            match self.post_with_retries(server, ts_request_der).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    log::warn!("server {server} failed: {e}");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| SigningError::TimestampError("All servers failed".into())))
    }

    async fn post_with_retries(&self, server: &str, body: &[u8]) -> SigningResult<Vec<u8>> {
        let attempts = self.cfg.retries_per_server.max(1);
        let mut last_err = SigningError::TimestampError(format!("no attempt made against {server}"));
        for attempt in 1..=attempts {
            log::debug!("timestamp http attempt {attempt} of {attempts} -> {server}");
            match self.single_post(server, body).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    last_err = e;
                    if attempt < attempts {
                        tokio::time::sleep(self.cfg.retry_delay).await;
                    }
                }
            }
        }
        Err(last_err)
    }

    async fn single_post(&self, server: &str, body: &[u8]) -> SigningResult<Vec<u8>> {
        let resp = self
            .http
            .post(server)
            .header("Content-Type", "application/timestamp-query")
            .header("Accept", "application/timestamp-reply")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| SigningError::TimestampError(format!("HTTP error: {e}")))?;
        if !resp.status().is_success() {
            return Err(SigningError::TimestampError(format!(
                "HTTP {} from {server}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SigningError::TimestampError(format!("Read body failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TimestampAuthorityClient for TimestampHttpClient {
    async fn get_timestamp_token(&self, signature: &[u8]) -> SigningResult<TimestampToken> {
        let request = self.requests.build_request(signature)?;
        let response = self.post_request(&request).await?;
        let token = TimestampParserService::token_for_signature(&response, signature)?;
        log::info!("timestamp token received ({} bytes)", token.der().len());
        Ok(token)
    }
}
