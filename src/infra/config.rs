//! Configuration management infrastructure.
//!
//! This module provides configuration file support for the remote signing
//! authority, the timestamp servers, revocation sources and the signature
//! policy. Adapters are built from these values explicitly; nothing here is
//! global.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::crl_http_client::CrlHttpConfig;
use crate::adapters::ocsp_http_client::OcspHttpConfig;
use crate::adapters::remote::GatewayConfig;
use crate::adapters::timestamp_http_client::{TimestampHttpConfig, DEFAULT_TIMESTAMP_URL};
use crate::domain::constants::{DEFAULT_POLICY_OID, DEFAULT_POLICY_URI};
use crate::domain::policy::SignaturePolicy;
use crate::infra::error::{SigningError, SigningResult};

/// Application configuration with all signing preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfiguration {
    pub gateway: GatewaySection,
    pub timestamp: TimestampSection,
    pub revocation: RevocationSection,
    pub policy: PolicySection,
    /// Extra bytes added on top of the placeholder estimate
    pub placeholder_margin: usize,
}

/// Remote signing authority settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub base_url: String,
    pub application_id: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
    pub verify_tls: bool,
}

/// RFC 3161 timestamp settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampSection {
    pub enabled: bool,
    pub primary_server: String,
    pub fallback_servers: Vec<String>,
    pub timeout_seconds: u64,
    pub retry_attempts: usize,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevocationSection {
    pub crl_enabled: bool,
    /// Fixed CRL locations; empty means use the certificates' distribution points
    pub crl_urls: Vec<String>,
    pub ocsp_enabled: bool,
    /// Fixed OCSP responder; empty means use the certificates' AIA entries
    pub ocsp_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub enabled: bool,
    pub oid: String,
    pub uri: String,
}

impl Default for SignerConfiguration {
    fn default() -> Self {
        Self {
            gateway: GatewaySection::default(),
            timestamp: TimestampSection::default(),
            revocation: RevocationSection::default(),
            policy: PolicySection::default(),
            placeholder_margin: 0,
        }
    }
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:8443/api/v1".to_string(),
            application_id: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_seconds: 30,
            verify_tls: true,
        }
    }
}

impl Default for TimestampSection {
    fn default() -> Self {
        Self {
            enabled: true,
            primary_server: DEFAULT_TIMESTAMP_URL.to_string(),
            fallback_servers: Vec::new(),
            timeout_seconds: 30,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

impl Default for RevocationSection {
    fn default() -> Self {
        Self {
            crl_enabled: true,
            crl_urls: Vec::new(),
            ocsp_enabled: false,
            ocsp_url: String::new(),
        }
    }
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            enabled: true,
            oid: DEFAULT_POLICY_OID.to_string(),
            uri: DEFAULT_POLICY_URI.to_string(),
        }
    }
}

impl SignerConfiguration {
    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        let g = &self.gateway;
        let mut config = GatewayConfig::new(&g.base_url, &g.application_id)
            .with_credentials(&g.username, &g.password)
            .with_timeout(g.timeout_seconds);
        if !g.verify_tls {
            config = config.with_insecure_tls();
        }
        config
    }

    /// `None` when timestamping is switched off.
    #[must_use]
    pub fn timestamp_config(&self) -> Option<TimestampHttpConfig> {
        let t = &self.timestamp;
        t.enabled.then(|| TimestampHttpConfig {
            primary: t.primary_server.clone(),
            fallbacks: t.fallback_servers.clone(),
            timeout: Duration::from_secs(t.timeout_seconds),
            retries_per_server: t.retry_attempts,
            retry_delay: Duration::from_millis(t.retry_delay_ms),
        })
    }

    /// `None` when CRL collection is switched off.
    #[must_use]
    pub fn crl_config(&self) -> Option<CrlHttpConfig> {
        self.revocation.crl_enabled.then(|| CrlHttpConfig {
            urls: self.revocation.crl_urls.clone(),
            ..CrlHttpConfig::default()
        })
    }

    /// `None` when OCSP is switched off.
    #[must_use]
    pub fn ocsp_config(&self) -> Option<OcspHttpConfig> {
        let r = &self.revocation;
        r.ocsp_enabled.then(|| OcspHttpConfig {
            url: (!r.ocsp_url.is_empty()).then(|| r.ocsp_url.clone()),
            ..OcspHttpConfig::default()
        })
    }

    pub fn signature_policy(&self) -> SigningResult<Option<SignaturePolicy>> {
        if !self.policy.enabled {
            return Ok(None);
        }
        SignaturePolicy::new(&self.policy.oid, &self.policy.uri).map(Some)
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> SigningResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("remote-cms-signer").join("config.toml"))
        } else {
            Ok(PathBuf::from("remote-cms-signer-config.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> SigningResult<SignerConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = SignerConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> SigningResult<SignerConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: SignerConfiguration = toml::from_str(&content).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &SignerConfiguration) -> SigningResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigningError::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        log::info!("Configuration saved successfully");
        Ok(())
    }

    /// Validate configuration values
    pub fn validate_config(config: &SignerConfiguration) -> SigningResult<()> {
        validate_url("gateway.base_url", &config.gateway.base_url)?;
        if config.gateway.timeout_seconds == 0 {
            return Err(SigningError::ConfigurationError(
                "Gateway timeout must be greater than 0".to_string(),
            ));
        }

        if config.timestamp.enabled {
            validate_url("timestamp.primary_server", &config.timestamp.primary_server)?;
            for url in &config.timestamp.fallback_servers {
                validate_url("timestamp.fallback_servers", url)?;
            }
            if config.timestamp.timeout_seconds == 0 {
                return Err(SigningError::ConfigurationError(
                    "Timestamp timeout must be greater than 0".to_string(),
                ));
            }
            if config.timestamp.retry_attempts == 0 {
                return Err(SigningError::ConfigurationError(
                    "Retry attempts must be greater than 0".to_string(),
                ));
            }
        }

        for url in &config.revocation.crl_urls {
            validate_url("revocation.crl_urls", url)?;
        }
        if !config.revocation.ocsp_url.is_empty() {
            validate_url("revocation.ocsp_url", &config.revocation.ocsp_url)?;
        }

        config.signature_policy()?;
        Ok(())
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> SigningResult<()> {
        let mut config = self.load_or_create_default()?;

        match key {
            "gateway.base_url" => config.gateway.base_url = value.to_string(),
            "gateway.application_id" => config.gateway.application_id = value.to_string(),
            "gateway.username" => config.gateway.username = value.to_string(),
            "gateway.timeout_seconds" => config.gateway.timeout_seconds = parse_value(key, value)?,
            "gateway.verify_tls" => config.gateway.verify_tls = parse_value(key, value)?,
            "timestamp.enabled" => config.timestamp.enabled = parse_value(key, value)?,
            "timestamp.primary_server" => config.timestamp.primary_server = value.to_string(),
            "revocation.crl_enabled" => config.revocation.crl_enabled = parse_value(key, value)?,
            "revocation.ocsp_enabled" => config.revocation.ocsp_enabled = parse_value(key, value)?,
            "revocation.ocsp_url" => config.revocation.ocsp_url = value.to_string(),
            "policy.enabled" => config.policy.enabled = parse_value(key, value)?,
            "policy.oid" => config.policy.oid = value.to_string(),
            "policy.uri" => config.policy.uri = value.to_string(),
            "placeholder_margin" => config.placeholder_margin = parse_value(key, value)?,
            _ => {
                return Err(SigningError::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        Self::validate_config(&config)?;
        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> SigningResult<String> {
        let config = self.load()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("JSON export failed: {e}"))),
        }
    }
}

/// Configuration export formats
#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    Toml,
    Json,
}

fn validate_url(key: &str, url: &str) -> SigningResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(SigningError::ConfigurationError(format!(
            "{key} must be an http(s) URL, got {url:?}"
        )))
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> SigningResult<T> {
    value
        .parse()
        .map_err(|_| SigningError::ConfigurationError(format!("Invalid value for {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_configuration() {
        let config = SignerConfiguration::default();
        assert!(ConfigManager::validate_config(&config).is_ok());
        assert_eq!(config.placeholder_margin, 0);
        assert!(config.timestamp_config().is_some());
        let policy = config.signature_policy().unwrap().unwrap();
        assert_eq!(policy.oid().to_string(), DEFAULT_POLICY_OID);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = SignerConfiguration::default();
        config.gateway.application_id = "app".into();
        config.revocation.crl_urls = vec!["http://crl.test/a.crl".into()];
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: SignerConfiguration = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: SignerConfiguration =
            toml::from_str("placeholder_margin = 512\n[timestamp]\nretry_attempts = 5\n").unwrap();
        assert_eq!(config.placeholder_margin, 512);
        assert_eq!(config.timestamp.retry_attempts, 5);
        assert_eq!(config.gateway, GatewaySection::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = SignerConfiguration::default();
        config.gateway.base_url = "ftp://nope".into();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = SignerConfiguration::default();
        config.policy.oid = "not-an-oid".into();
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = SignerConfiguration::default();
        config.timestamp.retry_attempts = 0;
        assert!(ConfigManager::validate_config(&config).is_err());
        config.timestamp.enabled = false;
        assert!(ConfigManager::validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_manager_with_temp_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(&config_path);

        let config = manager.load_or_create_default().unwrap();
        assert!(config_path.exists());
        assert_eq!(manager.load().unwrap(), config);

        manager.update_value("placeholder_margin", "2048").unwrap();
        manager.update_value("timestamp.enabled", "false").unwrap();
        let updated = manager.load().unwrap();
        assert_eq!(updated.placeholder_margin, 2048);
        assert!(updated.timestamp_config().is_none());
        assert!(manager.update_value("no.such.key", "1").is_err());
        assert!(manager.update_value("gateway.verify_tls", "maybe").is_err());
    }

    #[test]
    fn test_ocsp_config_follows_flag() {
        let mut config = SignerConfiguration::default();
        assert!(config.ocsp_config().is_none());

        config.revocation.ocsp_enabled = true;
        assert_eq!(config.ocsp_config().unwrap().url, None);

        config.revocation.ocsp_url = "http://ocsp.test/".into();
        assert_eq!(
            config.ocsp_config().unwrap().url.as_deref(),
            Some("http://ocsp.test/")
        );
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.revocation.ocsp_url = "ldap://ocsp.test".into();
        assert!(ConfigManager::validate_config(&config).is_err());
    }
}
