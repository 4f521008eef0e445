//! Configuration for revocation checks
//!
//! An [`OcspConfig`] is passed by reference into every check and never
//! modified by the client. It can be built in code with the `with_*`
//! methods or loaded from a JSON file in which certificates are PEM strings.

use ocsp_proto::Certificate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default timeout for each network step
pub const DEFAULT_TIMEOUT_MS: u64 = 6000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Options for a single OCSP check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcspConfig {
    /// Issuer certificate, also the trust anchor for the response signature.
    /// Downloaded from the CA Issuers URL when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<Certificate>,

    /// Responder URL, overriding the one in the certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocsp_url: Option<String>,

    /// Certificate expected to have signed the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocsp_certificate: Option<Certificate>,

    /// Verify the response signature and nonce. Only disable for debugging.
    #[serde(default = "default_true")]
    pub validate_signature: bool,

    /// Timeout in milliseconds applied to each network step
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Send a random nonce with the request
    #[serde(default = "default_true")]
    pub enable_nonce: bool,

    /// Attach the raw response bytes to the verdict
    #[serde(default)]
    pub raw_response: bool,
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for OcspConfig {
    fn default() -> Self {
        Self {
            ca: None,
            ocsp_url: None,
            ocsp_certificate: None,
            validate_signature: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            enable_nonce: true,
            raw_response: false,
        }
    }
}

impl OcspConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca(mut self, ca: Certificate) -> Self {
        self.ca = Some(ca);
        self
    }

    pub fn with_ocsp_url(mut self, url: impl Into<String>) -> Self {
        self.ocsp_url = Some(url.into());
        self
    }

    pub fn with_ocsp_certificate(mut self, cert: Certificate) -> Self {
        self.ocsp_certificate = Some(cert);
        self
    }

    pub fn with_validate_signature(mut self, enabled: bool) -> Self {
        self.validate_signature = enabled;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_nonce(mut self, enabled: bool) -> Self {
        self.enable_nonce = enabled;
        self
    }

    pub fn with_raw_response(mut self, enabled: bool) -> Self {
        self.raw_response = enabled;
        self
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: OcspConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check values that serde cannot
    ///
    /// A zero timeout is accepted: it makes every network step fail
    /// immediately with a timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.ocsp_url {
            let parsed = url::Url::parse(url)
                .map_err(|e| ConfigError::Invalid(format!("Invalid OCSP URL {}: {}", url, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "OCSP URL must use http or https: {}",
                    url
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture_cert(name: &str) -> Certificate {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../ocsp-proto/tests/fixtures")
            .join(name);
        Certificate::from_pem(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = OcspConfig::default();
        assert!(config.validate_signature);
        assert!(config.enable_nonce);
        assert!(!config.raw_response);
        assert_eq!(config.timeout_ms, 6000);
        assert!(config.ca.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: OcspConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, OcspConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config: OcspConfig =
            serde_json::from_str(r#"{"timeout_ms": 250, "enable_nonce": false}"#).unwrap();
        assert_eq!(config.timeout_ms, 250);
        assert!(!config.enable_nonce);
        assert!(config.validate_signature);
    }

    #[test]
    fn test_builders() {
        let config = OcspConfig::new()
            .with_ocsp_url("http://ocsp.example.com")
            .with_validate_signature(false)
            .with_timeout_ms(0)
            .with_nonce(false)
            .with_raw_response(true);
        assert_eq!(config.ocsp_url.as_deref(), Some("http://ocsp.example.com"));
        assert!(!config.validate_signature);
        assert_eq!(config.timeout_ms, 0);
        assert!(!config.enable_nonce);
        assert!(config.raw_response);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_ocsp_url() {
        let config = OcspConfig::new().with_ocsp_url("not a url");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = OcspConfig::new().with_ocsp_url("ftp://ocsp.example.com");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_file_round_trip_with_certificates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocsp.json");

        let config = OcspConfig::new()
            .with_ca(fixture_cert("ca.pem"))
            .with_ocsp_certificate(fixture_cert("responder.pem"))
            .with_ocsp_url("http://127.0.0.1:8080/ocsp");
        config.to_file(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("-----BEGIN CERTIFICATE-----"));

        let loaded = OcspConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        assert!(matches!(OcspConfig::from_file(&missing), Err(ConfigError::Io(_))));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{ not json").unwrap();
        assert!(matches!(OcspConfig::from_file(&garbage), Err(ConfigError::Parse(_))));

        let bad_cert = dir.path().join("bad-cert.json");
        fs::write(&bad_cert, r#"{"ca": "not a certificate"}"#).unwrap();
        assert!(matches!(OcspConfig::from_file(&bad_cert), Err(ConfigError::Parse(_))));

        let bad_url = dir.path().join("bad-url.json");
        fs::write(&bad_url, r#"{"ocsp_url": "nope"}"#).unwrap();
        assert!(matches!(OcspConfig::from_file(&bad_url), Err(ConfigError::Invalid(_))));
    }
}
