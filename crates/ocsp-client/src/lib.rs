//! OCSP revocation checking client
//!
//! Network side of the OCSP engine in `ocsp-proto`: downloads issuer and
//! leaf certificates, posts requests to the responder and validates the
//! answers.
//!
//! # Example
//!
//! ```rust,no_run
//! use ocsp_client::{OcspClient, OcspConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OcspClient::new();
//! let verdict = client
//!     .check_by_domain("example.com", &OcspConfig::default())
//!     .await?;
//! println!("{} (from {})", verdict.status, verdict.ocsp_url);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod transport;

pub use client::{host_from_domain, OcspClient, RawOcspResponse};
pub use config::{ConfigError, OcspConfig, DEFAULT_TIMEOUT_MS};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, Transport};

pub use ocsp_proto::{
    decode_der_or_pem, CaInfo, CertStatus, Certificate, CertificateInput, NetworkStep, OcspError,
    RevocationReason, Verdict,
};
