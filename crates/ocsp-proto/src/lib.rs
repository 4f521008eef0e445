//! OCSP Protocol Implementation
//!
//! This crate implements the client side of the Online Certificate Status
//! Protocol as defined in RFC 6960, with nonces per RFC 8954. It performs no
//! network I/O; see the `ocsp-client` crate for transport and orchestration.
//!
//! # Features
//!
//! - Certificate input normalization (PEM, DER, rustls handles, parsed)
//! - Authority Information Access lookup
//! - OCSP request encoding with SHA-1 or SHA-2 CertIDs and random nonces
//! - Response decoding and validation: status, responder resolution,
//!   signature and delegated-responder checks, nonce and CertID matching
//! - Pluggable cryptography through [`CryptoEngine`]
//!
//! # Example
//!
//! ```rust,no_run
//! use ocsp_proto::{
//!     Certificate, DefaultCryptoEngine, OcspRequestBuilder, ResponseValidator,
//!     ValidationContext,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cert = Certificate::from_pem(&std::fs::read_to_string("leaf.pem")?)?;
//! let issuer = Certificate::from_pem(&std::fs::read_to_string("issuer.pem")?)?;
//! let engine = DefaultCryptoEngine::new();
//!
//! // Build the request and send it to the responder
//! let request = OcspRequestBuilder::new(&engine).build(&cert, &issuer)?;
//! let response_bytes: Vec<u8> = Vec::new(); // POST request.to_der() here
//!
//! let verdict = ResponseValidator::new(&engine).validate(
//!     &response_bytes,
//!     &ValidationContext {
//!         certificate: &cert,
//!         issuer: &issuer,
//!         responder_certificate: None,
//!         nonce: request.nonce(),
//!         validate_signature: true,
//!         include_raw_response: false,
//!         ocsp_url: "http://ocsp.example.com",
//!     },
//! )?;
//! println!("{}", verdict.status);
//! # Ok(())
//! # }
//! ```

pub mod ca_info;
pub mod cert_id;
pub mod certificate;
pub mod crypto;
pub mod der;
pub mod error;
pub mod request;
pub mod response;
pub mod validator;
pub mod verdict;

pub use ca_info::{get_ca_info, CaInfo};
pub use cert_id::CertId;
pub use certificate::{
    decode_der_or_pem, AccessDescription, AccessMethod, Certificate, CertificateInput,
};
pub use crypto::{CryptoEngine, DefaultCryptoEngine, HashAlgorithm, SignatureAlgorithm};
pub use error::{NetworkStep, OcspError, Result};
pub use request::{OcspRequest, OcspRequestBuilder, NONCE_LEN};
pub use response::{
    BasicOcspResponse, OcspResponse, OcspResponseStatus, ResponderId, SingleResponse,
    SingleStatus,
};
pub use validator::{ResponseValidator, SignerSource, ValidationContext};
pub use verdict::{CertStatus, RevocationReason, Verdict};
