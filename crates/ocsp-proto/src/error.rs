//! OCSP error types
//!
//! Every failure of a revocation check is surfaced as exactly one
//! [`OcspError`] variant. Nothing is retried and no partial verdict is
//! produced; signature and chain failures abort the check.

use crate::response::OcspResponseStatus;
use std::fmt;

/// Network step that was running when a timeout or transport failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStep {
    /// GET of the issuer certificate from the CA Issuers URL
    IssuerDownload,
    /// POST of the OCSP request to the responder
    OcspRequest,
    /// TLS connection used to fetch a host's leaf certificate
    TlsConnect,
}

impl fmt::Display for NetworkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IssuerDownload => f.write_str("issuer certificate download"),
            Self::OcspRequest => f.write_str("OCSP request"),
            Self::TlsConnect => f.write_str("TLS connection"),
        }
    }
}

/// Errors that can occur while checking a certificate over OCSP
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OcspError {
    /// PEM text could not be decoded into a certificate
    #[error("Invalid PEM format: expected a single BEGIN/END CERTIFICATE block with base64 DER content")]
    InvalidPemFormat,

    /// Input is not a certificate shape this library understands
    #[error("Unsupported certificate type: {0}")]
    UnsupportedCertificateType(String),

    /// DER bytes are not a valid X.509 certificate
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Downloaded issuer certificate is neither DER nor PEM
    #[error("Downloaded issuer certificate could not be decoded as DER or PEM")]
    InvalidIssuerCertificate,

    /// Certificate carries no Authority Information Access extension
    #[error("Certificate has no Authority Information Access extension")]
    MissingAIAExtension,

    /// AIA extension has no OCSP responder entry
    #[error("Certificate has no OCSP responder URL")]
    MissingOcspUrl,

    /// AIA extension has no CA Issuers entry
    #[error("Certificate has no CA Issuers URL")]
    MissingIssuerUrl,

    /// Certificate notAfter is in the past
    #[error("Certificate expired at {0}")]
    CertificateExpired(String),

    /// Issuer certificate download returned a non-2xx status
    #[error("Issuer certificate download from {url} failed: HTTP {status} {text}")]
    IssuerDownloadFailed {
        /// HTTP status code
        status: u16,
        /// HTTP status text
        text: String,
        /// URL that was requested
        url: String,
    },

    /// OCSP POST returned a non-2xx status
    #[error("OCSP request to {url} failed: HTTP {status} {text}")]
    OcspRequestFailed {
        /// HTTP status code
        status: u16,
        /// HTTP status text
        text: String,
        /// Responder URL
        url: String,
    },

    /// Responder answered with a non-successful OCSPResponseStatus
    #[error("OCSP server returned status {0}")]
    OcspServerError(OcspResponseStatus),

    /// Successful status but no responseBytes
    #[error("OCSP response is successful but carries no response bytes")]
    MissingResponseBytes,

    /// responseType is not id-pkix-ocsp-basic
    #[error("Unknown OCSP response type: {0}")]
    UnknownResponseType(String),

    /// BasicOCSPResponse does not contain exactly one SingleResponse
    #[error("Expected exactly one SingleResponse, got {0}")]
    UnexpectedResponseCount(usize),

    /// No signing certificate could be resolved for the response
    #[error("Could not resolve the OCSP responder certificate")]
    ResponderNotFound,

    /// Embedded responder certificate does not chain to the trust anchor
    #[error("Responder certificate chain validation failed: {0}")]
    ChainValidationFailed(String),

    /// Response signature does not verify under the resolved certificate
    #[error("OCSP response signature verification failed")]
    SignatureVerificationFailed,

    /// Response nonce differs from the request nonce
    #[error("OCSP response nonce does not match the request nonce")]
    NonceMismatch,

    /// SingleResponse CertID does not identify the queried certificate
    #[error("OCSP response is for a different certificate")]
    CertificateMismatch,

    /// certStatus carries an unknown CHOICE tag
    #[error("Unrecognized certificate status tag [{0}]")]
    UnrecognizedCertStatus(u32),

    /// Response bytes are not a well-formed OCSPResponse
    #[error("Malformed OCSP response: {0}")]
    MalformedResponse(String),

    /// Hash or signature algorithm is not supported by the crypto engine
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Domain or URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A network step exceeded its timeout
    #[error("{step}: Operation timed out after {timeout_ms}ms")]
    TimeoutExceeded {
        /// Step that timed out
        step: NetworkStep,
        /// Configured timeout
        timeout_ms: u64,
    },

    /// DNS, connection or TLS level failure
    #[error("{step}: {message}")]
    TransportError {
        /// Step that failed
        step: NetworkStep,
        /// Underlying cause
        message: String,
    },

    /// TLS peer presented no certificate
    #[error("No certificate found for host {host}")]
    NoPeerCertificate {
        /// Host that was contacted
        host: String,
    },
}

impl OcspError {
    /// Stable machine-readable identifier for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPemFormat => "invalid_pem_format",
            Self::UnsupportedCertificateType(_) => "unsupported_certificate_type",
            Self::InvalidCertificate(_) => "invalid_certificate",
            Self::InvalidIssuerCertificate => "invalid_issuer_certificate",
            Self::MissingAIAExtension => "missing_aia_extension",
            Self::MissingOcspUrl => "missing_ocsp_url",
            Self::MissingIssuerUrl => "missing_issuer_url",
            Self::CertificateExpired(_) => "certificate_expired",
            Self::IssuerDownloadFailed { .. } => "issuer_download_failed",
            Self::OcspRequestFailed { .. } => "ocsp_request_failed",
            Self::OcspServerError(_) => "ocsp_server_error",
            Self::MissingResponseBytes => "missing_response_bytes",
            Self::UnknownResponseType(_) => "unknown_response_type",
            Self::UnexpectedResponseCount(_) => "unexpected_response_count",
            Self::ResponderNotFound => "responder_not_found",
            Self::ChainValidationFailed(_) => "chain_validation_failed",
            Self::SignatureVerificationFailed => "signature_verification_failed",
            Self::NonceMismatch => "nonce_mismatch",
            Self::CertificateMismatch => "certificate_mismatch",
            Self::UnrecognizedCertStatus(_) => "unrecognized_cert_status",
            Self::MalformedResponse(_) => "malformed_response",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::InvalidUrl(_) => "invalid_url",
            Self::TimeoutExceeded { .. } => "timeout_exceeded",
            Self::TransportError { .. } => "transport_error",
            Self::NoPeerCertificate { .. } => "no_peer_certificate",
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, OcspError>;
