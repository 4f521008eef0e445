//! Revocation check orchestration
//!
//! [`OcspClient`] runs the full pipeline for one certificate: expiry check,
//! URL resolution, issuer resolution, request building, the OCSP POST and
//! response validation. Each call is independent; nothing is cached between
//! checks and the configuration is only read.

use crate::config::OcspConfig;
use crate::transport::{HttpRequest, HttpTransport, Transport};
use chrono::Utc;
use ocsp_proto::{
    decode_der_or_pem, get_ca_info, CaInfo, Certificate, CertificateInput, CryptoEngine,
    DefaultCryptoEngine, NetworkStep, OcspError, OcspRequest, OcspRequestBuilder, Result,
    ResponseValidator, ValidationContext, Verdict,
};
use std::borrow::Cow;
use tracing::{debug, info};

/// Undecoded responder answer returned by [`OcspClient::get_raw_response`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOcspResponse {
    /// DER bytes as received
    pub raw_response: Vec<u8>,
    /// Nonce sent with the request, if any
    pub nonce: Option<Vec<u8>>,
    /// Issuer certificate used to build the request, PEM encoded
    pub issuer_pem: String,
}

/// Request/response exchange shared by the checking and raw operations
struct Exchange<'c> {
    ocsp_url: String,
    issuer: Cow<'c, Certificate>,
    request: OcspRequest,
    response: Vec<u8>,
}

/// OCSP client generic over its network collaborator
pub struct OcspClient<T: Transport = HttpTransport> {
    transport: T,
    engine: Box<dyn CryptoEngine>,
}

impl OcspClient<HttpTransport> {
    /// Client using the real network and the default crypto engine
    pub fn new() -> Self {
        Self::with_transport(HttpTransport::new())
    }
}

impl Default for OcspClient<HttpTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> OcspClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            engine: Box::new(DefaultCryptoEngine::new()),
        }
    }

    /// Replace the crypto engine used for hashing, nonces and verification
    pub fn with_engine(mut self, engine: impl CryptoEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Check the revocation status of a certificate
    ///
    /// Fails with [`OcspError::CertificateExpired`] before any network
    /// access when the certificate is past its notAfter.
    pub async fn check_by_certificate<'a>(
        &self,
        cert: impl Into<CertificateInput<'a>>,
        config: &OcspConfig,
    ) -> Result<Verdict> {
        let certificate = cert.into().normalize()?;
        let exchange = self.send_request(&certificate, config).await?;

        let verdict = ResponseValidator::new(self.engine.as_ref()).validate(
            &exchange.response,
            &ValidationContext {
                certificate: &certificate,
                issuer: &exchange.issuer,
                responder_certificate: config.ocsp_certificate.as_ref(),
                nonce: exchange.request.nonce(),
                validate_signature: config.validate_signature,
                include_raw_response: config.raw_response,
                ocsp_url: &exchange.ocsp_url,
            },
        )?;

        info!(
            serial = %certificate.serial_hex(),
            status = %verdict.status,
            url = %verdict.ocsp_url,
            "OCSP check complete"
        );
        Ok(verdict)
    }

    /// Fetch a host's live certificate and check it
    ///
    /// Accepts a bare host name or a URL, from which the host is taken.
    pub async fn check_by_domain(&self, domain: &str, config: &OcspConfig) -> Result<Verdict> {
        let host = host_from_domain(domain)?;
        let leaf = self.download_leaf_certificate(&host, config.timeout_ms).await?;
        self.check_by_certificate(&leaf, config).await
    }

    /// Run the request pipeline without interpreting the answer
    pub async fn get_raw_response<'a>(
        &self,
        cert: impl Into<CertificateInput<'a>>,
        config: &OcspConfig,
    ) -> Result<RawOcspResponse> {
        let certificate = cert.into().normalize()?;
        let exchange = self.send_request(&certificate, config).await?;
        let (_, nonce) = exchange.request.into_parts();
        Ok(RawOcspResponse {
            raw_response: exchange.response,
            nonce,
            issuer_pem: exchange.issuer.to_pem(),
        })
    }

    /// Responder and issuer URLs of a certificate, without network access
    pub fn get_cert_urls<'a>(&self, cert: impl Into<CertificateInput<'a>>) -> Result<CaInfo> {
        let certificate = cert.into().normalize()?;
        get_ca_info(&certificate)
    }

    /// Download the issuer of `cert` from its CA Issuers URL
    ///
    /// The body may be DER or PEM regardless of its Content-Type.
    pub async fn download_issuer_certificate<'a>(
        &self,
        cert: impl Into<CertificateInput<'a>>,
        timeout_ms: u64,
    ) -> Result<Certificate> {
        let certificate = cert.into().normalize()?;
        let issuer_url = get_ca_info(&certificate)?.issuer_url;
        debug!(url = %issuer_url, "Downloading issuer certificate");

        let response = self
            .transport
            .fetch_bytes(
                &HttpRequest::get(issuer_url.as_str()),
                timeout_ms,
                NetworkStep::IssuerDownload,
            )
            .await?;
        if !response.is_success() {
            return Err(OcspError::IssuerDownloadFailed {
                status: response.status,
                text: response.status_text,
                url: issuer_url,
            });
        }

        decode_der_or_pem(&response.body).map_err(|e| {
            debug!(error = %e, "Issuer certificate body rejected");
            OcspError::InvalidIssuerCertificate
        })
    }

    /// Fetch the leaf certificate a host presents on port 443
    pub async fn download_leaf_certificate(
        &self,
        host: &str,
        timeout_ms: u64,
    ) -> Result<Certificate> {
        let der = self.transport.fetch_leaf_certificate(host, timeout_ms).await?;
        Certificate::from_der(&der)
    }

    async fn send_request<'c>(
        &self,
        certificate: &Certificate,
        config: &'c OcspConfig,
    ) -> Result<Exchange<'c>> {
        if certificate.is_expired_at(Utc::now()) {
            return Err(OcspError::CertificateExpired(
                certificate.not_after().to_rfc3339(),
            ));
        }

        let ocsp_url = match &config.ocsp_url {
            Some(url) => url.clone(),
            None => get_ca_info(certificate)?.ocsp_url,
        };

        let issuer = match &config.ca {
            Some(ca) => Cow::Borrowed(ca),
            None => Cow::Owned(
                self.download_issuer_certificate(certificate, config.timeout_ms)
                    .await?,
            ),
        };

        let request = OcspRequestBuilder::new(self.engine.as_ref())
            .with_nonce(config.enable_nonce)
            .build(certificate, &issuer)?;
        debug!(
            url = %ocsp_url,
            serial = %certificate.serial_hex(),
            nonce = request.nonce().is_some(),
            "Sending OCSP request"
        );

        let response = self
            .transport
            .fetch_bytes(
                &HttpRequest::ocsp_post(ocsp_url.as_str(), request.to_der().to_vec()),
                config.timeout_ms,
                NetworkStep::OcspRequest,
            )
            .await?;
        if !response.is_success() {
            return Err(OcspError::OcspRequestFailed {
                status: response.status,
                text: response.status_text,
                url: ocsp_url,
            });
        }

        Ok(Exchange {
            ocsp_url,
            issuer,
            request,
            response: response.body,
        })
    }
}

/// Host part of a domain argument
///
/// Anything containing a slash is parsed as a URL.
pub fn host_from_domain(domain: &str) -> Result<String> {
    if !domain.contains('/') {
        return Ok(domain.to_string());
    }
    let url = url::Url::parse(domain).map_err(|_| OcspError::InvalidUrl(domain.to_string()))?;
    url.host_str()
        .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_string())
        .ok_or_else(|| OcspError::InvalidUrl(domain.to_string()))
}
