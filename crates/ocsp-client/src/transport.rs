//! Network access for revocation checks
//!
//! Two operations are needed: an HTTP exchange (issuer download and OCSP
//! POST) and a TLS handshake to read a host's leaf certificate. Both run
//! under a per-call timeout and release their connection on every exit
//! path, since the connection is owned by the future that gets dropped.

use async_trait::async_trait;
use ocsp_proto::{NetworkStep, OcspError, Result};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Port used to fetch a host's leaf certificate
pub const HTTPS_PORT: u16 = 443;

/// Content type of a DER-encoded OCSP request
pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
        }
    }
}

/// Outgoing HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// POST of a DER-encoded OCSP request
    pub fn ocsp_post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![(
                "Content-Type".to_string(),
                OCSP_REQUEST_CONTENT_TYPE.to_string(),
            )],
            body: Some(body),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP response as seen by the caller
///
/// Non-2xx responses are returned, not raised: the issuer download and the
/// OCSP POST report them differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network collaborator of the OCSP client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform an HTTP exchange, failing with `TimeoutExceeded` for `step`
    /// when it takes longer than `timeout_ms`
    async fn fetch_bytes(
        &self,
        request: &HttpRequest,
        timeout_ms: u64,
        step: NetworkStep,
    ) -> Result<HttpResponse>;

    /// Connect to `host` over TLS and return the DER of its leaf certificate
    async fn fetch_leaf_certificate(&self, host: &str, timeout_ms: u64) -> Result<Vec<u8>>;
}

/// reqwest and tokio-rustls backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    tls_port: u16,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            tls_port: HTTPS_PORT,
        }
    }

    /// Use another port for leaf certificate downloads
    pub fn with_tls_port(mut self, port: u16) -> Self {
        self.tls_port = port;
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_bytes(
        &self,
        request: &HttpRequest,
        timeout_ms: u64,
        step: NetworkStep,
    ) -> Result<HttpResponse> {
        let budget = time_budget(step, timeout_ms)?;
        debug!(url = %request.url, method = ?request.method, %step, "HTTP request");

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| transport_error(step, &e))?;
        let mut builder = client.request(request.method.as_reqwest(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(HttpResponse {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body: body.to_vec(),
            })
        };

        match tokio::time::timeout(budget, exchange).await {
            Ok(Ok(response)) => {
                debug!(status = response.status, bytes = response.body.len(), "HTTP response");
                Ok(response)
            }
            Ok(Err(e)) if e.is_timeout() => Err(OcspError::TimeoutExceeded { step, timeout_ms }),
            Ok(Err(e)) => Err(transport_error(step, &e)),
            Err(_) => Err(OcspError::TimeoutExceeded { step, timeout_ms }),
        }
    }

    async fn fetch_leaf_certificate(&self, host: &str, timeout_ms: u64) -> Result<Vec<u8>> {
        let step = NetworkStep::TlsConnect;
        let budget = time_budget(step, timeout_ms)?;
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| OcspError::InvalidUrl(host.to_string()))?;
        let connector = TlsConnector::from(Arc::new(tls_client_config()));
        debug!(host, port = self.tls_port, "Fetching leaf certificate");

        let handshake = async {
            let stream = TcpStream::connect((host, self.tls_port)).await?;
            let tls_stream = connector.connect(server_name, stream).await?;
            let (_, connection) = tls_stream.get_ref();
            let leaf = connection
                .peer_certificates()
                .and_then(|certs| certs.first())
                .map(|cert| cert.as_ref().to_vec());
            Ok::<_, std::io::Error>(leaf)
        };

        let leaf = tokio::time::timeout(budget, handshake)
            .await
            .map_err(|_| OcspError::TimeoutExceeded { step, timeout_ms })?
            .map_err(|e| OcspError::TransportError {
                step,
                message: format!("{}: {}", host, e),
            })?;

        leaf.ok_or_else(|| OcspError::NoPeerCertificate {
            host: host.to_string(),
        })
    }
}

/// Client configuration verifying servers against the Mozilla root set
fn tls_client_config() -> ClientConfig {
    let root_store = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

/// A zero budget is already exhausted
fn time_budget(step: NetworkStep, timeout_ms: u64) -> Result<Duration> {
    if timeout_ms == 0 {
        return Err(OcspError::TimeoutExceeded { step, timeout_ms });
    }
    Ok(Duration::from_millis(timeout_ms))
}

fn transport_error(step: NetworkStep, err: &(dyn std::error::Error + 'static)) -> OcspError {
    let mut message = err.to_string();
    if let Some(cause) = err.source() {
        message.push_str(&format!(" ({})", cause));
    }
    OcspError::TransportError { step, message }
}
