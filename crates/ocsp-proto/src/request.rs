//! OCSP request construction - RFC 6960 Section 4.1
//!
//! ```asn1
//! OCSPRequest ::= SEQUENCE {
//!     tbsRequest          TBSRequest,
//!     optionalSignature   [0] EXPLICIT Signature OPTIONAL
//! }
//!
//! TBSRequest ::= SEQUENCE {
//!     version             [0] EXPLICIT Version DEFAULT v1,
//!     requestorName       [1] EXPLICIT GeneralName OPTIONAL,
//!     requestList         SEQUENCE OF Request,
//!     requestExtensions   [2] EXPLICIT Extensions OPTIONAL
//! }
//!
//! Request ::= SEQUENCE {
//!     reqCert                 CertID,
//!     singleRequestExtensions [0] EXPLICIT Extensions OPTIONAL
//! }
//! ```
//!
//! Requests are unsigned and always carry exactly one certificate. When
//! enabled, a 32-byte nonce (RFC 8954) goes into `requestExtensions`.

use crate::cert_id::CertId;
use crate::certificate::Certificate;
use crate::crypto::{CryptoEngine, HashAlgorithm};
use crate::der::{
    der_explicit_context, der_octet_string, der_oid, der_sequence, oid, tag, Tlv,
};
use crate::error::{OcspError, Result};
use tracing::debug;

/// Nonce length in bytes (RFC 8954 recommends 32)
pub const NONCE_LEN: usize = 32;

/// A serialized single-certificate OCSP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspRequest {
    cert_id: CertId,
    nonce: Option<Vec<u8>>,
    der: Vec<u8>,
}

impl OcspRequest {
    /// CertID of the queried certificate
    pub fn cert_id(&self) -> &CertId {
        &self.cert_id
    }

    /// Raw nonce bytes, if one was attached
    pub fn nonce(&self) -> Option<&[u8]> {
        self.nonce.as_deref()
    }

    /// DER encoding, ready to POST
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    /// Split into (DER bytes, nonce)
    pub fn into_parts(self) -> (Vec<u8>, Option<Vec<u8>>) {
        (self.der, self.nonce)
    }

    /// Decode a single-certificate request
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let request_err =
            |e: OcspError| OcspError::MalformedResponse(format!("OCSP request: {}", e));

        let outer = Tlv::parse_exact(der)
            .and_then(|tlv| tlv.sequence("OCSPRequest"))
            .map_err(request_err)?;
        let tbs = outer
            .first()
            .ok_or_else(|| OcspError::malformed("OCSP request: empty OCSPRequest"))?
            .sequence("TBSRequest")
            .map_err(request_err)?;

        let mut request_list = None;
        let mut nonce = None;
        for item in tbs {
            if item.is_universal(tag::SEQUENCE) {
                request_list = Some(item.children().map_err(request_err)?);
            } else if item.is_context(2) {
                nonce = find_nonce(item.explicit_inner().map_err(request_err)?)
                    .map_err(request_err)?;
            }
        }

        let requests = request_list
            .ok_or_else(|| OcspError::malformed("OCSP request: missing requestList"))?;
        let [request] = requests.as_slice() else {
            return Err(OcspError::malformed(format!(
                "OCSP request: expected one Request, got {}",
                requests.len()
            )));
        };
        let cert_id_tlv = request
            .sequence("Request")
            .map_err(request_err)?
            .into_iter()
            .next()
            .ok_or_else(|| OcspError::malformed("OCSP request: empty Request"))?;

        Ok(Self {
            cert_id: CertId::from_tlv(cert_id_tlv).map_err(request_err)?,
            nonce,
            der: der.to_vec(),
        })
    }
}

/// OCSP request builder
///
/// Hashing and nonce generation go through the supplied [`CryptoEngine`].
pub struct OcspRequestBuilder<'a> {
    engine: &'a dyn CryptoEngine,
    hash_algorithm: HashAlgorithm,
    nonce_enabled: bool,
}

impl<'a> OcspRequestBuilder<'a> {
    /// SHA-1 CertID, nonce enabled
    pub fn new(engine: &'a dyn CryptoEngine) -> Self {
        Self {
            engine,
            hash_algorithm: HashAlgorithm::Sha1,
            nonce_enabled: true,
        }
    }

    /// Hash algorithm for the CertID
    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    /// Enable or disable the nonce extension
    pub fn with_nonce(mut self, enabled: bool) -> Self {
        self.nonce_enabled = enabled;
        self
    }

    /// Build the request for `cert` issued by `issuer`
    pub fn build(&self, cert: &Certificate, issuer: &Certificate) -> Result<OcspRequest> {
        let cert_id = CertId::new(self.engine, cert, issuer, self.hash_algorithm);

        let nonce = if self.nonce_enabled {
            let mut nonce = vec![0u8; NONCE_LEN];
            self.engine.fill_random(&mut nonce)?;
            Some(nonce)
        } else {
            None
        };

        // Request ::= SEQUENCE { reqCert }
        let request = der_sequence(&cert_id.to_der());

        // TBSRequest: version and requestorName omitted
        let mut tbs = der_sequence(&request);
        if let Some(nonce) = &nonce {
            tbs.extend_from_slice(&der_explicit_context(2, &nonce_extensions(nonce)));
        }

        let der = der_sequence(&der_sequence(&tbs));
        debug!(
            serial = %cert.serial_hex(),
            hash = ?self.hash_algorithm,
            nonce = nonce.is_some(),
            len = der.len(),
            "built OCSP request"
        );

        Ok(OcspRequest {
            cert_id,
            nonce,
            der,
        })
    }
}

/// Extensions ::= SEQUENCE OF Extension, holding only the nonce
///
/// extnValue wraps the nonce in its own OCTET STRING (RFC 8954 Section 2.1).
fn nonce_extensions(nonce: &[u8]) -> Vec<u8> {
    let mut ext = der_oid(oid::OCSP_NONCE);
    ext.extend_from_slice(&der_octet_string(&der_octet_string(nonce)));
    der_sequence(&der_sequence(&ext))
}

/// Find the nonce in an Extensions element
///
/// The inner OCTET STRING is unwrapped when present; responders that put the
/// bare nonce in extnValue are also accepted.
pub(crate) fn find_nonce(extensions: Tlv<'_>) -> Result<Option<Vec<u8>>> {
    for extension in extensions.sequence("Extensions")? {
        let fields = extension.sequence("Extension")?;
        let Some(extn_id) = fields.first() else {
            continue;
        };
        if !extn_id.is_oid(oid::OCSP_NONCE) {
            continue;
        }
        // critical BOOLEAN may sit between extnID and extnValue
        let extn_value = fields
            .iter()
            .skip(1)
            .find(|f| f.is_universal(tag::OCTET_STRING))
            .ok_or_else(|| OcspError::malformed("nonce extension without extnValue"))?;

        let nonce = match Tlv::parse_exact(extn_value.content) {
            Ok(inner) if inner.is_universal(tag::OCTET_STRING) => inner.content.to_vec(),
            _ => extn_value.content.to_vec(),
        };
        return Ok(Some(nonce));
    }
    Ok(None)
}
