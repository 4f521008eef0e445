//! OCSP response decoding - RFC 6960 Section 4.2
//!
//! ```asn1
//! OCSPResponse ::= SEQUENCE {
//!     responseStatus      OCSPResponseStatus,
//!     responseBytes       [0] EXPLICIT ResponseBytes OPTIONAL
//! }
//!
//! ResponseBytes ::= SEQUENCE {
//!     responseType        OBJECT IDENTIFIER,
//!     response            OCTET STRING
//! }
//!
//! BasicOCSPResponse ::= SEQUENCE {
//!     tbsResponseData     ResponseData,
//!     signatureAlgorithm  AlgorithmIdentifier,
//!     signature           BIT STRING,
//!     certs               [0] EXPLICIT SEQUENCE OF Certificate OPTIONAL
//! }
//!
//! ResponseData ::= SEQUENCE {
//!     version             [0] EXPLICIT Version DEFAULT v1,
//!     responderID         ResponderID,
//!     producedAt          GeneralizedTime,
//!     responses           SEQUENCE OF SingleResponse,
//!     responseExtensions  [1] EXPLICIT Extensions OPTIONAL
//! }
//!
//! ResponderID ::= CHOICE {
//!     byName              [1] Name,
//!     byKey               [2] KeyHash
//! }
//!
//! SingleResponse ::= SEQUENCE {
//!     certID              CertID,
//!     certStatus          CertStatus,
//!     thisUpdate          GeneralizedTime,
//!     nextUpdate          [0] EXPLICIT GeneralizedTime OPTIONAL,
//!     singleExtensions    [1] EXPLICIT Extensions OPTIONAL
//! }
//!
//! CertStatus ::= CHOICE {
//!     good                [0] IMPLICIT NULL,
//!     revoked             [1] IMPLICIT RevokedInfo,
//!     unknown             [2] IMPLICIT UnknownInfo
//! }
//!
//! RevokedInfo ::= SEQUENCE {
//!     revocationTime      GeneralizedTime,
//!     revocationReason    [0] EXPLICIT CRLReason OPTIONAL
//! }
//! ```
//!
//! Decoding is layered so the validator can check each level in order:
//! [`OcspResponse::from_der`] only reads the status and the response bytes,
//! [`OcspResponse::basic`] decodes the basic response, and the CertID and
//! certStatus of each [`SingleResponse`] are interpreted on demand.

use crate::cert_id::CertId;
use crate::certificate::Certificate;
use crate::der::{oid, oid_to_string, tag, Tlv};
use crate::error::{OcspError, Result};
use crate::request::find_nonce;
use crate::verdict::RevocationReason;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::warn;

/// OCSP response status (RFC 6960 Section 4.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcspResponseStatus {
    /// Response has valid confirmations
    Successful,
    /// Illegal confirmation request
    MalformedRequest,
    /// Internal error in issuer
    InternalError,
    /// Try again later
    TryLater,
    /// Must sign the request
    SigRequired,
    /// Request unauthorized
    Unauthorized,
    /// Any code not defined by RFC 6960
    Unrecognized(u32),
}

impl OcspResponseStatus {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Successful,
            1 => Self::MalformedRequest,
            2 => Self::InternalError,
            3 => Self::TryLater,
            5 => Self::SigRequired,
            6 => Self::Unauthorized,
            other => Self::Unrecognized(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Successful => 0,
            Self::MalformedRequest => 1,
            Self::InternalError => 2,
            Self::TryLater => 3,
            Self::SigRequired => 5,
            Self::Unauthorized => 6,
            Self::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for OcspResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Successful => f.write_str("successful"),
            Self::MalformedRequest => f.write_str("malformedRequest"),
            Self::InternalError => f.write_str("internalError"),
            Self::TryLater => f.write_str("tryLater"),
            Self::SigRequired => f.write_str("sigRequired"),
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::Unrecognized(code) => write!(f, "unrecognized ({})", code),
        }
    }
}

/// How the responder identified itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderId {
    /// DER-encoded Name of the signer
    ByName(Vec<u8>),
    /// SHA-1 of the signer's subjectPublicKey bits
    ByKey(Vec<u8>),
}

/// Certificate status from a SingleResponse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleStatus {
    Good,
    Revoked {
        revocation_time: DateTime<Utc>,
        reason: Option<RevocationReason>,
    },
    Unknown,
}

/// Outer OCSPResponse
#[derive(Debug, Clone)]
pub struct OcspResponse {
    /// responseStatus
    pub status: OcspResponseStatus,
    response_bytes: Option<ResponseBytes>,
}

#[derive(Debug, Clone)]
struct ResponseBytes {
    /// responseType OID content octets
    response_type: Vec<u8>,
    response: Vec<u8>,
}

impl OcspResponse {
    /// Decode the outer OCSPResponse
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let items = Tlv::parse_exact(der)?.sequence("OCSPResponse")?;
        let status_tlv = items
            .first()
            .ok_or_else(|| OcspError::malformed("empty OCSPResponse"))?
            .expect(tag::ENUMERATED, "responseStatus")?;
        let status = OcspResponseStatus::from_code(status_tlv.small_uint()?);

        let response_bytes = match items.get(1) {
            Some(wrapper) if wrapper.is_context(0) => {
                let fields = wrapper.explicit_inner()?.sequence("ResponseBytes")?;
                let [response_type, response] = fields.as_slice() else {
                    return Err(OcspError::malformed("ResponseBytes must have two elements"));
                };
                Some(ResponseBytes {
                    response_type: response_type
                        .expect(tag::OID, "responseType")?
                        .content
                        .to_vec(),
                    response: response
                        .expect(tag::OCTET_STRING, "response")?
                        .content
                        .to_vec(),
                })
            }
            Some(_) => return Err(OcspError::malformed("unexpected element after responseStatus")),
            None => None,
        };

        Ok(Self {
            status,
            response_bytes,
        })
    }

    /// Whether responseBytes is present
    pub fn has_response_bytes(&self) -> bool {
        self.response_bytes.is_some()
    }

    /// Decode the BasicOCSPResponse
    ///
    /// Fails with [`OcspError::MissingResponseBytes`] or
    /// [`OcspError::UnknownResponseType`] before any decoding is attempted.
    pub fn basic(&self) -> Result<BasicOcspResponse> {
        let bytes = self
            .response_bytes
            .as_ref()
            .ok_or(OcspError::MissingResponseBytes)?;
        if bytes.response_type != crate::der::oid_content(oid::OCSP_BASIC) {
            return Err(OcspError::UnknownResponseType(oid_to_string(
                &bytes.response_type,
            )));
        }
        BasicOcspResponse::from_der(&bytes.response)
    }
}

/// Decoded BasicOCSPResponse
#[derive(Debug, Clone)]
pub struct BasicOcspResponse {
    tbs_response_data: Vec<u8>,
    pub responder_id: ResponderId,
    pub produced_at: DateTime<Utc>,
    pub responses: Vec<SingleResponse>,
    /// Nonce from responseExtensions, inner OCTET STRING removed
    pub nonce: Option<Vec<u8>>,
    signature_algorithm: Vec<u8>,
    signature: Vec<u8>,
    /// Certificates from the `certs` field
    pub certs: Vec<Certificate>,
}

impl BasicOcspResponse {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let items = Tlv::parse_exact(der)?.sequence("BasicOCSPResponse")?;
        let (tbs, algorithm, signature, certs) = match items.as_slice() {
            [tbs, algorithm, signature] => (*tbs, *algorithm, *signature, None),
            [tbs, algorithm, signature, certs] if certs.is_context(0) => {
                (*tbs, *algorithm, *signature, Some(*certs))
            }
            _ => return Err(OcspError::malformed("unexpected BasicOCSPResponse layout")),
        };

        let mut fields = tbs.sequence("ResponseData")?.into_iter().peekable();

        // version [0] EXPLICIT, v1 only
        if fields.peek().is_some_and(|f| f.is_context(0)) {
            fields.next();
        }

        let responder_tlv = fields
            .next()
            .ok_or_else(|| OcspError::malformed("missing responderID"))?;
        let responder_id = if responder_tlv.is_context(1) {
            ResponderId::ByName(responder_tlv.explicit_inner()?.raw.to_vec())
        } else if responder_tlv.is_context(2) {
            let key_hash = responder_tlv
                .explicit_inner()?
                .expect(tag::OCTET_STRING, "ResponderID.byKey")?;
            ResponderId::ByKey(key_hash.content.to_vec())
        } else {
            return Err(OcspError::malformed("invalid responderID"));
        };

        let produced_at = fields
            .next()
            .ok_or_else(|| OcspError::malformed("missing producedAt"))?
            .expect(tag::GENERALIZED_TIME, "producedAt")?
            .time()?;

        let responses = fields
            .next()
            .ok_or_else(|| OcspError::malformed("missing responses"))?
            .sequence("responses")?
            .into_iter()
            .map(SingleResponse::from_tlv)
            .collect::<Result<Vec<_>>>()?;

        let mut nonce = None;
        for field in fields {
            if field.is_context(1) {
                nonce = find_nonce(field.explicit_inner()?)?;
            }
        }

        let certs = match certs {
            Some(wrapper) => wrapper
                .explicit_inner()?
                .sequence("certs")?
                .into_iter()
                .map(|cert| {
                    Certificate::from_der(cert.raw).map_err(|e| {
                        OcspError::malformed(format!("embedded certificate: {}", e))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            tbs_response_data: tbs.raw.to_vec(),
            responder_id,
            produced_at,
            responses,
            nonce,
            signature_algorithm: algorithm.expect(tag::SEQUENCE, "signatureAlgorithm")?.raw.to_vec(),
            signature: signature.bit_string()?.to_vec(),
            certs,
        })
    }

    /// DER of tbsResponseData, exactly as received
    pub fn tbs_response_data(&self) -> &[u8] {
        &self.tbs_response_data
    }

    /// DER of signatureAlgorithm
    pub fn signature_algorithm(&self) -> &[u8] {
        &self.signature_algorithm
    }

    /// Signature bits
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

/// One SingleResponse
#[derive(Debug, Clone)]
pub struct SingleResponse {
    cert_id: Vec<u8>,
    cert_status: Vec<u8>,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
}

impl SingleResponse {
    fn from_tlv(tlv: Tlv<'_>) -> Result<Self> {
        let mut fields = tlv.sequence("SingleResponse")?.into_iter();
        let cert_id = fields
            .next()
            .ok_or_else(|| OcspError::malformed("missing certID"))?
            .expect(tag::SEQUENCE, "certID")?;
        let cert_status = fields
            .next()
            .ok_or_else(|| OcspError::malformed("missing certStatus"))?;
        let this_update = fields
            .next()
            .ok_or_else(|| OcspError::malformed("missing thisUpdate"))?
            .expect(tag::GENERALIZED_TIME, "thisUpdate")?
            .time()?;

        let mut next_update = None;
        for field in fields {
            if field.is_context(0) {
                next_update = Some(field.explicit_inner()?.time()?);
            }
        }

        Ok(Self {
            cert_id: cert_id.raw.to_vec(),
            cert_status: cert_status.raw.to_vec(),
            this_update,
            next_update,
        })
    }

    /// Decode certID
    pub fn cert_id(&self) -> Result<CertId> {
        CertId::from_tlv(Tlv::parse_exact(&self.cert_id)?)
    }

    /// Decode certStatus
    ///
    /// A CHOICE tag other than good, revoked or unknown is
    /// [`OcspError::UnrecognizedCertStatus`]. An out-of-range revocation
    /// reason code is logged and kept as
    /// [`RevocationReason::Other`].
    pub fn status(&self) -> Result<SingleStatus> {
        let status = Tlv::parse_exact(&self.cert_status)?;
        if status.class != crate::der::Class::ContextSpecific {
            return Err(OcspError::UnrecognizedCertStatus(status.tag));
        }

        match status.tag {
            0 => Ok(SingleStatus::Good),
            1 => {
                let mut fields = status.children()?.into_iter();
                let revocation_time = fields
                    .next()
                    .ok_or_else(|| OcspError::malformed("missing revocationTime"))?
                    .time()?;

                let mut reason = None;
                for field in fields {
                    if field.is_context(0) {
                        let code = field
                            .explicit_inner()?
                            .expect(tag::ENUMERATED, "revocationReason")?
                            .small_uint()?;
                        reason = RevocationReason::from_code(code);
                        match reason {
                            Some(r) if !r.is_assigned() => {
                                warn!(code, "unassigned revocation reason code")
                            }
                            None => warn!(code, "ignoring out-of-range revocation reason"),
                            _ => {}
                        }
                    }
                }

                Ok(SingleStatus::Revoked {
                    revocation_time,
                    reason,
                })
            }
            2 => Ok(SingleStatus::Unknown),
            other => Err(OcspError::UnrecognizedCertStatus(other)),
        }
    }
}
