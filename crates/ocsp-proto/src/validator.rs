//! OCSP response validation
//!
//! Turns response bytes into a [`Verdict`] or exactly one [`OcspError`].
//! The checks run in a fixed order and the first failure is terminal:
//!
//! 1. **Decode** the OCSPResponse.
//! 2. **Status**: responseStatus must be `successful`, responseBytes must be
//!    present and of type id-pkix-ocsp-basic.
//! 3. **Shape**: exactly one SingleResponse.
//! 4. **Signature** (when enabled): resolve the signing certificate and
//!    verify the signature over tbsResponseData.
//! 5. **Nonce** (when enabled and one was sent): a nonce in the response
//!    must equal the one sent. A missing nonce is tolerated.
//! 6. **CertID**: recomputed with the response's hash algorithm, must match.
//! 7. **Status derivation**: good, revoked or unknown.
//!
//! # Responder resolution
//!
//! The signing certificate is found by trying [`SIGNER_RESOLVERS`] in order;
//! the first strategy that returns a certificate wins:
//!
//! - the responder certificate configured by the caller,
//! - the trust anchor, matched by subject name (`byName`),
//! - the trust anchor, matched by SHA-1 of its public key (`byKey`),
//! - a certificate from the response's `certs` field, matched the same two
//!   ways. Such a delegated responder must be issued directly by the trust
//!   anchor and carry the id-kp-OCSPSigning extended key usage.
//!
//! A signature or chain failure is never downgraded to `unknown`.

use crate::cert_id::CertId;
use crate::certificate::Certificate;
use crate::crypto::{CryptoEngine, HashAlgorithm};
use crate::error::{OcspError, Result};
use crate::response::{
    BasicOcspResponse, OcspResponse, OcspResponseStatus, ResponderId, SingleStatus,
};
use crate::verdict::{CertStatus, Verdict};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Inputs of one validation
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Certificate whose status was requested
    pub certificate: &'a Certificate,
    /// Issuer of `certificate`; also the trust anchor for the response signature
    pub issuer: &'a Certificate,
    /// Explicitly trusted responder-signing certificate
    pub responder_certificate: Option<&'a Certificate>,
    /// Nonce sent in the request
    pub nonce: Option<&'a [u8]>,
    pub validate_signature: bool,
    /// Attach the raw response bytes to the verdict
    pub include_raw_response: bool,
    /// Responder URL, reported in the verdict
    pub ocsp_url: &'a str,
}

/// Where the signing certificate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerSource {
    Configured,
    TrustAnchorByName,
    TrustAnchorByKey,
    Embedded,
}

/// A resolved signing certificate
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSigner<'r> {
    pub certificate: &'r Certificate,
    pub source: SignerSource,
}

/// Everything a resolver strategy may look at
pub struct ResolverInput<'r> {
    pub engine: &'r dyn CryptoEngine,
    pub response: &'r BasicOcspResponse,
    pub trust_anchor: &'r Certificate,
    pub configured: Option<&'r Certificate>,
}

/// A responder resolution strategy
pub type SignerResolver = for<'r> fn(&ResolverInput<'r>) -> Option<ResolvedSigner<'r>>;

/// Strategies in the order they are tried
pub const SIGNER_RESOLVERS: &[SignerResolver] = &[
    resolve_configured,
    resolve_anchor_by_name,
    resolve_anchor_by_key,
    resolve_embedded,
];

/// Explicitly configured responder certificate
pub fn resolve_configured<'r>(input: &ResolverInput<'r>) -> Option<ResolvedSigner<'r>> {
    input.configured.map(|certificate| ResolvedSigner {
        certificate,
        source: SignerSource::Configured,
    })
}

/// Trust anchor whose subject equals a byName responderID
pub fn resolve_anchor_by_name<'r>(input: &ResolverInput<'r>) -> Option<ResolvedSigner<'r>> {
    match &input.response.responder_id {
        ResponderId::ByName(name) if name.as_slice() == input.trust_anchor.subject_raw() => {
            Some(ResolvedSigner {
                certificate: input.trust_anchor,
                source: SignerSource::TrustAnchorByName,
            })
        }
        _ => None,
    }
}

/// Trust anchor whose key hash equals a byKey responderID
pub fn resolve_anchor_by_key<'r>(input: &ResolverInput<'r>) -> Option<ResolvedSigner<'r>> {
    match &input.response.responder_id {
        ResponderId::ByKey(hash) if *hash == key_hash(input.engine, input.trust_anchor) => {
            Some(ResolvedSigner {
                certificate: input.trust_anchor,
                source: SignerSource::TrustAnchorByKey,
            })
        }
        _ => None,
    }
}

/// Certificate from the response's `certs` that matches the responderID
pub fn resolve_embedded<'r>(input: &ResolverInput<'r>) -> Option<ResolvedSigner<'r>> {
    input
        .response
        .certs
        .iter()
        .find(|cert| matches_responder_id(input.engine, &input.response.responder_id, cert))
        .map(|certificate| ResolvedSigner {
            certificate,
            source: SignerSource::Embedded,
        })
}

/// Whether `cert` is the certificate named by `id`
pub fn matches_responder_id(
    engine: &dyn CryptoEngine,
    id: &ResponderId,
    cert: &Certificate,
) -> bool {
    match id {
        ResponderId::ByName(name) => name.as_slice() == cert.subject_raw(),
        ResponderId::ByKey(hash) => *hash == key_hash(engine, cert),
    }
}

/// KeyHash: SHA-1 over the subjectPublicKey bits (RFC 6960 Section 4.2.1)
fn key_hash(engine: &dyn CryptoEngine, cert: &Certificate) -> Vec<u8> {
    engine.digest(HashAlgorithm::Sha1, cert.public_key_bits())
}

/// OCSP response validator
pub struct ResponseValidator<'a> {
    engine: &'a dyn CryptoEngine,
    now: Option<DateTime<Utc>>,
}

impl<'a> ResponseValidator<'a> {
    pub fn new(engine: &'a dyn CryptoEngine) -> Self {
        Self { engine, now: None }
    }

    /// Fix the time used for chain validation
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Validate `der` against `ctx`
    pub fn validate(&self, der: &[u8], ctx: &ValidationContext<'_>) -> Result<Verdict> {
        // Decode
        let response = OcspResponse::from_der(der)?;

        // Status
        if response.status != OcspResponseStatus::Successful {
            return Err(OcspError::OcspServerError(response.status));
        }
        let basic = response.basic()?;

        // Shape
        let [single] = basic.responses.as_slice() else {
            return Err(OcspError::UnexpectedResponseCount(basic.responses.len()));
        };

        // Signature
        if ctx.validate_signature {
            self.verify_signature(&basic, ctx)?;

            // Nonce
            if let Some(sent) = ctx.nonce {
                match basic.nonce.as_deref() {
                    Some(received) if received != sent => return Err(OcspError::NonceMismatch),
                    Some(_) => debug!("response nonce matches"),
                    None => warn!(url = ctx.ocsp_url, "responder did not echo the request nonce"),
                }
            }
        } else {
            debug!("signature validation disabled");
        }

        // CertID
        let received = single.cert_id()?;
        let expected = CertId::new(
            self.engine,
            ctx.certificate,
            ctx.issuer,
            received.hash_algorithm,
        );
        if received != expected {
            return Err(OcspError::CertificateMismatch);
        }

        // Status derivation
        let (status, revocation_time, revocation_reason) = match single.status()? {
            SingleStatus::Good => (CertStatus::Good, None, None),
            SingleStatus::Revoked {
                revocation_time,
                reason,
            } => (CertStatus::Revoked, Some(revocation_time), reason),
            SingleStatus::Unknown => (CertStatus::Unknown, None, None),
        };
        debug!(
            serial = %ctx.certificate.serial_hex(),
            %status,
            "OCSP response validated"
        );

        Ok(Verdict {
            status,
            ocsp_url: ctx.ocsp_url.to_string(),
            revocation_time,
            revocation_reason,
            next_update: single.next_update,
            this_update: Some(single.this_update),
            produced_at: Some(basic.produced_at),
            raw_response: ctx.include_raw_response.then(|| der.to_vec()),
        })
    }

    /// Resolve the signer, check its authority, verify the signature
    fn verify_signature(
        &self,
        basic: &BasicOcspResponse,
        ctx: &ValidationContext<'_>,
    ) -> Result<()> {
        let input = ResolverInput {
            engine: self.engine,
            response: basic,
            trust_anchor: ctx.issuer,
            configured: ctx.responder_certificate,
        };
        let signer = SIGNER_RESOLVERS
            .iter()
            .find_map(|resolve| resolve(&input))
            .ok_or(OcspError::ResponderNotFound)?;
        debug!(
            source = ?signer.source,
            signer = signer.certificate.subject_name(),
            "resolved OCSP signer"
        );

        if signer.source == SignerSource::Embedded {
            self.authorize_delegate(signer.certificate, ctx.issuer)?;
        }

        let valid = self.engine.verify_signature(
            basic.signature_algorithm(),
            signer.certificate.spki(),
            basic.tbs_response_data(),
            basic.signature(),
        )?;
        if !valid {
            return Err(OcspError::SignatureVerificationFailed);
        }
        Ok(())
    }

    /// A delegated responder must be issued directly by the anchor and be
    /// authorized to sign OCSP (RFC 6960 Section 4.2.2.2)
    fn authorize_delegate(&self, responder: &Certificate, anchor: &Certificate) -> Result<()> {
        if responder != anchor && responder.issuer_raw() != anchor.subject_raw() {
            return Err(OcspError::ChainValidationFailed(format!(
                "responder {} is not issued directly by {}",
                responder.subject_name(),
                anchor.subject_name()
            )));
        }

        let now = self.now.unwrap_or_else(Utc::now);
        self.engine
            .validate_chain(responder, &[], std::slice::from_ref(anchor), now)?;

        if responder != anchor && !responder.has_ocsp_signing_eku() {
            return Err(OcspError::ChainValidationFailed(format!(
                "responder {} lacks the OCSPSigning extended key usage",
                responder.subject_name()
            )));
        }
        Ok(())
    }
}
