//! Production crypto engine: RustCrypto digests, ring signatures, OS randomness

use super::{split_spki, CryptoEngine, HashAlgorithm, SignatureAlgorithm};
use crate::certificate::Certificate;
use crate::error::{OcspError, Result};
use chrono::{DateTime, Utc};
use rand::RngCore;
use ring::signature::{self, UnparsedPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::{debug, trace};

/// Longest issuer path walked during chain validation
const MAX_CHAIN_DEPTH: usize = 8;

/// Default [`CryptoEngine`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCryptoEngine;

impl DefaultCryptoEngine {
    pub fn new() -> Self {
        Self
    }

    /// Whether `issuer` signed `cert`
    fn issued_by(&self, cert: &Certificate, issuer: &Certificate) -> bool {
        if cert.issuer_raw() != issuer.subject_raw() {
            return false;
        }
        self.verify_signature(
            cert.signature_algorithm(),
            issuer.spki(),
            cert.tbs_certificate(),
            cert.signature(),
        )
        .unwrap_or(false)
    }
}

impl CryptoEngine for DefaultCryptoEngine {
    fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        match algorithm {
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    fn verify_signature(
        &self,
        algorithm_identifier: &[u8],
        spki: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        let algorithm = SignatureAlgorithm::resolve(algorithm_identifier, spki)?;
        trace!("Verifying signature with algorithm {:?}", algorithm);

        let ring_algo: &'static dyn signature::VerificationAlgorithm = match algorithm {
            SignatureAlgorithm::EcdsaP256Sha256 => &signature::ECDSA_P256_SHA256_ASN1,
            SignatureAlgorithm::EcdsaP256Sha384 => &signature::ECDSA_P256_SHA384_ASN1,
            SignatureAlgorithm::EcdsaP384Sha256 => &signature::ECDSA_P384_SHA256_ASN1,
            SignatureAlgorithm::EcdsaP384Sha384 => &signature::ECDSA_P384_SHA384_ASN1,
            SignatureAlgorithm::RsaPkcs1Sha1 => {
                &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY
            }
            SignatureAlgorithm::RsaPkcs1Sha256 => &signature::RSA_PKCS1_2048_8192_SHA256,
            SignatureAlgorithm::RsaPkcs1Sha384 => &signature::RSA_PKCS1_2048_8192_SHA384,
            SignatureAlgorithm::RsaPkcs1Sha512 => &signature::RSA_PKCS1_2048_8192_SHA512,
            SignatureAlgorithm::RsaPssSha256 => &signature::RSA_PSS_2048_8192_SHA256,
            SignatureAlgorithm::RsaPssSha384 => &signature::RSA_PSS_2048_8192_SHA384,
            SignatureAlgorithm::RsaPssSha512 => &signature::RSA_PSS_2048_8192_SHA512,
            SignatureAlgorithm::Ed25519 => &signature::ED25519,
        };

        let (_, _, public_key) = split_spki(spki)?;
        let pk = UnparsedPublicKey::new(ring_algo, public_key);
        Ok(pk.verify(message, signature).is_ok())
    }

    fn validate_chain(
        &self,
        leaf: &Certificate,
        intermediates: &[Certificate],
        anchors: &[Certificate],
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut current = leaf;

        for depth in 0..MAX_CHAIN_DEPTH {
            if anchors.iter().any(|anchor| anchor == current) {
                debug!(depth, "chain reached trust anchor");
                return Ok(());
            }

            if !current.is_valid_at(at) {
                return Err(OcspError::ChainValidationFailed(format!(
                    "certificate {} is outside its validity period",
                    current.subject_name()
                )));
            }

            if let Some(anchor) = anchors.iter().find(|a| self.issued_by(current, a)) {
                if !anchor.is_valid_at(at) {
                    return Err(OcspError::ChainValidationFailed(format!(
                        "trust anchor {} is outside its validity period",
                        anchor.subject_name()
                    )));
                }
                debug!(depth, anchor = anchor.subject_name(), "chain validated");
                return Ok(());
            }

            let issuer = intermediates
                .iter()
                .filter(|c| *c != current)
                .find(|c| self.issued_by(current, c))
                .ok_or_else(|| {
                    OcspError::ChainValidationFailed(format!(
                        "no trusted issuer found for {}",
                        current.subject_name()
                    ))
                })?;
            if !issuer.can_sign_certificates() {
                return Err(OcspError::ChainValidationFailed(format!(
                    "{} is not a CA and cannot issue {}",
                    issuer.subject_name(),
                    current.subject_name()
                )));
            }
            current = issuer;
        }

        Err(OcspError::ChainValidationFailed(format!(
            "chain longer than {} certificates",
            MAX_CHAIN_DEPTH
        )))
    }

    fn fill_random(&self, buf: &mut [u8]) -> Result<()> {
        rand::rng().fill_bytes(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixture(name: &str) -> Certificate {
        let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
        Certificate::from_pem(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_digest_lengths() {
        let engine = DefaultCryptoEngine::new();
        for alg in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            assert_eq!(engine.digest(alg, b"abc").len(), alg.output_len());
        }
        // FIPS 180 test vector
        assert_eq!(
            engine.digest(HashAlgorithm::Sha1, b"abc")[..4],
            [0xa9, 0x99, 0x3e, 0x36]
        );
    }

    #[test]
    fn test_verify_certificate_signature() {
        let engine = DefaultCryptoEngine::new();
        let ca = fixture("ca.pem");
        let leaf = fixture("good.pem");
        let other = fixture("other-ca.pem");

        assert!(engine
            .verify_signature(
                leaf.signature_algorithm(),
                ca.spki(),
                leaf.tbs_certificate(),
                leaf.signature()
            )
            .unwrap());
        assert!(!engine
            .verify_signature(
                leaf.signature_algorithm(),
                other.spki(),
                leaf.tbs_certificate(),
                leaf.signature()
            )
            .unwrap());
    }

    #[test]
    fn test_chain_to_anchor() {
        let engine = DefaultCryptoEngine::new();
        let ca = fixture("ca.pem");
        let responder = fixture("responder.pem");

        engine
            .validate_chain(&responder, &[], &[ca.clone()], now())
            .unwrap();
        engine.validate_chain(&ca, &[], &[ca.clone()], now()).unwrap();
    }

    #[test]
    fn test_chain_rejects_unrelated_anchor() {
        let engine = DefaultCryptoEngine::new();
        let rogue = fixture("rogue-responder.pem");
        let ca = fixture("ca.pem");
        let other = fixture("other-ca.pem");

        let err = engine
            .validate_chain(&rogue, &[other], &[ca], now())
            .unwrap_err();
        assert!(matches!(err, OcspError::ChainValidationFailed(_)));
    }

    #[test]
    fn test_chain_rejects_expired_link() {
        let engine = DefaultCryptoEngine::new();
        let ca = fixture("ca.pem");
        let expired = fixture("expired.pem");

        let err = engine
            .validate_chain(&expired, &[], &[ca], now())
            .unwrap_err();
        assert!(matches!(err, OcspError::ChainValidationFailed(_)));
    }

    #[test]
    fn test_fill_random() {
        let engine = DefaultCryptoEngine::new();
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        engine.fill_random(&mut a).unwrap();
        engine.fill_random(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
