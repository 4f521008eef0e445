//! Cryptographic collaborator
//!
//! The request builder and the response validator never hash, verify or draw
//! randomness directly; they go through a [`CryptoEngine`] handed to them by
//! the caller. [`DefaultCryptoEngine`] is the production engine. Tests can
//! substitute their own.

mod default;

pub use self::default::DefaultCryptoEngine;

use crate::certificate::Certificate;
use crate::der::{oid, tag, Tlv};
use crate::error::{OcspError, Result};
use chrono::{DateTime, Utc};

/// Hash algorithms usable in a CertID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-1, the default for compatibility with deployed responders
    #[default]
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Algorithm OID arcs
    pub fn oid(self) -> &'static [u64] {
        match self {
            Self::Sha1 => oid::SHA1,
            Self::Sha256 => oid::SHA256,
            Self::Sha384 => oid::SHA384,
            Self::Sha512 => oid::SHA512,
        }
    }

    /// Look up an algorithm by OBJECT IDENTIFIER element
    pub fn from_oid(tlv: &Tlv<'_>) -> Option<Self> {
        [Self::Sha1, Self::Sha256, Self::Sha384, Self::Sha512]
            .into_iter()
            .find(|alg| tlv.is_oid(alg.oid()))
    }

    /// Digest length in bytes
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

/// Signature algorithms the default engine can verify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// ECDSA with P-256 curve and SHA-256
    EcdsaP256Sha256,
    /// ECDSA with P-256 curve and SHA-384
    EcdsaP256Sha384,
    /// ECDSA with P-384 curve and SHA-256
    EcdsaP384Sha256,
    /// ECDSA with P-384 curve and SHA-384
    EcdsaP384Sha384,
    /// RSA PKCS#1 v1.5 with SHA-1 (still common on OCSP responders)
    RsaPkcs1Sha1,
    RsaPkcs1Sha256,
    RsaPkcs1Sha384,
    RsaPkcs1Sha512,
    RsaPssSha256,
    RsaPssSha384,
    RsaPssSha512,
    Ed25519,
}

impl SignatureAlgorithm {
    /// Resolve from a signature AlgorithmIdentifier and the signer's SPKI
    ///
    /// For ECDSA the curve comes from the public key parameters; for RSA-PSS
    /// the hash comes from the RSASSA-PSS-params.
    pub fn resolve(algorithm_identifier: &[u8], spki: &[u8]) -> Result<Self> {
        let (sig_oid, sig_params) = split_algorithm_identifier(algorithm_identifier)?;

        let unsupported = || {
            OcspError::UnsupportedAlgorithm(crate::der::oid_to_string(sig_oid.content))
        };

        if sig_oid.is_oid(oid::SHA1_WITH_RSA) {
            Ok(Self::RsaPkcs1Sha1)
        } else if sig_oid.is_oid(oid::SHA256_WITH_RSA) {
            Ok(Self::RsaPkcs1Sha256)
        } else if sig_oid.is_oid(oid::SHA384_WITH_RSA) {
            Ok(Self::RsaPkcs1Sha384)
        } else if sig_oid.is_oid(oid::SHA512_WITH_RSA) {
            Ok(Self::RsaPkcs1Sha512)
        } else if sig_oid.is_oid(oid::ED25519) {
            Ok(Self::Ed25519)
        } else if sig_oid.is_oid(oid::ECDSA_WITH_SHA256) || sig_oid.is_oid(oid::ECDSA_WITH_SHA384) {
            let sha384 = sig_oid.is_oid(oid::ECDSA_WITH_SHA384);
            let (_, key_params, _) = split_spki(spki)?;
            let curve = key_params.ok_or_else(unsupported)?;
            match (curve.is_oid(oid::SECP256R1), curve.is_oid(oid::SECP384R1), sha384) {
                (true, _, false) => Ok(Self::EcdsaP256Sha256),
                (true, _, true) => Ok(Self::EcdsaP256Sha384),
                (_, true, false) => Ok(Self::EcdsaP384Sha256),
                (_, true, true) => Ok(Self::EcdsaP384Sha384),
                _ => Err(OcspError::UnsupportedAlgorithm(format!(
                    "curve {}",
                    crate::der::oid_to_string(curve.content)
                ))),
            }
        } else if sig_oid.is_oid(oid::RSASSA_PSS) {
            match pss_hash(sig_params)? {
                HashAlgorithm::Sha256 => Ok(Self::RsaPssSha256),
                HashAlgorithm::Sha384 => Ok(Self::RsaPssSha384),
                HashAlgorithm::Sha512 => Ok(Self::RsaPssSha512),
                HashAlgorithm::Sha1 => Err(unsupported()),
            }
        } else {
            Err(unsupported())
        }
    }
}

/// Hashing, signature verification, chain validation and randomness
pub trait CryptoEngine: Send + Sync {
    /// Digest `data` with `algorithm`
    fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8>;

    /// Verify `signature` over `message`
    ///
    /// `algorithm_identifier` is the DER AlgorithmIdentifier that accompanied
    /// the signature and `spki` the signer's DER SubjectPublicKeyInfo.
    /// Returns `Ok(false)` for a signature that does not verify and an error
    /// only when the algorithm cannot be handled.
    fn verify_signature(
        &self,
        algorithm_identifier: &[u8],
        spki: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool>;

    /// Validate that `leaf` chains to one of `anchors` at time `at`
    ///
    /// `intermediates` may supply certificates between the two; each one
    /// used as an issuer must be a CA allowed to sign certificates.
    /// Failures are [`OcspError::ChainValidationFailed`].
    fn validate_chain(
        &self,
        leaf: &Certificate,
        intermediates: &[Certificate],
        anchors: &[Certificate],
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Fill `buf` with cryptographically strong random bytes
    fn fill_random(&self, buf: &mut [u8]) -> Result<()>;
}

/// Split AlgorithmIdentifier ::= SEQUENCE { algorithm OID, parameters ANY OPTIONAL }
pub(crate) fn split_algorithm_identifier(der: &[u8]) -> Result<(Tlv<'_>, Option<Tlv<'_>>)> {
    let items = Tlv::parse_exact(der)?.sequence("AlgorithmIdentifier")?;
    let mut items = items.into_iter();
    let algorithm = items
        .next()
        .ok_or_else(|| OcspError::malformed("empty AlgorithmIdentifier"))?
        .expect(tag::OID, "AlgorithmIdentifier.algorithm")?;
    Ok((algorithm, items.next()))
}

/// Split SubjectPublicKeyInfo into (algorithm OID, parameters, key bits)
pub(crate) fn split_spki(der: &[u8]) -> Result<(Tlv<'_>, Option<Tlv<'_>>, &[u8])> {
    let items = Tlv::parse_exact(der)?.sequence("SubjectPublicKeyInfo")?;
    match items.as_slice() {
        [algorithm, key] => {
            let (oid, params) = split_algorithm_identifier(algorithm.raw)?;
            Ok((oid, params, key.bit_string()?))
        }
        _ => Err(OcspError::malformed("SubjectPublicKeyInfo must have two elements")),
    }
}

/// Hash named in RSASSA-PSS-params; SHA-1 when absent
fn pss_hash(params: Option<Tlv<'_>>) -> Result<HashAlgorithm> {
    let Some(params) = params else {
        return Ok(HashAlgorithm::Sha1);
    };
    for item in params.sequence("RSASSA-PSS-params")? {
        if item.is_context(0) {
            let (hash_oid, _) = split_algorithm_identifier(item.explicit_inner()?.raw)?;
            return HashAlgorithm::from_oid(&hash_oid).ok_or_else(|| {
                OcspError::UnsupportedAlgorithm(crate::der::oid_to_string(hash_oid.content))
            });
        }
    }
    Ok(HashAlgorithm::Sha1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::{der_explicit_context, der_null, der_oid, der_sequence};

    const CA_PEM: &str = include_str!("../../tests/fixtures/ca.pem");

    #[test]
    fn test_resolve_ecdsa_from_curve() {
        let ca = Certificate::from_pem(CA_PEM).unwrap();
        let alg = SignatureAlgorithm::resolve(ca.signature_algorithm(), ca.spki()).unwrap();
        assert_eq!(alg, SignatureAlgorithm::EcdsaP256Sha256);
    }

    #[test]
    fn test_resolve_rsa_pkcs1() {
        let ca = Certificate::from_pem(CA_PEM).unwrap();
        let mut content = der_oid(oid::SHA1_WITH_RSA);
        content.extend_from_slice(&der_null());
        let alg = SignatureAlgorithm::resolve(&der_sequence(&content), ca.spki()).unwrap();
        assert_eq!(alg, SignatureAlgorithm::RsaPkcs1Sha1);
    }

    #[test]
    fn test_resolve_pss_hash_from_params() {
        let ca = Certificate::from_pem(CA_PEM).unwrap();
        let mut hash_alg = der_oid(oid::SHA384);
        hash_alg.extend_from_slice(&der_null());
        let params = der_sequence(&der_explicit_context(0, &der_sequence(&hash_alg)));
        let mut content = der_oid(oid::RSASSA_PSS);
        content.extend_from_slice(&params);

        let alg = SignatureAlgorithm::resolve(&der_sequence(&content), ca.spki()).unwrap();
        assert_eq!(alg, SignatureAlgorithm::RsaPssSha384);
    }

    #[test]
    fn test_resolve_unknown_algorithm() {
        let ca = Certificate::from_pem(CA_PEM).unwrap();
        let content = der_oid(&[1, 2, 3, 4]);
        let err = SignatureAlgorithm::resolve(&der_sequence(&content), ca.spki()).unwrap_err();
        assert_eq!(err, OcspError::UnsupportedAlgorithm("1.2.3.4".to_string()));
    }

    #[test]
    fn test_hash_algorithm_oid_lookup() {
        let encoded = der_oid(oid::SHA256);
        let tlv = Tlv::parse_exact(&encoded).unwrap();
        assert_eq!(HashAlgorithm::from_oid(&tlv), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha1);
    }
}
