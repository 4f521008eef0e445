//! Test PKI fixtures and an in-process OCSP responder
//!
//! The fixtures under `tests/fixtures/` form a small EC P-256 PKI:
//!
//! - `ca.pem` / `ca.key.der`: "OCSP Test Root CA", issuer of every leaf
//! - `responder.pem` / `responder.key.der`: delegated responder with
//!   id-kp-OCSPSigning
//! - `responder-no-eku.pem`: delegated responder without the EKU
//! - `other-ca.pem`, `rogue-responder.pem`: an unrelated hierarchy
//! - `good.pem` (serial 0x1001), `revoked.pem` (0x1002),
//!   `revoked-no-reason.pem` (0x1003), `expired.pem` (0x1004),
//!   `no-ocsp-url.pem`, `no-issuer-url.pem`, `self-signed.pem`
//!
//! Static responses (`*.der`) were produced with an independent encoder and
//! carry the nonce `00 01 .. 1f` when they carry one. [`MockResponder`]
//! answers live requests, echoing their nonce and CertID.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use ocsp_proto::der::{
    der_bit_string, der_enumerated, der_explicit_context, der_generalized_time,
    der_implicit_context, der_integer, der_octet_string, der_oid, der_sequence, der_tlv, oid,
};
use ocsp_proto::{Certificate, CryptoEngine, DefaultCryptoEngine, HashAlgorithm, OcspRequest};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use std::path::PathBuf;

pub fn fixture_path(name: &str) -> PathBuf {
    // Also included by the client crate's tests, hence the sibling path
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../ocsp-proto/tests/fixtures")
        .join(name)
}

/// Raw fixture bytes
pub fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).expect("fixture should exist")
}

/// PEM fixture as a parsed certificate
pub fn cert(name: &str) -> Certificate {
    let pem = std::fs::read_to_string(fixture_path(name)).expect("fixture should exist");
    Certificate::from_pem(&pem).expect("fixture should be a valid certificate")
}

/// Nonce carried by the static responses
pub fn fixture_nonce() -> Vec<u8> {
    (0u8..32).collect()
}

/// thisUpdate of every static response
pub fn fixture_this_update() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

/// nextUpdate of every static response
pub fn fixture_next_update() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2124, 6, 1, 0, 0, 0).unwrap()
}

/// revocationTime of the static revoked responses
pub fn fixture_revocation_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// OCSPResponse carrying only a status code
pub fn status_only_response(code: u8) -> Vec<u8> {
    der_sequence(&der_enumerated(code))
}

/// Key and certificate used to sign responses
pub struct Signer {
    key: EcdsaKeyPair,
    pub certificate: Certificate,
}

impl Signer {
    pub fn ca() -> Self {
        Self::load("ca.key.der", "ca.pem")
    }

    pub fn responder() -> Self {
        Self::load("responder.key.der", "responder.pem")
    }

    /// Same key, presenting another certificate
    pub fn with_certificate(mut self, certificate: Certificate) -> Self {
        self.certificate = certificate;
        self
    }

    /// Issue an id-kp-OCSPSigning certificate named `common_name`
    ///
    /// The new certificate reuses this signer's key pair, so
    /// `Signer::with_certificate` can sign responses with it. It carries
    /// no basicConstraints.
    pub fn issue_ocsp_signing_cert(&self, serial: u8, common_name: &str) -> Certificate {
        let not_before = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let not_after = Utc.with_ymd_and_hms(2124, 1, 1, 0, 0, 0).unwrap();

        let mut validity = der_generalized_time(&not_before);
        validity.extend_from_slice(&der_generalized_time(&not_after));

        let mut tbs = der_explicit_context(0, &der_integer(&[0x02]));
        tbs.extend_from_slice(&der_integer(&[0x30, serial]));
        tbs.extend_from_slice(&der_sequence(&der_oid(oid::ECDSA_WITH_SHA256)));
        tbs.extend_from_slice(self.certificate.subject_raw());
        tbs.extend_from_slice(&der_sequence(&validity));
        tbs.extend_from_slice(&common_name_der(common_name));
        tbs.extend_from_slice(self.certificate.spki());
        tbs.extend_from_slice(&der_explicit_context(3, &der_sequence(&ocsp_signing_eku())));
        let tbs = der_sequence(&tbs);

        let signature = self.sign(&tbs);
        let mut cert = tbs;
        cert.extend_from_slice(&der_sequence(&der_oid(oid::ECDSA_WITH_SHA256)));
        cert.extend_from_slice(&der_bit_string(&signature));

        Certificate::from_der(&der_sequence(&cert)).expect("issued certificate should parse")
    }

    fn load(key: &str, cert_name: &str) -> Self {
        let rng = SystemRandom::new();
        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &fixture(key), &rng)
            .expect("fixture key should load");
        Self {
            key,
            certificate: cert(cert_name),
        }
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let rng = SystemRandom::new();
        self.key
            .sign(&rng, message)
            .expect("signing should succeed")
            .as_ref()
            .to_vec()
    }
}

/// certStatus to put in the response
#[derive(Debug, Clone)]
pub enum Status {
    Good,
    Revoked {
        time: Vec<u8>,
        reason: Option<u8>,
    },
    Unknown,
    /// Arbitrary context-specific primitive tag
    Tag(u8),
}

impl Status {
    pub fn revoked(time: DateTime<Utc>, reason: Option<u8>) -> Self {
        Self::Revoked {
            time: der_generalized_time(&time),
            reason,
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            Self::Good => der_implicit_context(0, &[]),
            Self::Revoked { time, reason } => {
                let mut info = time.clone();
                if let Some(reason) = reason {
                    info.extend_from_slice(&der_explicit_context(0, &der_enumerated(*reason)));
                }
                der_tlv(0xA1, &info)
            }
            Self::Unknown => der_implicit_context(2, &[]),
            Self::Tag(tag) => der_implicit_context(*tag, &[]),
        }
    }
}

/// What to put in the response nonce extension
#[derive(Debug, Clone)]
pub enum NonceMode {
    Echo,
    Omit,
    Fixed(Vec<u8>),
}

/// Signs OCSP responses for live requests
pub struct MockResponder {
    signer: Signer,
    by_key: bool,
    status: Status,
    nonce: NonceMode,
    certs: Vec<Certificate>,
    response_count: usize,
    corrupt_signature: bool,
    serial_override: Option<Vec<u8>>,
}

impl MockResponder {
    /// CA-signed, byName, good, nonce echoed
    pub fn new() -> Self {
        Self::with_signer(Signer::ca())
    }

    pub fn with_signer(signer: Signer) -> Self {
        Self {
            signer,
            by_key: false,
            status: Status::Good,
            nonce: NonceMode::Echo,
            certs: Vec::new(),
            response_count: 1,
            corrupt_signature: false,
            serial_override: None,
        }
    }

    pub fn by_key(mut self) -> Self {
        self.by_key = true;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn nonce(mut self, nonce: NonceMode) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn embed(mut self, cert: Certificate) -> Self {
        self.certs.push(cert);
        self
    }

    pub fn response_count(mut self, count: usize) -> Self {
        self.response_count = count;
        self
    }

    pub fn corrupt_signature(mut self) -> Self {
        self.corrupt_signature = true;
        self
    }

    pub fn serial(mut self, serial: &[u8]) -> Self {
        self.serial_override = Some(serial.to_vec());
        self
    }

    /// Answer a DER-encoded OCSP request
    pub fn respond(&self, request_der: &[u8]) -> Vec<u8> {
        let request = OcspRequest::from_der(request_der).expect("request should decode");

        let mut cert_id = request.cert_id().clone();
        if let Some(serial) = &self.serial_override {
            cert_id.serial_number = serial.clone();
        }

        let now = Utc::now();
        let mut single = cert_id.to_der();
        single.extend_from_slice(&self.status.encode());
        single.extend_from_slice(&der_generalized_time(&now));
        single.extend_from_slice(&der_explicit_context(
            0,
            &der_generalized_time(&(now + chrono::Duration::days(7))),
        ));
        let single = der_sequence(&single);
        let responses: Vec<u8> = std::iter::repeat(single)
            .take(self.response_count)
            .flatten()
            .collect();

        let responder_id = if self.by_key {
            let hash = DefaultCryptoEngine::new()
                .digest(HashAlgorithm::Sha1, self.signer.certificate.public_key_bits());
            der_explicit_context(2, &der_octet_string(&hash))
        } else {
            der_explicit_context(1, self.signer.certificate.subject_raw())
        };

        let mut tbs = responder_id;
        tbs.extend_from_slice(&der_generalized_time(&now));
        tbs.extend_from_slice(&der_sequence(&responses));
        let nonce = match &self.nonce {
            NonceMode::Echo => request.nonce().map(<[u8]>::to_vec),
            NonceMode::Omit => None,
            NonceMode::Fixed(nonce) => Some(nonce.clone()),
        };
        if let Some(nonce) = nonce {
            tbs.extend_from_slice(&der_explicit_context(1, &nonce_extensions(&nonce)));
        }
        let tbs = der_sequence(&tbs);

        let mut signature = self.signer.sign(&tbs);
        if self.corrupt_signature {
            if let Some(last) = signature.last_mut() {
                *last ^= 0x01;
            }
        }

        let mut basic = tbs;
        basic.extend_from_slice(&der_sequence(&der_oid(oid::ECDSA_WITH_SHA256)));
        basic.extend_from_slice(&der_bit_string(&signature));
        if !self.certs.is_empty() {
            let certs: Vec<u8> = self.certs.iter().flat_map(|c| c.der().to_vec()).collect();
            basic.extend_from_slice(&der_explicit_context(0, &der_sequence(&certs)));
        }
        let basic = der_sequence(&basic);

        let mut response_bytes = der_oid(oid::OCSP_BASIC);
        response_bytes.extend_from_slice(&der_octet_string(&basic));

        let mut response = der_enumerated(0);
        response.extend_from_slice(&der_explicit_context(0, &der_sequence(&response_bytes)));
        der_sequence(&response)
    }
}

/// Name with a single CN attribute
fn common_name_der(common_name: &str) -> Vec<u8> {
    let mut attribute = der_oid(&[2, 5, 4, 3]);
    attribute.extend_from_slice(&der_tlv(0x0C, common_name.as_bytes()));
    der_sequence(&der_tlv(0x31, &der_sequence(&attribute)))
}

/// extKeyUsage extension listing id-kp-OCSPSigning
fn ocsp_signing_eku() -> Vec<u8> {
    let usages = der_sequence(&der_oid(&[1, 3, 6, 1, 5, 5, 7, 3, 9]));
    let mut ext = der_oid(&[2, 5, 29, 37]);
    ext.extend_from_slice(&der_octet_string(&usages));
    der_sequence(&ext)
}

fn nonce_extensions(nonce: &[u8]) -> Vec<u8> {
    let mut ext = der_oid(oid::OCSP_NONCE);
    ext.extend_from_slice(&der_octet_string(&der_octet_string(nonce)));
    der_sequence(&der_sequence(&ext))
}
