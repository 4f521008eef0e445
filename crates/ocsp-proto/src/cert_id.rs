//! CertID: the key that ties a request to its response
//!
//! ```asn1
//! CertID ::= SEQUENCE {
//!     hashAlgorithm       AlgorithmIdentifier,
//!     issuerNameHash      OCTET STRING,
//!     issuerKeyHash       OCTET STRING,
//!     serialNumber        CertificateSerialNumber
//! }
//! ```

use crate::certificate::Certificate;
use crate::crypto::{CryptoEngine, HashAlgorithm};
use crate::der::{
    der_integer, der_null, der_octet_string, der_oid, der_sequence, tag, Tlv,
};
use crate::error::{OcspError, Result};

/// Identifies one certificate to a responder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertId {
    /// Hash algorithm used for the two issuer hashes
    pub hash_algorithm: HashAlgorithm,
    /// Hash of the issuer's DER-encoded subject Name
    pub issuer_name_hash: Vec<u8>,
    /// Hash of the issuer's subjectPublicKey bits
    pub issuer_key_hash: Vec<u8>,
    /// Serial number content octets
    pub serial_number: Vec<u8>,
}

impl CertId {
    /// Compute the CertID of `cert` as issued by `issuer`
    pub fn new(
        engine: &dyn CryptoEngine,
        cert: &Certificate,
        issuer: &Certificate,
        hash_algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            hash_algorithm,
            issuer_name_hash: engine.digest(hash_algorithm, issuer.subject_raw()),
            issuer_key_hash: engine.digest(hash_algorithm, issuer.public_key_bits()),
            serial_number: cert.raw_serial().to_vec(),
        }
    }

    /// DER encoding
    pub fn to_der(&self) -> Vec<u8> {
        let mut hash_algo_content = der_oid(self.hash_algorithm.oid());
        hash_algo_content.extend_from_slice(&der_null());

        let mut cert_id = der_sequence(&hash_algo_content);
        cert_id.extend_from_slice(&der_octet_string(&self.issuer_name_hash));
        cert_id.extend_from_slice(&der_octet_string(&self.issuer_key_hash));
        cert_id.extend_from_slice(&der_integer(&self.serial_number));

        der_sequence(&cert_id)
    }

    /// Decode a CertID element
    ///
    /// Absent and NULL hash parameters are treated alike, so equality of the
    /// decoded value only depends on the algorithm OID and the three remaining
    /// fields.
    pub fn from_tlv(tlv: Tlv<'_>) -> Result<Self> {
        let items = tlv.sequence("CertID")?;
        let [algorithm, name_hash, key_hash, serial] = items.as_slice() else {
            return Err(OcspError::malformed("CertID must have four elements"));
        };

        let algorithm_oid = algorithm
            .sequence("CertID.hashAlgorithm")?
            .into_iter()
            .next()
            .ok_or_else(|| OcspError::malformed("empty CertID.hashAlgorithm"))?
            .expect(tag::OID, "CertID.hashAlgorithm")?;
        let hash_algorithm = HashAlgorithm::from_oid(&algorithm_oid).ok_or_else(|| {
            OcspError::UnsupportedAlgorithm(crate::der::oid_to_string(algorithm_oid.content))
        })?;

        Ok(Self {
            hash_algorithm,
            issuer_name_hash: name_hash
                .expect(tag::OCTET_STRING, "CertID.issuerNameHash")?
                .content
                .to_vec(),
            issuer_key_hash: key_hash
                .expect(tag::OCTET_STRING, "CertID.issuerKeyHash")?
                .content
                .to_vec(),
            serial_number: serial.expect(tag::INTEGER, "CertID.serialNumber")?.content.to_vec(),
        })
    }
}
