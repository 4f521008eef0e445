//! Minimal DER support for OCSP structures
//!
//! Encoding is done with explicit tag-length-value helpers; the structures
//! an OCSP client emits are small and fixed, so building them inside out is
//! simpler than pulling in a full ASN.1 compiler.
//!
//! Decoding walks TLVs with the `asn1-rs` parser that ships with
//! `x509-parser`. Every decoded element keeps a reference to its raw bytes,
//! which is what signature verification needs (the signature covers the
//! exact DER of `tbsResponseData`, not a re-encoding of it).

use crate::error::{OcspError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::borrow::Cow;
use x509_parser::oid_registry::asn1_rs::{Any, FromDer, Oid};

pub use x509_parser::oid_registry::asn1_rs::Class;

/// Universal tag numbers used by OCSP
pub mod tag {
    pub const BOOLEAN: u32 = 0x01;
    pub const INTEGER: u32 = 0x02;
    pub const BIT_STRING: u32 = 0x03;
    pub const OCTET_STRING: u32 = 0x04;
    pub const NULL: u32 = 0x05;
    pub const OID: u32 = 0x06;
    pub const ENUMERATED: u32 = 0x0a;
    pub const UTC_TIME: u32 = 0x17;
    pub const GENERALIZED_TIME: u32 = 0x18;
    pub const SEQUENCE: u32 = 0x10;
}

/// Object identifiers, as arc lists
pub mod oid {
    /// id-sha1
    pub const SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
    /// id-sha256
    pub const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
    /// id-sha384
    pub const SHA384: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 2];
    /// id-sha512
    pub const SHA512: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 3];
    /// id-pkix-ocsp-basic
    pub const OCSP_BASIC: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 1, 1];
    /// id-pkix-ocsp-nonce
    pub const OCSP_NONCE: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 1, 2];
    /// id-pe-authorityInfoAccess
    pub const AUTHORITY_INFO_ACCESS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 1, 1];
    /// id-ad-ocsp
    pub const AD_OCSP: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 1];
    /// id-ad-caIssuers
    pub const AD_CA_ISSUERS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 2];
    /// sha1WithRSAEncryption
    pub const SHA1_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 5];
    /// sha256WithRSAEncryption
    pub const SHA256_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 11];
    /// sha384WithRSAEncryption
    pub const SHA384_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 12];
    /// sha512WithRSAEncryption
    pub const SHA512_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 13];
    /// id-RSASSA-PSS
    pub const RSASSA_PSS: &[u64] = &[1, 2, 840, 113549, 1, 1, 10];
    /// ecdsa-with-SHA256
    pub const ECDSA_WITH_SHA256: &[u64] = &[1, 2, 840, 10045, 4, 3, 2];
    /// ecdsa-with-SHA384
    pub const ECDSA_WITH_SHA384: &[u64] = &[1, 2, 840, 10045, 4, 3, 3];
    /// id-Ed25519
    pub const ED25519: &[u64] = &[1, 3, 101, 112];
    /// prime256v1
    pub const SECP256R1: &[u64] = &[1, 2, 840, 10045, 3, 1, 7];
    /// secp384r1
    pub const SECP384R1: &[u64] = &[1, 3, 132, 0, 34];
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a SEQUENCE
pub fn der_sequence(contents: &[u8]) -> Vec<u8> {
    der_tlv(0x30, contents)
}

/// Encode an OCTET STRING
pub fn der_octet_string(contents: &[u8]) -> Vec<u8> {
    der_tlv(0x04, contents)
}

/// Encode an INTEGER from its content octets
///
/// The content is used as-is; callers pass the two's complement encoding
/// they already hold (a certificate serial number keeps its original bytes).
pub fn der_integer(content: &[u8]) -> Vec<u8> {
    der_tlv(0x02, content)
}

/// Encode an ENUMERATED with a small non-negative value
pub fn der_enumerated(value: u8) -> Vec<u8> {
    if value & 0x80 != 0 {
        der_tlv(0x0a, &[0x00, value])
    } else {
        der_tlv(0x0a, &[value])
    }
}

/// Encode a BIT STRING with no unused bits
pub fn der_bit_string(bits: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(bits.len() + 1);
    content.push(0x00);
    content.extend_from_slice(bits);
    der_tlv(0x03, &content)
}

/// Encode a GeneralizedTime with second precision
pub fn der_generalized_time(time: &DateTime<Utc>) -> Vec<u8> {
    let text = time.format("%Y%m%d%H%M%SZ").to_string();
    der_tlv(0x18, text.as_bytes())
}

/// Encode an OBJECT IDENTIFIER
pub fn der_oid(components: &[u64]) -> Vec<u8> {
    der_tlv(0x06, &oid_content(components))
}

/// Content octets of an OBJECT IDENTIFIER
pub fn oid_content(components: &[u64]) -> Vec<u8> {
    let mut encoded = Vec::new();
    if components.len() < 2 {
        return encoded;
    }

    // First two components are encoded as 40*v1 + v2
    encoded.extend_from_slice(&encode_base128(40 * components[0] + components[1]));

    for &component in &components[2..] {
        encoded.extend_from_slice(&encode_base128(component));
    }

    encoded
}

/// Encode NULL
pub fn der_null() -> Vec<u8> {
    vec![0x05, 0x00]
}

/// Encode context-specific explicit (constructed) tag
pub fn der_explicit_context(tag: u8, contents: &[u8]) -> Vec<u8> {
    der_tlv(0xA0 | tag, contents)
}

/// Encode context-specific implicit primitive tag
pub fn der_implicit_context(tag: u8, contents: &[u8]) -> Vec<u8> {
    der_tlv(0x80 | tag, contents)
}

/// Encode Tag-Length-Value
pub fn der_tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut result = vec![tag];
    result.extend_from_slice(&der_length(contents.len()));
    result.extend_from_slice(contents);
    result
}

/// Encode DER length
fn der_length(length: usize) -> Vec<u8> {
    if length < 128 {
        vec![length as u8]
    } else {
        let mut length_bytes = Vec::new();
        let mut len = length;
        while len > 0 {
            length_bytes.insert(0, (len & 0xFF) as u8);
            len >>= 8;
        }
        let mut result = vec![0x80 | length_bytes.len() as u8];
        result.extend_from_slice(&length_bytes);
        result
    }
}

/// Encode value in base-128 (for OID components)
fn encode_base128(mut value: u64) -> Vec<u8> {
    let mut result = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        result.insert(0, (value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    result
}

// ============================================================================
// Decoding
// ============================================================================

/// One decoded DER element
#[derive(Debug, Clone, Copy)]
pub struct Tlv<'a> {
    /// Tag class
    pub class: Class,
    /// Tag number
    pub tag: u32,
    /// Constructed bit
    pub constructed: bool,
    /// Content octets
    pub content: &'a [u8],
    /// Complete encoding, header included
    pub raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Parse one element from the front of `input`, returning the remainder
    pub fn parse(input: &'a [u8]) -> Result<(Self, &'a [u8])> {
        let (rest, any) = Any::from_der(input)
            .map_err(|e| OcspError::malformed(format!("invalid DER element: {}", e)))?;
        let consumed = input.len() - rest.len();
        let tlv = Tlv {
            class: any.header.class(),
            tag: any.header.tag().0,
            constructed: any.header.is_constructed(),
            content: any.data,
            raw: &input[..consumed],
        };
        Ok((tlv, rest))
    }

    /// Parse exactly one element, rejecting trailing data
    pub fn parse_exact(input: &'a [u8]) -> Result<Self> {
        let (tlv, rest) = Self::parse(input)?;
        if !rest.is_empty() {
            return Err(OcspError::malformed(format!(
                "{} bytes of trailing data",
                rest.len()
            )));
        }
        Ok(tlv)
    }

    /// Parse the content as a list of elements
    pub fn children(&self) -> Result<Vec<Tlv<'a>>> {
        let mut items = Vec::new();
        let mut input = self.content;
        while !input.is_empty() {
            let (item, rest) = Self::parse(input)?;
            items.push(item);
            input = rest;
        }
        Ok(items)
    }

    /// Whether this is the given universal tag
    pub fn is_universal(&self, tag: u32) -> bool {
        self.class == Class::Universal && self.tag == tag
    }

    /// Whether this is the given context-specific tag
    pub fn is_context(&self, tag: u32) -> bool {
        self.class == Class::ContextSpecific && self.tag == tag
    }

    /// Require the given universal tag
    pub fn expect(self, tag: u32, what: &str) -> Result<Self> {
        if self.is_universal(tag) {
            Ok(self)
        } else {
            Err(OcspError::malformed(format!(
                "{}: unexpected tag {:?}/{}",
                what, self.class, self.tag
            )))
        }
    }

    /// Children of a SEQUENCE
    pub fn sequence(self, what: &str) -> Result<Vec<Tlv<'a>>> {
        self.expect(tag::SEQUENCE, what)?.children()
    }

    /// Inner element of an EXPLICIT context tag
    pub fn explicit_inner(&self) -> Result<Tlv<'a>> {
        Tlv::parse_exact(self.content)
    }

    /// Whether this OBJECT IDENTIFIER equals the given arcs
    pub fn is_oid(&self, components: &[u64]) -> bool {
        self.is_universal(tag::OID) && self.content == oid_content(components).as_slice()
    }

    /// Content of a BIT STRING without the unused-bits octet
    pub fn bit_string(&self) -> Result<&'a [u8]> {
        let tlv = self.expect(tag::BIT_STRING, "BIT STRING")?;
        match tlv.content.split_first() {
            Some((0, bits)) => Ok(bits),
            Some((unused, _)) => Err(OcspError::malformed(format!(
                "BIT STRING with {} unused bits",
                unused
            ))),
            None => Err(OcspError::malformed("empty BIT STRING")),
        }
    }

    /// Value of a small non-negative INTEGER or ENUMERATED
    pub fn small_uint(&self) -> Result<u32> {
        if self.content.is_empty() || self.content.len() > 4 || self.content[0] & 0x80 != 0 {
            return Err(OcspError::malformed("integer out of range"));
        }
        Ok(self
            .content
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }

    /// Decode a GeneralizedTime or UTCTime
    pub fn time(&self) -> Result<DateTime<Utc>> {
        parse_time(self)
    }
}

/// Dotted-decimal form of OID content octets
pub fn oid_to_string(content: &[u8]) -> String {
    Oid::new(Cow::Borrowed(content)).to_id_string()
}

fn parse_time(tlv: &Tlv<'_>) -> Result<DateTime<Utc>> {
    let bad_time = || OcspError::malformed("invalid time value");
    let text = std::str::from_utf8(tlv.content).map_err(|_| bad_time())?;
    let text = text.strip_suffix('Z').ok_or_else(bad_time)?;
    let text = match text.split_once('.') {
        Some((whole, _fraction)) => whole,
        None => text,
    };

    let full = if tlv.is_universal(tag::GENERALIZED_TIME) {
        text.to_string()
    } else if tlv.is_universal(tag::UTC_TIME) {
        // RFC 5280: YY >= 50 is 19YY, otherwise 20YY
        let yy: u32 = text.get(..2).and_then(|y| y.parse().ok()).ok_or_else(bad_time)?;
        let century = if yy >= 50 { "19" } else { "20" };
        format!("{}{}", century, text)
    } else {
        return Err(OcspError::malformed(format!(
            "expected a time value, got tag {}",
            tlv.tag
        )));
    };

    NaiveDateTime::parse_from_str(&full, "%Y%m%d%H%M%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| bad_time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_der_length_encoding() {
        assert_eq!(der_length(0), vec![0x00]);
        assert_eq!(der_length(127), vec![0x7F]);
        assert_eq!(der_length(128), vec![0x81, 0x80]);
        assert_eq!(der_length(256), vec![0x82, 0x01, 0x00]);
    }

    #[test]
    fn test_der_oid_encoding() {
        // SHA-256 OID: 2.16.840.1.101.3.4.2.1
        let encoded = der_oid(oid::SHA256);
        assert_eq!(encoded[0], 0x06);
        assert_eq!(
            &encoded[2..],
            &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01]
        );

        // id-pkix-ocsp-nonce
        assert_eq!(
            der_oid(oid::OCSP_NONCE),
            vec![0x06, 0x09, 0x2B, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, 0x01, 0x02]
        );
    }

    #[test]
    fn test_parse_nested() {
        let inner = der_octet_string(b"abc");
        let outer = der_sequence(&der_explicit_context(2, &inner));

        let seq = Tlv::parse_exact(&outer).unwrap();
        let items = seq.sequence("outer").unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_context(2));
        assert!(items[0].constructed);

        let octets = items[0].explicit_inner().unwrap();
        assert!(octets.is_universal(tag::OCTET_STRING));
        assert_eq!(octets.content, b"abc");
        assert_eq!(octets.raw, inner.as_slice());
    }

    #[test]
    fn test_parse_rejects_trailing_data() {
        let mut bytes = der_null();
        bytes.push(0x00);
        assert!(matches!(
            Tlv::parse_exact(&bytes),
            Err(OcspError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_truncated() {
        let bytes = [0x30, 0x05, 0x02, 0x01];
        assert!(Tlv::parse(&bytes).is_err());
    }

    #[test]
    fn test_generalized_time() {
        let time = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let encoded = der_generalized_time(&time);
        assert_eq!(&encoded[2..], b"20250301120000Z");
        assert_eq!(Tlv::parse_exact(&encoded).unwrap().time().unwrap(), time);

        let fractional = der_tlv(0x18, b"20250301120000.250Z");
        assert_eq!(Tlv::parse_exact(&fractional).unwrap().time().unwrap(), time);
    }

    #[test]
    fn test_utc_time_pivot() {
        let modern = der_tlv(0x17, b"250301120000Z");
        assert_eq!(
            Tlv::parse_exact(&modern).unwrap().time().unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
        );

        let legacy = der_tlv(0x17, b"990101000000Z");
        assert_eq!(
            Tlv::parse_exact(&legacy).unwrap().time().unwrap(),
            Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_small_uint() {
        let value_der = der_enumerated(4);
        let value = Tlv::parse_exact(&value_der).unwrap();
        assert_eq!(value.small_uint().unwrap(), 4);

        let negative_der = der_tlv(0x02, &[0xFF]);
        let negative = Tlv::parse_exact(&negative_der).unwrap();
        assert!(negative.small_uint().is_err());
    }

    #[test]
    fn test_oid_round_trip() {
        let encoded = der_oid(oid::OCSP_BASIC);
        let tlv = Tlv::parse_exact(&encoded).unwrap();
        assert!(tlv.is_oid(oid::OCSP_BASIC));
        assert!(!tlv.is_oid(oid::OCSP_NONCE));
        assert_eq!(oid_to_string(tlv.content), "1.3.6.1.5.5.7.48.1.1");
    }
}
