//! Public result of a revocation check

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Revocation status reported by the responder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertStatus {
    Good,
    Revoked,
    Unknown,
}

impl fmt::Display for CertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => f.write_str("good"),
            Self::Revoked => f.write_str("revoked"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// CRLReason (RFC 5280 Section 5.3.1)
///
/// Codes outside the RFC list are kept as [`RevocationReason::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
    /// Unassigned code such as 7
    Other(u8),
}

impl RevocationReason {
    /// `None` only for codes that do not fit a CRLReason at all
    pub fn from_code(code: u32) -> Option<Self> {
        let reason = match code {
            0 => Self::Unspecified,
            1 => Self::KeyCompromise,
            2 => Self::CaCompromise,
            3 => Self::AffiliationChanged,
            4 => Self::Superseded,
            5 => Self::CessationOfOperation,
            6 => Self::CertificateHold,
            8 => Self::RemoveFromCrl,
            9 => Self::PrivilegeWithdrawn,
            10 => Self::AaCompromise,
            other => Self::Other(u8::try_from(other).ok()?),
        };
        Some(reason)
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::KeyCompromise => 1,
            Self::CaCompromise => 2,
            Self::AffiliationChanged => 3,
            Self::Superseded => 4,
            Self::CessationOfOperation => 5,
            Self::CertificateHold => 6,
            Self::RemoveFromCrl => 8,
            Self::PrivilegeWithdrawn => 9,
            Self::AaCompromise => 10,
            Self::Other(code) => code,
        }
    }

    /// RFC 5280 name, `None` for unassigned codes
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::Unspecified => "unspecified",
            Self::KeyCompromise => "keyCompromise",
            Self::CaCompromise => "cACompromise",
            Self::AffiliationChanged => "affiliationChanged",
            Self::Superseded => "superseded",
            Self::CessationOfOperation => "cessationOfOperation",
            Self::CertificateHold => "certificateHold",
            Self::RemoveFromCrl => "removeFromCRL",
            Self::PrivilegeWithdrawn => "privilegeWithdrawn",
            Self::AaCompromise => "aACompromise",
            Self::Other(_) => return None,
        };
        Some(name)
    }

    pub fn is_assigned(self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "unrecognized({})", self.code()),
        }
    }
}

/// Assigned reasons serialize as their RFC name, others as the bare code
impl Serialize for RevocationReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.name() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_u8(self.code()),
        }
    }
}

/// Validated outcome of one OCSP check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub status: CertStatus,
    /// Responder that produced the answer
    pub ocsp_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<RevocationReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_update: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub this_update: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub produced_at: Option<DateTime<Utc>>,
    /// Undecoded response, when requested
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_base64"
    )]
    pub raw_response: Option<Vec<u8>>,
}

impl Verdict {
    pub fn is_revoked(&self) -> bool {
        self.status == CertStatus::Revoked
    }

    pub fn is_good(&self) -> bool {
        self.status == CertStatus::Good
    }

    /// Whether `now` lies within [thisUpdate, nextUpdate)
    ///
    /// Informational only; the validator does not reject stale responses.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let started = self.this_update.map_or(true, |t| t <= now);
        let not_stale = self.next_update.map_or(true, |t| now < t);
        started && not_stale
    }
}

fn serialize_base64<S: Serializer>(
    bytes: &Option<Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn verdict() -> Verdict {
        Verdict {
            status: CertStatus::Revoked,
            ocsp_url: "http://ocsp.test.invalid".to_string(),
            revocation_time: Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()),
            revocation_reason: Some(RevocationReason::Superseded),
            next_update: Some(Utc.with_ymd_and_hms(2025, 6, 8, 0, 0, 0).unwrap()),
            this_update: Some(Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()),
            produced_at: None,
            raw_response: Some(vec![0x30, 0x03, 0x0a, 0x01, 0x00]),
        }
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(RevocationReason::from_code(4), Some(RevocationReason::Superseded));
        assert_eq!(RevocationReason::from_code(7), Some(RevocationReason::Other(7)));
        assert_eq!(RevocationReason::from_code(11), Some(RevocationReason::Other(11)));
        assert_eq!(RevocationReason::from_code(300), None);
        assert_eq!(RevocationReason::Other(7).code(), 7);
        assert!(!RevocationReason::Other(7).is_assigned());
        assert_eq!(RevocationReason::Other(7).to_string(), "unrecognized(7)");
        assert_eq!(RevocationReason::RemoveFromCrl.code(), 8);
        assert_eq!(RevocationReason::CaCompromise.to_string(), "cACompromise");
    }

    #[test]
    fn test_freshness() {
        let v = verdict();
        assert!(v.is_fresh(Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()));
        assert!(!v.is_fresh(Utc.with_ymd_and_hms(2025, 6, 8, 0, 0, 0).unwrap()));
        assert!(!v.is_fresh(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(verdict()).unwrap();
        assert_eq!(json["status"], "revoked");
        assert_eq!(json["revocationReason"], "superseded");
        assert_eq!(json["ocspUrl"], "http://ocsp.test.invalid");
        assert_eq!(json["rawResponse"], "MAMKAQA=");
        assert!(json.get("producedAt").is_none());
    }

    #[test]
    fn test_json_unassigned_reason_is_numeric() {
        let mut v = verdict();
        v.revocation_reason = Some(RevocationReason::Other(7));
        let json = serde_json::to_value(v).unwrap();
        assert_eq!(json["revocationReason"], 7);
    }
}
