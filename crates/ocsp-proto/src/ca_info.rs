//! Authority Information Access lookup
//!
//! Pure lookup over an already-parsed certificate; no network access.

use crate::certificate::{AccessMethod, Certificate};
use crate::error::{OcspError, Result};
use serde::Serialize;

/// Responder and issuer locations published by a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaInfo {
    /// OCSP responder URL
    pub ocsp_url: String,
    /// CA Issuers URL for the issuer certificate
    pub issuer_url: String,
}

/// Extract the OCSP and CA Issuers URLs from the AIA extension
pub fn get_ca_info(cert: &Certificate) -> Result<CaInfo> {
    let descriptions = cert
        .authority_info_access()
        .ok_or(OcspError::MissingAIAExtension)?;

    let find = |method: AccessMethod| {
        descriptions
            .iter()
            .filter(|desc| desc.method == method)
            .filter_map(|desc| desc.uri.as_deref())
            .find(|uri| !uri.is_empty())
            .map(str::to_string)
    };

    let ocsp_url = find(AccessMethod::Ocsp).ok_or(OcspError::MissingOcspUrl)?;
    let issuer_url = find(AccessMethod::CaIssuers).ok_or(OcspError::MissingIssuerUrl)?;

    Ok(CaInfo {
        ocsp_url,
        issuer_url,
    })
}
