use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSource {
    Ip,
    Domain,
}

/// Outcome of turning the user's target string into an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub ip: IpAddr,
    pub source: TargetSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Fields lifted from the leaf certificate a host presented.
///
/// Issuer and subject are keyed by RDN short name (`C`, `O`, `CN`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInfo {
    pub issuer: BTreeMap<String, String>,
    pub subject: BTreeMap<String, String>,
    pub not_before: String,
    pub not_after: String,
    /// Whether the chain validated against the bundled trust roots.
    pub verified: bool,
}

impl CertificateInfo {
    pub fn issuer_field(&self, key: &str) -> Option<&str> {
        self.issuer.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubdomainRecord {
    pub subdomain: String,
    pub ip: Option<IpAddr>,
    pub ssl: Option<CertificateInfo>,
    pub possible_takeover: bool,
}

impl SubdomainRecord {
    /// A record where every probe came back empty.
    pub fn bare(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            ip: None,
            ssl: None,
            possible_takeover: false,
        }
    }
}
