use serde::{Deserialize, Serialize};

/// Final payload of a successful installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationResult {
    pub success: bool,
    pub site: SiteInfo,
    pub credentials: Credentials,
    /// Ways to reach the site besides the primary URL, most useful first.
    pub access_methods: Vec<AccessMethod>,
    pub dns: DnsInstructions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    pub domain: String,
    pub host_ip: String,
    pub access_url: String,
    pub admin_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub admin_user: String,
    pub admin_password: String,
    pub admin_email: String,
    pub database_name: String,
    pub database_user: String,
    pub database_password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    PreviewDomain,
    BareIp,
    Domain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessMethod {
    pub kind: AccessKind,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record type, e.g. `A`.
    pub kind: String,
    /// Host label relative to the zone (`@`, `www`).
    pub name: String,
    pub value: String,
    pub ttl: u32,
}

/// Provider-neutral DNS setup guidance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsInstructions {
    pub records: Vec<DnsRecord>,
    pub notes: Vec<String>,
}
