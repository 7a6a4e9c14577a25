//! Assembly of the final success payload.

use siteforge_common::{
    AccessKind, AccessMethod, Credentials, DnsInstructions, DnsRecord, InstallationResult,
    SiteInfo,
};

const DNS_TTL: u32 = 3600;

/// Everything known once the last step has completed.
#[derive(Debug, Clone)]
pub struct ResultInput {
    pub domain: String,
    pub host_ip: String,
    pub assigned_port: Option<u16>,
    pub preview_domain: Option<String>,
    pub credentials: Credentials,
}

/// Build the success payload.
///
/// The primary URL uses the preview port when one was assigned, so the site
/// is reachable before DNS for `domain` exists.
#[must_use]
pub fn build_result(input: ResultInput) -> InstallationResult {
    let ResultInput {
        domain,
        host_ip,
        assigned_port,
        preview_domain,
        credentials,
    } = input;

    let access_url = match assigned_port {
        Some(port) => format!("http://{host_ip}:{port}"),
        None => format!("http://{host_ip}"),
    };
    let admin_url = format!("{access_url}/wp-admin");

    let mut access_methods = Vec::new();
    if let Some(preview) = &preview_domain {
        access_methods.push(AccessMethod {
            kind: AccessKind::PreviewDomain,
            url: format!("http://{preview}"),
            description: "Preview hostname, usable before your DNS is set up".to_string(),
        });
    }
    if assigned_port.is_some() {
        access_methods.push(AccessMethod {
            kind: AccessKind::BareIp,
            url: format!("http://{host_ip}"),
            description: "Server IP address on the default HTTP port".to_string(),
        });
    }
    access_methods.push(AccessMethod {
        kind: AccessKind::Domain,
        url: format!("http://{domain}"),
        description: "Your domain, once its DNS records point at the server".to_string(),
    });

    let dns = DnsInstructions {
        records: ["@", "www"]
            .into_iter()
            .map(|name| DnsRecord {
                kind: "A".to_string(),
                name: name.to_string(),
                value: host_ip.clone(),
                ttl: DNS_TTL,
            })
            .collect(),
        notes: vec![
            format!("Create the records above in the DNS zone for {domain}."),
            "DNS changes can take up to 48 hours to propagate.".to_string(),
            "Remove any existing A or AAAA records for the same names first.".to_string(),
            format!(
                "Once {domain} resolves, switch the WordPress and Site Address to http://{domain} under Settings > General."
            ),
        ],
    };

    InstallationResult {
        success: true,
        site: SiteInfo {
            domain,
            host_ip,
            access_url,
            admin_url,
            assigned_port,
            preview_domain,
        },
        credentials,
        access_methods,
        dns,
    }
}
