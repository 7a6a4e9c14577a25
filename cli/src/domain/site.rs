//! Naming of everything a site owns on the host.
//!
//! Database identifiers are derived from the domain so re-running an
//! installation for the same domain lands on the same names, which is what
//! the preflight conflict probes look for. A readable prefix keeps them
//! recognizable; a digest of the full domain keeps them distinct after
//! truncation or when two domains differ only in punctuation.

use sha2::{Digest, Sha256};

use crate::domain::credentials::hex_encode;

/// MariaDB identifier length limits.
const DB_USER_MAX: usize = 32;
const DB_NAME_MAX: usize = 64;

const DIGEST_CHARS: usize = 8;

/// Paths and identifiers for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    pub domain: String,
    pub site_root: String,
    pub vhost_available: String,
    pub vhost_enabled: String,
    pub db_name: String,
    pub db_user: String,
}

impl SiteLayout {
    /// Layout for `domain` under `web_root`.
    #[must_use]
    pub fn for_domain(domain: &str, web_root: &str) -> Self {
        let web_root = web_root.trim_end_matches('/');
        Self {
            domain: domain.to_string(),
            site_root: format!("{web_root}/{domain}"),
            vhost_available: format!("/etc/nginx/sites-available/{domain}"),
            vhost_enabled: format!("/etc/nginx/sites-enabled/{domain}"),
            db_name: db_identifier(domain, DB_NAME_MAX),
            db_user: db_identifier(domain, DB_USER_MAX),
        }
    }
}

/// `blog.example.com` becomes `wp_blog_example_com_<digest>`, with the
/// readable part cut so the whole fits in `max` characters.
fn db_identifier(domain: &str, max: usize) -> String {
    let digest = hex_encode(&Sha256::digest(domain.as_bytes()));
    let prefix_max = max - "wp_".len() - 1 - DIGEST_CHARS;
    let readable: String = domain
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .take(prefix_max)
        .collect();
    format!("wp_{}_{}", readable.trim_end_matches('_'), &digest[..DIGEST_CHARS])
}
