//! Preview-domain derivation.

use sha2::{Digest, Sha256};

use crate::domain::credentials::hex_encode;

const HASH_CHARS: usize = 10;
const SLUG_MAX: usize = 40;

/// Deterministic preview hostname for a requester's site.
///
/// Format: `{label-slug}-{10 hex chars}.{base}`. The hash covers the
/// requester id and the raw label separated by a NUL byte, so the same label
/// from two requesters never collides.
#[must_use]
pub fn preview_domain(requester_id: &str, label: &str, base_domain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(requester_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(label.as_bytes());
    let digest = hex_encode(&hasher.finalize());
    let hash = &digest[..HASH_CHARS];
    let base = base_domain.trim_matches('.');
    format!("{}-{hash}.{base}", slugify(label))
}

/// Lowercase DNS-label slug: runs of other characters collapse to one `-`.
fn slugify(label: &str) -> String {
    let mut out = String::new();
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let out: String = out.chars().take(SLUG_MAX).collect();
    let out = out.trim_end_matches('-');
    if out.is_empty() {
        "site".to_string()
    } else {
        out.to_string()
    }
}
