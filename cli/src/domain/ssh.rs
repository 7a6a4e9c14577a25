//! Classification of SSH client diagnostics.

use crate::domain::error::ConnectionCause;

/// Map the ssh client's stderr to candidate causes, most likely first.
///
/// Unrecognised output yields every cause, since the client gave nothing
/// to narrow it down.
#[must_use]
pub fn classify_connect_failure(stderr: &str) -> Vec<ConnectionCause> {
    use ConnectionCause::{BadCredentials, Firewall, ServiceDown, Unreachable};

    let text = stderr.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    if has(&[
        "permission denied",
        "too many authentication failures",
        "incorrect passphrase",
        "bad passphrase",
        "no supported authentication methods",
        "authentication failed",
    ]) {
        vec![BadCredentials]
    } else if has(&["connection refused"]) {
        vec![ServiceDown, Firewall]
    } else if has(&[
        "could not resolve hostname",
        "name or service not known",
        "no route to host",
        "network is unreachable",
        "host is down",
    ]) {
        vec![Unreachable]
    } else if has(&["connection timed out", "operation timed out"]) {
        vec![Firewall, Unreachable]
    } else if has(&[
        "connection reset",
        "connection closed by",
        "kex_exchange_identification",
    ]) {
        vec![Firewall, ServiceDown]
    } else {
        vec![Unreachable, BadCredentials, Firewall, ServiceDown]
    }
}

/// Causes for a connect attempt that produced no verdict before the timeout.
#[must_use]
pub fn classify_connect_timeout() -> Vec<ConnectionCause> {
    vec![ConnectionCause::Firewall, ConnectionCause::Unreachable]
}
