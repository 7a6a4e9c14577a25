//! Application service: server capability detection.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use siteforge_common::ServerCapabilities;

use crate::application::ports::RemoteShell;

const WEB_SERVER_PROBE: &str = "command -v nginx >/dev/null 2>&1";
const DATABASE_PROBE: &str =
    "command -v mariadb >/dev/null 2>&1 || command -v mysqld >/dev/null 2>&1";
const RUNTIME_PROBE: &str =
    "command -v php >/dev/null 2>&1 && compgen -G '/etc/php/*/fpm/php-fpm.conf' >/dev/null";
const SITE_TOOL_PROBE: &str = "command -v wp >/dev/null 2>&1";
const HTTP_CLIENT_PROBE: &str = "command -v curl >/dev/null 2>&1";
const ARCHIVE_TOOL_PROBE: &str = "command -v unzip >/dev/null 2>&1";
const FIREWALL_PROBE: &str = "command -v ufw >/dev/null 2>&1";

/// Probe the host for every component of the stack.
///
/// Probes are read-only and run concurrently. A probe whose transport fails
/// counts as absent.
pub async fn detect(shell: &impl RemoteShell) -> ServerCapabilities {
    let (web_server, database, runtime, site_tool, http_client, archive_tool, firewall) = tokio::join!(
        probe(shell, "web_server", WEB_SERVER_PROBE),
        probe(shell, "database", DATABASE_PROBE),
        probe(shell, "runtime", RUNTIME_PROBE),
        probe(shell, "site_tool", SITE_TOOL_PROBE),
        probe(shell, "http_client", HTTP_CLIENT_PROBE),
        probe(shell, "archive_tool", ARCHIVE_TOOL_PROBE),
        probe(shell, "firewall", FIREWALL_PROBE),
    );
    let caps = ServerCapabilities {
        web_server,
        database,
        runtime,
        site_tool,
        http_client,
        archive_tool,
        firewall,
    };
    tracing::info!(
        host = shell.host(),
        configured = caps.is_configured(),
        ?caps,
        "capabilities detected"
    );
    caps
}

async fn probe(shell: &impl RemoteShell, name: &str, command: &str) -> bool {
    match shell.run(command).await {
        Ok(output) => output.success(),
        Err(e) => {
            tracing::warn!(probe = name, error = %e, "capability probe failed, assuming absent");
            false
        }
    }
}
