use serde::{Deserialize, Serialize};

/// What the configuration detector found on the target host.
///
/// The first four fields form the core set: a host with all of them is
/// treated as already configured and takes the fast path. The remaining
/// fields are auxiliary tools that are installed on demand when missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// nginx is installed.
    pub web_server: bool,
    /// A MySQL-compatible database server is installed.
    pub database: bool,
    /// The PHP runtime is installed.
    pub runtime: bool,
    /// The WordPress CLI (`wp`) is on PATH.
    pub site_tool: bool,
    /// `curl` is on PATH.
    #[serde(default)]
    pub http_client: bool,
    /// `unzip` is on PATH.
    #[serde(default)]
    pub archive_tool: bool,
    /// `ufw` is on PATH.
    #[serde(default)]
    pub firewall: bool,
}

impl ServerCapabilities {
    /// Every capability present.
    #[must_use]
    pub fn all() -> Self {
        Self {
            web_server: true,
            database: true,
            runtime: true,
            site_tool: true,
            http_client: true,
            archive_tool: true,
            firewall: true,
        }
    }

    /// `true` when every core capability is present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.web_server && self.database && self.runtime && self.site_tool
    }

    /// Package names of auxiliary tools that are absent.
    #[must_use]
    pub fn missing_auxiliary(&self) -> Vec<&'static str> {
        [
            (self.http_client, "curl"),
            (self.archive_tool, "unzip"),
            (self.firewall, "ufw"),
        ]
        .into_iter()
        .filter_map(|(present, name)| (!present).then_some(name))
        .collect()
    }
}
