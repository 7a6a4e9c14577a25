//! Connection parameters for one remote host.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::ProvisionError;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Pattern is a compile-time constant
    Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("valid username regex")
});

/// How to authenticate against the SSH server.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    PrivateKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::PrivateKey { path, passphrase } => f
                .debug_struct("PrivateKey")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Target host and credentials. Immutable once a connection starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential: Credential,
}

impl ConnectionConfig {
    /// `user@host` as understood by the ssh client.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// Whether remote commands need `sudo` to act as root.
    #[must_use]
    pub fn needs_sudo(&self) -> bool {
        self.username != "root"
    }

    /// Check the config before any network activity.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Validation` naming the first invalid field.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.host.trim().is_empty() || self.host.chars().any(char::is_whitespace) {
            return Err(ProvisionError::invalid("host", "must be a non-empty hostname or IP"));
        }
        if self.host.starts_with('-') {
            return Err(ProvisionError::invalid("host", "must not start with '-'"));
        }
        if self.port == 0 {
            return Err(ProvisionError::invalid("port", "must be between 1 and 65535"));
        }
        if !USERNAME_RE.is_match(&self.username) {
            return Err(ProvisionError::invalid(
                "username",
                format!("'{}' is not a valid unix user name", self.username),
            ));
        }
        match &self.credential {
            Credential::Password(p) if p.is_empty() => {
                Err(ProvisionError::invalid("password", "must not be empty"))
            }
            Credential::PrivateKey { path, .. } if path.as_os_str().is_empty() => {
                Err(ProvisionError::invalid("private key", "path must not be empty"))
            }
            _ => Ok(()),
        }
    }
}
