//! Domain types and validators for siteforge configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "pipeline.deadline_secs",
    "pipeline.command_timeout_secs",
    "pipeline.connect_timeout_secs",
    "preview.port_start",
    "preview.port_end",
    "preview.base_domain",
    "site.web_root",
    "site.admin_user",
];

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "SITEFORGE_CONFIG";

/// Environment variable carrying the database administrator password for
/// hosts where the database root account does not use socket auth.
pub const DB_ADMIN_PASSWORD_ENV: &str = "SITEFORGE_DB_ADMIN_PASSWORD";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.siteforge/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SiteforgeConfig {
    pub pipeline: PipelineConfig,
    pub preview: PreviewConfig,
    pub site: SiteDefaults,
}

/// Time limits for one installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Wall-clock limit for the whole step sequence.
    pub deadline_secs: u64,
    /// Limit for any single remote command.
    pub command_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 600,
            command_timeout_secs: 900,
            connect_timeout_secs: 20,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Preview access pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub port_start: u16,
    pub port_end: u16,
    /// Parent zone for preview hostnames. No preview hostnames without it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_domain: Option<String>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            port_start: 8100,
            port_end: 8999,
            base_domain: None,
        }
    }
}

/// Defaults applied to every site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteDefaults {
    pub web_root: String,
    pub admin_user: String,
}

impl Default for SiteDefaults {
    fn default() -> Self {
        Self {
            web_root: "/var/www".to_string(),
            admin_user: "admin".to_string(),
        }
    }
}

impl SiteforgeConfig {
    /// Check cross-field constraints after loading.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first inconsistent setting.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.preview.port_start > 0 && self.preview.port_start <= self.preview.port_end,
            "preview.port_start ({}) must be between 1 and preview.port_end ({})",
            self.preview.port_start,
            self.preview.port_end
        );
        anyhow::ensure!(self.pipeline.deadline_secs > 0, "pipeline.deadline_secs must be positive");
        anyhow::ensure!(
            self.pipeline.command_timeout_secs > 0,
            "pipeline.command_timeout_secs must be positive"
        );
        anyhow::ensure!(
            self.pipeline.connect_timeout_secs > 0,
            "pipeline.connect_timeout_secs must be positive"
        );
        anyhow::ensure!(self.site.web_root.starts_with('/'), "site.web_root must be an absolute path");
        Ok(())
    }

    /// Apply `key = value`, validating both.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "pipeline.deadline_secs" => self.pipeline.deadline_secs = parse_secs(key, value)?,
            "pipeline.command_timeout_secs" => {
                self.pipeline.command_timeout_secs = parse_secs(key, value)?;
            }
            "pipeline.connect_timeout_secs" => {
                self.pipeline.connect_timeout_secs = parse_secs(key, value)?;
            }
            "preview.port_start" => self.preview.port_start = parse_port(key, value)?,
            "preview.port_end" => self.preview.port_end = parse_port(key, value)?,
            "preview.base_domain" => {
                self.preview.base_domain = if value.is_empty() {
                    None
                } else {
                    Some(value.trim_matches('.').to_ascii_lowercase())
                };
            }
            "site.web_root" => self.site.web_root = value.to_string(),
            "site.admin_user" => self.site.admin_user = value.to_string(),
            other => return Err(unknown_key(other).into()),
        }
        self.validate()
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(unknown_key(key).into());
    }
    Ok(())
}

fn unknown_key(key: &str) -> ConfigError {
    ConfigError::UnknownKey {
        key: key.to_string(),
        valid: VALID_CONFIG_KEYS.join(", "),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "Expected a positive number of seconds".to_string(),
        }
        .into()),
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    match value.parse::<u16>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "Expected a TCP port between 1 and 65535".to_string(),
        }
        .into()),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
