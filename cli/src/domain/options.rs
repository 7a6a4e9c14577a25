//! Installation options and their validation.
//!
//! Pure functions only: no I/O, no async. Every slug that later lands in a
//! remote command line is checked here first.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ProvisionError;

pub static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Compile-time constant pattern.
    #[allow(clippy::expect_used)]
    Regex::new(r"^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$").expect("valid regex")
});

pub static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9._%+-]+@([A-Za-z0-9-]+\.)+[A-Za-z]{2,63}$").expect("valid regex")
});

/// Theme and plugin slugs as published in the WordPress directory.
pub static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9][a-z0-9-]{0,99}$").expect("valid regex")
});

pub static ADMIN_USER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9_.-]{3,60}$").expect("valid regex")
});

pub static INSTALLATION_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid regex")
});

/// Who asked for the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: String,
    pub email: String,
}

/// Site-level customization applied after the site exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteCustomization {
    pub title: String,
    pub admin_user: String,
    /// Generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    /// Defaults to the requester's email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    pub plugins: Vec<String>,
}

impl Default for SiteCustomization {
    fn default() -> Self {
        Self {
            title: "My Site".to_string(),
            admin_user: "admin".to_string(),
            admin_password: None,
            admin_email: None,
            tagline: None,
            theme: None,
            plugins: Vec::new(),
        }
    }
}

/// Everything the caller decides about one installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationOptions {
    /// Key for port bookkeeping and event routing.
    pub installation_id: String,
    pub domain: String,
    pub requester: Requester,
    #[serde(default)]
    pub site: SiteCustomization,
    /// Trust the host to already carry the stack and skip the bootstrap group.
    #[serde(default)]
    pub skip_system_setup: bool,
    /// Assign a preview port so the site is reachable before DNS propagates.
    #[serde(default = "default_preview_access")]
    pub preview_access: bool,
}

fn default_preview_access() -> bool {
    true
}

impl InstallationOptions {
    /// Admin email, falling back to the requester's.
    #[must_use]
    pub fn admin_email(&self) -> &str {
        self.site
            .admin_email
            .as_deref()
            .unwrap_or(&self.requester.email)
    }

    /// Validate every field and report all violations at once.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Validation` listing every violation.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        let mut errors: Vec<String> = Vec::new();

        if !INSTALLATION_ID_RE.is_match(&self.installation_id) {
            errors.push(format!(
                "installation_id '{}' must be 1-64 letters, digits, '-' or '_'",
                self.installation_id
            ));
        }
        if !DOMAIN_RE.is_match(&self.domain) || self.domain.len() > 253 {
            errors.push(format!(
                "domain '{}' must be a lowercase fully-qualified hostname",
                self.domain
            ));
        }
        if self.requester.id.trim().is_empty() {
            errors.push("requester.id must not be empty".to_string());
        }
        if !EMAIL_RE.is_match(&self.requester.email) {
            errors.push(format!(
                "requester.email '{}' is not a valid address",
                self.requester.email
            ));
        }
        if let Some(email) = &self.site.admin_email
            && !EMAIL_RE.is_match(email)
        {
            errors.push(format!("site.admin_email '{email}' is not a valid address"));
        }
        if self.site.title.trim().is_empty() {
            errors.push("site.title must not be empty".to_string());
        }
        if !ADMIN_USER_RE.is_match(&self.site.admin_user) {
            errors.push(format!(
                "site.admin_user '{}' must be 3-60 letters, digits, '.', '-' or '_'",
                self.site.admin_user
            ));
        }
        if let Some(password) = &self.site.admin_password {
            if password.len() < 12 {
                errors.push("site.admin_password must be at least 12 characters".to_string());
            }
            if password.chars().any(char::is_control) {
                errors.push("site.admin_password must not contain control characters".to_string());
            }
        }
        if let Some(theme) = &self.site.theme
            && !SLUG_RE.is_match(theme)
        {
            errors.push(format!("site.theme '{theme}' is not a valid slug"));
        }
        for plugin in &self.site.plugins {
            if !SLUG_RE.is_match(plugin) {
                errors.push(format!("site.plugins entry '{plugin}' is not a valid slug"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProvisionError::invalid("installation options", errors.join("\n")))
        }
    }
}
