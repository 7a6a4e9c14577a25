//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! `ProvisionError` is the classified taxonomy every pipeline failure maps
//! onto; `InstallationError` adds the diagnostic context a caller needs to
//! decide whether to retry, change the domain, or escalate.

use std::time::Duration;

use siteforge_common::{PipelineStatus, ServerCapabilities, StepRecord};
use thiserror::Error;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Errors from `siteforge config set`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\n{expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}

// ── Connection causes ─────────────────────────────────────────────────────────

/// Candidate explanation for a failed connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionCause {
    Unreachable,
    BadCredentials,
    Firewall,
    ServiceDown,
}

impl ConnectionCause {
    #[must_use]
    pub fn hint(self) -> &'static str {
        match self {
            Self::Unreachable => "host is unreachable (check the address and network route)",
            Self::BadCredentials => "credentials were rejected (check username, password or key)",
            Self::Firewall => "a firewall may be dropping SSH traffic",
            Self::ServiceDown => "the SSH service is not running on the target port",
        }
    }
}

// ── Port allocation ───────────────────────────────────────────────────────────

/// Errors from the preview port pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortAllocationError {
    #[error("preview port pool {start}-{end} is exhausted")]
    Exhausted { start: u16, end: u16 },

    #[error("port {port} is already reserved by installation '{holder}'")]
    RaceLost { port: u16, holder: String },

    #[error("port {port} is outside the preview pool {start}-{end}")]
    OutOfRange { port: u16, start: u16, end: u16 },
}

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Classified failure of a provisioning operation.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("cannot connect to {host}: {detail}")]
    Connection {
        host: String,
        detail: String,
        causes: Vec<ConnectionCause>,
    },

    #[error("a site already exists for {domain}: {}", evidence.join("; "))]
    Conflict { domain: String, evidence: Vec<String> },

    #[error("command failed with exit code {exit_code}: {command}\n{stderr}")]
    Command {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("installation exceeded its {}s deadline", deadline.as_secs())]
    Timeout { deadline: Duration },

    #[error(transparent)]
    PortAllocation(#[from] PortAllocationError),

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("installation was cancelled")]
    Cancelled,

    #[error("remote session error: {0:#}")]
    Remote(#[from] anyhow::Error),
}

impl ProvisionError {
    /// Build a validation error for `field`.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code, used by JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection_failed",
            Self::Conflict { .. } => "conflict",
            Self::Command { .. } => "command_failed",
            Self::Timeout { .. } => "timeout",
            Self::PortAllocation(_) => "port_allocation",
            Self::Validation { .. } => "validation",
            Self::Cancelled => "cancelled",
            Self::Remote(_) => "remote",
        }
    }

    /// Whether re-running the same request could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Command { .. } | Self::Timeout { .. } | Self::Remote(_)
        )
    }
}

// ── Installation error ────────────────────────────────────────────────────────

/// A failed installation, with everything known at the point of failure.
#[derive(Debug, Error)]
#[error("{}", self.summary())]
pub struct InstallationError {
    #[source]
    pub cause: ProvisionError,
    pub status: PipelineStatus,
    /// Id of the step that was running when the pipeline stopped.
    pub failed_step: Option<String>,
    pub completed_steps: Vec<String>,
    pub capabilities: Option<ServerCapabilities>,
    pub steps: Vec<StepRecord>,
}

impl InstallationError {
    /// Failure before any step ran (validation, connection).
    #[must_use]
    pub fn before_pipeline(cause: ProvisionError) -> Self {
        let status = match cause {
            ProvisionError::Cancelled => PipelineStatus::Cancelled,
            ProvisionError::Timeout { .. } => PipelineStatus::TimedOut,
            _ => PipelineStatus::Failed,
        };
        Self {
            cause,
            status,
            failed_step: None,
            completed_steps: Vec::new(),
            capabilities: None,
            steps: Vec::new(),
        }
    }

    fn summary(&self) -> String {
        match &self.failed_step {
            Some(step) => format!("installation failed at step '{step}': {}", self.cause),
            None => format!("installation failed: {}", self.cause),
        }
    }
}
