//! Progress events emitted by one installation.
//!
//! Event tags are camelCase (`stepStart`, `installationComplete`, ...) so that
//! a browser client can switch on `type` directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Diagnostic context attached to a step failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepErrorContext {
    pub current_step: String,
    pub completed_step_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProvisionEvent {
    /// Remote session established.
    Connected { host: String },

    /// One line of remote command output.
    Output { line: String },

    #[serde(rename_all = "camelCase")]
    StepStart { id: String, label: String },

    #[serde(rename_all = "camelCase")]
    StepComplete {
        id: String,
        label: String,
        duration_ms: u64,
    },

    /// Step bypassed by capability detection or `skip_system_setup`.
    StepSkipped {
        id: String,
        label: String,
        reason: String,
    },

    StepError {
        id: String,
        label: String,
        error: String,
        context: StepErrorContext,
    },

    /// A tolerated failure inside a step (optional plugin, firewall rule, ...).
    Warning { message: String },

    /// Terminal event, emitted exactly once per installation.
    InstallationComplete { success: bool },

    Error { message: String },
}

impl ProvisionEvent {
    /// `true` for the event that closes an installation's stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InstallationComplete { .. })
    }
}

/// Event plus delivery metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub installation_id: String,
    /// Strictly increasing within one installation, starting at 0.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: ProvisionEvent,
}
