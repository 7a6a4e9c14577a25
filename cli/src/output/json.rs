//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one document on stdout at the end
//! (events before it are one object per line). Failures use the error object
//! below so scripts can switch on `code`.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use crate::application::services::installation::InstallationReport;
use crate::domain::error::{ConfigError, InstallationError, ProvisionError};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Machine code for an error that escaped a command.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<ProvisionError>() {
        return e.code();
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return "config";
    }
    "error"
}

/// Format a failed installation: the error object plus its diagnostic context.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_failure(err: &InstallationError) -> Result<String> {
    let mut obj = json!({
        "error": true,
        "message": err.cause.to_string(),
        "code": err.cause.code(),
        "retryable": err.cause.is_retryable(),
        "status": err.status,
        "failed_step": err.failed_step,
        "completed_steps": err.completed_steps,
        "capabilities": err.capabilities,
        "steps": err.steps,
    });
    match &err.cause {
        ProvisionError::Connection { causes, .. } => {
            obj["causes"] = serde_json::to_value(causes).context("JSON serialization failed")?;
        }
        ProvisionError::Conflict { evidence, .. } => {
            obj["evidence"] = json!(evidence);
        }
        _ => {}
    }
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format the success document.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_report(report: &InstallationReport) -> Result<String> {
    let obj = json!({
        "result": report.result,
        "capabilities": report.capabilities,
        "steps": report.steps,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Pretty-print any serializable value.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_value(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}
