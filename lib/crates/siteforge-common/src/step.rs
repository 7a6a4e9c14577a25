//! Step records and the pipeline status they roll up into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a single provisioning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Running | Self::Skipped)
                | (Self::Running, Self::Completed | Self::Failed)
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected step status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step '{step}' cannot move from {from} to {to}")]
pub struct TransitionError {
    pub step: String,
    pub from: StepStatus,
    pub to: StepStatus,
}

/// Record of one step of one installation. Created pending when the
/// pipeline starts and updated in place as it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: String,
    pub label: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Failure detail, set only when `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Skip reason or other annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StepRecord {
    #[must_use]
    pub fn pending(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            error: None,
            note: None,
        }
    }

    /// PENDING → RUNNING.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(StepStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// RUNNING → COMPLETED. Returns the measured duration in milliseconds.
    pub fn complete(&mut self) -> Result<u64, TransitionError> {
        self.transition(StepStatus::Completed)?;
        Ok(self.finish())
    }

    /// RUNNING → FAILED.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<u64, TransitionError> {
        self.transition(StepStatus::Failed)?;
        self.error = Some(error.into());
        Ok(self.finish())
    }

    /// PENDING → SKIPPED.
    pub fn skip(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(StepStatus::Skipped)?;
        self.note = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, to: StepStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                step: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    fn finish(&mut self) -> u64 {
        let now = Utc::now();
        self.finished_at = Some(now);
        let ms = self
            .started_at
            .map(|start| (now - start).num_milliseconds())
            .and_then(|ms| u64::try_from(ms).ok())
            .unwrap_or(0);
        self.duration_ms = Some(ms);
        ms
    }
}

/// Ids of the records that reached `Completed`, in declared order.
#[must_use]
pub fn completed_ids(records: &[StepRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.status == StepStatus::Completed)
        .map(|r| r.id.clone())
        .collect()
}

/// Overall state of one installation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}
