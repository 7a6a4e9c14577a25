//! Application service: ordered step execution.
//!
//! Runs a plan of step descriptors against a [`StepExecutor`], keeping one
//! [`StepRecord`] per descriptor and emitting a progress event for every
//! transition. The whole sequence races the installation's [`Deadline`];
//! cancellation is checked between steps.

use std::fmt;
use std::time::Duration;

use siteforge_common::{
    ProvisionEvent, ServerCapabilities, StepErrorContext, StepRecord, StepStatus, completed_ids,
};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::application::services::events::EventEmitter;
use crate::domain::error::ProvisionError;

/// Identifier of one step of the standard plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Preflight,
    SystemUpdate,
    InstallDependencies,
    InstallStack,
    CreateSite,
    Customize,
    Harden,
}

impl StepId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::SystemUpdate => "system_update",
            Self::InstallDependencies => "install_dependencies",
            Self::InstallStack => "install_stack",
            Self::CreateSite => "create_site",
            Self::Customize => "customize",
            Self::Harden => "harden",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Preflight => "Preflight checks",
            Self::SystemUpdate => "Updating system packages",
            Self::InstallDependencies => "Installing base dependencies",
            Self::InstallStack => "Installing web stack",
            Self::CreateSite => "Creating site",
            Self::Customize => "Customizing site",
            Self::Harden => "Hardening and finalizing",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One wall-clock limit shared by every phase of an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now.
    #[must_use]
    pub fn starting_now(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    #[must_use]
    pub fn at(&self) -> Instant {
        self.at
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// The error reported once the deadline has passed.
    #[must_use]
    pub fn exceeded(&self) -> ProvisionError {
        ProvisionError::Timeout {
            deadline: self.budget,
        }
    }
}

/// What the plan knows about the host before the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanContext {
    pub capabilities: ServerCapabilities,
    pub skip_system_setup: bool,
}

impl PlanContext {
    /// Whether the bootstrap group runs.
    #[must_use]
    pub fn full_path(&self) -> bool {
        !self.skip_system_setup && !self.capabilities.is_configured()
    }

    fn skip_reason(&self) -> &'static str {
        if self.skip_system_setup {
            "system setup skipped on request"
        } else {
            "host already has the web stack"
        }
    }
}

/// When a step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredWhen {
    Always,
    FullPath,
}

impl RequiredWhen {
    #[must_use]
    pub fn holds(self, ctx: &PlanContext) -> bool {
        match self {
            Self::Always => true,
            Self::FullPath => ctx.full_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDescriptor {
    pub id: StepId,
    pub required_when: RequiredWhen,
}

impl StepDescriptor {
    #[must_use]
    pub const fn new(id: StepId, required_when: RequiredWhen) -> Self {
        Self { id, required_when }
    }
}

/// The standard provisioning plan, in execution order.
#[must_use]
pub fn standard_plan() -> Vec<StepDescriptor> {
    use RequiredWhen::{Always, FullPath};
    vec![
        StepDescriptor::new(StepId::Preflight, Always),
        StepDescriptor::new(StepId::SystemUpdate, FullPath),
        StepDescriptor::new(StepId::InstallDependencies, FullPath),
        StepDescriptor::new(StepId::InstallStack, FullPath),
        StepDescriptor::new(StepId::CreateSite, Always),
        StepDescriptor::new(StepId::Customize, Always),
        StepDescriptor::new(StepId::Harden, FullPath),
    ]
}

/// Does the work of each step.
#[allow(async_fn_in_trait)]
pub trait StepExecutor {
    /// Run `step` to completion.
    ///
    /// # Errors
    ///
    /// Any error fails the step and aborts the pipeline.
    async fn execute(&mut self, step: StepId) -> Result<(), ProvisionError>;
}

/// Why a pipeline stopped early.
#[derive(Debug)]
pub struct StepFailure {
    /// Step that was running, if any.
    pub step: Option<StepId>,
    pub cause: ProvisionError,
}

/// Everything a finished pipeline leaves behind.
#[derive(Debug)]
pub struct PipelineRun {
    pub records: Vec<StepRecord>,
    pub outcome: Result<(), StepFailure>,
}

/// Run `plan` until it finishes or `deadline` passes.
///
/// On expiry the step in flight is marked failed with "deadline exceeded";
/// closing the session is left to the caller, which owns it.
pub async fn run_pipeline(
    plan: &[StepDescriptor],
    ctx: &PlanContext,
    executor: &mut impl StepExecutor,
    emitter: &EventEmitter,
    deadline: Deadline,
    cancel: &watch::Receiver<bool>,
) -> PipelineRun {
    let mut records: Vec<StepRecord> = plan
        .iter()
        .map(|d| StepRecord::pending(d.id.as_str(), d.id.label()))
        .collect();

    let timed = tokio::time::timeout_at(
        deadline.at(),
        run_sequence(plan, ctx, executor, emitter, cancel, &mut records),
    )
    .await;

    let outcome = match timed {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(deadline_secs = deadline.budget.as_secs(), "installation deadline exceeded");
            let running = plan
                .iter()
                .zip(records.iter_mut())
                .find(|(_, r)| r.status == StepStatus::Running);
            let step = running.map(|(d, record)| {
                let _ = record.fail("deadline exceeded");
                d.id
            });
            if let Some(id) = step {
                emit_step_error(emitter, id, "deadline exceeded", &records);
            }
            Err(StepFailure {
                step,
                cause: deadline.exceeded(),
            })
        }
    };

    PipelineRun { records, outcome }
}

async fn run_sequence(
    plan: &[StepDescriptor],
    ctx: &PlanContext,
    executor: &mut impl StepExecutor,
    emitter: &EventEmitter,
    cancel: &watch::Receiver<bool>,
    records: &mut [StepRecord],
) -> Result<(), StepFailure> {
    for (index, descriptor) in plan.iter().enumerate() {
        let id = descriptor.id;

        if *cancel.borrow() {
            tracing::info!(next_step = %id, "installation cancelled");
            return Err(StepFailure {
                step: None,
                cause: ProvisionError::Cancelled,
            });
        }

        if !descriptor.required_when.holds(ctx) {
            let reason = ctx.skip_reason();
            records[index].skip(reason).map_err(|e| internal(id, e))?;
            tracing::info!(step = %id, reason, "step skipped");
            emitter.emit(ProvisionEvent::StepSkipped {
                id: id.as_str().to_string(),
                label: id.label().to_string(),
                reason: reason.to_string(),
            });
            continue;
        }

        records[index].start().map_err(|e| internal(id, e))?;
        tracing::info!(step = %id, "step started");
        emitter.emit(ProvisionEvent::StepStart {
            id: id.as_str().to_string(),
            label: id.label().to_string(),
        });

        match executor.execute(id).await {
            Ok(()) => {
                let duration_ms = records[index].complete().map_err(|e| internal(id, e))?;
                tracing::info!(step = %id, duration_ms, "step completed");
                emitter.emit(ProvisionEvent::StepComplete {
                    id: id.as_str().to_string(),
                    label: id.label().to_string(),
                    duration_ms,
                });
            }
            Err(cause) => {
                let message = cause.to_string();
                let _ = records[index].fail(message.clone());
                tracing::warn!(step = %id, error = %message, "step failed");
                emit_step_error(emitter, id, &message, records);
                return Err(StepFailure {
                    step: Some(id),
                    cause,
                });
            }
        }
    }
    Ok(())
}

fn emit_step_error(emitter: &EventEmitter, id: StepId, error: &str, records: &[StepRecord]) {
    emitter.emit(ProvisionEvent::StepError {
        id: id.as_str().to_string(),
        label: id.label().to_string(),
        error: error.to_string(),
        context: StepErrorContext {
            current_step: id.as_str().to_string(),
            completed_step_ids: completed_ids(records),
        },
    });
}

fn internal(step: StepId, err: impl std::error::Error + Send + Sync + 'static) -> StepFailure {
    StepFailure {
        step: Some(step),
        cause: ProvisionError::Remote(anyhow::Error::new(err)),
    }
}
