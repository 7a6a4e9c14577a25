//! Live rendering of an installation's event stream.
//!
//! The command layer subscribes to the installation's `EventEmitter` and feeds
//! every envelope through an [`EventReporter`]: spinners and status lines for
//! humans, one JSON object per line for `--json`.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;
use siteforge_common::{EventEnvelope, ProvisionEvent};

use crate::output::OutputContext;
use crate::output::progress::{self, Outcome};

/// Event sink selected by the output mode.
pub enum EventReporter<'a> {
    Human(TerminalReporter<'a>),
    Json(JsonLinesReporter),
}

impl EventReporter<'_> {
    /// Render one envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be serialized in JSON mode.
    pub fn handle(&mut self, envelope: &EventEnvelope) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.handle(&envelope.event);
                Ok(())
            }
            Self::Json(r) => r.handle(envelope),
        }
    }
}

/// Prints each envelope as a single line of JSON on stdout.
pub struct JsonLinesReporter;

impl JsonLinesReporter {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        let line = serde_json::to_string(envelope).context("JSON serialization failed")?;
        println!("{line}");
        Ok(())
    }
}

/// Terminal progress: one spinner per running step.
///
/// - step boundaries print `✓`/`✗` lines (suppressed when `ctx.quiet`, except failures)
/// - `output` lines are shown only when `verbose`
/// - warnings print `⚠` lines without disturbing the spinner
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    verbose: bool,
    spinner: Option<ProgressBar>,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext, verbose: bool) -> Self {
        Self {
            ctx,
            verbose,
            spinner: None,
        }
    }

    pub fn handle(&mut self, event: &ProvisionEvent) {
        match event {
            ProvisionEvent::Connected { host } => self.ctx.success(&format!("Connected to {host}")),
            ProvisionEvent::StepStart { label, .. } => {
                if self.ctx.show_progress() {
                    self.spinner = Some(progress::spinner(label));
                } else {
                    self.ctx.step(label);
                }
            }
            ProvisionEvent::StepComplete {
                label, duration_ms, ..
            } => {
                let msg = format!("{label} {}", format_duration(*duration_ms).style(self.ctx.styles.dim));
                match self.spinner.take() {
                    Some(pb) => progress::finish(&pb, Outcome::Completed, &msg),
                    None => self.ctx.success(&msg),
                }
            }
            ProvisionEvent::StepSkipped { label, reason, .. } => {
                self.ctx.note(&format!("- {label} (skipped: {reason})"));
            }
            ProvisionEvent::StepError { label, .. } => match self.spinner.take() {
                Some(pb) => progress::finish(&pb, Outcome::Failed, label),
                None => self.ctx.error(label),
            },
            ProvisionEvent::Output { line } => {
                if self.verbose && !self.ctx.quiet {
                    let line = format!("    {}", line.style(self.ctx.styles.dim));
                    match &self.spinner {
                        Some(pb) => pb.println(line),
                        None => println!("{line}"),
                    }
                }
            }
            ProvisionEvent::Warning { message } => match &self.spinner {
                Some(pb) => pb.suspend(|| self.ctx.warn(message)),
                None => self.ctx.warn(message),
            },
            ProvisionEvent::InstallationComplete { .. } => {
                if let Some(pb) = self.spinner.take() {
                    pb.finish_and_clear();
                }
            }
            // The final failure is rendered from the returned error.
            ProvisionEvent::Error { .. } => {}
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// `1234` ms -> `"(1.2s)"`, `75_000` ms -> `"(1m15s)"`.
#[must_use]
pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    if secs >= 60 {
        format!("({}m{:02}s)", secs / 60, secs % 60)
    } else {
        format!("({}.{}s)", secs, (ms % 1000) / 100)
    }
}
