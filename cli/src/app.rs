//! Application context: unified state passed to every command handler.
//!
//! Built once in `Cli::run()` from the global flags and the loaded
//! configuration. Commands take `&AppContext` and never read global flags
//! themselves.

use std::sync::Arc;

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::application::services::port_allocator::PortAllocator;
use crate::domain::config::{DB_ADMIN_PASSWORD_ENV, SiteforgeConfig};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::ssh::OpenSshConnector;
use crate::output::{EventReporter, HumanRenderer, JsonLinesReporter, OutputContext, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
#[derive(Debug, Clone, Copy, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
    /// Show remote command output.
    pub verbose: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    pub verbose: bool,
    pub config_store: YamlConfigStore,
    pub config: SiteforgeConfig,
    /// Process-wide preview port pool.
    pub ports: Arc<PortAllocator>,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or is invalid.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let config_store = YamlConfigStore::locate()?;
        let config = config_store.load()?;
        let ports = Arc::new(PortAllocator::new(
            config.preview.port_start,
            config.preview.port_end,
        ));

        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            mode,
            verbose: flags.verbose,
            config_store,
            config,
            ports,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    #[must_use]
    pub fn human(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }

    /// Event sink for the live progress stream.
    #[must_use]
    pub fn reporter(&self) -> EventReporter<'_> {
        match self.mode {
            OutputMode::Human => EventReporter::Human(TerminalReporter::new(&self.output, self.verbose)),
            OutputMode::Json => EventReporter::Json(JsonLinesReporter),
        }
    }

    /// SSH connector using the configured per-command timeout.
    #[must_use]
    pub fn connector(&self) -> OpenSshConnector<TokioCommandRunner> {
        let timeout = self.config.pipeline.command_timeout();
        OpenSshConnector::new(TokioCommandRunner::new(), timeout)
    }

    /// Database administrator password, when the host's root account needs one.
    #[must_use]
    pub fn db_admin_password(&self) -> Option<String> {
        std::env::var(DB_ADMIN_PASSWORD_ENV)
            .ok()
            .filter(|v| !v.is_empty())
    }
}
