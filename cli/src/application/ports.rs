//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::config::SiteforgeConfig;
use crate::domain::connection::ConnectionConfig;
use crate::domain::error::ProvisionError;

// ── Value Types ───────────────────────────────────────────────────────────────

/// Captured result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// `self` on exit 0, otherwise a `Command` error naming `command`.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Command` on nonzero exit.
    pub fn check(self, command: &str) -> Result<Self, ProvisionError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ProvisionError::Command {
                command: command.to_string(),
                exit_code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

// ── Remote Shell Port ─────────────────────────────────────────────────────────

/// An established session on one remote host.
///
/// Commands are plain shell text interpreted by `bash` on the host. Each call
/// is independent: no working directory or environment carries over.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    /// Run `command` and capture its output.
    ///
    /// A nonzero exit is reported in [`CommandOutput::exit_code`], not as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Remote` when the transport fails or the
    /// command exceeds the per-command timeout.
    async fn run(&self, command: &str) -> Result<CommandOutput, ProvisionError>;

    /// Like [`RemoteShell::run`], with `input` written to the command's stdin.
    ///
    /// Secrets go here rather than into `command`, which the host shows in
    /// its process list.
    ///
    /// # Errors
    ///
    /// Same as [`RemoteShell::run`].
    async fn run_with_input(
        &self,
        command: &str,
        input: &str,
    ) -> Result<CommandOutput, ProvisionError>;

    /// Run `command` and treat a nonzero exit as a failure.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Command` on nonzero exit, or any transport
    /// error from [`RemoteShell::run`].
    async fn run_or_fail(&self, command: &str) -> Result<CommandOutput, ProvisionError> {
        self.run(command).await?.check(command)
    }

    /// Open an interactive login shell with piped stdin/stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the process cannot be
    /// spawned.
    fn open_shell(&self) -> Result<tokio::process::Child, ProvisionError>;

    /// Close the session. Safe to call more than once.
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Host this session is connected to.
    fn host(&self) -> &str;
}

/// Opens sessions. Never retries on its own.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Session: RemoteShell;

    /// Establish a session within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::Connection` with classified causes.
    async fn connect(
        &self,
        config: &ConnectionConfig,
        timeout: Duration,
    ) -> Result<Self::Session, ProvisionError>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run `program` to completion and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout the child is killed, never left orphaned.
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<Output>;

    /// [`CommandRunner::run`] with `input` on stdin, closed once written.
    ///
    /// # Errors
    ///
    /// Same as [`CommandRunner::run`].
    async fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
        timeout: Duration,
    ) -> Result<Output>;

    /// Spawn a long-lived program without waiting for it.
    ///
    /// Secrets travel in `env` so they never appear in argv. stdin is
    /// closed, stdout discarded and stderr piped for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn spawn_background(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<tokio::process::Child>;

    /// Spawn a program with piped stdin/stdout for interactive use.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn spawn_interactive(&self, program: &str, args: &[&str]) -> Result<tokio::process::Child>;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, or defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<SiteforgeConfig>;

    /// Persist `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, config: &SiteforgeConfig) -> Result<()>;

    /// Location of the configuration file.
    fn path(&self) -> &Path;
}
