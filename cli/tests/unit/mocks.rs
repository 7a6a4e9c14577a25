//! Shared mock infrastructure for unit tests.
//!
//! [`ScriptedShell`] answers remote commands from substring rules so service
//! tests can stage a fresh host, a configured host, or a host that fails at a
//! chosen command, then inspect every command that ran.

#![allow(clippy::expect_used, dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use siteforge_cli::application::ports::{CommandOutput, Connector, RemoteShell};
use siteforge_cli::domain::connection::{ConnectionConfig, Credential};
use siteforge_cli::domain::error::{ConnectionCause, ProvisionError};
use siteforge_cli::domain::options::{InstallationOptions, Requester, SiteCustomization};
use tokio::sync::watch;

pub const HOST: &str = "203.0.113.7";

// ── Scripted shell ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Response {
    Exit { code: i32, stdout: String, stderr: String },
    Transport(String),
    Hang,
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    response: Response,
}

#[derive(Default)]
struct Inner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
    inputs: Mutex<Vec<(String, String)>>,
    cancel_on: Mutex<Option<(String, watch::Sender<bool>)>>,
    disconnects: AtomicUsize,
    closed: AtomicBool,
}

/// Remote shell answering from substring rules. Later rules take precedence;
/// commands that match nothing exit 0 with no output.
#[derive(Clone, Default)]
pub struct ScriptedShell {
    inner: Arc<Inner>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().expect("mock mutex")
}

impl ScriptedShell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, pattern: &str, response: Response) -> Self {
        lock(&self.inner.rules).insert(
            0,
            Rule {
                pattern: pattern.to_string(),
                response,
            },
        );
        self
    }

    /// Commands containing `pattern` exit with `code` and print `stdout`.
    #[must_use]
    pub fn on(self, pattern: &str, code: i32, stdout: &str) -> Self {
        self.push(
            pattern,
            Response::Exit {
                code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    /// Commands containing `pattern` exit with `code` and print `stderr`.
    #[must_use]
    pub fn fail(self, pattern: &str, code: i32, stderr: &str) -> Self {
        self.push(
            pattern,
            Response::Exit {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Commands containing `pattern` lose the transport.
    #[must_use]
    pub fn drop_on(self, pattern: &str, message: &str) -> Self {
        self.push(pattern, Response::Transport(message.to_string()))
    }

    /// Commands containing `pattern` never return.
    #[must_use]
    pub fn hang_on(self, pattern: &str) -> Self {
        self.push(pattern, Response::Hang)
    }

    /// Flip `cancel` when a command containing `pattern` runs.
    #[must_use]
    pub fn cancel_on(self, pattern: &str, cancel: watch::Sender<bool>) -> Self {
        *lock(&self.inner.cancel_on) = Some((pattern.to_string(), cancel));
        self
    }

    /// Host with nothing installed and no trace of the site.
    #[must_use]
    pub fn fresh_host() -> Self {
        Self::new()
            .on("fpm.sock", 0, "/run/php/php8.3-fpm.sock")
            .on("ls -A", 1, "")
            .on("SHOW DATABASES", 1, "")
            .on("mysql.user", 1, "")
            .on("test -e", 1, "")
            .on("command -v", 1, "")
            .on("ufw allow", 0, "")
            .on("curl -fsSL", 0, "")
    }

    /// Host that already runs the full stack, with no trace of the site.
    #[must_use]
    pub fn configured_host() -> Self {
        Self::fresh_host().on("command -v", 0, "")
    }

    /// Every command that ran, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.inner.calls).clone()
    }

    #[must_use]
    pub fn ran(&self, needle: &str) -> bool {
        self.calls().iter().any(|c| c.contains(needle))
    }

    /// Stdin given to the first command containing `command`.
    #[must_use]
    pub fn input_for(&self, command: &str) -> Option<String> {
        lock(&self.inner.inputs)
            .iter()
            .find(|(c, _)| c.contains(command))
            .map(|(_, input)| input.clone())
    }

    /// Whether any command received stdin containing `needle`.
    #[must_use]
    pub fn fed(&self, needle: &str) -> bool {
        lock(&self.inner.inputs).iter().any(|(_, i)| i.contains(needle))
    }

    #[must_use]
    pub fn disconnects(&self) -> usize {
        self.inner.disconnects.load(Ordering::SeqCst)
    }

    fn respond(&self, command: &str) -> Response {
        lock(&self.inner.rules)
            .iter()
            .find(|r| command.contains(&r.pattern))
            .map_or(
                Response::Exit {
                    code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                },
                |r| r.response.clone(),
            )
    }

    async fn answer(&self, command: &str) -> Result<CommandOutput, ProvisionError> {
        if !self.is_connected() {
            return Err(anyhow::anyhow!("session closed").into());
        }
        lock(&self.inner.calls).push(command.to_string());
        if let Some((pattern, tx)) = lock(&self.inner.cancel_on).as_ref() {
            if command.contains(pattern.as_str()) {
                let _ = tx.send(true);
            }
        }
        match self.respond(command) {
            Response::Exit {
                code,
                stdout,
                stderr,
            } => Ok(CommandOutput {
                stdout,
                stderr,
                exit_code: code,
            }),
            Response::Transport(message) => Err(anyhow::anyhow!(message).into()),
            Response::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(anyhow::anyhow!("hung command returned").into())
            }
        }
    }
}

impl RemoteShell for ScriptedShell {
    async fn run(&self, command: &str) -> Result<CommandOutput, ProvisionError> {
        self.answer(command).await
    }

    async fn run_with_input(
        &self,
        command: &str,
        input: &str,
    ) -> Result<CommandOutput, ProvisionError> {
        lock(&self.inner.inputs).push((command.to_string(), input.to_string()));
        self.answer(command).await
    }

    fn open_shell(&self) -> Result<tokio::process::Child, ProvisionError> {
        Err(anyhow::anyhow!("interactive shells are not scripted").into())
    }

    async fn disconnect(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        !self.inner.closed.load(Ordering::SeqCst)
    }

    fn host(&self) -> &str {
        HOST
    }
}

// ── Connector ─────────────────────────────────────────────────────────────────

/// Hands out clones of one scripted shell, or refuses every connection.
pub struct FakeConnector {
    shell: ScriptedShell,
    refuse: Option<Vec<ConnectionCause>>,
    stall: bool,
    attempts: AtomicUsize,
}

impl FakeConnector {
    #[must_use]
    pub fn new(shell: ScriptedShell) -> Self {
        Self {
            shell,
            refuse: None,
            stall: false,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Connection attempts that never complete, ignoring their own timeout.
    #[must_use]
    pub fn stalling() -> Self {
        Self {
            stall: true,
            ..Self::new(ScriptedShell::new())
        }
    }

    #[must_use]
    pub fn refusing(causes: Vec<ConnectionCause>) -> Self {
        Self {
            shell: ScriptedShell::new(),
            refuse: Some(causes),
            stall: false,
            attempts: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    type Session = ScriptedShell;

    async fn connect(
        &self,
        config: &ConnectionConfig,
        _timeout: Duration,
    ) -> Result<ScriptedShell, ProvisionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        }
        match &self.refuse {
            Some(causes) => Err(ProvisionError::Connection {
                host: config.host.clone(),
                detail: "Connection refused".to_string(),
                causes: causes.clone(),
            }),
            None => Ok(self.shell.clone()),
        }
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

#[must_use]
pub fn connection() -> ConnectionConfig {
    ConnectionConfig {
        host: HOST.to_string(),
        port: 22,
        username: "root".to_string(),
        credential: Credential::Password("correct horse battery".to_string()),
    }
}

#[must_use]
pub fn options(installation_id: &str) -> InstallationOptions {
    InstallationOptions {
        installation_id: installation_id.to_string(),
        domain: "blog.example.com".to_string(),
        requester: Requester {
            id: "user-1".to_string(),
            email: "owner@example.com".to_string(),
        },
        site: SiteCustomization {
            title: "Field Notes".to_string(),
            plugins: vec!["akismet".to_string()],
            ..SiteCustomization::default()
        },
        skip_system_setup: false,
        preview_access: true,
    }
}
