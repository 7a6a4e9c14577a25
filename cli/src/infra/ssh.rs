//! OpenSSH-backed implementation of the `Connector` and `RemoteShell` ports.
//!
//! One ControlMaster per session carries every command, so authentication
//! happens once. The control socket, the askpass helper and a per-session
//! known_hosts file live in a private temporary directory that is removed
//! when the session is dropped.

use std::path::Path;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::application::ports::{CommandOutput, CommandRunner, Connector, RemoteShell};
use crate::domain::connection::{ConnectionConfig, Credential};
use crate::domain::error::ProvisionError;
use crate::domain::shell::shell_quote;
use crate::domain::ssh::{classify_connect_failure, classify_connect_timeout};

const SSH: &str = "ssh";
const SECRET_ENV: &str = "SITEFORGE_SSH_SECRET";
const READY_POLL: Duration = Duration::from_millis(250);
const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

const ASKPASS_SCRIPT: &str = r#"#!/bin/sh
[ -n "$SITEFORGE_SSH_SECRET" ] || exit 1
printf '%s\n' "$SITEFORGE_SSH_SECRET"
"#;

/// Opens [`OpenSshSession`]s through the system `ssh` client.
pub struct OpenSshConnector<R> {
    runner: R,
    command_timeout: Duration,
}

impl<R: CommandRunner + Clone> OpenSshConnector<R> {
    #[must_use]
    pub fn new(runner: R, command_timeout: Duration) -> Self {
        Self {
            runner,
            command_timeout,
        }
    }
}

impl<R: CommandRunner + Clone> Connector for OpenSshConnector<R> {
    type Session = OpenSshSession<R>;

    async fn connect(
        &self,
        config: &ConnectionConfig,
        timeout: Duration,
    ) -> Result<Self::Session, ProvisionError> {
        config.validate()?;

        let dir = tempfile::Builder::new()
            .prefix("siteforge-ssh-")
            .tempdir()
            .context("cannot create SSH session directory")?;
        let askpass = dir.path().join("askpass.sh");
        write_executable(&askpass, ASKPASS_SCRIPT)?;

        let base = base_args(config, dir.path(), timeout);
        let mut env = vec![
            ("SSH_ASKPASS".to_string(), askpass.display().to_string()),
            ("SSH_ASKPASS_REQUIRE".to_string(), "force".to_string()),
            ("DISPLAY".to_string(), ":0".to_string()),
        ];
        if let Some(secret) = secret(&config.credential) {
            env.push((SECRET_ENV.to_string(), secret.to_string()));
        }

        let mut master_args = base.clone();
        master_args.extend(
            ["-o", "ControlMaster=yes", "-N", &config.destination()]
                .iter()
                .map(ToString::to_string),
        );
        let argv: Vec<&str> = master_args.iter().map(String::as_str).collect();
        tracing::debug!(host = %config.host, "starting ssh control master");
        let mut master = self
            .runner
            .spawn_background(SSH, &argv, &env)
            .context("cannot start the ssh client")?;

        let session = OpenSshSession {
            runner: self.runner.clone(),
            host: config.host.clone(),
            destination: config.destination(),
            base_args: base,
            command_timeout: self.command_timeout,
            master: Mutex::new(None),
            connected: AtomicBool::new(false),
            _dir: dir,
        };

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if session.control("check").await {
                break;
            }
            if let Ok(Some(status)) = master.try_wait() {
                let stderr = read_stderr(&mut master).await;
                return Err(connect_failed(&config.host, status, &stderr));
            }
            if tokio::time::Instant::now() >= deadline {
                let _ = master.kill().await;
                return Err(ProvisionError::Connection {
                    host: config.host.clone(),
                    detail: format!("no SSH session within {}s", timeout.as_secs()),
                    causes: classify_connect_timeout(),
                });
            }
            tokio::time::sleep(READY_POLL).await;
        }

        *session.master.lock().await = Some(master);
        session.connected.store(true, Ordering::SeqCst);
        tracing::info!(host = %config.host, "ssh session established");
        Ok(session)
    }
}

/// A live ControlMaster session.
pub struct OpenSshSession<R> {
    runner: R,
    host: String,
    destination: String,
    base_args: Vec<String>,
    command_timeout: Duration,
    master: Mutex<Option<Child>>,
    connected: AtomicBool,
    _dir: TempDir,
}

impl<R: CommandRunner> OpenSshSession<R> {
    fn args_with<'a>(&'a self, extra: &[&'a str]) -> Vec<&'a str> {
        let mut args: Vec<&str> = self.base_args.iter().map(String::as_str).collect();
        args.extend_from_slice(extra);
        args
    }

    /// `ssh -O <op>` against the control socket. True on exit status 0.
    async fn control(&self, op: &str) -> bool {
        let mut args = self.args_with(&[]);
        args.extend_from_slice(&["-o", "ControlMaster=no", "-O", op, &self.destination]);
        matches!(
            self.runner.run(SSH, &args, CONTROL_TIMEOUT).await,
            Ok(out) if out.status.success()
        )
    }

    async fn exec(&self, command: &str, input: Option<&str>) -> Result<CommandOutput, ProvisionError> {
        if !self.is_connected() {
            return Err(anyhow::anyhow!("session to {} is closed", self.host).into());
        }
        let remote = format!("bash -c {}", shell_quote(command));
        let args = self.args_with(&[
            "-o",
            "ControlMaster=no",
            "-o",
            "BatchMode=yes",
            "-T",
            &self.destination,
            &remote,
        ]);
        tracing::debug!(host = %self.host, command, stdin = input.is_some(), "remote command");
        let output = match input {
            Some(input) => {
                self.runner
                    .run_with_input(SSH, &args, input.as_bytes(), self.command_timeout)
                    .await
            }
            None => self.runner.run(SSH, &args, self.command_timeout).await,
        }
        .with_context(|| format!("remote command on {} did not complete", self.host))?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: exit_code(output.status),
        })
    }
}

impl<R: CommandRunner> RemoteShell for OpenSshSession<R> {
    async fn run(&self, command: &str) -> Result<CommandOutput, ProvisionError> {
        self.exec(command, None).await
    }

    async fn run_with_input(
        &self,
        command: &str,
        input: &str,
    ) -> Result<CommandOutput, ProvisionError> {
        self.exec(command, Some(input)).await
    }

    fn open_shell(&self) -> Result<Child, ProvisionError> {
        if !self.is_connected() {
            return Err(anyhow::anyhow!("session to {} is closed", self.host).into());
        }
        let args = self.args_with(&["-o", "ControlMaster=no", "-T", &self.destination, "bash -l"]);
        Ok(self.runner.spawn_interactive(SSH, &args)?)
    }

    async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        if !self.control("exit").await {
            tracing::debug!(host = %self.host, "ssh -O exit failed, killing master");
        }
        if let Some(mut master) = self.master.lock().await.take() {
            let _ = master.kill().await;
        }
        tracing::info!(host = %self.host, "ssh session closed");
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn host(&self) -> &str {
        &self.host
    }
}

/// Options shared by the master and every multiplexed client.
fn base_args(config: &ConnectionConfig, dir: &Path, timeout: Duration) -> Vec<String> {
    let control_path = dir.join("cm.sock");
    let known_hosts = dir.join("known_hosts");
    let mut args = vec![
        "-p".to_string(),
        config.port.to_string(),
        "-o".to_string(),
        format!("ControlPath={}", control_path.display()),
        "-o".to_string(),
        format!("UserKnownHostsFile={}", known_hosts.display()),
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={}", timeout.as_secs().max(1)),
        "-o".to_string(),
        "ServerAliveInterval=15".to_string(),
        "-o".to_string(),
        "ServerAliveCountMax=4".to_string(),
        "-o".to_string(),
        "NumberOfPasswordPrompts=1".to_string(),
    ];
    match &config.credential {
        Credential::Password(_) => args.extend(
            [
                "-o",
                "PreferredAuthentications=password,keyboard-interactive",
                "-o",
                "PubkeyAuthentication=no",
            ]
            .iter()
            .map(ToString::to_string),
        ),
        Credential::PrivateKey { path, .. } => {
            args.push("-i".to_string());
            args.push(path.display().to_string());
            args.extend(
                ["-o", "IdentitiesOnly=yes", "-o", "PreferredAuthentications=publickey"]
                    .iter()
                    .map(ToString::to_string),
            );
        }
    }
    args
}

fn secret(credential: &Credential) -> Option<&str> {
    match credential {
        Credential::Password(p) => Some(p),
        Credential::PrivateKey { passphrase, .. } => passphrase.as_deref(),
    }
}

fn write_executable(path: &Path, content: &str) -> Result<(), ProvisionError> {
    std::fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("set permissions on {}", path.display()))?;
    }
    Ok(())
}

async fn read_stderr(child: &mut Child) -> String {
    let mut stderr = String::new();
    if let Some(mut stream) = child.stderr.take() {
        let _ = stream.read_to_string(&mut stderr).await;
    }
    stderr
}

fn connect_failed(host: &str, status: ExitStatus, stderr: &str) -> ProvisionError {
    let stderr = stderr.trim();
    let detail = if stderr.is_empty() {
        format!("ssh exited before the session was ready ({status})")
    } else {
        stderr.lines().last().unwrap_or(stderr).to_string()
    };
    ProvisionError::Connection {
        host: host.to_string(),
        detail,
        causes: classify_connect_failure(stderr),
    }
}

/// Exit code, with signal deaths reported shell-style as 128 + signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
