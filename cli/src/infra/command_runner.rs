//! Infrastructure implementation of the `CommandRunner` port.
//!
//! Every local process siteforge starts is an `ssh` client: the ControlMaster
//! in the background, short multiplexed commands, and interactive shells.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};

use crate::application::ports::CommandRunner;

/// Production `CommandRunner` on `tokio::process`.
///
/// Dropping a child's future on timeout would leave the process running
/// until it is reaped, so the timeout branch kills it explicitly.
///
/// On unix every child gets its own process group. A terminal Ctrl-C then
/// reaches siteforge alone, which turns it into a cancellation between steps
/// while the ssh children keep running.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// `Command` for `program`, outside the terminal's foreground process group.
fn command(program: &str) -> Command {
    let mut cmd = Command::new(program);
    #[cfg(unix)]
    cmd.process_group(0);
    cmd.kill_on_drop(true);
    cmd
}

async fn drain(pipe: Option<impl AsyncRead + Unpin>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

/// Write `input` and close the pipe. A child that exits without reading is
/// not an error here; its exit status tells the story.
async fn feed(stdin: Option<ChildStdin>, input: &[u8]) {
    let Some(mut stdin) = stdin else {
        return;
    };
    if let Err(e) = stdin.write_all(input).await {
        tracing::debug!(error = %e, "child closed stdin early");
    }
}

async fn wait_with_timeout(
    program: &str,
    mut child: Child,
    input: &[u8],
    timeout: Duration,
) -> Result<Output> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let finished = async {
        let ((), status, stdout, stderr) = tokio::join!(
            feed(stdin, input),
            child.wait(),
            drain(stdout),
            drain(stderr)
        );
        let status = status.with_context(|| format!("waiting for {program}"))?;
        Ok::<_, anyhow::Error>(Output {
            status,
            stdout,
            stderr,
        })
    };

    match tokio::time::timeout(timeout, finished).await {
        Ok(result) => result,
        Err(_) => {
            let _ = child.kill().await;
            anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<Output> {
        let child = command(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        wait_with_timeout(program, child, &[], timeout).await
    }

    async fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
        timeout: Duration,
    ) -> Result<Output> {
        let child = command(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        wait_with_timeout(program, child, input, timeout).await
    }

    fn spawn_background(
        &self,
        program: &str,
        args: &[&str],
        env: &[(String, String)],
    ) -> Result<Child> {
        command(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))
    }

    fn spawn_interactive(&self, program: &str, args: &[&str]) -> Result<Child> {
        command(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))
    }
}
