//! `siteforge shell`: interactive shell on the target host.

use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::app::AppContext;
use crate::application::ports::{Connector, RemoteShell};
use crate::commands::ConnectArgs;

#[derive(Args, Debug)]
pub struct ShellArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

/// Copies bytes from `reader` to `writer` until EOF.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub async fn bridge_io<R, W>(reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Local stdin as chunks, read on a detached thread.
///
/// A read pending on the runtime's blocking pool cannot be cancelled and
/// would hold up shutdown until the next line of input. This thread is left
/// behind instead, and stops at its next read once the receiver is gone.
fn stdin_chunks() -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let mut stdin = std::io::stdin().lock();
        let mut buf = [0u8; 8192];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Writes every chunk to `writer` until the sending side closes.
///
/// # Errors
///
/// Returns an error if writing fails.
pub async fn forward_chunks<W>(chunks: &mut mpsc::Receiver<Vec<u8>>, writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(chunk) = chunks.recv().await {
        writer.write_all(&chunk).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the connection fails or the shell cannot be spawned.
pub async fn run(app: &AppContext, args: &ShellArgs) -> Result<ExitCode> {
    let config = args.connect.to_config()?;
    let session = app
        .connector()
        .connect(&config, app.config.pipeline.connect_timeout())
        .await?;
    let result = attach(&session).await;
    session.disconnect().await;
    result
}

async fn attach(session: &impl RemoteShell) -> Result<ExitCode> {
    let mut child = session.open_shell()?;
    let mut remote_in = child.stdin.take().context("shell stdin is not piped")?;
    let mut remote_out = child.stdout.take().context("shell stdout is not piped")?;

    let mut chunks = stdin_chunks();
    let forward = tokio::spawn(async move {
        if let Err(e) = forward_chunks(&mut chunks, &mut remote_in).await {
            tracing::debug!(error = %e, "stdin forwarding stopped");
        }
    });
    let mut stdout = tokio::io::stdout();
    let copied = bridge_io(&mut remote_out, &mut stdout).await;
    forward.abort();
    copied?;

    let status = child.wait().await.context("remote shell did not exit")?;
    Ok(if status.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
