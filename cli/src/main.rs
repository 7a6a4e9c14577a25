//! siteforge - provision a bare SSH host into a running website

use std::process::ExitCode;

use clap::Parser;
use siteforge_cli::cli::Cli;
use siteforge_cli::output::json::{error_code, format_error};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(watch_interrupts(cancel_tx));

    match cli.run(cancel_rx).await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            match format_error(&message, error_code(&e)) {
                Ok(body) if json => println!("{body}"),
                _ => eprintln!("Error: {message}"),
            }
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr so they never mix with `--json` output.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// First Ctrl-C requests cancellation after the step in flight; a second one
/// exits immediately.
async fn watch_interrupts(cancel: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("\nCancelling after the current step (press Ctrl-C again to abort)");
    let _ = cancel.send(true);
    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(130);
    }
}
