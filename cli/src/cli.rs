//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Provision a bare SSH host into a running website
#[derive(Parser)]
#[command(
    name = "siteforge",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Output in JSON format (progress events as JSON lines)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Show remote command output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install the web stack and a new site on a host
    Provision(Box<commands::provision::ProvisionArgs>),

    /// Show which parts of the web stack a host already has
    Detect(commands::detect::DetectArgs),

    /// Open an interactive shell on a host
    Shell(commands::shell::ShellArgs),

    /// Print the preview hostname for a requester and label
    PreviewDomain(commands::preview_domain::PreviewDomainArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// `cancel` flips to `true` when the user asks to stop; long-running
    /// commands finish the step in flight and then wind down.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails before producing its own report.
    pub async fn run(self, cancel: watch::Receiver<bool>) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            verbose,
            command,
        } = self;

        let flags = AppFlags {
            no_color,
            quiet,
            json,
            verbose,
        };
        match command {
            Command::Version => {
                commands::version::run(json)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Provision(args) => {
                let app = AppContext::new(&flags)?;
                commands::provision::run(&app, &args, cancel).await
            }
            Command::Detect(args) => {
                let app = AppContext::new(&flags)?;
                commands::detect::run(&app, &args).await
            }
            Command::Shell(args) => {
                let app = AppContext::new(&flags)?;
                commands::shell::run(&app, &args).await
            }
            Command::PreviewDomain(args) => {
                let app = AppContext::new(&flags)?;
                commands::preview_domain::run(&app, &args)
            }
            Command::Config(cmd) => {
                let app = AppContext::new(&flags)?;
                commands::config::run(&app, cmd)
            }
        }
    }
}
