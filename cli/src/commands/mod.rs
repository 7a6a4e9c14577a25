//! Command implementations

pub mod config;
pub mod detect;
pub mod preview_domain;
pub mod provision;
pub mod shell;
pub mod version;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::domain::connection::{ConnectionConfig, Credential};

/// SSH target and credentials, shared by every command that connects.
///
/// Secrets are never taken on the command line: passwords and passphrases
/// are read from a named environment variable or prompted for.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Host name or IP address of the server
    #[arg(long)]
    pub host: String,

    /// SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// Remote user (non-root users need passwordless sudo)
    #[arg(short, long, default_value = "root")]
    pub user: String,

    /// Private key file
    #[arg(short, long, value_name = "PATH", conflicts_with_all = ["password_env", "ask_password"])]
    pub identity: Option<PathBuf>,

    /// Read the SSH password from this environment variable
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,

    /// Read the private key passphrase from this environment variable
    #[arg(long, value_name = "VAR", requires = "identity")]
    pub passphrase_env: Option<String>,

    /// Prompt for the SSH password
    #[arg(long, conflicts_with = "password_env")]
    pub ask_password: bool,
}

impl ConnectArgs {
    /// Resolve the flags into a connection config, reading secrets as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if no credential source was given, a named variable
    /// is unset, or the password prompt fails.
    pub fn to_config(&self) -> Result<ConnectionConfig> {
        let credential = if let Some(path) = &self.identity {
            let passphrase = self.passphrase_env.as_deref().map(read_env).transpose()?;
            Credential::PrivateKey {
                path: path.clone(),
                passphrase,
            }
        } else if let Some(var) = &self.password_env {
            Credential::Password(read_env(var)?)
        } else if self.ask_password {
            let password = dialoguer::Password::new()
                .with_prompt(format!("SSH password for {}@{}", self.user, self.host))
                .interact()
                .context("cannot read password")?;
            Credential::Password(password)
        } else {
            anyhow::bail!(
                "no SSH credential given\n\nUse --identity <PATH>, --password-env <VAR> or --ask-password"
            );
        };

        Ok(ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            credential,
        })
    }
}

fn read_env(var: &str) -> Result<String> {
    std::env::var(var).with_context(|| format!("environment variable {var} is not set"))
}
