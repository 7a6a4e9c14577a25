//! `siteforge config`: show and set configuration values.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::domain::config::validate_config_key;
use crate::output::json::format_value;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Print the configuration file location
    Path,
    /// Set configuration value
    Set {
        /// Configuration key (e.g. preview.base_domain)
        key: String,
        /// Configuration value (empty string clears optional settings)
        value: String,
    },
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read, validated or saved.
pub fn run(app: &AppContext, cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => show_config(app),
        ConfigCommand::Path => show_path(app),
        ConfigCommand::Set { key, value } => set_config(app, &key, &value),
    }
}

fn show_config(app: &AppContext) -> Result<ExitCode> {
    let path = app.config_store.path();
    if app.is_json() {
        println!("{}", format_value(&app.config)?);
    } else {
        app.human().render_config(&app.config, path);
    }
    Ok(ExitCode::SUCCESS)
}

fn show_path(app: &AppContext) -> Result<ExitCode> {
    let path = app.config_store.path();
    if app.is_json() {
        println!("{}", format_value(&json!({ "path": path }))?);
    } else {
        println!("{}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn set_config(app: &AppContext, key: &str, value: &str) -> Result<ExitCode> {
    validate_config_key(key)?;

    let mut config = app.config.clone();
    config.set(key, value)?;
    app.config_store.save(&config)?;
    tracing::info!(key, "configuration updated");

    if app.is_json() {
        println!("{}", format_value(&json!({ "key": key, "value": value }))?);
    } else {
        app.output.success(&format!("Set {key} = {value}"));
    }
    Ok(ExitCode::SUCCESS)
}
