//! `siteforge provision`: turn a bare host into a running site.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::watch;

use crate::app::AppContext;
use crate::application::services::events::{EventEmitter, Subscription};
use crate::application::services::installation::{Installer, InstallerSettings};
use crate::commands::ConnectArgs;
use crate::domain::config::SiteforgeConfig;
use crate::domain::options::{InstallationOptions, Requester, SiteCustomization};
use crate::output::EventReporter;
use crate::output::json::{format_failure, format_report};

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Read installation options from a YAML file
    #[arg(long, value_name = "FILE", conflicts_with_all = [
        "domain", "email", "requester_id", "title", "admin_user", "admin_email",
        "tagline", "theme", "plugins",
    ])]
    pub options: Option<PathBuf>,

    /// Domain the site will be served under
    #[arg(long, required_unless_present = "options")]
    pub domain: Option<String>,

    /// Requester email (also the default admin email)
    #[arg(long, required_unless_present = "options")]
    pub email: Option<String>,

    /// Requester identifier (defaults to the email)
    #[arg(long)]
    pub requester_id: Option<String>,

    /// Site title
    #[arg(long)]
    pub title: Option<String>,

    /// Site tagline
    #[arg(long)]
    pub tagline: Option<String>,

    /// Administrator user name (defaults to site.admin_user)
    #[arg(long)]
    pub admin_user: Option<String>,

    /// Administrator email (defaults to --email)
    #[arg(long)]
    pub admin_email: Option<String>,

    /// Read the administrator password from this environment variable
    /// (generated when absent)
    #[arg(long, value_name = "VAR")]
    pub admin_password_env: Option<String>,

    /// Theme to install and activate
    #[arg(long)]
    pub theme: Option<String>,

    /// Plugin to install and activate (repeatable)
    #[arg(long = "plugin", value_name = "SLUG")]
    pub plugins: Vec<String>,

    /// Assume the web stack is already installed
    #[arg(long)]
    pub skip_system_setup: bool,

    /// Do not assign a preview port
    #[arg(long)]
    pub no_preview: bool,

    /// Installation identifier (generated when absent)
    #[arg(long)]
    pub installation_id: Option<String>,
}

/// Merge flags, the options file and configuration defaults.
///
/// # Errors
///
/// Returns an error if the options file cannot be read or parsed, or a
/// named environment variable is unset.
pub fn build_options(args: &ProvisionArgs, config: &SiteforgeConfig) -> Result<InstallationOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_yaml::from_str::<InstallationOptions>(&content)
                .with_context(|| format!("cannot parse {}", path.display()))?
        }
        None => {
            let email = args.email.clone().unwrap_or_default();
            InstallationOptions {
                installation_id: String::new(),
                domain: args.domain.clone().unwrap_or_default().to_ascii_lowercase(),
                requester: Requester {
                    id: args.requester_id.clone().unwrap_or_else(|| email.clone()),
                    email,
                },
                site: SiteCustomization {
                    title: args.title.clone().unwrap_or_else(|| SiteCustomization::default().title),
                    admin_user: args
                        .admin_user
                        .clone()
                        .unwrap_or_else(|| config.site.admin_user.clone()),
                    admin_password: None,
                    admin_email: args.admin_email.clone(),
                    tagline: args.tagline.clone(),
                    theme: args.theme.clone(),
                    plugins: args.plugins.clone(),
                },
                skip_system_setup: false,
                preview_access: true,
            }
        }
    };

    if let Some(id) = &args.installation_id {
        options.installation_id.clone_from(id);
    }
    if options.installation_id.is_empty() {
        options.installation_id = uuid::Uuid::new_v4().to_string();
    }
    if let Some(var) = &args.admin_password_env {
        let password =
            std::env::var(var).with_context(|| format!("environment variable {var} is not set"))?;
        options.site.admin_password = Some(password);
    }
    options.skip_system_setup |= args.skip_system_setup;
    options.preview_access &= !args.no_preview;
    Ok(options)
}

/// Run one installation, rendering its event stream as it goes.
///
/// # Errors
///
/// Returns an error for problems before the installation starts (bad flags,
/// unreadable options). A failed installation is rendered and reported
/// through the exit code.
pub async fn run(
    app: &AppContext,
    args: &ProvisionArgs,
    cancel: watch::Receiver<bool>,
) -> Result<ExitCode> {
    let connection = args.connect.to_config()?;
    let options = build_options(args, &app.config)?;
    tracing::debug!(installation_id = %options.installation_id, "options resolved");

    if !app.is_json() {
        app.output.header(&format!(
            "Provisioning {} on {}",
            options.domain, connection.host
        ));
    }

    let emitter = EventEmitter::new(options.installation_id.clone());
    let subscription = emitter.subscribe();
    let connector = app.connector();
    let settings = InstallerSettings::from_config(&app.config, app.db_admin_password());
    let installer = Installer::new(&connector, &app.ports, settings);

    let mut reporter = app.reporter();
    let (outcome, rendered) = tokio::join!(
        installer.install(&connection, &options, &emitter, cancel),
        render_events(subscription, &mut reporter),
    );
    drop(reporter);
    if let Err(e) = rendered {
        tracing::warn!(error = %e, "progress rendering stopped");
    }

    match outcome {
        Ok(report) => {
            if app.is_json() {
                println!("{}", format_report(&report)?);
            } else {
                app.human().render_report(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if app.is_json() {
                println!("{}", format_failure(&err)?);
            } else {
                let human = app.human();
                human.render_failure(&err);
                if app.verbose {
                    human.render_steps(&err.steps);
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Drain `subscription` until the terminal event.
async fn render_events(mut subscription: Subscription, reporter: &mut EventReporter<'_>) -> Result<()> {
    while let Some(envelope) = subscription.receiver.recv().await {
        reporter.handle(&envelope)?;
        if envelope.event.is_terminal() {
            break;
        }
    }
    Ok(())
}
