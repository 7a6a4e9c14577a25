//! `siteforge detect`: connect and report what the host already carries.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{Connector, RemoteShell};
use crate::application::services::detect::detect;
use crate::commands::ConnectArgs;
use crate::output::json::format_value;
use crate::output::progress::{self, Outcome};

#[derive(Args, Debug)]
pub struct DetectArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

/// # Errors
///
/// Returns an error if the credentials cannot be resolved or the connection
/// fails.
pub async fn run(app: &AppContext, args: &DetectArgs) -> Result<ExitCode> {
    let config = args.connect.to_config()?;
    let connector = app.connector();

    let pb = (!app.is_json() && app.output.show_progress())
        .then(|| progress::spinner(&format!("Inspecting {}", config.host)));
    let connected = connector
        .connect(&config, app.config.pipeline.connect_timeout())
        .await;
    let session = match connected {
        Ok(session) => session,
        Err(e) => {
            if let Some(pb) = &pb {
                progress::finish(pb, Outcome::Failed, &format!("Inspecting {}", config.host));
            }
            return Err(e.into());
        }
    };
    let caps = detect(&session).await;
    session.disconnect().await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if app.is_json() {
        println!("{}", format_value(&caps)?);
    } else {
        app.human().render_capabilities(&config.host, &caps);
    }
    Ok(ExitCode::SUCCESS)
}
