//! `siteforge preview-domain`: print the preview hostname for a request.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::app::AppContext;
use crate::domain::preview::preview_domain;
use crate::output::json::format_value;

#[derive(Args, Debug)]
pub struct PreviewDomainArgs {
    /// Requester identifier
    #[arg(long)]
    pub requester: String,

    /// Site label, usually the target domain
    #[arg(long)]
    pub label: String,

    /// Base domain (defaults to preview.base_domain from the configuration)
    #[arg(long)]
    pub base: Option<String>,
}

/// # Errors
///
/// Returns an error if no base domain is configured or given.
pub fn run(app: &AppContext, args: &PreviewDomainArgs) -> Result<ExitCode> {
    let Some(base) = args
        .base
        .as_deref()
        .or(app.config.preview.base_domain.as_deref())
    else {
        anyhow::bail!(
            "no preview base domain\n\nPass --base <DOMAIN> or run: siteforge config set preview.base_domain <DOMAIN>"
        );
    };

    let domain = preview_domain(&args.requester, &args.label, base);
    if app.is_json() {
        println!("{}", format_value(&json!({ "preview_domain": domain }))?);
    } else {
        println!("{domain}");
    }
    Ok(ExitCode::SUCCESS)
}
