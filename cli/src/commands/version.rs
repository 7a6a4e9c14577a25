//! `siteforge version`

use anyhow::Result;
use serde_json::json;

use crate::output::json::format_value;

/// Print the version. Needs no configuration, so it works even when the
/// config file is broken.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(json: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!("{}", format_value(&json!({ "version": version }))?);
    } else {
        println!("siteforge {version}");
    }
    Ok(())
}
