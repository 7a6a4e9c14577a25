//! Capability detection against scripted hosts.

use siteforge_cli::application::services::detect::detect;

use crate::mocks::ScriptedShell;

#[tokio::test]
async fn test_fresh_host_has_nothing() {
    let caps = detect(&ScriptedShell::fresh_host()).await;
    assert!(!caps.is_configured());
    assert!(!caps.web_server && !caps.database && !caps.runtime && !caps.site_tool);
    assert_eq!(caps.missing_auxiliary(), vec!["curl", "unzip", "ufw"]);
}

#[tokio::test]
async fn test_configured_host_has_everything() {
    let shell = ScriptedShell::configured_host();
    let caps = detect(&shell).await;
    assert!(caps.is_configured());
    assert!(caps.missing_auxiliary().is_empty());
    assert_eq!(shell.calls().len(), 7);
}

#[tokio::test]
async fn test_partial_host() {
    let shell = ScriptedShell::fresh_host()
        .on("command -v nginx", 0, "")
        .on("command -v mariadb", 0, "");
    let caps = detect(&shell).await;
    assert!(caps.web_server);
    assert!(caps.database);
    assert!(!caps.runtime);
    assert!(!caps.is_configured());
}

#[tokio::test]
async fn test_transport_error_counts_as_absent() {
    let shell = ScriptedShell::configured_host().drop_on("command -v wp", "broken pipe");
    let caps = detect(&shell).await;
    assert!(!caps.site_tool);
    assert!(caps.web_server);
    assert!(!caps.is_configured());
}
