//! Behavior the `RemoteShell` port provides on top of `run`.

#![allow(clippy::expect_used)]

use siteforge_cli::application::ports::RemoteShell;
use siteforge_cli::domain::error::ProvisionError;

use crate::mocks::ScriptedShell;

#[tokio::test]
async fn test_run_or_fail_passes_success_through() {
    let shell = ScriptedShell::new().on("nginx -v", 0, "nginx/1.24.0");
    let output = shell.run_or_fail("nginx -v").await.expect("exit 0");
    assert_eq!(output.stdout, "nginx/1.24.0");
    assert!(output.success());
}

#[tokio::test]
async fn test_run_or_fail_turns_nonzero_exit_into_command_error() {
    let shell = ScriptedShell::new().fail("systemctl reload nginx", 1, "  Job failed.\n");
    let err = shell
        .run_or_fail("systemctl reload nginx")
        .await
        .expect_err("exit 1");
    match err {
        ProvisionError::Command {
            command, exit_code, stderr,
        } => {
            assert_eq!(command, "systemctl reload nginx");
            assert_eq!(exit_code, 1);
            assert_eq!(stderr, "Job failed.");
        }
        other => panic!("expected command failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_run_or_fail_keeps_transport_errors() {
    let shell = ScriptedShell::new().drop_on("uptime", "connection reset");
    let err = shell.run_or_fail("uptime").await.expect_err("transport");
    assert_eq!(err.code(), "remote");
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn test_closed_session_refuses_commands() {
    let shell = ScriptedShell::new();
    shell.disconnect().await;
    assert!(!shell.is_connected());
    assert!(shell.run_or_fail("true").await.is_err());
}
