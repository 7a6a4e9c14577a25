//! Integration tests for `siteforge provision` failures that happen before
//! any connection is attempted.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// TEST-NET-3 address; nothing here ever connects.
const HOST: &str = "203.0.113.7";

fn siteforge(config_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("siteforge"));
    cmd.env("NO_COLOR", "1")
        .env("SITEFORGE_CONFIG", config_dir.path().join("config.yaml"))
        .env("SITEFORGE_TEST_PW", "correct horse battery");
    cmd
}

fn temp() -> TempDir {
    TempDir::new().expect("temp dir")
}

#[test]
fn test_provision_requires_domain() {
    let dir = temp();
    siteforge(&dir)
        .args(["provision", "--host", HOST, "--password-env", "SITEFORGE_TEST_PW"])
        .args(["--email", "owner@example.com"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--domain"));
}

#[test]
fn test_provision_rejects_password_flag() {
    let dir = temp();
    siteforge(&dir)
        .args(["provision", "--host", HOST, "--password", "hunter2"])
        .args(["--domain", "blog.example.com", "--email", "owner@example.com"])
        .assert()
        .code(2);
}

#[test]
fn test_provision_without_credentials_fails() {
    let dir = temp();
    siteforge(&dir)
        .args(["provision", "--host", HOST])
        .args(["--domain", "blog.example.com", "--email", "owner@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no SSH credential given"));
}

#[test]
fn test_provision_unset_password_variable_fails() {
    let dir = temp();
    siteforge(&dir)
        .args(["provision", "--host", HOST, "--password-env", "SITEFORGE_TEST_UNSET_PW"])
        .args(["--domain", "blog.example.com", "--email", "owner@example.com"])
        .env_remove("SITEFORGE_TEST_UNSET_PW")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SITEFORGE_TEST_UNSET_PW is not set"));
}

#[test]
fn test_provision_invalid_domain_reports_validation() {
    let dir = temp();
    siteforge(&dir)
        .args(["provision", "--host", HOST, "--password-env", "SITEFORGE_TEST_PW"])
        .args(["--domain", "localhost", "--email", "owner@example.com"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("domain"));
}

#[test]
fn test_provision_invalid_domain_json_failure_document() {
    let dir = temp();
    siteforge(&dir)
        .args(["--json", "provision", "--host", HOST, "--password-env", "SITEFORGE_TEST_PW"])
        .args(["--domain", "localhost", "--email", "owner@example.com"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""code": "validation""#))
        .stdout(predicate::str::contains(r#""retryable": false"#))
        .stdout(predicate::str::contains("correct horse battery").not());
}

#[test]
fn test_provision_unreadable_options_file() {
    let dir = temp();
    let missing = dir.path().join("missing.yaml");
    siteforge(&dir)
        .args(["provision", "--host", HOST, "--password-env", "SITEFORGE_TEST_PW"])
        .arg("--options")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}
