//! Integration tests for the CLI skeleton: help, version, preview domains.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn siteforge(config_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("siteforge"));
    cmd.env("NO_COLOR", "1")
        .env("SITEFORGE_CONFIG", config_dir.path().join("config.yaml"));
    cmd
}

fn temp() -> TempDir {
    TempDir::new().expect("temp dir")
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    let dir = temp();
    siteforge(&dir).assert().code(2).stderr(predicate::str::contains(
        "Provision a bare SSH host into a running website",
    ));
}

#[test]
fn test_cli_help_lists_commands() {
    let dir = temp();
    siteforge(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("preview-domain"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command_shows_version() {
    let dir = temp();
    siteforge(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "siteforge {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let dir = temp();
    let out = siteforge(&dir)
        .args(["version", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_version_works_with_broken_config() {
    let dir = temp();
    std::fs::write(dir.path().join("config.yaml"), "pipeline: [not, a, map").expect("write");
    siteforge(&dir).arg("version").assert().success();
}

// --- preview-domain ---

#[test]
fn test_preview_domain_with_base() {
    let dir = temp();
    siteforge(&dir)
        .args([
            "preview-domain",
            "--requester",
            "user-1",
            "--label",
            "blog.example.com",
            "--base",
            "preview.example.net",
        ])
        .assert()
        .success()
        .stdout(predicate::str::ends_with(".preview.example.net\n"));
}

#[test]
fn test_preview_domain_is_deterministic() {
    let dir = temp();
    let run = || {
        siteforge(&dir)
            .args([
                "preview-domain",
                "--requester",
                "user-1",
                "--label",
                "blog.example.com",
                "--base",
                "preview.example.net",
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_preview_domain_uses_configured_base() {
    let dir = temp();
    siteforge(&dir)
        .args(["config", "set", "preview.base_domain", "sites.example.org"])
        .assert()
        .success();
    siteforge(&dir)
        .args(["preview-domain", "--requester", "u", "--label", "shop"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".sites.example.org"));
}

#[test]
fn test_preview_domain_without_base_fails() {
    let dir = temp();
    siteforge(&dir)
        .args(["preview-domain", "--requester", "u", "--label", "shop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no preview base domain"));
}

#[test]
fn test_preview_domain_without_base_json_error() {
    let dir = temp();
    let out = siteforge(&dir)
        .args(["--json", "preview-domain", "--requester", "u", "--label", "shop"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["code"], "error");
    assert!(
        value["message"]
            .as_str()
            .is_some_and(|m| m.contains("no preview base domain"))
    );
}
