//! Integration tests for `siteforge config`.
//!
//! Every test points `SITEFORGE_CONFIG` at a temp path so they never read or
//! write `~/.siteforge/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn siteforge() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("siteforge"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

// ---------------------------------------------------------------------------
// `siteforge config show`
// ---------------------------------------------------------------------------

#[test]
fn test_config_show_without_file_uses_defaults() {
    let (_dir, path) = temp_config_path();
    siteforge()
        .args(["config", "show"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("preview.port_start"))
        .stdout(predicate::str::contains("8100"))
        .stdout(predicate::str::contains("/var/www"));
}

#[test]
fn test_config_show_masks_database_password() {
    let (_dir, path) = temp_config_path();
    siteforge()
        .args(["config", "show"])
        .env("SITEFORGE_CONFIG", &path)
        .env("SITEFORGE_DB_ADMIN_PASSWORD", "hunter2-not-shown")
        .assert()
        .success()
        .stdout(predicate::str::contains("(set)"))
        .stdout(predicate::str::contains("hunter2-not-shown").not());
}

#[test]
fn test_config_show_json() {
    let (_dir, path) = temp_config_path();
    let out = siteforge()
        .args(["--json", "config", "show"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["preview"]["port_start"], 8100);
    assert_eq!(value["site"]["admin_user"], "admin");
}

#[test]
fn test_config_show_rejects_invalid_file() {
    let (_dir, path) = temp_config_path();
    std::fs::write(&path, "preview:\n  port_start: 9000\n  port_end: 8000\n").unwrap();
    siteforge()
        .args(["config", "show"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

// ---------------------------------------------------------------------------
// `siteforge config path`
// ---------------------------------------------------------------------------

#[test]
fn test_config_path_honours_env_override() {
    let (_dir, path) = temp_config_path();
    siteforge()
        .args(["config", "path"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains(path.as_str()));
}

// ---------------------------------------------------------------------------
// `siteforge config set`
// ---------------------------------------------------------------------------

#[test]
fn test_config_set_persists_value() {
    let (_dir, path) = temp_config_path();
    siteforge()
        .args(["config", "set", "pipeline.deadline_secs", "1200"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("pipeline.deadline_secs"));

    let content = std::fs::read_to_string(&path).expect("config written");
    assert!(content.contains("deadline_secs: 1200"), "got: {content}");

    siteforge()
        .args(["config", "show"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1200"));
}

#[cfg(unix)]
#[test]
fn test_config_set_writes_private_file() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, path) = temp_config_path();
    siteforge()
        .args(["config", "set", "site.admin_user", "editor"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .success();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_config_set_unknown_key_fails() {
    let (_dir, path) = temp_config_path();
    siteforge()
        .args(["config", "set", "preview.colour", "blue"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"))
        .stderr(predicate::str::contains("preview.base_domain"));
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_set_bad_value_fails() {
    let (_dir, path) = temp_config_path();
    siteforge()
        .args(["config", "set", "preview.port_start", "not-a-port"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("preview.port_start"));
}

#[test]
fn test_config_set_unknown_key_json_error_code() {
    let (_dir, path) = temp_config_path();
    let out = siteforge()
        .args(["--json", "config", "set", "nope", "1"])
        .env("SITEFORGE_CONFIG", &path)
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "config");
}
