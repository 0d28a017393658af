//! CLI integration tests for the ss3link command-line interface.
//!
//! These tests cover argument parsing and the offline config commands. Nothing
//! here talks to the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the ss3link binary with an isolated config directory.
fn ss3link(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ss3link").unwrap();
    cmd.env("SS3LINK_CONFIG_DIR", config_dir.path());
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SimpliSafe"))
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("alarm"))
        .stdout(predicate::str::contains("lock"))
        .stdout(predicate::str::contains("listen"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ss3link"));
}

#[test]
fn test_auth_help() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .args(["auth", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("logout"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_alarm_set_rejects_unknown_mode() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .args(["alarm", "set", "armed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown alarm mode"));
}

#[test]
fn test_lock_set_rejects_unknown_action() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .args(["lock", "set", "open"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown lock action"));
}

#[test]
fn test_missing_subcommand() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir).arg("alarm").assert().failure();
}

#[test]
fn test_unknown_subcommand() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .arg("arm")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_defaults() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No config files loaded"))
        .stdout(predicate::str::contains("https://api.simplisafe.com/v1"))
        .stdout(predicate::str::contains("refresh buffer: 300s"));
}

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    assert!(dir.path().join("config.toml").exists());

    ss3link(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_reads_overrides() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[api]\nbase_url = \"https://example.test/v1\"\n\n[auth]\nrefresh_buffer_secs = 120\n",
    )
    .unwrap();

    ss3link(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.test/v1"))
        .stdout(predicate::str::contains("refresh buffer: 120s"));
}

#[test]
fn test_config_dir_flag_overrides_env() {
    let env_dir = TempDir::new().unwrap();
    let flag_dir = TempDir::new().unwrap();
    ss3link(&env_dir)
        .args(["--config-dir"])
        .arg(flag_dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            flag_dir.path().join("config.toml").display().to_string(),
        ));
}

#[test]
fn test_auth_status_without_session() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not signed in"));
}

#[test]
fn test_auth_status_json() {
    let dir = TempDir::new().unwrap();
    ss3link(&dir)
        .args(["--json", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"signed_in\": false"));
}
