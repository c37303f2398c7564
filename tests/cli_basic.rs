//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, each subcommand
//! responds to `--help`, and the network-free commands work against a
//! temporary settings directory.

#![allow(deprecated)] // cargo_bin deprecation — replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper: get a Command for the `balancers` binary.
fn balancers() -> Command {
    Command::cargo_bin("balancers").expect("binary 'balancers' should be built")
}

/// Helper: a Command isolated from the user's config and settings.
fn isolated(dir: &TempDir) -> Command {
    let mut cmd = balancers();
    cmd.env("XDG_CONFIG_HOME", dir.path())
        .env("BALANCERS_LOG", "off")
        .arg("--store-dir")
        .arg(dir.path().join("store"));
    cmd
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    balancers()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: balancers"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("settings"))
        .stdout(predicate::str::contains("streams"))
        .stdout(predicate::str::contains("link"));
}

#[test]
fn version_flag_shows_semver() {
    balancers()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^balancers \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_args_shows_error_and_usage() {
    balancers()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: balancers"));
}

#[test]
fn invalid_subcommand_fails() {
    balancers()
        .arg("this-is-not-a-real-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─── Subcommand help ─────────────────────────────────────────────────────────

#[test]
fn search_help() {
    balancers()
        .args(["search", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Search every live balancer"))
        .stdout(predicate::str::contains("<TITLE>"))
        .stdout(predicate::str::contains("--kp"))
        .stdout(predicate::str::contains("--imdb"))
        .stdout(predicate::str::contains("--all"));
}

#[test]
fn settings_set_help() {
    balancers()
        .args(["settings", "set", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<PATH>"))
        .stdout(predicate::str::contains("<VALUE>"));
}

#[test]
fn link_help() {
    balancers()
        .args(["link", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("playable URL"))
        .stdout(predicate::str::contains("<BALANCER>"))
        .stdout(predicate::str::contains("<STREAM_ID>"));
}

// ─── Subcommand argument validation ──────────────────────────────────────────

#[test]
fn search_missing_title_fails() {
    balancers()
        .arg("search")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<TITLE>"));
}

#[test]
fn search_all_conflicts_with_filter() {
    balancers()
        .args(["search", "Dune", "--all", "--filter", "{}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// ─── Network-free commands ───────────────────────────────────────────────────

#[test]
fn settings_show_lists_every_balancer() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[x] svetacdn"))
        .stdout(predicate::str::contains("[ ] kodik"))
        .stdout(predicate::str::contains("vibix"));
}

#[test]
fn settings_set_persists() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["settings", "set", "kodik.token", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kodik.token = \"abc\""));

    isolated(&dir)
        .args(["--json", "settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"token\": \"abc\""));

    assert!(dir.path().join("store").join("balancers_settings.json").exists());
}

#[test]
fn settings_set_rejects_empty_segments() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["settings", "set", "kodik..token", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid settings path"));
}

#[test]
fn list_shows_default_live_balancers() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("svetacdn"))
        .stdout(predicate::str::contains("videodb"))
        .stdout(predicate::str::contains("kodik").not());
}

#[test]
fn streams_on_dead_balancer_fails() {
    let dir = TempDir::new().unwrap();
    isolated(&dir)
        .args(["streams", "kodik", "123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not live"));
}
