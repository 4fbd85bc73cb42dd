// ABOUTME: Integration tests for the cpi-deploy CLI commands.
// ABOUTME: Validates --help output, delete argument checking, and the deployment command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cpi_deploy_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cpi-deploy"));
    cmd.env("HOME", home.path())
        .arg("--config")
        .arg(home.path().join("config.json"));
    cmd
}

#[test]
fn help_shows_commands() {
    Command::new(assert_cmd::cargo::cargo_bin!("cpi-deploy"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deployment"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn delete_without_arguments_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();

    cpi_deploy_cmd(&home)
        .arg("delete")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Invalid usage - delete command requires exactly 1 argument",
        ))
        .stderr(predicate::function(|stderr: &str| {
            let error = stderr.find("Error: Invalid usage - ");
            let usage = stderr.find("Expected usage: cpi-deploy delete <cpi-release-tarball>");
            matches!((error, usage), (Some(e), Some(u)) if e < u)
        }));
}

#[test]
fn delete_with_two_arguments_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();

    cpi_deploy_cmd(&home)
        .args(["delete", "a.tgz", "b.tgz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Invalid usage - delete command requires exactly 1 argument",
        ));
}

#[test]
fn delete_without_deployment_fails_validation() {
    let home = tempfile::tempdir().unwrap();
    let tarball = home.path().join("cpi.tgz");
    fs::write(&tarball, b"").unwrap();

    cpi_deploy_cmd(&home)
        .arg("delete")
        .arg(&tarball)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Started validating"))
        .stdout(predicate::str::contains("Validating deployment manifest... failed"))
        .stderr(predicate::str::contains("No deployment set"));
}

#[test]
fn deployment_without_one_set_fails() {
    let home = tempfile::tempdir().unwrap();

    cpi_deploy_cmd(&home)
        .arg("deployment")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No deployment set"));
}

#[test]
fn deployment_can_be_set_and_shown() {
    let home = tempfile::tempdir().unwrap();
    let manifest = home.path().join("micro.yml");
    fs::write(&manifest, "name: micro\n").unwrap();

    cpi_deploy_cmd(&home)
        .arg("deployment")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Deployment set to"))
        .stdout(predicate::str::contains("micro.yml"));

    let config = fs::read_to_string(home.path().join("config.json")).unwrap();
    assert!(config.contains("micro.yml"));

    cpi_deploy_cmd(&home)
        .arg("deployment")
        .assert()
        .success()
        .stdout(predicate::str::contains("Current deployment is"))
        .stdout(predicate::str::contains("micro.yml"));
}

#[test]
fn deployment_rejects_missing_manifest() {
    let home = tempfile::tempdir().unwrap();

    cpi_deploy_cmd(&home)
        .args(["deployment", "nowhere.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    assert!(!home.path().join("config.json").exists());
}
