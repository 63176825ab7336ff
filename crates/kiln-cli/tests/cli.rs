//! End-to-end checks of the binary's argument surface.

use assert_cmd::Command;
use predicates::prelude::*;

fn kiln() -> Command {
    Command::cargo_bin("kiln").unwrap()
}

#[test]
fn bare_invocation_lists_the_available_tasks() {
    kiln()
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("dev"))
        .stdout(predicate::str::contains("test"));
}

#[test]
fn test_command_succeeds_without_doing_anything() {
    kiln().arg("test").assert().success();
}

#[test]
fn build_with_a_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    kiln()
        .current_dir(dir.path())
        .args(["build", "--config", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn quiet_and_verbose_conflict() {
    kiln().args(["test", "--quiet", "--verbose"]).assert().failure();
}
