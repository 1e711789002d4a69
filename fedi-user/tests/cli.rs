//! CLI smoke tests for fedi-user

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_describes_command() {
    Command::cargo_bin("fedi-user")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("HANDLE"))
        .stdout(predicate::str::contains("--days"));
}

#[test]
fn test_requires_handle_argument() {
    Command::cargo_bin("fedi-user").unwrap().assert().failure();
}

#[test]
fn test_blank_handle_is_invalid_input() {
    Command::cargo_bin("fedi-user")
        .unwrap()
        .arg("@")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Invalid input"));
}
