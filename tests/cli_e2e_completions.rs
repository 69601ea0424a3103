//! End-to-end tests for `rbuild completions`.

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_zsh_script_on_stdout() {
    cargo_bin_cmd!("rbuild")
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef rbuild"))
        .stdout(predicate::str::contains("--show-passwords"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_completions_needs_no_configuration() {
    // no HOME and no rc files: completions must still work
    let fixture = TestFixture::new();
    fixture
        .command()
        .env_remove("HOME")
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("images"));
}

#[test]
fn test_unknown_shell_is_usage_error() {
    cargo_bin_cmd!("rbuild")
        .args(["completions", "tcsh"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}
