use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("bf").unwrap();
    cmd.env("BF_CONFIG", "/nonexistent/bf.toml")
        .env_remove("BF_CAPACITY")
        .env_remove("BF_CELL_WIDTH")
        .env_remove("BF_MAX_STEPS")
        .env_remove("BF_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_unmatched_open_bracket_error() {
    cargo_bin()
        .timeout(Duration::from_secs(2)).arg("run").arg("[+")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unmatched bracket '['"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_unmatched_close_bracket_error() {
    cargo_bin()
        .timeout(Duration::from_secs(2)).write_stdin("+]")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Parse error").and(predicate::str::contains("']'")));
}

#[test]
fn test_caret_points_at_offending_character() {
    cargo_bin()
        .args(["run", "ab]"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("at source offset 2").and(predicate::str::contains("  ab]\n    ^")));
}

#[test]
fn test_tape_underflow_error() {
    cargo_bin()
        .args(["run", "<"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("tape underflow"));
}

#[test]
fn test_tape_overflow_error_with_small_capacity() {
    cargo_bin()
        .args(["run", "--capacity", "1", ">"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("tape overflow"));
}

#[test]
fn test_zero_capacity_is_rejected() {
    cargo_bin()
        .args(["run", "--capacity", "0", "+"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("capacity"));
}

#[test]
fn test_input_is_unsupported() {
    cargo_bin()
        .args(["run", ","])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("input (',') is not supported"));
}

#[test]
fn test_partial_output_is_flushed_before_failure() {
    cargo_bin()
        .args(["run", "++++++++[>++++++++<-]>+.+.,"])
        .assert()
        .code(1)
        .stdout("AB")
        .stderr(predicate::str::contains("not supported"));
}
