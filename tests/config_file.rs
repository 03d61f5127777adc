use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn cargo_bin_with_config(content: &str) -> (Command, tempfile::NamedTempFile) {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "{}", content).unwrap();
    let mut cmd = Command::cargo_bin("bf").unwrap();
    cmd.env("BF_CONFIG", tf.path())
        .env_remove("BF_CAPACITY")
        .env_remove("BF_CELL_WIDTH")
        .env_remove("BF_MAX_STEPS")
        .env_remove("BF_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    (cmd, tf)
}

#[test]
fn capacity_from_config_file_bounds_the_tape() {
    let (mut cmd, _tf) = cargo_bin_with_config("[engine]\ncapacity = 1\n");
    cmd.args(["run", ">"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("tape overflow"));
}

#[test]
fn environment_overrides_config_file() {
    let (mut cmd, _tf) = cargo_bin_with_config("[engine]\ncapacity = 1\n");
    cmd.env("BF_CAPACITY", "2")
        .args(["run", ">+."])
        .assert()
        .success()
        .stdout(vec![1u8]);
}

#[test]
fn flag_overrides_environment() {
    let (mut cmd, _tf) = cargo_bin_with_config("");
    cmd.env("BF_CAPACITY", "2")
        .args(["run", "--capacity", "1", ">"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("tape overflow"));
}

#[test]
fn cell_width_from_config_file() {
    let (mut cmd, _tf) = cargo_bin_with_config("[engine]\ncell_width = \"u32\"\n");
    // Wraps to 0 on 8-bit cells; a 32-bit cell enters the loop and sets cell 1.
    cmd.arg("run").arg(format!("{}[[-]>+<]>.", "+".repeat(256)))
        .assert()
        .success()
        .stdout(vec![1u8]);
}
