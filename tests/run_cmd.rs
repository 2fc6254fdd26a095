use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

const HELLO_WORLD: &str = concat!(
    "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]",
    ">>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.",
);

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("tapebf").unwrap();
    cmd.env("TAPEBF_CONFIG", "/nonexistent/tapebf.toml")
        .env_remove("TAPEBF_TAPE_LEN")
        .env_remove("TAPEBF_MAX_STEPS")
        .env_remove("TAPEBF_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    cmd
}

fn read_to_tempfile(content: &str) -> tempfile::NamedTempFile {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "{}", content).unwrap();
    tf
}

#[test]
fn test_run_positional_code_success() {
    cargo_bin()
        .args(["run", "--", "----[---->+<]>++."])
        .assert()
        .success()
        .stdout("A")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_run_parts_are_concatenated() {
    // 65 increments split across three args, then print
    cargo_bin()
        .arg("run")
        .arg("+".repeat(30))
        .arg("+".repeat(35))
        .arg(".")
        .assert()
        .success()
        .stdout("A");
}

#[test]
fn test_run_file_hello_world() {
    let tf = read_to_tempfile(&format!("hello world, commented\n{HELLO_WORLD}\n"));
    cargo_bin()
        .arg("run").arg("--file").arg(tf.path())
        .assert()
        .success()
        .stdout("Hello World!\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_run_reads_stdin_and_echoes() {
    cargo_bin()
        .args(["run", ",.,."])
        .write_stdin("Zq")
        .assert()
        .success()
        .stdout("Zq");
}

#[test]
fn test_run_missing_file_fails() {
    cargo_bin()
        .args(["run", "--file", "/nonexistent/program.bf"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read code file"));
}

#[test]
fn test_run_tape_len_flag_bounds_cursor() {
    cargo_bin()
        .args(["run", "--tape-len", "2", ">>"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of bounds"));

    cargo_bin()
        .args(["run", "--tape-len", "3", ">>"])
        .assert()
        .success();
}
