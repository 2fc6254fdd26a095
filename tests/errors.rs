use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("tapebf").unwrap();
    cmd.env("TAPEBF_CONFIG", "/nonexistent/tapebf.toml")
        .env_remove("TAPEBF_TAPE_LEN")
        .env_remove("TAPEBF_MAX_STEPS")
        .env_remove("TAPEBF_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_unmatched_close_error() {
    cargo_bin()
        .timeout(Duration::from_secs(2))
        .args(["run", "++]"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(
            predicate::str::contains("Parse error: unmatched ']'")
                .and(predicate::str::contains("line 1, column 3"))
                .and(predicate::str::contains("    ^")),
        );
}

#[test]
fn test_unterminated_open_error() {
    cargo_bin()
        .timeout(Duration::from_secs(2))
        .args(["run", "+[[-]"])
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("Parse error: unterminated '['")
                .and(predicate::str::contains("column 2")),
        );
}

#[test]
fn test_nothing_runs_when_build_fails() {
    // the leading output would print 'A' if anything executed
    let code = format!("{}.]", "+".repeat(65));
    cargo_bin()
        .args(["run", code.as_str()])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_bounds_error_keeps_partial_output() {
    let code = format!("{}.<", "+".repeat(65));
    cargo_bin()
        .args(["run", code.as_str()])
        .assert()
        .code(1)
        .stdout("A")
        .stderr(predicate::str::contains("Runtime error: cursor out of bounds"));
}

#[test]
fn test_exhausted_input_is_an_error() {
    cargo_bin()
        .args(["run", ",,"])
        .write_stdin("x")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("I/O error"));
}

#[test]
fn test_error_caret_on_later_line() {
    let tf = {
        use std::io::Write;
        let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
        write!(tf, "+++\n  <<").unwrap();
        tf
    };
    cargo_bin()
        .arg("run").arg("--file").arg(tf.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2, column 3").and(predicate::str::contains("  <<")));
}
