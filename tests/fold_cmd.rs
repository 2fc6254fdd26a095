use assert_cmd::Command;
use predicates::prelude::*;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("tapebf").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn fold_prints_counts_and_jump_targets() {
    cargo_bin()
        .args(["fold", "+++++ -- [-]"])
        .assert()
        .success()
        .stdout("    0  +  x5\n    1  -  x2\n    2  [  -> 4\n    3  -  x1\n    4  ]  -> 2\n");
}

#[test]
fn fold_resolves_outer_loop_to_outer_close() {
    cargo_bin()
        .args(["fold", "--", "-[--[+]--]"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("    1  [  -> 7\n")
                .and(predicate::str::contains("    7  ]  -> 1\n")),
        );
}

#[test]
fn fold_reports_unbalanced_brackets() {
    cargo_bin()
        .args(["fold", "]"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unmatched ']'"));
}
