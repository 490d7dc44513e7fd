// Verifies that --debug writes a step-by-step table to stderr.
use predicates::prelude::*;

#[test]
fn debug_flag_prints_table() {
    let mut cmd = assert_cmd::Command::cargo_bin("bf")
        .expect("failed to locate bf binary");

    cmd.args(["read", "--debug", ">"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicates::str::contains("STEP | PTR")
            .and(predicates::str::contains("Moved pointer to cell 1"))
        );
}

#[test]
fn debug_flag_keeps_program_output_on_stdout() {
    let mut cmd = assert_cmd::Command::cargo_bin("bf")
        .expect("failed to locate bf binary");

    cmd.args(["read", "-d", "+++[-]+."])
        .assert()
        .success()
        .stdout("\u{1}\n")
        .stderr(predicates::str::contains("Cell != 0; run loop body")
            .and(predicates::str::contains("Cell is 0; exit loop"))
            .and(predicates::str::contains("Output byte 1"))
        );
}
