use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn cargo_bin() -> Command { Command::cargo_bin("rlbf").unwrap() }

#[test]
fn compresses_positional_code() {
    cargo_bin()
        .args(["compress", "++++[-]"])
        .assert()
        .success()
        .stdout("4+[-]\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn compresses_stdin_and_drops_comments() {
    cargo_bin()
        .arg("compress")
        .write_stdin("add two: ++\nthen move 3 right: >>>\n[[]]")
        .assert()
        .success()
        .stdout("2+3>[[]]\n");
}

#[test]
fn compresses_file() {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, ",,,, ....").unwrap();
    cargo_bin()
        .arg("compress").arg("--file").arg(tf.path())
        .assert()
        .success()
        .stdout("4,4.\n");
}

#[test]
fn expands_compressed_stream() {
    cargo_bin()
        .args(["compress", "--expand", "3+[2-]"])
        .assert()
        .success()
        .stdout("+++[--]\n");
}

#[test]
fn expand_rejects_truncated_literal() {
    cargo_bin()
        .args(["compress", "--expand", "+12"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Parse error: repeat count at offset 1 is not followed by an instruction"));
}
