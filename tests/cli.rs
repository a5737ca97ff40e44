use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const ECHO: &str = r#"slot:custom.echo
   .arguments
      value:int
   .lambda
      return:x:../*/.arguments/*/value
signal:custom.echo
   value:int:42
"#;

#[test]
fn hyperlambda_eval_prints_resulting_tree() {
    let mut cmd = Command::cargo_bin("hyperlambda").expect("binary exists");
    cmd.arg("eval").arg(ECHO);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("signal:int:42"));
}

#[test]
fn hyperlambda_run_executes_file() {
    let dir = tempdir().expect("create temp dir");
    let script = dir.path().join("echo.hl");
    fs::write(&script, ECHO).expect("write script");

    let mut cmd = Command::cargo_bin("hyperlambda").expect("binary exists");
    cmd.arg("run").arg(&script);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("signal:int:42"));
}

#[test]
fn hyperlambda_run_walks_folders_with_fresh_sessions() {
    let dir = tempdir().expect("create temp dir");
    let nested = dir.path().join("nested");
    fs::create_dir_all(&nested).expect("create nested dir");
    fs::write(dir.path().join("a.hl"), ECHO).expect("write a");
    fs::write(nested.join("b.hl"), ".dest\nset:x:../*/.dest\n   .\n      done\n")
        .expect("write b");
    fs::write(dir.path().join("ignored.txt"), "signal:custom.echo\n").expect("write txt");

    let mut cmd = Command::cargo_bin("hyperlambda").expect("binary exists");
    cmd.arg("run").arg(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("signal:int:42"))
        .stdout(predicate::str::contains("b.hl"))
        .stdout(predicate::str::contains("ignored").not());
}

#[test]
fn hyperlambda_reports_unknown_slots() {
    let mut cmd = Command::cargo_bin("hyperlambda").expect("binary exists");
    cmd.arg("eval").arg("signal:custom.missing\n");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("custom.missing"));
}

#[test]
fn hyperlambda_respects_max_depth() {
    let mut cmd = Command::cargo_bin("hyperlambda").expect("binary exists");
    cmd.env("HYPERLAMBDA_MAX_DEPTH", "8")
        .arg("eval")
        .arg("slot:custom.loop\n   .lambda\n      signal:custom.loop\nsignal:custom.loop\n");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("RecursionLimit"));
}

#[test]
fn hyperlambda_lists_native_slots() {
    let mut cmd = Command::cargo_bin("hyperlambda").expect("binary exists");
    cmd.arg("slots");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("for-each"))
        .stdout(predicate::str::contains("signal"));
}

#[test]
fn hyperlambda_reports_unreadable_scripts_as_io_errors() {
    let dir = tempdir().expect("create temp dir");
    let missing = dir.path().join("missing.hl");

    let mut cmd = Command::cargo_bin("hyperlambda").expect("binary exists");
    cmd.arg("run").arg(&missing);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("I/O error: cannot read"))
        .stderr(predicate::str::contains("missing.hl"));
}
