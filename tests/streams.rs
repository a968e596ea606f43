use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;

fn cargo_bin() -> Command { Command::cargo_bin("rlbf").unwrap() }

fn infinite_bf() -> &'static str { "+[]" }

#[test]
fn test_stdout_only_for_program_output() {
    cargo_bin()
        .timeout(Duration::from_secs(2))
        .arg("run").arg("+++.")
        .assert()
        .success()
        .stdout("\u{3}\n")
        .stderr(predicate::str::contains("Execution aborted").not());
}

#[test]
fn test_stderr_only_for_abort_messages() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .env("RLBF_TIMEOUT_MS", "100")
        .arg("run").arg(infinite_bf())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Execution aborted: wall-clock timeout exceeded (100 ms)"))
        .stdout(predicate::str::contains("Execution aborted").not());
}

#[test]
fn test_step_limit_aborts() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--max-steps", "1000", infinite_bf()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Execution aborted: step limit exceeded (1000)"));
}

#[test]
fn reads_from_stdin_and_echoes_bytes() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .arg("run").arg(",[.,]")
        .write_stdin("Zap")
        .assert()
        .success()
        .stdout("Zap\n");
}

#[cfg(unix)]
#[test]
fn ctrl_c_cancels_a_blocked_read() {
    use std::io::Read;
    use std::process::{Command as Process, Stdio};
    use std::thread;
    use std::time::Instant;

    // stdin stays open and idle, so ',' blocks until the signal arrives.
    let mut child = Process::new(assert_cmd::cargo::cargo_bin("rlbf"))
        .args(["run", "--timeout", "0", ","])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn rlbf");
    thread::sleep(Duration::from_millis(500));

    let killed = Process::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("run kill");
    assert!(killed.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = child.try_wait().expect("poll rlbf") {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("rlbf still running after SIGINT");
        }
        thread::sleep(Duration::from_millis(20));
    };

    let mut stderr = String::new();
    child.stderr.take().unwrap().read_to_string(&mut stderr).unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(stderr.contains("Execution aborted: cancelled"), "stderr: {stderr}");
}
