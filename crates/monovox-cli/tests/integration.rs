//! End-to-end tests for the monovox binary. None of these open an audio device.

use std::io::Write;
use std::process::{Command, Stdio};

fn monovox() -> Command {
    Command::new(env!("CARGO_BIN_EXE_monovox"))
}

fn keys_dry_run(extra: &[&str], script: &str) -> std::process::Output {
    let mut child = monovox()
        .arg("keys")
        .arg("--dry-run")
        .args(extra)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn monovox");
    // The child may exit before reading everything (bad config), so a
    // broken pipe here is not a failure.
    let _ = child.stdin.take().expect("stdin").write_all(script.as_bytes());
    child.wait_with_output().expect("wait for monovox")
}

#[test]
fn help_lists_subcommands() {
    let output = monovox().arg("--help").output().expect("run monovox");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["devices", "play", "keys"] {
        assert!(stdout.contains(name), "missing {name} in:\n{stdout}");
    }
}

#[test]
fn play_rejects_bad_note_list() {
    let output = monovox()
        .args(["play", "--notes", "24,x"])
        .output()
        .expect("run monovox");
    assert!(!output.status.success());
}

#[test]
fn dry_run_session_reports_status() {
    let output = keys_dry_run(&[], "cutoff 900\non 24\nstatus\noff 24\nstatus\nquit\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout:\n{stdout}");
    assert!(lines[0].contains("note=24"));
    assert!(lines[0].contains("cutoff=900Hz"));
    assert!(lines[1].contains("Releasing"));
}

#[test]
fn dry_run_session_survives_bad_input() {
    let output = keys_dry_run(&[], "wobble 3\ncutoff\non 12\nstatus\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("unknown command 'wobble'"));
    assert!(stdout.contains("note=12"));
}

#[test]
fn dry_run_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "contour_scale = 25.0\n").unwrap();

    let config = path.to_str().unwrap();
    let output = keys_dry_run(&["--config", config], "on 24\nquit\n");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn dry_run_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "release_floor = -1.0\n").unwrap();

    let config = path.to_str().unwrap();
    let output = keys_dry_run(&["--config", config], "quit\n");
    assert!(!output.status.success());
}
