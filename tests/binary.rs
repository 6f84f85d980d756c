use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use digenv::types::ABNORMAL_EXIT_CODE;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

fn digenv() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_digenv"));
    cmd.env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .stdin(Stdio::null());
    cmd
}

/// Write an executable shell script into `dir`.
fn script(dir: &TempDir, name: &str, body: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

#[test]
fn dry_run_lists_four_stages_with_patterns() -> TestResult {
    let output = digenv()
        .env("PAGER", "cat")
        .args(["--dry-run", "HOME"])
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("stages (4):"));
    assert!(stdout.contains("0: printenv"));
    assert!(stdout.contains("1: grep HOME"));
    assert!(stdout.contains("2: sort"));
    assert!(stdout.contains("3: cat (fallback: more)"));

    Ok(())
}

#[test]
fn prints_sorted_environment_through_the_pager() -> TestResult {
    let output = digenv()
        .env("DIGENV_ZZZ", "last")
        .env("DIGENV_AAA", "first")
        .args(["--pager", "cat"])
        .output()?;

    assert!(output.status.success(), "status: {:?}", output.status);
    let stdout = String::from_utf8(output.stdout)?;
    let aaa = stdout.find("DIGENV_AAA=first").ok_or("missing DIGENV_AAA")?;
    let zzz = stdout.find("DIGENV_ZZZ=last").ok_or("missing DIGENV_ZZZ")?;
    assert!(aaa < zzz);

    Ok(())
}

#[test]
fn filter_arguments_reach_grep() -> TestResult {
    let output = digenv()
        .env("DIGENV_KEEP", "1")
        .env("DIGENV_DROP", "1")
        .args(["--pager", "cat", "KEEP"])
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "DIGENV_KEEP=1\n");

    Ok(())
}

#[test]
fn grep_without_matches_is_still_a_clean_run() -> TestResult {
    let output = digenv()
        .args(["--pager", "cat", "NO_SUCH_VARIABLE_ANYWHERE"])
        .output()?;

    // grep exits 1, which is a normal exit and not a pipeline failure.
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());

    Ok(())
}

#[test]
fn empty_pager_flag_reports_an_error() -> TestResult {
    let output = digenv().args(["--pager", ""]).output()?;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("digenv error"));

    Ok(())
}

#[test]
fn pager_killed_by_a_signal_exits_with_the_abnormal_status() -> TestResult {
    let dir = TempDir::new()?;
    let pager = script(&dir, "dying-pager", "kill -KILL $$")?;

    let output = digenv().arg("--pager").arg(&pager).output()?;

    assert_eq!(output.status.code(), Some(ABNORMAL_EXIT_CODE));
    assert!(output.stdout.is_empty());

    Ok(())
}

#[test]
fn interrupt_during_the_run_does_not_kill_the_orchestrator() -> TestResult {
    let dir = TempDir::new()?;
    // Interrupt digenv itself, then drain the input like a pager would.
    let pager = script(&dir, "interrupting-pager", "kill -INT $PPID\ncat >/dev/null")?;

    let output = digenv().arg("--pager").arg(&pager).output()?;

    assert_eq!(output.status.code(), Some(0), "status: {:?}", output.status);

    Ok(())
}
