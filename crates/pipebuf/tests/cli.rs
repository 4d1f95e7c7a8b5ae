use std::os::unix::process::CommandExt as _;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*; // cargo_bin()
use nix::sys::resource::{Resource, setrlimit};
use predicates::prelude::*;

#[test]
fn reports_a_confirmed_size() -> Result<()> {
  let mut cmd = Command::cargo_bin("measure-pipebuf")?;
  let report = predicate::str::is_match(r"^pipe buffer size = [1-9][0-9]*\n$")?;

  cmd
    .assert()
    .success()
    .stdout(report)
    .stderr(predicate::str::is_empty());

  Ok(())
}

#[test]
fn fatal_pipe_failure_exits_255() -> Result<()> {
  let mut cmd = Command::cargo_bin("measure-pipebuf")?;
  // Too few descriptors for the coarse batch's pipes.
  // SAFETY: setrlimit is async-signal-safe and touches no parent state.
  unsafe {
    cmd.pre_exec(|| {
      setrlimit(Resource::RLIMIT_NOFILE, 10, 10)?;
      Ok(())
    });
  }

  cmd
    .assert()
    .code(255)
    .stdout(predicate::str::is_empty())
    .stderr(predicate::str::contains("pipe: EMFILE"));

  Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn unwritable_report_exits_255() -> Result<()> {
  let mut cmd = Command::cargo_bin("measure-pipebuf")?;
  cmd.stdout(std::fs::File::create("/dev/full")?);

  cmd
    .assert()
    .code(255)
    .stderr(predicate::str::contains("write report:"));

  Ok(())
}

#[test]
fn help_describes_the_tool() -> Result<()> {
  let mut cmd = Command::cargo_bin("measure-pipebuf")?;
  cmd.arg("--help");

  cmd.assert().success().stdout(
    predicate::str::contains("Usage")
      .and(predicate::str::contains("pipe buffer"))
      .and(predicate::str::contains("-V, --version")),
  );

  Ok(())
}

#[test]
fn rejects_arguments() -> Result<()> {
  let mut cmd = Command::cargo_bin("measure-pipebuf")?;
  cmd.arg("65536");

  cmd.assert().code(2).stdout(predicate::str::is_empty());

  Ok(())
}

#[test]
fn constants_prints_two_lines() -> Result<()> {
  let mut cmd = Command::cargo_bin("pipebuf-constants")?;
  let report = predicate::str::is_match(
    r"^PIPE_BUF (= [0-9]+|is not defined)\n_PC_PIPE_BUF = -?[0-9]+\n$",
  )?;

  cmd.assert().success().stdout(report);

  Ok(())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[test]
fn constants_on_linux() -> Result<()> {
  let mut cmd = Command::cargo_bin("pipebuf-constants")?;

  cmd
    .assert()
    .success()
    .stdout("PIPE_BUF = 4096\n_PC_PIPE_BUF = 4096\n");

  Ok(())
}
