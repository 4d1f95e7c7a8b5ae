//! Platform pipe buffer constants, reported by `pipebuf-constants`.

use log::warn;
#[cfg(any(target_os = "linux", target_os = "android"))]
use nix::libc;
use nix::unistd::{PathconfVar, fpathconf, pipe};

/// Compile-time `PIPE_BUF`, where the platform defines one.
#[must_use]
pub fn pipe_buf() -> Option<usize> {
  #[cfg(any(target_os = "linux", target_os = "android"))]
  {
    Some(libc::PIPE_BUF)
  }
  #[cfg(not(any(target_os = "linux", target_os = "android")))]
  {
    None
  }
}

/// `fpathconf(_PC_PIPE_BUF)` on the write end of a fresh pipe, or `None`
/// if the value could not be queried. `-1` means the platform reports no
/// limit.
#[must_use]
pub fn pc_pipe_buf() -> Option<i64> {
  let (_reader, writer) = match pipe() {
    Ok(fds) => fds,
    Err(err) => {
      warn!("pipe: {err}");
      return None;
    }
  };
  match fpathconf(&writer, PathconfVar::PIPE_BUF) {
    Ok(value) => Some(value.map_or(-1, i64::from)),
    Err(err) => {
      warn!("fpathconf: {err}");
      None
    }
  }
}

/// The report lines, in output order.
#[must_use]
pub fn report() -> Vec<String> {
  let mut lines = vec![match pipe_buf() {
    Some(value) => format!("PIPE_BUF = {value}"),
    None => "PIPE_BUF is not defined".to_string(),
  }];
  if let Some(value) = pc_pipe_buf() {
    lines.push(format!("_PC_PIPE_BUF = {value}"));
  }
  lines
}
