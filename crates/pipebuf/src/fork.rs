//! Probe runner backed by real pipes and forked children.
//!
//! Every candidate gets its own pipe and child. The child sets the write
//! end to non-blocking, writes its candidate size once and exits with its
//! batch index on a full write or `FAILURE_STATUS` otherwise. The parent
//! keeps the read ends open so the written bytes stay in the pipe buffers
//! until they are drained.

use std::fs::File;
use std::os::fd::OwnedFd;

use log::debug;
use nix::errno::Errno;
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::libc;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork, pipe, write};

use crate::config::FAILURE_STATUS;
use crate::probe::{Candidates, Probe, ProbeError, ProbeRunner, ProbeStatus};

#[derive(Debug, Default)]
pub struct ForkRunner;

impl ForkRunner {
  #[must_use]
  pub fn new() -> Self {
    Self
  }
}

impl ProbeRunner for ForkRunner {
  type Pipe = File;

  fn launch(&mut self, candidates: &Candidates) -> Result<Vec<Probe<File>>, ProbeError> {
    // Allocated before forking so children never touch the allocator.
    let payload = vec![0u8; candidates.largest()];

    let mut readers = Vec::with_capacity(candidates.len());
    let mut children = Vec::with_capacity(candidates.len());
    for (index, &size) in candidates.iter().enumerate() {
      match spawn_probe(index, &payload[..size]) {
        Ok((reader, child)) => {
          readers.push(reader);
          children.push(child);
        }
        Err(err) => {
          let _ = reap(&children);
          return Err(err);
        }
      }
    }
    debug!(
      "forked {} probes up to {} bytes",
      children.len(),
      candidates.largest()
    );

    let statuses = reap(&children)?;
    Ok(
      candidates
        .iter()
        .zip(readers)
        .zip(statuses)
        .map(|((&size, reader), status)| Probe {
          size,
          status,
          pipe: File::from(reader),
        })
        .collect(),
    )
  }
}

/// Create a pipe and fork a child writing `payload` into it.
/// Returns the read end and the child's pid.
fn spawn_probe(index: usize, payload: &[u8]) -> Result<(OwnedFd, Pid), ProbeError> {
  let (reader, writer) = pipe().map_err(ProbeError::Pipe)?;

  // SAFETY: the child only calls close, fcntl, write and _exit, all of
  // which are async-signal-safe, so forking a multi-threaded parent is fine.
  match unsafe { fork() }.map_err(ProbeError::Fork)? {
    ForkResult::Child => {
      drop(reader);
      write_and_exit(index, &writer, payload)
    }
    ForkResult::Parent { child } => {
      drop(writer);
      Ok((reader, child))
    }
  }
}

/// Body of a probe child. Never returns.
fn write_and_exit(index: usize, writer: &OwnedFd, payload: &[u8]) -> ! {
  let status = match set_nonblocking(writer) {
    // A blocking write could stall the whole batch.
    Err(_) => FAILURE_STATUS,
    Ok(()) => match write(writer, payload) {
      Ok(written) if written == payload.len() => i32::try_from(index).unwrap_or(FAILURE_STATUS),
      _ => FAILURE_STATUS,
    },
  };
  // SAFETY: `_exit` skips atexit handlers and stdio flushing inherited from
  // the parent, and is async-signal-safe.
  unsafe { libc::_exit(status) }
}

fn set_nonblocking(fd: &OwnedFd) -> nix::Result<()> {
  let flags = OFlag::from_bits_retain(fcntl(fd, FcntlArg::F_GETFL)?);
  fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
  Ok(())
}

/// Wait for every child by pid. Completion order does not matter since each
/// pid is waited for individually; children forked elsewhere are left alone.
fn reap(children: &[Pid]) -> Result<Vec<ProbeStatus>, ProbeError> {
  children
    .iter()
    .enumerate()
    .map(|(index, &pid)| wait_for_exit(pid).map(|exit| classify(index, exit)))
    .collect()
}

/// Exit code of `pid`, or `None` if it was killed by a signal.
fn wait_for_exit(pid: Pid) -> Result<Option<i32>, ProbeError> {
  loop {
    match waitpid(pid, None) {
      Ok(WaitStatus::Exited(_, code)) => return Ok(Some(code)),
      Ok(WaitStatus::Signaled(_, signal, _)) => {
        debug!("probe child {pid} killed by {signal:?}");
        return Ok(None);
      }
      Ok(_) | Err(Errno::EINTR) => {}
      Err(err) => return Err(ProbeError::Wait(err)),
    }
  }
}

/// A probe counts as written only if its child exited with its own index.
fn classify(index: usize, exit: Option<i32>) -> ProbeStatus {
  match exit {
    Some(code) if code != FAILURE_STATUS && usize::try_from(code) == Ok(index) => {
      ProbeStatus::Written
    }
    _ => ProbeStatus::Failed,
  }
}
