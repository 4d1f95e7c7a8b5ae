use std::io::{ErrorKind, Read};

use log::debug;
use nix::errno::Errno;
use thiserror::Error;

mod candidates;

pub use candidates::Candidates;

/// Fatal failures while running a batch of probes.
#[derive(Debug, Error)]
pub enum ProbeError {
  #[error("pipe: {0}")]
  Pipe(Errno),
  #[error("fork: {0}")]
  Fork(Errno),
  #[error("wait: {0}")]
  Wait(Errno),
  #[error("read from pipe: {0}")]
  Read(std::io::Error),
  #[error("invalid probe batch: {0}")]
  InvalidBatch(String),
}

/// Outcome of a single probe child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
  /// The child wrote all of its bytes without blocking.
  Written,
  /// Partial write, foreign exit status, or no regular exit at all.
  Failed,
}

/// One launched probe together with the read end of its pipe.
#[derive(Debug)]
pub struct Probe<P> {
  pub size: usize,
  pub status: ProbeStatus,
  pub pipe: P,
}

/// Launches one probe per candidate and reports how each one ended.
///
/// Implementations must return the probes in candidate order and must only
/// return once every probe has finished writing.
pub trait ProbeRunner {
  type Pipe: Read;

  /// # Errors
  /// Any error is fatal for the whole measurement.
  fn launch(&mut self, candidates: &Candidates) -> Result<Vec<Probe<Self::Pipe>>, ProbeError>;
}

/// Run a batch and return the confirmed length of the leading run of
/// written probes, or zero if the first probe already failed.
///
/// Probes after the first failure are never drained; their pipes are
/// closed when they go out of scope.
///
/// # Errors
/// Propagates launch failures and read errors while draining.
pub fn run_batch<R>(runner: &mut R, candidates: &Candidates) -> Result<usize, ProbeError>
where
  R: ProbeRunner + ?Sized,
{
  let probes = runner.launch(candidates)?;
  if probes.len() != candidates.len() {
    return Err(ProbeError::InvalidBatch(format!(
      "runner returned {} probes for {} candidates",
      probes.len(),
      candidates.len()
    )));
  }

  let mut confirmed_len = 0;
  for (index, (probe, &size)) in probes.into_iter().zip(candidates.iter()).enumerate() {
    if probe.size != size {
      return Err(ProbeError::InvalidBatch(format!(
        "probe {index} wrote {} bytes, expected {size}",
        probe.size
      )));
    }
    if probe.status == ProbeStatus::Failed {
      debug!("probe {index} ({size} bytes) failed; stopping confirmation");
      break;
    }
    let mut pipe = probe.pipe;
    confirmed_len = suck_pipe(&mut pipe, size)?;
  }
  Ok(confirmed_len)
}

/// Drain up to `expected` bytes and return how many were actually read.
///
/// Stops early once the writing end is closed.
///
/// # Errors
/// Returns `ProbeError::Read` on any read error other than `EINTR`.
pub fn suck_pipe<R>(pipe: &mut R, expected: usize) -> Result<usize, ProbeError>
where
  R: Read + ?Sized,
{
  let mut buf = vec![0u8; expected];
  let mut bytes_read = 0;
  while bytes_read < expected {
    match pipe.read(&mut buf[bytes_read..]) {
      Ok(0) => break,
      Ok(nbytes) => bytes_read += nbytes,
      Err(err) if err.kind() == ErrorKind::Interrupted => {}
      Err(err) => return Err(ProbeError::Read(err)),
    }
  }
  Ok(bytes_read)
}
