use std::fmt;

use log::{debug, warn};

use crate::config::ProbeLimits;
use crate::probe::{Candidates, ProbeError, ProbeRunner, run_batch};

/// Result of a full measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
  /// Every refinement round confirmed its base.
  Confirmed(usize),
  /// Not even the smallest coarse probe was written.
  Beyond { limit: usize },
  /// A refinement round could not confirm the best estimate so far.
  Unconfirmed(usize),
}

impl Measurement {
  #[must_use]
  pub fn exit_code(&self) -> i32 {
    match self {
      Measurement::Confirmed(_) => 0,
      Measurement::Beyond { .. } | Measurement::Unconfirmed(_) => 1,
    }
  }
}

impl fmt::Display for Measurement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Measurement::Confirmed(len) => write!(f, "pipe buffer size = {len}"),
      Measurement::Beyond { limit } => write!(f, "pipe buffer size is beyond {limit}"),
      Measurement::Unconfirmed(len) => write!(
        f,
        "pipe buffer len is possibly {len} but that was not confirmed"
      ),
    }
  }
}

/// Probe all powers of two in a single batch.
///
/// # Errors
/// Propagates fatal probe errors.
pub fn coarse_search<R>(runner: &mut R, limits: &ProbeLimits) -> Result<usize, ProbeError>
where
  R: ProbeRunner + ?Sized,
{
  let len = run_batch(runner, &Candidates::powers_of_two(limits))?;
  debug!("coarse search confirmed {len} bytes");
  Ok(len)
}

/// Shape of one refinement batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Round {
  pub increment: usize,
  pub tests: usize,
}

/// Refinement rounds for a coarse base.
///
/// The increment starts at `base / max_processes` and is divided by
/// `max_processes` while it stays above it. Once it is small enough, a final
/// round scans `increment` consecutive sizes one byte apart. Bases below
/// `max_processes` go straight to that byte-exact scan.
#[derive(Debug, Clone)]
pub struct Schedule {
  next: Option<Round>,
  max_processes: usize,
}

impl Schedule {
  #[must_use]
  pub fn new(base: usize, limits: &ProbeLimits) -> Self {
    let max_processes = limits.max_processes();
    let next = if base >= max_processes {
      Some(Round {
        increment: base / max_processes,
        tests: max_processes,
      })
    } else if base > 0 {
      Some(Round {
        increment: 1,
        tests: base,
      })
    } else {
      None
    };
    Self {
      next,
      max_processes,
    }
  }
}

impl Iterator for Schedule {
  type Item = Round;

  fn next(&mut self) -> Option<Round> {
    let round = self.next?;
    self.next = if round.increment > self.max_processes {
      Some(Round {
        increment: round.increment / self.max_processes,
        tests: self.max_processes,
      })
    } else if round.increment > 1 {
      Some(Round {
        increment: 1,
        tests: round.increment,
      })
    } else {
      None
    };
    Some(round)
  }
}

/// Narrow a confirmed coarse length down to the exact capacity.
///
/// # Errors
/// Propagates fatal probe errors.
pub fn refine<R>(
  runner: &mut R,
  base: usize,
  limits: &ProbeLimits,
) -> Result<Measurement, ProbeError>
where
  R: ProbeRunner + ?Sized,
{
  let mut buflen = base;
  for (number, round) in Schedule::new(base, limits).enumerate() {
    let candidates = Candidates::evenly_spaced(buflen, round.increment, round.tests, limits)?;
    let len = run_batch(runner, &candidates)?;
    debug!(
      "round {}: base={buflen} increment={} tests={} confirmed={len}",
      number + 1,
      round.increment,
      round.tests
    );
    if len == 0 {
      warn!("round {} could not confirm {buflen} bytes", number + 1);
      return Ok(Measurement::Unconfirmed(buflen));
    }
    buflen = len;
  }
  Ok(Measurement::Confirmed(buflen))
}

/// Coarse search followed by refinement.
///
/// # Errors
/// Propagates fatal probe errors.
pub fn measure<R>(runner: &mut R, limits: &ProbeLimits) -> Result<Measurement, ProbeError>
where
  R: ProbeRunner + ?Sized,
{
  let buflen = coarse_search(runner, limits)?;
  if buflen == 0 {
    warn!("even a single byte could not be written without blocking");
    return Ok(Measurement::Beyond {
      limit: limits.coarse_limit(),
    });
  }
  refine(runner, buflen, limits)
}
