//! Compiled-in probing limits.
//!
//! There is no configuration file and no flag: the limits below are the
//! whole configuration surface. `ProbeLimits` bundles them so the search
//! can be exercised with smaller batches in tests.

use anyhow::{Result, bail};

/// The coarse search probes powers of two up to `2^(MAX_SIZE - 1)`.
pub const MAX_SIZE: u32 = 20;

/// Upper bound on probe children forked per batch.
pub const MAX_PROCESSES: usize = 32;

/// Exit status of a probe child whose write came up short.
/// Also the exit status of the measuring process on fatal errors.
pub const FAILURE_STATUS: i32 = 255;

/// Exit statuses from this value up are not portable as probe indexes.
pub const INDEX_STATUS_LIMIT: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeLimits {
  max_size: u32,
  max_processes: usize,
}

impl ProbeLimits {
  /// Validate a pair of limits.
  ///
  /// Every coarse probe needs its own child, and a child reports success by
  /// exiting with its batch index, so `max_size <= max_processes` and
  /// `max_processes <= 128` must hold.
  ///
  /// # Errors
  /// Returns an error if any of the bounds above is violated.
  pub fn new(max_size: u32, max_processes: usize) -> Result<Self> {
    if max_size == 0 {
      bail!("max_size must be at least 1");
    }
    if max_size >= usize::BITS {
      bail!("max_size {max_size} does not fit into a byte count");
    }
    if max_processes > INDEX_STATUS_LIMIT {
      bail!("max_processes {max_processes} exceeds the exit status limit of {INDEX_STATUS_LIMIT}");
    }
    if (max_size as usize) > max_processes {
      bail!("max_size {max_size} needs more children than max_processes {max_processes}");
    }
    Ok(Self {
      max_size,
      max_processes,
    })
  }

  #[must_use]
  pub fn max_size(&self) -> u32 {
    self.max_size
  }

  #[must_use]
  pub fn max_processes(&self) -> usize {
    self.max_processes
  }

  /// Largest size probed by the coarse search.
  #[must_use]
  pub fn coarse_limit(&self) -> usize {
    1 << (self.max_size - 1)
  }
}

impl Default for ProbeLimits {
  fn default() -> Self {
    Self {
      max_size: MAX_SIZE,
      max_processes: MAX_PROCESSES,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_limits_match_constants() {
    let limits = ProbeLimits::default();
    assert_eq!(limits.max_size(), 20);
    assert_eq!(limits.max_processes(), 32);
    assert_eq!(limits.coarse_limit(), 524_288);
    assert_eq!(ProbeLimits::new(MAX_SIZE, MAX_PROCESSES).unwrap(), limits);
  }

  #[test]
  fn rejects_more_powers_than_children() {
    let err = ProbeLimits::new(10, 8).unwrap_err();
    assert!(err.to_string().contains("max_processes 8"));
  }

  #[test]
  fn rejects_indexes_beyond_portable_exit_statuses() {
    assert!(ProbeLimits::new(20, 129).is_err());
    assert!(ProbeLimits::new(20, 128).is_ok());
  }

  #[test]
  fn rejects_zero_max_size() {
    assert!(ProbeLimits::new(0, 4).is_err());
  }
}
