use crate::config::ProbeLimits;

use super::ProbeError;

/// The byte counts probed by one batch.
///
/// Always non-empty, strictly ascending, free of zero sizes and no longer
/// than the batch limit. Confirmation stops at the first failed probe, which
/// only finds the boundary when sizes grow along the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates(Vec<usize>);

impl Candidates {
  /// # Errors
  /// Returns `ProbeError::InvalidBatch` if `sizes` breaks an invariant.
  pub fn new(sizes: Vec<usize>, limits: &ProbeLimits) -> Result<Self, ProbeError> {
    if sizes.is_empty() {
      return Err(ProbeError::InvalidBatch("no candidates".to_string()));
    }
    if sizes.len() > limits.max_processes() {
      return Err(ProbeError::InvalidBatch(format!(
        "{} candidates exceed the batch limit of {}",
        sizes.len(),
        limits.max_processes()
      )));
    }
    if sizes[0] == 0 {
      return Err(ProbeError::InvalidBatch(
        "candidate sizes must be positive".to_string(),
      ));
    }
    if !sizes.windows(2).all(|pair| pair[0] < pair[1]) {
      return Err(ProbeError::InvalidBatch(
        "candidate sizes must be strictly ascending".to_string(),
      ));
    }
    Ok(Self(sizes))
  }

  /// `1, 2, 4, ..., 2^(max_size - 1)`.
  #[must_use]
  pub fn powers_of_two(limits: &ProbeLimits) -> Self {
    Self((0..limits.max_size()).map(|exp| 1usize << exp).collect())
  }

  /// `base + increment * i` for `i` in `0..tests`.
  ///
  /// # Errors
  /// Returns `ProbeError::InvalidBatch` if the offsets overflow or the
  /// resulting list breaks an invariant.
  pub fn evenly_spaced(
    base: usize,
    increment: usize,
    tests: usize,
    limits: &ProbeLimits,
  ) -> Result<Self, ProbeError> {
    let sizes = (0..tests)
      .map(|i| {
        increment
          .checked_mul(i)
          .and_then(|offset| base.checked_add(offset))
      })
      .collect::<Option<Vec<_>>>()
      .ok_or_else(|| {
        ProbeError::InvalidBatch(format!(
          "{tests} offsets of {increment} from {base} overflow"
        ))
      })?;
    Self::new(sizes, limits)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  #[must_use]
  pub fn largest(&self) -> usize {
    self.0.last().copied().unwrap_or_default()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, usize> {
    self.0.iter()
  }

  #[must_use]
  pub fn sizes(&self) -> &[usize] {
    &self.0
  }
}

impl<'a> IntoIterator for &'a Candidates {
  type Item = &'a usize;
  type IntoIter = std::slice::Iter<'a, usize>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}
