use std::io::Cursor;

use pipebuf::probe::{Candidates, Probe, ProbeError, ProbeRunner, ProbeStatus};

/// In-memory stand-in for the kernel's pipe buffer.
///
/// A probe is written in full when its size fits the capacity of the batch;
/// larger probes fail after a partial write of `capacity` bytes, like a
/// non-blocking write into an empty pipe.
#[derive(Debug, Clone)]
pub struct SimulatedKernel {
  capacities: Vec<usize>,
  batches: Vec<Vec<usize>>,
}

impl SimulatedKernel {
  pub fn new(capacity: usize) -> Self {
    Self::shifting(vec![capacity])
  }

  /// Capacity changes from batch to batch; the last entry sticks.
  pub fn shifting(capacities: Vec<usize>) -> Self {
    assert!(!capacities.is_empty(), "at least one capacity");
    Self {
      capacities,
      batches: Vec::new(),
    }
  }

  /// Candidate sizes of every batch launched so far.
  pub fn batches(&self) -> &[Vec<usize>] {
    &self.batches
  }

  fn capacity(&self, batch: usize) -> usize {
    let last = self.capacities.len() - 1;
    self.capacities[batch.min(last)]
  }
}

impl ProbeRunner for SimulatedKernel {
  type Pipe = Cursor<Vec<u8>>;

  fn launch(&mut self, candidates: &Candidates) -> Result<Vec<Probe<Self::Pipe>>, ProbeError> {
    let capacity = self.capacity(self.batches.len());
    self.batches.push(candidates.sizes().to_vec());
    Ok(
      candidates
        .iter()
        .map(|&size| {
          let (status, written) = if size <= capacity {
            (ProbeStatus::Written, size)
          } else {
            (ProbeStatus::Failed, capacity)
          };
          Probe {
            size,
            status,
            pipe: Cursor::new(vec![0; written]),
          }
        })
        .collect(),
    )
  }
}
