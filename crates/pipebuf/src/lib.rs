use anyhow::{Context, Result};
use clap::Parser;

pub mod config;
pub mod constants;
pub mod fork;
pub mod probe;
pub mod search;

use crate::config::ProbeLimits;
use crate::fork::ForkRunner;
use crate::search::Measurement;

/// Measure the pipe buffer size by probing it with non-blocking writes
/// from forked child processes.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {}

pub fn parse() -> Cli {
  Cli::parse()
}

pub fn run() -> Result<Measurement> {
  let _cli = parse();
  let limits = ProbeLimits::default();
  let mut runner = ForkRunner::new();
  search::measure(&mut runner, &limits).context("failed to measure the pipe buffer")
}
