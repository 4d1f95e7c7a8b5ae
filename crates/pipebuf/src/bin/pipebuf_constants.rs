use clap::Parser;

/// Print the platform's pipe buffer constants for comparison with
/// `measure-pipebuf`.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {}

fn main() {
  let env = env_logger::Env::default().default_filter_or("warn");
  env_logger::Builder::from_env(env).init();
  Cli::parse();

  for line in pipebuf::constants::report() {
    println!("{line}");
  }
}
