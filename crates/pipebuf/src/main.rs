use std::io::{self, Write as _};

use owo_colors::OwoColorize as _;
use pipebuf::config::FAILURE_STATUS;
use pipebuf::search::Measurement;

fn main() {
  let env = env_logger::Env::default().default_filter_or("warn");
  env_logger::Builder::from_env(env).init();

  let code = match pipebuf::run() {
    Ok(measurement) => match report(&measurement) {
      Ok(()) => measurement.exit_code(),
      Err(err) => fail(&format!("write report: {err}")),
    },
    Err(err) => fail(&format!("{err:#}")),
  };
  std::process::exit(code);
}

fn report(measurement: &Measurement) -> io::Result<()> {
  let mut stdout = io::stdout().lock();
  writeln!(stdout, "{measurement}")?;
  stdout.flush()
}

fn fail(message: &str) -> i32 {
  anstream::eprintln!("{}", message.red());
  FAILURE_STATUS
}
