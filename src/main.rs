use clap::Parser;
use dotenv_cli::edit::{DeleteOutcome, Editor};
use dotenv_cli::output::lookup;
use dotenv_cli::rules::{Action, Options, RuleViolation};
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
  name = "dotenv",
  about = "Read and update environment variables from a .env file",
  version,
  author
)]
struct Cli {
  /// Environment variable keys
  keys: Vec<String>,

  /// Path to the .env file
  #[arg(short, long, env = "DOTENV_FILE", default_value = ".env")]
  file: PathBuf,

  /// Output as JSON
  #[arg(short, long)]
  json: bool,

  /// Update the environment variable in the .env file
  #[arg(short, long, value_name = "VALUE", allow_hyphen_values = true)]
  set: Option<String>,

  /// Delete the environment variable from the .env file
  #[arg(short, long)]
  delete: bool,

  /// Output line breaks as line breaks instead of \n
  #[arg(short, long)]
  multiline: bool,

  /// Always quote the value when setting
  #[arg(short, long)]
  quote: bool,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

/// Reads a value piped on stdin, if any.
///
/// Reads until end of input, so a parent that keeps its end of the pipe open
/// blocks the command.
fn read_pipe() -> std::io::Result<Option<String>> {
  let mut stdin = std::io::stdin();
  if stdin.is_terminal() {
    return Ok(None);
  }

  let mut input = String::new();
  stdin.read_to_string(&mut input)?;
  let input = input.trim();

  Ok((!input.is_empty()).then(|| input.to_string()))
}

fn run(cli: Cli) -> Result<ExitCode, dotenv_cli::Error> {
  if !cli.file.exists() {
    let path = std::path::absolute(&cli.file).unwrap_or(cli.file);
    return Err(RuleViolation::FileNotFound(path).into());
  }

  // Only a lone key can take a piped value.
  let piped = if cli.keys.len() == 1 && cli.set.is_none() && !cli.delete && !cli.json {
    read_pipe()?
  } else {
    None
  };

  let options = Options {
    keys: cli.keys,
    json: cli.json,
    multiline: cli.multiline,
    quote: cli.quote,
    set: cli.set.or(piped),
    delete: cli.delete,
  };

  match options.action()? {
    Action::Get {
      keys,
      json,
      multiline,
    } => {
      let (mut store, cycle) = dotenv_cli::load_partial(&cli.file)?;

      // Keys caught in a cycle are reported and left out; the rest still print.
      let mut unresolved = false;
      if let Some(cycle) = cycle {
        eprintln!("Warning: {cycle}");
        for key in &cycle.keys {
          store.remove(key);
        }
        unresolved = keys.is_empty() || keys.iter().any(|key| cycle.keys.contains(key));
      }

      let found = lookup(&store, &keys, json, multiline)?;

      if let Some(output) = &found.output {
        println!("{output}");
      }

      Ok(if found.is_complete() && !unresolved {
        ExitCode::SUCCESS
      } else {
        ExitCode::FAILURE
      })
    }
    Action::Set { key, value, quote } => {
      let mut store = dotenv_cli::read(&cli.file)?;
      Editor::set(&mut store, &cli.file, &key, &value, quote)?;
      Ok(ExitCode::SUCCESS)
    }
    Action::Delete { key } => {
      let mut store = dotenv_cli::read(&cli.file)?;
      Ok(match Editor::delete(&mut store, &cli.file, &key)? {
        DeleteOutcome::Deleted => ExitCode::SUCCESS,
        DeleteOutcome::NotFound => ExitCode::FAILURE,
      })
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  match run(cli) {
    Ok(code) => code,
    Err(err) => {
      eprintln!("{err}");
      ExitCode::FAILURE
    }
  }
}
