use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use cpq::error::{InvalidExtensionSnafu, ReadSourceSnafu, WriteOutputSnafu};
use cpq::{CompileResult, StderrChannel, translate_into};
use snafu::{ResultExt, ensure};
use tracing_subscriber::EnvFilter;

/// Translate a CPL program (`.ou`) into quad code (`.qud`).
#[derive(Debug, Parser)]
#[command(name = "cpq", version)]
struct Cli {
  /// Source program; must end with `.ou`.
  input: PathBuf,

  /// Where to write the quad program. Defaults to the input with a `.qud` extension.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Also print the quad program to stdout.
  #[arg(long)]
  stdout: bool,

  /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn init_logging(verbose: u8) {
  let default = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn output_path(input: &Path, output: Option<PathBuf>) -> PathBuf {
  output.unwrap_or_else(|| input.with_extension("qud"))
}

/// Returns `Ok(false)` when the source was translated but produced no program.
fn run(cli: Cli) -> CompileResult<bool> {
  let input = cli.input;
  ensure!(
    input.extension().is_some_and(|ext| ext == "ou"),
    InvalidExtensionSnafu { path: input.clone() }
  );

  let source = fs::read_to_string(&input).context(ReadSourceSnafu { path: input.clone() })?;
  tracing::debug!(path = %input.display(), bytes = source.len(), "read source");

  let mut channel = StderrChannel::default();
  let Some(quad) = translate_into(&source, &mut channel) else {
    eprintln!("Compilation did not produce output. Skipping file creation.");
    return Ok(false);
  };
  if channel.reported() > 0 {
    tracing::warn!(count = channel.reported(), "program produced despite lexical errors");
  }

  let target = output_path(&input, cli.output);
  fs::write(&target, &quad).context(WriteOutputSnafu { path: target.clone() })?;
  tracing::info!(path = %target.display(), "wrote quad program");

  if cli.stdout {
    print!("{quad}");
  }
  Ok(true)
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  match run(cli) {
    Ok(true) => {}
    Ok(false) => process::exit(1),
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_output_swaps_the_extension() {
    assert_eq!(
      output_path(Path::new("dir/prog.ou"), None),
      PathBuf::from("dir/prog.qud")
    );
    assert_eq!(
      output_path(Path::new("prog.ou"), Some(PathBuf::from("out.txt"))),
      PathBuf::from("out.txt")
    );
  }

  #[test]
  fn rejects_inputs_without_the_source_extension() {
    let cli = Cli {
      input: PathBuf::from("program.txt"),
      output: None,
      stdout: false,
      verbose: 0,
    };
    assert!(matches!(
      run(cli),
      Err(cpq::CompileError::InvalidExtension { .. })
    ));
  }
}
