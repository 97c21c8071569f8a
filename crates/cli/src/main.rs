mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{ClasspathArgs, GenerateArgs};
use crate::output::{Mark, OutputFormat, print_mark};

/// mapgen - run a MyBatis-style code generator as a build step
#[derive(Parser)]
#[command(name = "mapgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Report per-task progress and debug logging
  #[arg(short, long, global = true, env = "MAPGEN_VERBOSE")]
  verbose: bool,

  /// Output format for the command summary
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the generator once for the host project
  Generate(GenerateArgs),

  /// Show the lookup roots a run would expose to the generator
  Classpath(ClasspathArgs),
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Generate(args) => cmd::cmd_generate(&args, cli.verbose, cli.format),
    Commands::Classpath(args) => cmd::cmd_classpath(&args, cli.format),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_mark(Mark::Failed, &format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
