//! Implementation of the `mapgen generate` command.
//!
//! Every run option can come from a flag or from its `MAPGEN_*` environment
//! variable. Options left unset default from the host project model: output
//! under the build directory, configuration under the source resources.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Result, anyhow, bail};
use clap::Args;
use tracing::{debug, info};

use mapgen_lib::config::RunConfig;
use mapgen_lib::consts::APP_NAME;
use mapgen_lib::generate::CommandEngine;
use mapgen_lib::parse::XmlConfigurationParser;
use mapgen_lib::run::{Coordinator, Outcome, RunError, RunReport};

use crate::output::{Mark, OutputFormat, format_elapsed, print_field, print_json, print_mark, yes_no};

use super::load_project;

#[derive(Debug, Args)]
pub struct GenerateArgs {
  /// Host project model, updated with the registered output after a run
  #[arg(long, env = "MAPGEN_PROJECT", default_value = "mapgen-project.json")]
  pub project: PathBuf,

  /// Directory that receives generated files
  #[arg(long, env = "MAPGEN_OUTPUT_DIRECTORY")]
  pub output_directory: Option<PathBuf>,

  /// Generator configuration document
  #[arg(long, env = "MAPGEN_CONFIGURATION_FILE")]
  pub configuration_file: Option<PathBuf>,

  /// Overwrite existing generated files (XML files are always merged)
  #[arg(long, env = "MAPGEN_OVERWRITE")]
  pub overwrite: bool,

  /// SQL script to run before generation (path or classpath:name)
  #[arg(long, env = "MAPGEN_SQL_SCRIPT")]
  pub sql_script: Option<String>,

  /// Database driver for the SQL script
  #[arg(long, env = "MAPGEN_JDBC_DRIVER")]
  pub jdbc_driver: Option<String>,

  /// Database URL for the SQL script
  #[arg(long, env = "MAPGEN_JDBC_URL")]
  pub jdbc_url: Option<String>,

  #[arg(long, env = "MAPGEN_JDBC_USER_ID")]
  pub jdbc_user_id: Option<String>,

  #[arg(long, env = "MAPGEN_JDBC_PASSWORD", hide_env_values = true)]
  pub jdbc_password: Option<String>,

  /// Comma delimited tables to generate
  #[arg(long, env = "MAPGEN_TABLE_NAMES")]
  pub table_names: Option<String>,

  /// Comma delimited contexts to generate
  #[arg(long, env = "MAPGEN_CONTEXTS")]
  pub contexts: Option<String>,

  /// Skip the run
  #[arg(long, env = "MAPGEN_SKIP")]
  pub skip: bool,

  /// Expose compile-scope dependencies to the generator
  #[arg(long, env = "MAPGEN_INCLUDE_COMPILE_DEPENDENCIES")]
  pub include_compile_dependencies: bool,

  /// Expose dependencies of every scope to the generator
  #[arg(long, env = "MAPGEN_INCLUDE_ALL_DEPENDENCIES")]
  pub include_all_dependencies: bool,

  /// Generator program to run
  #[arg(long, env = "MAPGEN_ENGINE")]
  pub engine: Option<PathBuf>,

  /// Argument passed to the generator program (repeatable)
  #[arg(long = "engine-arg", allow_hyphen_values = true)]
  pub engine_args: Vec<String>,
}

impl GenerateArgs {
  /// Build the run options, defaulting unset locations from the project.
  /// Relative locations are taken from the project base directory.
  fn run_config(&self, basedir: &Path, build_dir: &Path, verbose: bool) -> RunConfig {
    let defaults = RunConfig::with_defaults(basedir, build_dir);
    RunConfig {
      output_directory: self
        .output_directory
        .as_deref()
        .map_or(defaults.output_directory, |dir| basedir.join(dir)),
      configuration_file: self
        .configuration_file
        .as_deref()
        .map(|file| basedir.join(file))
        .or(defaults.configuration_file),
      verbose,
      overwrite: self.overwrite,
      sql_script: self.sql_script.clone(),
      jdbc_driver: self.jdbc_driver.clone(),
      jdbc_url: self.jdbc_url.clone(),
      jdbc_user_id: self.jdbc_user_id.clone(),
      jdbc_password: self.jdbc_password.clone(),
      table_names: self.table_names.clone(),
      contexts: self.contexts.clone(),
      skip: self.skip,
      include_compile_dependencies: self.include_compile_dependencies,
      include_all_dependencies: self.include_all_dependencies,
    }
  }
}

/// Translate a failed run into the one-line error the CLI reports.
///
/// Parse and semantic errors were already reported one by one.
fn run_failure(err: RunError) -> anyhow::Error {
  match &err {
    RunError::ParseFailed { .. } | RunError::SemanticConfigurationInvalid { .. } => anyhow!("{err}"),
    _ => anyhow::Error::new(err).context("Generator run failed"),
  }
}

fn print_report(report: &RunReport, output: &Path) {
  print_field("Output", output.display());
  print_field("Written", report.report.written.len());
  print_field("Merged", report.report.merged.len());
  print_field("Skipped", report.report.skipped.len());
  print_field("Warnings", report.warnings.len());
  print_field("Output registered", yes_no(report.output_registered));
}

/// Execute the generate command.
///
/// Runs the generator once, prints a summary and, when the project model was
/// loaded from disk, saves it back so later build steps see the registered
/// output.
pub fn cmd_generate(args: &GenerateArgs, verbose: bool, format: OutputFormat) -> Result<()> {
  let started = Instant::now();
  let (mut model, from_disk) = load_project(&args.project)?;
  let config = args.run_config(&model.basedir, &model.build.directory, verbose);

  let engine = match (&args.engine, config.skip) {
    (Some(program), _) => CommandEngine::new(program).with_args(args.engine_args.iter().cloned()),
    // Never invoked when skipping.
    (None, true) => CommandEngine::new(APP_NAME),
    (None, false) => bail!("No generator program configured (use --engine or MAPGEN_ENGINE)"),
  };
  let parser = XmlConfigurationParser::new();

  let outcome = Coordinator::new(&mut model, &parser, &engine)
    .run(&config)
    .map_err(run_failure)?;

  if from_disk && !matches!(outcome, Outcome::Skipped) {
    model.save(&args.project)?;
  } else {
    debug!(project = %args.project.display(), "project model not saved");
  }

  let elapsed = format_elapsed(started.elapsed());
  info!(elapsed = %elapsed, "generate command finished");

  if format.is_json() {
    let report = outcome.report();
    return print_json(&serde_json::json!({
      "outcome": match &outcome {
        Outcome::Skipped => "skipped",
        Outcome::Completed(_) => "completed",
        Outcome::Interrupted(_) => "interrupted",
      },
      "output_directory": config.output_directory,
      "written": report.map(|r| &r.report.written),
      "merged": report.map(|r| &r.report.merged),
      "skipped": report.map(|r| &r.report.skipped),
      "warnings": report.map(|r| &r.warnings),
      "output_registered": report.is_some_and(|r| r.output_registered),
    }));
  }

  match &outcome {
    Outcome::Skipped => print_mark(Mark::Note, "Generator skipped"),
    Outcome::Completed(report) => {
      print_mark(Mark::Done, &format!(
        "Generated {} file(s) in {}",
        report.report.files_saved(),
        elapsed
      ));
      print_report(report, &config.output_directory);
    }
    Outcome::Interrupted(report) => {
      print_mark(Mark::Attention, "Generation was interrupted");
      print_report(report, &config.output_directory);
    }
  }

  Ok(())
}
