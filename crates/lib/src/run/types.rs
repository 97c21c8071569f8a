//! Outcomes, errors and phases of a generator run.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::generate::{GenerateError, GenerationReport};
use crate::project::DependencyResolutionRequired;
use crate::script::ScriptError;

pub use crate::generate::Warnings;

/// Why a run failed.
#[derive(Debug, Error)]
pub enum RunError {
  /// The run options are incomplete or point at missing files.
  #[error("{0}")]
  ConfigurationInvalid(String),

  #[error("failed to parse configuration {}: {} errors", path.display(), errors.len())]
  ParseFailed { path: PathBuf, errors: Vec<String> },

  #[error(transparent)]
  DependencyResolutionFailed(#[from] DependencyResolutionRequired),

  #[error("SQL script execution failed: {0}")]
  ScriptExecutionFailed(#[source] ScriptError),

  /// The engine rejected the configuration.
  #[error("invalid generator configuration: {} errors", errors.len())]
  SemanticConfigurationInvalid { errors: Vec<String> },

  #[error("generation failed: {0}")]
  GenerationIo(#[source] GenerateError),
}

impl RunError {
  /// The discrete messages behind this error.
  ///
  /// Parse and semantic failures carry one message per problem; every other
  /// variant is a single message.
  pub fn messages(&self) -> Vec<String> {
    match self {
      RunError::ParseFailed { errors, .. } | RunError::SemanticConfigurationInvalid { errors } => errors.clone(),
      other => vec![other.to_string()],
    }
  }
}

impl From<ScriptError> for RunError {
  fn from(err: ScriptError) -> Self {
    if err.is_configuration_error() {
      RunError::ConfigurationInvalid(err.to_string())
    } else {
      RunError::ScriptExecutionFailed(err)
    }
  }
}

/// What a run produced when it got as far as generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
  /// Every warning of the run, in the order it was raised.
  pub warnings: Warnings,

  /// Files the engine committed.
  pub report: GenerationReport,

  /// Whether the output directory was registered with the host build.
  pub output_registered: bool,
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// The run was configured to skip; nothing happened.
  Skipped,

  Completed(RunReport),

  /// Generation stopped early. Everything after generation still ran.
  Interrupted(RunReport),
}

impl Outcome {
  pub fn report(&self) -> Option<&RunReport> {
    match self {
      Outcome::Skipped => None,
      Outcome::Completed(report) | Outcome::Interrupted(report) => Some(report),
    }
  }
}

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
  Idle,
  Skipped,
  EnvironmentReady,
  ScriptDone,
  ConfigParsed,
  Generated,
  Integrated,
  Restored,
  Failed,
}

impl fmt::Display for RunPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      RunPhase::Idle => "idle",
      RunPhase::Skipped => "skipped",
      RunPhase::EnvironmentReady => "environment_ready",
      RunPhase::ScriptDone => "script_done",
      RunPhase::ConfigParsed => "config_parsed",
      RunPhase::Generated => "generated",
      RunPhase::Integrated => "integrated",
      RunPhase::Restored => "restored",
      RunPhase::Failed => "failed",
    };
    f.write_str(name)
  }
}
