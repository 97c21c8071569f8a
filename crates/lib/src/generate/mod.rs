//! The generator engine seam.
//!
//! Code generation itself happens behind the [`Engine`] trait. The run
//! assembles a [`GenerationJob`] (structured configuration, write policy,
//! environment) and invokes the engine with a progress reporter, the context
//! and table filters, and the run's shared warning list.
//!
//! # Submodules
//!
//! - [`model`] - Structured configuration handed to engines
//! - [`write_policy`] - Overwrite, skip and merge decisions per file
//! - [`progress`] - Progress notifications
//! - [`command`] - Engine adapter that runs an external generator program

pub mod command;
pub mod model;
pub mod progress;
pub mod write_policy;

pub use command::CommandEngine;
pub use model::{ContextConfig, GeneratorConfig, GeneratorTarget, JdbcConnection, TableConfig, TargetKind};
pub use progress::{ProgressReporter, TracingProgress};
pub use write_policy::{DefaultWritePolicy, MergeError, WriteDecision, WritePolicy, merge_xml};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::environment::RunEnvironment;
use crate::filter::Filter;

/// Human readable warnings accumulated across a run, in order.
pub type Warnings = Vec<String>;

/// Everything an engine needs besides filters and callbacks.
pub struct GenerationJob<'a> {
  pub config: &'a GeneratorConfig,
  pub configuration_file: &'a Path,
  pub output_directory: &'a Path,
  pub write_policy: &'a dyn WritePolicy,
  pub environment: &'a RunEnvironment,
  pub verbose: bool,
}

/// Files an engine committed to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
  pub written: Vec<PathBuf>,
  pub merged: Vec<PathBuf>,
  pub skipped: Vec<PathBuf>,
}

impl GenerationReport {
  /// Files that were written or merged.
  pub fn files_saved(&self) -> usize {
    self.written.len() + self.merged.len()
  }
}

/// Ways generation can end other than success.
#[derive(Debug, Error)]
pub enum GenerateError {
  /// The configuration is well formed but semantically invalid.
  #[error("invalid generator configuration ({} errors)", .0.len())]
  InvalidConfiguration(Vec<String>),

  #[error("database error: {0}")]
  Database(String),

  #[error("i/o error: {0}")]
  Io(#[from] io::Error),

  /// Generation stopped early at the request of a collaborator.
  #[error("generation interrupted")]
  Interrupted,
}

/// A code generator.
pub trait Engine {
  /// Generate files for the selected contexts and tables.
  ///
  /// Warnings are appended to `warnings`, which already holds the warnings of
  /// configuration parsing.
  fn generate(
    &self,
    job: &GenerationJob<'_>,
    progress: &mut dyn ProgressReporter,
    contexts: &Filter,
    tables: &Filter,
    warnings: &mut Warnings,
  ) -> Result<GenerationReport, GenerateError>;
}
