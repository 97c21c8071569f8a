//! Options for a single generator run.
//!
//! A [`RunConfig`] is assembled once by the invoking build step and then only
//! borrowed: nothing in the run mutates it.

use std::path::{Path, PathBuf};

use crate::consts::{DEFAULT_CONFIGURATION_FILE, DEFAULT_OUTPUT_SUBDIR};

/// Scalar options for one generator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
  /// Directory that receives generated files.
  pub output_directory: PathBuf,

  /// Location of the generator configuration document.
  pub configuration_file: Option<PathBuf>,

  /// Report per-task progress, not just start and end.
  pub verbose: bool,

  /// Overwrite existing generated files. XML files are always merged.
  pub overwrite: bool,

  /// SQL script to run before generation. When set, `jdbc_driver` and
  /// `jdbc_url` are required.
  pub sql_script: Option<String>,
  pub jdbc_driver: Option<String>,
  pub jdbc_url: Option<String>,
  pub jdbc_user_id: Option<String>,
  pub jdbc_password: Option<String>,

  /// Comma delimited list of tables to generate.
  pub table_names: Option<String>,

  /// Comma delimited list of contexts to generate.
  pub contexts: Option<String>,

  /// Skip the run entirely.
  pub skip: bool,

  /// Expose compile-scope classpath elements to the generator.
  pub include_compile_dependencies: bool,

  /// Expose classpath elements of every scope to the generator.
  pub include_all_dependencies: bool,
}

impl RunConfig {
  /// Create a config with the conventional locations for a project rooted at
  /// `basedir` whose build output lives in `build_dir`.
  pub fn with_defaults(basedir: &Path, build_dir: &Path) -> Self {
    Self {
      output_directory: build_dir.join(DEFAULT_OUTPUT_SUBDIR),
      configuration_file: Some(basedir.join(DEFAULT_CONFIGURATION_FILE)),
      verbose: false,
      overwrite: false,
      sql_script: None,
      jdbc_driver: None,
      jdbc_url: None,
      jdbc_user_id: None,
      jdbc_password: None,
      table_names: None,
      contexts: None,
      skip: false,
      include_compile_dependencies: false,
      include_all_dependencies: false,
    }
  }

  /// Whether either dependency scope flag asks for a resolved classpath.
  pub fn includes_dependencies(&self) -> bool {
    self.include_compile_dependencies || self.include_all_dependencies
  }
}

impl Default for RunConfig {
  fn default() -> Self {
    Self::with_defaults(Path::new("."), Path::new("target"))
  }
}
