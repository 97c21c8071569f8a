mod classpath;
mod generate;

pub use classpath::{ClasspathArgs, cmd_classpath};
pub use generate::{GenerateArgs, cmd_generate};

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use mapgen_lib::project::ProjectModel;

/// Load the host project model.
///
/// When the file does not exist the current directory is described with the
/// conventional layout and no resolved dependencies. The flag tells whether
/// the model came from disk.
fn load_project(path: &Path) -> Result<(ProjectModel, bool)> {
  if path.is_file() {
    let path = dunce::canonicalize(path).with_context(|| format!("Failed to resolve {}", path.display()))?;
    let model = ProjectModel::load(&path)?;
    return Ok((model, true));
  }

  let cwd = std::env::current_dir().context("Failed to determine current directory")?;
  let basedir = dunce::canonicalize(&cwd).unwrap_or(cwd);
  debug!(path = %path.display(), basedir = %basedir.display(), "no project file, using conventional layout");
  Ok((ProjectModel::new(basedir), false))
}
