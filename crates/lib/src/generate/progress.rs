//! Progress reporting for generation runs.

use std::path::Path;

use tracing::{debug, info};

/// Receives coarse lifecycle notifications from the engine.
///
/// Purely observational: nothing a reporter does affects control flow.
pub trait ProgressReporter {
  fn started(&mut self, total_tasks: usize);
  fn task(&mut self, description: &str);
  fn file_saved(&mut self, path: &Path);
  fn done(&mut self);
}

/// Reports progress through `tracing`.
///
/// Per-task and per-file notifications are logged at info level only when
/// verbose; otherwise they go to debug.
#[derive(Debug, Default)]
pub struct TracingProgress {
  verbose: bool,
  tasks: usize,
  files: usize,
}

impl TracingProgress {
  pub fn new(verbose: bool) -> Self {
    Self {
      verbose,
      ..Self::default()
    }
  }

  pub fn files_saved(&self) -> usize {
    self.files
  }
}

impl ProgressReporter for TracingProgress {
  fn started(&mut self, total_tasks: usize) {
    debug!(total_tasks, "generation started");
  }

  fn task(&mut self, description: &str) {
    self.tasks += 1;
    if self.verbose {
      info!("{description}");
    } else {
      debug!("{description}");
    }
  }

  fn file_saved(&mut self, path: &Path) {
    self.files += 1;
    if self.verbose {
      info!(path = %path.display(), "saved file");
    } else {
      debug!(path = %path.display(), "saved file");
    }
  }

  fn done(&mut self) {
    info!(tasks = self.tasks, files = self.files, "generation finished");
  }
}
