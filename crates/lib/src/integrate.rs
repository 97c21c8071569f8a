//! Registration of generated output with the host build.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::consts::XML_RESOURCE_PATTERN;
use crate::project::{HostBuild, Resource};

fn absolute(path: &Path) -> PathBuf {
  dunce::canonicalize(path)
    .or_else(|_| std::path::absolute(path))
    .unwrap_or_else(|_| path.to_path_buf())
}

/// Register `output_directory` as a compile source root and as a resource
/// root for XML files.
///
/// Returns whether the directory existed and was registered. Registering the
/// same directory twice leaves the host unchanged.
pub fn register_output(output_directory: &Path, host: &mut dyn HostBuild) -> bool {
  if !output_directory.is_dir() {
    debug!(path = %output_directory.display(), "output directory absent, nothing to register");
    return false;
  }

  let root = absolute(output_directory);
  host.add_compile_source_root(root.clone());
  host.add_resource(Resource::new(&root).with_include(XML_RESOURCE_PATTERN));

  info!(path = %root.display(), "registered generated sources with host build");
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::project::ProjectModel;
  use tempfile::TempDir;

  #[test]
  fn absent_directory_is_not_registered() {
    let temp = TempDir::new().unwrap();
    let mut model = ProjectModel::new(temp.path());

    assert!(!register_output(&temp.path().join("generated"), &mut model));
    assert!(model.compile_source_roots.is_empty());
    assert!(model.resources.is_empty());
  }

  #[test]
  fn existing_directory_is_registered_once() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("target/generated-sources/mapgen");
    std::fs::create_dir_all(&out).unwrap();
    let mut model = ProjectModel::new(temp.path());

    assert!(register_output(&out, &mut model));
    assert!(register_output(&out, &mut model));

    let root = dunce::canonicalize(&out).unwrap();
    assert_eq!(model.compile_source_roots, vec![root.clone()]);
    assert_eq!(model.resources, vec![Resource::new(&root).with_include("**/*.xml")]);
  }
}
