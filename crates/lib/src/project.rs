//! Host build model.
//!
//! The run reads classpath elements and layout information from the host build
//! and, once generation succeeds, registers the output directory with it. The
//! [`HostBuild`] trait is that seam; [`ProjectModel`] is the JSON-backed
//! implementation the CLI loads from and saves back to disk so that later
//! build phases see the registered roots.
//!
//! # Example Project File
//!
//! ```json
//! {
//!   "basedir": "/work/app",
//!   "build": {
//!     "directory": "/work/app/target",
//!     "output_directory": "/work/app/target/classes",
//!     "test_output_directory": "/work/app/target/test-classes"
//!   },
//!   "compile_classpath": ["/work/app/target/classes", "/home/u/.m2/sqlite-jdbc.jar"],
//!   "resources": [{ "directory": "/work/app/src/main/resources" }],
//!   "properties": { "db.schema": "public" }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Dependency scope whose classpath elements were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  Compile,
  Test,
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Scope::Compile => write!(f, "compile"),
      Scope::Test => write!(f, "test"),
    }
  }
}

/// The host build never resolved dependencies for the requested scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dependency resolution required: {scope} classpath elements are not available")]
pub struct DependencyResolutionRequired {
  pub scope: Scope,
}

/// A resource root registered with the host build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
  pub directory: PathBuf,

  /// Include patterns. Empty means every file under `directory`.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub includes: Vec<String>,
}

impl Resource {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      includes: Vec::new(),
    }
  }

  pub fn with_include(mut self, pattern: &str) -> Self {
    self.includes.push(pattern.to_string());
    self
  }
}

/// What the run needs from the build that hosts it.
pub trait HostBuild {
  /// Project base directory; anchors relative paths in the configuration.
  fn base_directory(&self) -> &Path;

  /// Classpath elements of the compile scope.
  fn compile_classpath_elements(&self) -> Result<Vec<PathBuf>, DependencyResolutionRequired>;

  /// Classpath elements of the test scope, which include the compile scope.
  fn test_classpath_elements(&self) -> Result<Vec<PathBuf>, DependencyResolutionRequired>;

  /// Compiled classes output directory.
  fn output_directory(&self) -> &Path;

  /// Compiled test classes output directory.
  fn test_output_directory(&self) -> &Path;

  /// Declared resource directories.
  fn resource_directories(&self) -> Vec<PathBuf>;

  /// Property bag available for placeholder substitution.
  fn properties(&self) -> &BTreeMap<String, String>;

  fn add_compile_source_root(&mut self, root: PathBuf);

  fn add_resource(&mut self, resource: Resource);
}

/// Directory layout of the host build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLayout {
  pub directory: PathBuf,
  pub output_directory: PathBuf,
  pub test_output_directory: PathBuf,
}

impl BuildLayout {
  /// The conventional `target/`, `target/classes`, `target/test-classes` layout.
  pub fn conventional(basedir: &Path) -> Self {
    let directory = basedir.join("target");
    Self {
      output_directory: directory.join("classes"),
      test_output_directory: directory.join("test-classes"),
      directory,
    }
  }
}

/// JSON-backed host build description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModel {
  pub basedir: PathBuf,
  pub build: BuildLayout,

  /// `None` when the host did not resolve compile dependencies.
  #[serde(default)]
  pub compile_classpath: Option<Vec<PathBuf>>,

  /// `None` when the host did not resolve test dependencies.
  #[serde(default)]
  pub test_classpath: Option<Vec<PathBuf>>,

  #[serde(default)]
  pub resources: Vec<Resource>,

  #[serde(default)]
  pub compile_source_roots: Vec<PathBuf>,

  #[serde(default)]
  pub properties: BTreeMap<String, String>,
}

/// Errors that can occur when loading or saving a project model.
#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("failed to read project file {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to parse project file {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("failed to serialize project model: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write project file {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },
}

impl ProjectModel {
  /// A project with the conventional layout and no resolved dependencies.
  pub fn new(basedir: impl Into<PathBuf>) -> Self {
    let basedir = basedir.into();
    Self {
      build: BuildLayout::conventional(&basedir),
      basedir,
      compile_classpath: None,
      test_classpath: None,
      resources: Vec::new(),
      compile_source_roots: Vec::new(),
      properties: BTreeMap::new(),
    }
  }

  /// Load a project model from a JSON file.
  ///
  /// A relative `basedir` is anchored at the directory holding the file, and
  /// every other relative path is anchored at `basedir`.
  pub fn load(path: &Path) -> Result<Self, ProjectError> {
    info!(path = %path.display(), "loading project model");

    let content = fs::read_to_string(path).map_err(|source| ProjectError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut model: ProjectModel = serde_json::from_str(&content).map_err(|source| ProjectError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let anchor = path.parent().unwrap_or_else(|| Path::new("."));
    model.anchor_paths(anchor);
    debug!(basedir = %model.basedir.display(), "project model loaded");
    Ok(model)
  }

  /// Save the model as pretty JSON, writing to a temp file then renaming.
  pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
    let content = serde_json::to_string_pretty(self).map_err(ProjectError::Serialize)?;
    let write_err = |source| ProjectError::Write {
      path: path.to_path_buf(),
      source,
    };

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content).map_err(write_err)?;
    fs::rename(&temp_path, path).map_err(write_err)?;

    info!(path = %path.display(), "project model saved");
    Ok(())
  }

  fn anchor_paths(&mut self, anchor: &Path) {
    if self.basedir.is_relative() {
      // Rebuilding from components drops `.` segments.
      self.basedir = anchor.join(&self.basedir).components().collect();
    }
    let base = self.basedir.clone();
    let anchored = |p: &mut PathBuf| {
      if p.is_relative() {
        *p = base.join(&*p);
      }
    };

    anchored(&mut self.build.directory);
    anchored(&mut self.build.output_directory);
    anchored(&mut self.build.test_output_directory);
    for element in self.compile_classpath.iter_mut().flatten() {
      anchored(element);
    }
    for element in self.test_classpath.iter_mut().flatten() {
      anchored(element);
    }
    for resource in &mut self.resources {
      anchored(&mut resource.directory);
    }
    for root in &mut self.compile_source_roots {
      anchored(root);
    }
  }
}

impl HostBuild for ProjectModel {
  fn base_directory(&self) -> &Path {
    &self.basedir
  }

  fn compile_classpath_elements(&self) -> Result<Vec<PathBuf>, DependencyResolutionRequired> {
    self.compile_classpath.clone().ok_or(DependencyResolutionRequired { scope: Scope::Compile })
  }

  fn test_classpath_elements(&self) -> Result<Vec<PathBuf>, DependencyResolutionRequired> {
    self.test_classpath.clone().ok_or(DependencyResolutionRequired { scope: Scope::Test })
  }

  fn output_directory(&self) -> &Path {
    &self.build.output_directory
  }

  fn test_output_directory(&self) -> &Path {
    &self.build.test_output_directory
  }

  fn resource_directories(&self) -> Vec<PathBuf> {
    self.resources.iter().map(|r| r.directory.clone()).collect()
  }

  fn properties(&self) -> &BTreeMap<String, String> {
    &self.properties
  }

  fn add_compile_source_root(&mut self, root: PathBuf) {
    if !self.compile_source_roots.contains(&root) {
      self.compile_source_roots.push(root);
    }
  }

  fn add_resource(&mut self, resource: Resource) {
    if !self.resources.contains(&resource) {
      self.resources.push(resource);
    }
  }
}
