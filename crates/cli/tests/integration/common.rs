//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Project model with relative paths, anchored at the temp directory on load.
const PROJECT_JSON: &str = r#"{
  "basedir": ".",
  "build": {
    "directory": "target",
    "output_directory": "target/classes",
    "test_output_directory": "target/test-classes"
  },
  "compile_classpath": ["target/classes", "lib/sqlite-jdbc.jar"],
  "test_classpath": ["target/test-classes", "target/classes", "lib/sqlite-jdbc.jar", "lib/junit.jar"],
  "resources": [{ "directory": "src/main/resources" }],
  "properties": { "project.name": "app" }
}"#;

/// Isolated host project.
///
/// Each test gets its own temporary directory holding a project model, the
/// generator configuration under `src/main/resources`, and the stand-in
/// generator script.
pub struct TestEnv {
  pub temp: TempDir,
  pub project_path: PathBuf,
}

impl TestEnv {
  /// A project with the default configuration fixture in place.
  pub fn new() -> Self {
    let env = Self::empty();
    env.write_file("mapgen-project.json", PROJECT_JSON);
    env.write_file(
      "src/main/resources/generatorConfig.xml",
      &fixture_content("generatorConfig.xml"),
    );
    env.write_file(
      "src/main/resources/generator.properties",
      &fixture_content("generator.properties"),
    );
    env
  }

  /// Create an empty test environment.
  pub fn empty() -> Self {
    let temp = TempDir::new().unwrap();
    let project_path = temp.path().join("mapgen-project.json");
    Self { temp, project_path }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Default output directory of the project.
  pub fn output_path(&self) -> PathBuf {
    self.path("target/generated-sources/mapgen")
  }

  pub fn project_json(&self) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(&self.project_path).unwrap()).unwrap()
  }

  /// Get a pre-configured Command for the mapgen binary.
  ///
  /// Runs in the temp directory with `MAPGEN_*` variables of the caller
  /// removed.
  pub fn mapgen_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("mapgen");
    cmd.current_dir(self.temp.path());
    for (key, _) in std::env::vars() {
      if key.starts_with("MAPGEN_") || key.starts_with("FAKE_GENERATOR_") {
        cmd.env_remove(key);
      }
    }
    cmd.env_remove("RUST_LOG");
    cmd
  }

  /// `mapgen generate` wired to the stand-in generator script.
  pub fn generate_cmd(&self) -> Command {
    let mut cmd = self.mapgen_cmd();
    cmd
      .arg("generate")
      .arg("--engine")
      .arg("/bin/sh")
      .arg("--engine-arg")
      .arg(fixture_path("fake_generator.sh"));
    cmd
  }
}

/// Whether `path` is listed in a JSON array of paths.
pub fn lists_path(value: &serde_json::Value, path: &Path) -> bool {
  let expected = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
  value
    .as_array()
    .is_some_and(|items| items.iter().any(|item| item.as_str().map(PathBuf::from) == Some(expected.clone())))
}
