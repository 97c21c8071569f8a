//! Classpath command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn compile_scope_excludes_output_directories() {
  let env = TestEnv::new();

  env
    .mapgen_cmd()
    .args(["classpath", "--include-compile-dependencies"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Classpath: 1 entries"))
    .stdout(predicate::str::contains("sqlite-jdbc.jar"))
    .stdout(predicate::str::contains("classes").not());
}

#[test]
fn all_scopes_as_json() {
  let env = TestEnv::new();

  let output = env
    .mapgen_cmd()
    .args(["classpath", "--include-all-dependencies", "--format", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let classpath = value["classpath"].as_array().unwrap();
  assert_eq!(classpath.len(), 2);
  assert!(classpath.iter().any(|e| e.as_str().unwrap().ends_with("junit.jar")));
  assert_eq!(value["resources"].as_array().unwrap().len(), 1);
}

#[test]
fn unresolved_scope_fails() {
  let env = TestEnv::new();
  env.write_file(
    "mapgen-project.json",
    r#"{
      "basedir": ".",
      "build": {
        "directory": "target",
        "output_directory": "target/classes",
        "test_output_directory": "target/test-classes"
      }
    }"#,
  );

  env
    .mapgen_cmd()
    .args(["classpath", "--include-all-dependencies"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("test classpath elements are not available"));
}
