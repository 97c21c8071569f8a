//! Generate command integration tests.
//!
//! The generator program is a shell script fixture, so these tests run on
//! Unix only.

use predicates::prelude::*;

use super::common::{TestEnv, fixture_content, fixture_path, lists_path};

#[test]
fn generates_filtered_tables_and_registers_output() {
  let env = TestEnv::new();

  env
    .generate_cmd()
    .args(["--table-names", "user, order", "--contexts", "ctx1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Generated 4 file(s)"))
    .stdout(predicate::str::contains("Output registered: yes"))
    .stderr(predicate::str::contains("Table audit_log was not found"));

  let out = env.output_path();
  assert!(out.join("com/example/model/user.java").is_file());
  assert!(out.join("com/example/model/order.java").is_file());
  assert!(out.join("com/example/mapper/userMapper.xml").is_file());
  assert!(out.join("com/example/mapper/orderMapper.xml").is_file());

  let project = env.project_json();
  assert!(lists_path(&project["compile_source_roots"], &out));
  let resource = project["resources"]
    .as_array()
    .unwrap()
    .iter()
    .find(|r| r["includes"] == serde_json::json!(["**/*.xml"]))
    .expect("output registered as resource root");
  assert!(lists_path(&serde_json::json!([resource["directory"]]), &out));
}

#[test]
fn verbose_run_reports_filters_seen_by_generator() {
  let env = TestEnv::new();

  env
    .generate_cmd()
    .args(["--verbose", "--table-names", "user,order,", "--contexts", "ctx1"])
    .assert()
    .success()
    .stderr(predicate::str::contains("Introspecting tables: order,user"))
    .stderr(predicate::str::contains("Introspecting contexts: ctx1"));
}

#[test]
fn rerun_keeps_existing_sources_and_merges_mappers() {
  let env = TestEnv::new();
  env.generate_cmd().args(["--contexts", "ctx1"]).assert().success();

  let model = env.output_path().join("com/example/model/user.java");
  let mapper = env.output_path().join("com/example/mapper/userMapper.xml");
  std::fs::write(&model, "public class user { int custom; }\n").unwrap();
  std::fs::write(
    &mapper,
    r#"<mapper namespace="user"><select id="selectAll"/><select id="byName"/></mapper>"#,
  )
  .unwrap();

  env
    .generate_cmd()
    .args(["--contexts", "ctx1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Skipped: 1"))
    .stdout(predicate::str::contains("Merged: 1"))
    .stderr(predicate::str::contains("was not overwritten"));

  assert_eq!(
    std::fs::read_to_string(&model).unwrap(),
    "public class user { int custom; }\n"
  );
  assert!(std::fs::read_to_string(&mapper).unwrap().contains(r#"<select id="byName"/>"#));
}

#[test]
fn overwrite_replaces_existing_sources() {
  let env = TestEnv::new();
  env.generate_cmd().args(["--contexts", "ctx1"]).assert().success();
  let model = env.output_path().join("com/example/model/user.java");
  std::fs::write(&model, "stale").unwrap();

  env
    .generate_cmd()
    .args(["--contexts", "ctx1", "--overwrite"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Skipped: 0"));

  assert_eq!(std::fs::read_to_string(&model).unwrap(), "public class user {}\n");
}

#[test]
fn semantic_errors_are_reported_individually() {
  let env = TestEnv::new();

  env
    .generate_cmd()
    .env("FAKE_GENERATOR_EXIT", "2")
    .assert()
    .failure()
    .stderr(predicate::str::contains("table user has no primary key"))
    .stderr(predicate::str::contains("context ctx1 declares no client generator"))
    .stderr(predicate::str::contains("invalid generator configuration: 2 errors"));

  assert!(env.project_json()["compile_source_roots"].is_null());
}

#[test]
fn parse_errors_fail_before_generation() {
  let env = TestEnv::new();

  env
    .generate_cmd()
    .arg("--configuration-file")
    .arg(fixture_path("invalid_config.xml"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("<table> requires attribute tableName"))
    .stderr(predicate::str::contains("duplicate context id ctx1"))
    .stderr(predicate::str::contains("failed to parse configuration"))
    .stderr(predicate::str::contains("Table audit_log was not found").not());

  assert!(!env.output_path().exists());
}

#[test]
fn database_errors_fail_the_run() {
  let env = TestEnv::new();

  env
    .generate_cmd()
    .env("FAKE_GENERATOR_EXIT", "3")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Generator run failed"));
}

#[test]
fn interruption_is_not_a_failure() {
  let env = TestEnv::new();

  env
    .generate_cmd()
    .env("FAKE_GENERATOR_EXIT", "130")
    .assert()
    .success()
    .stderr(predicate::str::contains("Generation was interrupted"));
}

#[test]
fn sql_script_runs_before_generation() {
  let env = TestEnv::new();
  env.write_file("src/main/resources/setup.sql", &fixture_content("setup.sql"));
  std::fs::create_dir_all(env.path("target")).unwrap();

  env
    .generate_cmd()
    .args([
      "--sql-script",
      "classpath:setup.sql",
      "--jdbc-driver",
      "org.sqlite.JDBC",
      "--jdbc-url",
      "jdbc:sqlite:target/app.db",
    ])
    .assert()
    .success();

  let db = env.path("target/app.db");
  assert!(std::fs::metadata(&db).unwrap().len() > 0);
}

#[test]
fn missing_sql_script_is_a_configuration_error() {
  let env = TestEnv::new();

  env
    .generate_cmd()
    .args(["--sql-script", "classpath:absent.sql", "--jdbc-driver", "sqlite", "--jdbc-url", "app.db"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("SQL script file does not exist: classpath:absent.sql"));

  assert!(!env.output_path().exists());
}

#[test]
fn options_from_environment() {
  let env = TestEnv::new();

  env
    .generate_cmd()
    .env("MAPGEN_OUTPUT_DIRECTORY", "gen")
    .env("MAPGEN_TABLE_NAMES", "order")
    .env("MAPGEN_CONTEXTS", "ctx1")
    .assert()
    .success();

  assert!(env.path("gen/com/example/model/order.java").is_file());
  assert!(!env.path("gen/com/example/model/user.java").exists());
}

#[test]
fn json_summary() {
  let env = TestEnv::new();

  let output = env
    .generate_cmd()
    .args(["--format", "json", "--contexts", "ctx1", "--table-names", "user"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(value["outcome"], "completed");
  assert_eq!(value["written"].as_array().unwrap().len(), 2);
  assert_eq!(value["warnings"], serde_json::json!(["Table audit_log was not found"]));
  assert_eq!(value["output_registered"], true);
}

#[test]
fn relative_locations_follow_the_project_not_the_working_directory() {
  let env = TestEnv::new();
  std::fs::create_dir_all(env.path("nested")).unwrap();

  env
    .generate_cmd()
    .current_dir(env.path("nested"))
    .args(["--project", "../mapgen-project.json", "--output-directory", "gen", "--contexts", "ctx1"])
    .assert()
    .success();

  assert!(env.path("gen/com/example/model/user.java").is_file());
  assert!(!env.path("nested/gen").exists());
}
