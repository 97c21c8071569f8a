//! Engine adapter for an external generator program.
//!
//! The program receives the structured configuration and its resolved targets
//! as JSON on stdin, and the rest of the job through environment variables:
//!
//! - `MAPGEN_CONFIGURATION_FILE` - the configuration document
//! - `MAPGEN_STAGING_DIR` - where to write candidate files
//! - `MAPGEN_CONTEXTS`, `MAPGEN_TABLES` - comma joined filters (empty: all)
//! - `MAPGEN_CLASSPATH` - the run's classpath, as a path list
//! - `MAPGEN_RESOURCE_PATH` - resource directories, as a path list
//! - `MAPGEN_VERBOSE` - `true` or `false`
//!
//! Target `N` of the payload is staged under `$MAPGEN_STAGING_DIR/N/`. Lines
//! printed to stdout starting with `warning:` or `error:` are collected; other
//! lines are reported as progress. Exit status 2 means an invalid
//! configuration, 3 a database error, 130 an interruption. A program stopped
//! by SIGINT or SIGTERM was interrupted; any other signal is a failure.
//!
//! Staged files are committed to their target directories through the write
//! policy once the program succeeds.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, ExitStatus, Stdio};

use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::consts::ENV_PREFIX;
use crate::filter::Filter;

use super::{
  Engine, GenerateError, GenerationJob, GenerationReport, GeneratorConfig, ProgressReporter, TargetKind, Warnings,
  WriteDecision, WritePolicy,
};

const EXIT_INVALID_CONFIGURATION: i32 = 2;
const EXIT_DATABASE: i32 = 3;
const EXIT_INTERRUPTED: i32 = 130;

// POSIX signal numbers that stop a generator cooperatively.
const SIGINT: i32 = 2;
const SIGTERM: i32 = 15;

/// Runs an external generator program.
#[derive(Debug, Clone)]
pub struct CommandEngine {
  program: PathBuf,
  args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StagedTarget {
  index: usize,
  context: String,
  kind: TargetKind,
  directory: PathBuf,
}

#[derive(Serialize)]
struct EnginePayload<'a> {
  configuration: &'a GeneratorConfig,
  targets: &'a [StagedTarget],
}

fn env_name(name: &str) -> String {
  format!("{ENV_PREFIX}{name}")
}

impl CommandEngine {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn with_args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn program(&self) -> &Path {
    &self.program
  }

  /// Resolve target directories for every selected context. Targets whose
  /// directory cannot be resolved are reported as warnings and left out.
  fn stage_targets(&self, job: &GenerationJob<'_>, contexts: &Filter, warnings: &mut Warnings) -> Vec<StagedTarget> {
    let mut targets = Vec::new();
    for context in job.config.selected_contexts(contexts) {
      for target in &context.targets {
        match job
          .write_policy
          .target_directory(&target.target_project, &target.target_package)
        {
          Ok(directory) => targets.push(StagedTarget {
            index: targets.len(),
            context: context.id.clone(),
            kind: target.kind,
            directory,
          }),
          Err(e) => warnings.push(format!(
            "Cannot resolve {} directory for context {}: {e}",
            target.kind, context.id
          )),
        }
      }
    }
    targets
  }

  fn spawn(
    &self,
    job: &GenerationJob<'_>,
    staging: &Path,
    payload: &[u8],
    contexts: &Filter,
    tables: &Filter,
  ) -> io::Result<std::process::Output> {
    let classpath = job.environment.classpath().to_search_path().map_err(io::Error::other)?;
    let resource_path = std::env::join_paths(job.environment.resources().roots()).map_err(io::Error::other)?;

    let mut command = Command::new(&self.program);
    command
      .args(&self.args)
      .env(env_name("CONFIGURATION_FILE"), job.configuration_file)
      .env(env_name("STAGING_DIR"), staging)
      .env(env_name("CONTEXTS"), contexts.joined())
      .env(env_name("TABLES"), tables.joined())
      .env(env_name("CLASSPATH"), classpath)
      .env(env_name("RESOURCE_PATH"), resource_path)
      .env(env_name("VERBOSE"), job.verbose.to_string())
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());

    debug!(program = %self.program.display(), args = ?self.args, "spawning generator");
    let mut child = command.spawn()?;
    let stdin = child.stdin.take();

    // The payload is fed from its own thread while stdout and stderr drain,
    // so a program that prints before reading its input cannot stall the run.
    std::thread::scope(|scope| {
      let feeder = scope.spawn(move || write_payload(stdin, payload));
      let output = child.wait_with_output();
      feeder
        .join()
        .map_err(|_| io::Error::other("generator payload writer panicked"))??;
      output
    })
  }

  /// Write one staged file to its destination as the policy decides.
  fn commit_file(
    staged: &Path,
    destination: &Path,
    policy: &dyn WritePolicy,
    report: &mut GenerationReport,
    warnings: &mut Warnings,
  ) -> io::Result<bool> {
    if let Some(parent) = destination.parent() {
      fs::create_dir_all(parent)?;
    }

    match policy.decide(destination) {
      WriteDecision::Write => {
        fs::copy(staged, destination)?;
        report.written.push(destination.to_path_buf());
      }
      WriteDecision::Skip => {
        warnings.push(format!("Existing file {} was not overwritten", destination.display()));
        report.skipped.push(destination.to_path_buf());
        return Ok(false);
      }
      WriteDecision::Merge if !destination.exists() => {
        fs::copy(staged, destination)?;
        report.written.push(destination.to_path_buf());
      }
      WriteDecision::Merge => {
        let existing = fs::read_to_string(destination)?;
        let generated = fs::read_to_string(staged)?;
        match policy.merge(&existing, &generated) {
          Ok(merged) => {
            fs::write(destination, merged)?;
            report.merged.push(destination.to_path_buf());
          }
          Err(e) => {
            warnings.push(format!("Cannot merge {}: {e}", destination.display()));
            report.skipped.push(destination.to_path_buf());
            return Ok(false);
          }
        }
      }
    }
    Ok(true)
  }

  fn commit(
    targets: &[StagedTarget],
    staging: &Path,
    policy: &dyn WritePolicy,
    progress: &mut dyn ProgressReporter,
    warnings: &mut Warnings,
  ) -> Result<GenerationReport, GenerateError> {
    let mut report = GenerationReport::default();

    for target in targets {
      let staged_root = staging.join(target.index.to_string());
      for entry in WalkDir::new(&staged_root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
          continue;
        }
        if policy.is_cancelled() {
          return Err(GenerateError::Interrupted);
        }

        let relative = entry.path().strip_prefix(&staged_root).map_err(io::Error::other)?;
        let destination = target.directory.join(relative);
        if Self::commit_file(entry.path(), &destination, policy, &mut report, warnings)? {
          progress.file_saved(&destination);
        }
      }
    }

    Ok(report)
  }
}

/// Write the payload and close stdin. A program that exits without reading
/// all of it is judged by its exit status, not by the broken pipe.
fn write_payload(stdin: Option<ChildStdin>, payload: &[u8]) -> io::Result<()> {
  let Some(mut stdin) = stdin else {
    return Ok(());
  };
  match stdin.write_all(payload) {
    Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
    _ => Ok(()),
  }
}

#[cfg(unix)]
fn termination_signal(status: ExitStatus) -> Option<i32> {
  use std::os::unix::process::ExitStatusExt;
  status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: ExitStatus) -> Option<i32> {
  None
}

fn interpret_status(status: ExitStatus, errors: Vec<String>, stderr: &str) -> Result<(), GenerateError> {
  if status.success() {
    return Ok(());
  }

  match status.code() {
    Some(EXIT_INVALID_CONFIGURATION) if errors.is_empty() => Err(GenerateError::InvalidConfiguration(vec![
      "generator reported an invalid configuration".to_string(),
    ])),
    Some(EXIT_INVALID_CONFIGURATION) => Err(GenerateError::InvalidConfiguration(errors)),
    Some(EXIT_DATABASE) if errors.is_empty() => Err(GenerateError::Database(stderr.trim().to_string())),
    Some(EXIT_DATABASE) => Err(GenerateError::Database(errors.join("; "))),
    Some(EXIT_INTERRUPTED) => Err(GenerateError::Interrupted),
    Some(code) => Err(GenerateError::Io(io::Error::other(format!(
      "generator exited with status {code}: {}",
      stderr.trim()
    )))),
    None => match termination_signal(status) {
      Some(SIGINT | SIGTERM) => Err(GenerateError::Interrupted),
      Some(signal) => Err(GenerateError::Io(io::Error::other(format!(
        "generator terminated by signal {signal}"
      )))),
      None => Err(GenerateError::Io(io::Error::other("generator terminated abnormally"))),
    },
  }
}

impl Engine for CommandEngine {
  fn generate(
    &self,
    job: &GenerationJob<'_>,
    progress: &mut dyn ProgressReporter,
    contexts: &Filter,
    tables: &Filter,
    warnings: &mut Warnings,
  ) -> Result<GenerationReport, GenerateError> {
    let targets = self.stage_targets(job, contexts, warnings);
    progress.started(targets.len());

    if job.write_policy.is_cancelled() {
      return Err(GenerateError::Interrupted);
    }

    let staging = tempfile::Builder::new().prefix("mapgen-staging-").tempdir()?;
    for target in &targets {
      fs::create_dir_all(staging.path().join(target.index.to_string()))?;
    }

    let payload = serde_json::to_vec(&EnginePayload {
      configuration: job.config,
      targets: &targets,
    })
    .map_err(io::Error::other)?;

    let output = self.spawn(job, staging.path(), &payload, contexts, tables)?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "generator stderr");
    }

    let mut errors = Vec::new();
    for line in stdout.lines() {
      if let Some(message) = line.strip_prefix("warning:") {
        warnings.push(message.trim().to_string());
      } else if let Some(message) = line.strip_prefix("error:") {
        errors.push(message.trim().to_string());
      } else if !line.trim().is_empty() {
        progress.task(line.trim());
      }
    }

    if let Err(e) = interpret_status(output.status, errors, &stderr) {
      warn!(status = ?output.status.code(), error = %e, "generator did not complete");
      return Err(e);
    }

    let report = Self::commit(&targets, staging.path(), job.write_policy, progress, warnings)?;
    info!(
      written = report.written.len(),
      merged = report.merged.len(),
      skipped = report.skipped.len(),
      "committed generated files"
    );
    progress.done();

    close_staging(staging);
    Ok(report)
  }
}

fn close_staging(staging: TempDir) {
  let path = staging.path().to_path_buf();
  if let Err(e) = staging.close() {
    warn!(path = %path.display(), error = %e, "failed to remove staging directory");
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::environment::RunEnvironment;
  use crate::filter::parse_filter;
  use crate::generate::{ContextConfig, DefaultWritePolicy, GeneratorTarget, MergeError, TableConfig};
  use crate::generate::progress::TracingProgress;
  use crate::util::testutil::shell_engine;
  use tempfile::TempDir;

  fn config() -> GeneratorConfig {
    GeneratorConfig {
      contexts: vec![ContextConfig {
        id: "ctx1".to_string(),
        targets: vec![
          GeneratorTarget {
            kind: TargetKind::JavaModel,
            target_package: "com.example.model".to_string(),
            target_project: "MAPGEN".to_string(),
          },
          GeneratorTarget {
            kind: TargetKind::SqlMap,
            target_package: "com.example.mapper".to_string(),
            target_project: "MAPGEN".to_string(),
          },
        ],
        tables: vec![TableConfig {
          table_name: "user".to_string(),
          ..TableConfig::default()
        }],
        ..ContextConfig::default()
      }],
      ..GeneratorConfig::default()
    }
  }

  struct Fixture {
    temp: TempDir,
    config: GeneratorConfig,
    environment: RunEnvironment,
  }

  impl Fixture {
    fn new() -> Self {
      Self {
        temp: TempDir::new().unwrap(),
        config: config(),
        environment: RunEnvironment::default(),
      }
    }

    fn output(&self) -> PathBuf {
      self.temp.path().join("out")
    }

    fn run(
      &self,
      script: &str,
      policy: &dyn WritePolicy,
      warnings: &mut Warnings,
    ) -> Result<GenerationReport, GenerateError> {
      let config_file = self.temp.path().join("generatorConfig.xml");
      let output = self.output();
      let job = GenerationJob {
        config: &self.config,
        configuration_file: &config_file,
        output_directory: &output,
        write_policy: policy,
        environment: &self.environment,
        verbose: false,
      };
      shell_engine(script).generate(
        &job,
        &mut TracingProgress::new(false),
        &parse_filter(Some("ctx1")),
        &parse_filter(Some("user, order")),
        warnings,
      )
    }
  }

  const GENERATE_USER: &str = r#"
payload=$(cat)
case "$payload" in *'"id":"ctx1"'*) ;; *) exit 1 ;; esac
[ "$MAPGEN_TABLES" = "order,user" ] || exit 1
[ "$MAPGEN_CONTEXTS" = "ctx1" ] || exit 1
echo "Generating classes for table user"
echo "warning: Table order does not exist"
printf 'class User {}' > "$MAPGEN_STAGING_DIR/0/User.java"
printf '<mapper namespace="UserMapper"><select id="selectAll"/></mapper>' > "$MAPGEN_STAGING_DIR/1/UserMapper.xml"
"#;

  #[test]
  fn commits_staged_files_to_target_directories() {
    let fixture = Fixture::new();
    let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);
    let mut warnings = vec!["from parsing".to_string()];

    let report = fixture.run(GENERATE_USER, &policy, &mut warnings).unwrap();

    let model = fixture.output().join("com/example/model/User.java");
    let mapper = fixture.output().join("com/example/mapper/UserMapper.xml");
    assert_eq!(report.written, vec![model.clone(), mapper.clone()]);
    assert_eq!(std::fs::read_to_string(model).unwrap(), "class User {}");
    assert!(mapper.is_file());
    assert_eq!(warnings, vec!["from parsing", "Table order does not exist"]);
  }

  #[test]
  fn existing_files_are_skipped_or_merged() {
    let fixture = Fixture::new();
    let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);
    let model = fixture.output().join("com/example/model/User.java");
    let mapper = fixture.output().join("com/example/mapper/UserMapper.xml");
    std::fs::create_dir_all(model.parent().unwrap()).unwrap();
    std::fs::create_dir_all(mapper.parent().unwrap()).unwrap();
    std::fs::write(&model, "class User { int custom; }").unwrap();
    std::fs::write(&mapper, r#"<mapper namespace="UserMapper"><select id="byEmail"/></mapper>"#).unwrap();
    let mut warnings = Vec::new();

    let report = fixture.run(GENERATE_USER, &policy, &mut warnings).unwrap();

    assert_eq!(report.skipped, vec![model.clone()]);
    assert_eq!(report.merged, vec![mapper.clone()]);
    assert_eq!(std::fs::read_to_string(&model).unwrap(), "class User { int custom; }");
    let merged = std::fs::read_to_string(&mapper).unwrap();
    assert!(merged.contains(r#"<select id="selectAll"/>"#));
    assert!(merged.contains(r#"<select id="byEmail"/>"#));
    assert!(warnings.iter().any(|w| w.contains("was not overwritten")));
  }

  #[test]
  fn exit_status_two_reports_each_error() {
    let fixture = Fixture::new();
    let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);
    let script = "cat > /dev/null; echo 'error: context ctx1 has no tables'; echo 'error: table user has no columns'; exit 2";

    let err = fixture.run(script, &policy, &mut Vec::new()).unwrap_err();

    match err {
      GenerateError::InvalidConfiguration(errors) => assert_eq!(
        errors,
        vec!["context ctx1 has no tables", "table user has no columns"]
      ),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn exit_status_three_is_database_error() {
    let fixture = Fixture::new();
    let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);

    let err = fixture
      .run("echo 'error: connection refused'; exit 3", &policy, &mut Vec::new())
      .unwrap_err();

    assert!(matches!(err, GenerateError::Database(ref m) if m == "connection refused"));
  }

  struct CancelledPolicy(DefaultWritePolicy);

  impl WritePolicy for CancelledPolicy {
    fn target_directory(&self, target_project: &str, target_package: &str) -> io::Result<PathBuf> {
      self.0.target_directory(target_project, target_package)
    }

    fn decide(&self, target: &Path) -> WriteDecision {
      self.0.decide(target)
    }

    fn merge(&self, existing: &str, generated: &str) -> Result<String, MergeError> {
      self.0.merge(existing, generated)
    }

    fn is_cancelled(&self) -> bool {
      true
    }
  }

  #[test]
  fn cancelling_policy_interrupts() {
    let fixture = Fixture::new();
    let policy = CancelledPolicy(DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false));

    let err = fixture.run(GENERATE_USER, &policy, &mut Vec::new()).unwrap_err();
    assert!(matches!(err, GenerateError::Interrupted));
  }

  #[test]
  fn unresolvable_target_becomes_warning() {
    let mut fixture = Fixture::new();
    fixture.config.contexts[0].targets[0].target_project = "missing/project".to_string();
    let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);
    let mut warnings = Vec::new();

    let report = fixture
      .run("cat > /dev/null; printf '<m/>' > \"$MAPGEN_STAGING_DIR/0/M.xml\"", &policy, &mut warnings)
      .unwrap();

    assert_eq!(report.written, vec![fixture.output().join("com/example/mapper/M.xml")]);
    assert!(warnings[0].starts_with("Cannot resolve javaModelGenerator directory for context ctx1"));
  }

  #[test]
  fn missing_program_is_io_error() {
    let fixture = Fixture::new();
    let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);
    let output = fixture.output();
    let config_file = fixture.temp.path().join("generatorConfig.xml");
    let job = GenerationJob {
      config: &fixture.config,
      configuration_file: &config_file,
      output_directory: &output,
      write_policy: &policy,
      environment: &fixture.environment,
      verbose: false,
    };

    let err = CommandEngine::new(fixture.temp.path().join("no-such-generator"))
      .generate(
        &job,
        &mut TracingProgress::new(false),
        &Filter::default(),
        &Filter::default(),
        &mut Vec::new(),
      )
      .unwrap_err();
    assert!(matches!(err, GenerateError::Io(_)));
  }

  #[test]
  fn nothing_staged_leaves_output_absent() {
    let fixture = Fixture::new();
    let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);

    let report = fixture.run("cat > /dev/null", &policy, &mut Vec::new()).unwrap();

    assert_eq!(report.files_saved(), 0);
    assert!(!fixture.output().exists());
  }

  const CHATTY_THEN_READ: &str = r#"
i=0
while [ $i -lt 20000 ]; do echo "introspecting column $i"; i=$((i+1)); done
payload=$(cat)
case "$payload" in *'"table_name":"table_3999"'*) ;; *) exit 1 ;; esac
printf 'class Big {}' > "$MAPGEN_STAGING_DIR/0/Big.java"
"#;

  #[test]
  fn large_payload_and_chatty_generator_do_not_stall() {
    let mut fixture = Fixture::new();
    fixture.config.contexts[0].tables = (0..4000)
      .map(|i| TableConfig {
        table_name: format!("table_{i}"),
        ..TableConfig::default()
      })
      .collect();

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
      let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);
      let result = fixture.run(CHATTY_THEN_READ, &policy, &mut Vec::new());
      let _ = tx.send(result.map(|report| report.files_saved()).map_err(|e| e.to_string()));
    });

    let saved = rx
      .recv_timeout(std::time::Duration::from_secs(60))
      .expect("generator run did not finish")
      .unwrap();
    assert_eq!(saved, 1);
  }

  #[test]
  fn crashed_generator_is_a_failure() {
    let fixture = Fixture::new();
    let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);

    let err = fixture
      .run("cat > /dev/null; kill -SEGV $$", &policy, &mut Vec::new())
      .unwrap_err();

    match err {
      GenerateError::Io(e) => assert_eq!(e.to_string(), "generator terminated by signal 11"),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn terminated_generator_is_interrupted() {
    let fixture = Fixture::new();
    let policy = DefaultWritePolicy::new(fixture.output(), fixture.temp.path(), false);

    for script in ["cat > /dev/null; kill -TERM $$", "cat > /dev/null; exit 130"] {
      let err = fixture.run(script, &policy, &mut Vec::new()).unwrap_err();
      assert!(matches!(err, GenerateError::Interrupted), "{script}: {err}");
    }
  }
}
