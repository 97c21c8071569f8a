//! The run coordinator.
//!
//! A [`Coordinator`] sequences one generator run:
//!
//! 1. skip check
//! 2. environment resolution, installing the ambient lookup context
//! 3. configuration file validation
//! 4. the optional pre-run SQL script
//! 5. filter parsing and configuration parsing
//! 6. generation through the [`Engine`]
//! 7. warnings, then registration of the output with the host build
//!
//! The ambient lookup context in place before the run is back in place after
//! it, however the run ends.

mod types;

pub use types::{Outcome, RunError, RunPhase, RunReport, Warnings};

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::environment::{self, AmbientGuard};
use crate::filter::parse_filter;
use crate::generate::{
  DefaultWritePolicy, Engine, GenerateError, GenerationJob, GenerationReport, ProgressReporter, TracingProgress,
  WritePolicy,
};
use crate::integrate;
use crate::parse::ConfigurationParser;
use crate::project::HostBuild;
use crate::script::{self, DriverRegistry};

static TRACING_SINK: TracingSink = TracingSink;

/// Runs the generator as one step of a host build.
pub struct Coordinator<'a> {
  host: &'a mut dyn HostBuild,
  parser: &'a dyn ConfigurationParser,
  engine: &'a dyn Engine,
  sink: &'a dyn DiagnosticSink,
  drivers: Option<&'a DriverRegistry>,
  write_policy: Option<&'a dyn WritePolicy>,
  progress: Option<&'a mut dyn ProgressReporter>,
  phase: RunPhase,
}

impl<'a> Coordinator<'a> {
  /// A coordinator reporting through `tracing`, with the built-in database
  /// drivers, the default write policy and `tracing` progress.
  pub fn new(host: &'a mut dyn HostBuild, parser: &'a dyn ConfigurationParser, engine: &'a dyn Engine) -> Self {
    Self {
      host,
      parser,
      engine,
      sink: &TRACING_SINK,
      drivers: None,
      write_policy: None,
      progress: None,
      phase: RunPhase::Idle,
    }
  }

  pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
    self.sink = sink;
    self
  }

  pub fn with_drivers(mut self, drivers: &'a DriverRegistry) -> Self {
    self.drivers = Some(drivers);
    self
  }

  pub fn with_write_policy(mut self, policy: &'a dyn WritePolicy) -> Self {
    self.write_policy = Some(policy);
    self
  }

  pub fn with_progress(mut self, progress: &'a mut dyn ProgressReporter) -> Self {
    self.progress = Some(progress);
    self
  }

  /// The phase the last run reached.
  pub fn phase(&self) -> RunPhase {
    self.phase
  }

  fn advance(&mut self, next: RunPhase) {
    debug!(from = %self.phase, to = %next, "run phase");
    self.phase = next;
  }

  /// Execute one run.
  ///
  /// # Errors
  ///
  /// Returns an error if:
  /// - the configuration file is unset or missing, or the SQL script
  ///   parameters are incomplete
  /// - a requested dependency scope was never resolved by the host
  /// - the SQL script fails
  /// - the configuration cannot be parsed or the engine rejects it
  /// - generation fails with a database or I/O error
  ///
  /// Parse and semantic errors are reported to the diagnostic sink one by one
  /// before the error is returned.
  pub fn run(&mut self, config: &RunConfig) -> Result<Outcome, RunError> {
    self.phase = RunPhase::Idle;

    if config.skip {
      self.sink.info("generator is skipped");
      self.advance(RunPhase::Skipped);
      return Ok(Outcome::Skipped);
    }

    let mut guard = AmbientGuard::save();
    let result = self.run_guarded(config, &mut guard);
    drop(guard);

    match &result {
      Ok(_) => self.advance(RunPhase::Restored),
      Err(e) => {
        warn!(error = %e, "generator run failed");
        self.advance(RunPhase::Failed);
      }
    }
    result
  }

  fn run_guarded(&mut self, config: &RunConfig, guard: &mut AmbientGuard) -> Result<Outcome, RunError> {
    let env = environment::prepare(config, &*self.host, guard)?;
    self.advance(RunPhase::EnvironmentReady);

    let configuration_file = configuration_file(config)?;

    let builtin;
    let drivers = match self.drivers {
      Some(drivers) => drivers,
      None => {
        builtin = DriverRegistry::with_builtin();
        &builtin
      }
    };
    script::run_script_if_necessary(config, &env, drivers)?;
    self.advance(RunPhase::ScriptDone);

    let tables = parse_filter(config.table_names.as_deref());
    let contexts = parse_filter(config.contexts.as_deref());
    debug!(tables = %tables.joined(), contexts = %contexts.joined(), "run filters");

    let mut warnings = Warnings::new();
    let generator_config = match self.parser.parse(&configuration_file, &env, &mut warnings) {
      Ok(parsed) => parsed,
      Err(e) => {
        for message in &e.errors {
          self.sink.error(message);
        }
        return Err(RunError::ParseFailed {
          path: configuration_file,
          errors: e.errors,
        });
      }
    };
    self.advance(RunPhase::ConfigParsed);

    let default_policy = DefaultWritePolicy::new(
      &config.output_directory,
      self.host.base_directory(),
      config.overwrite,
    );
    let mut default_progress = TracingProgress::new(config.verbose);

    let generated = {
      let job = GenerationJob {
        config: &generator_config,
        configuration_file: &configuration_file,
        output_directory: &config.output_directory,
        write_policy: match self.write_policy {
          Some(policy) => policy,
          None => &default_policy,
        },
        environment: &env,
        verbose: config.verbose,
      };
      let progress: &mut dyn ProgressReporter = match self.progress.as_deref_mut() {
        Some(progress) => progress,
        None => &mut default_progress,
      };
      self.engine.generate(&job, progress, &contexts, &tables, &mut warnings)
    };

    let (report, interrupted) = match generated {
      Ok(report) => (report, false),
      Err(GenerateError::Interrupted) => {
        info!("generation was interrupted");
        (GenerationReport::default(), true)
      }
      Err(GenerateError::InvalidConfiguration(errors)) => {
        for message in &errors {
          self.sink.error(message);
        }
        self.emit_warnings(&warnings);
        return Err(RunError::SemanticConfigurationInvalid { errors });
      }
      Err(e) => {
        self.emit_warnings(&warnings);
        return Err(RunError::GenerationIo(e));
      }
    };
    self.advance(RunPhase::Generated);

    self.emit_warnings(&warnings);

    let output_registered = integrate::register_output(&config.output_directory, &mut *self.host);
    self.advance(RunPhase::Integrated);

    info!(
      files = report.files_saved(),
      skipped = report.skipped.len(),
      warnings = warnings.len(),
      output_registered,
      "generator run finished"
    );

    let run_report = RunReport {
      warnings,
      report,
      output_registered,
    };
    Ok(if interrupted {
      Outcome::Interrupted(run_report)
    } else {
      Outcome::Completed(run_report)
    })
  }

  fn emit_warnings(&self, warnings: &Warnings) {
    for warning in warnings {
      self.sink.warn(warning);
    }
  }
}

fn configuration_file(config: &RunConfig) -> Result<PathBuf, RunError> {
  let path = config
    .configuration_file
    .as_ref()
    .ok_or_else(|| RunError::ConfigurationInvalid("configuration file not specified".to_string()))?;

  if !path.exists() {
    return Err(RunError::ConfigurationInvalid(format!(
      "configuration file {} does not exist",
      path.display()
    )));
  }
  if !path.is_file() {
    return Err(RunError::ConfigurationInvalid(format!(
      "configuration file {} is not a regular file",
      path.display()
    )));
  }
  if let Err(e) = fs::File::open(path) {
    return Err(RunError::ConfigurationInvalid(format!(
      "configuration file {} cannot be read: {e}",
      path.display()
    )));
  }
  Ok(path.clone())
}
