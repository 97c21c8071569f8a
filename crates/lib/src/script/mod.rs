//! Pre-run SQL script execution.
//!
//! When a run configures `sql_script`, the script is executed against the
//! configured database before the configuration document is parsed, so that
//! schema introspection during generation sees its effects. The connection is
//! opened and dropped inside this step.
//!
//! # Script Format
//!
//! ```sql
//! -- comment lines are skipped
//! CREATE TABLE person (
//!   id INTEGER PRIMARY KEY,
//!   name TEXT
//! );
//! INSERT INTO person (name) VALUES ('ada');
//! ```
//!
//! A statement ends at a line whose trimmed text ends with `;`. Text left after
//! the last terminator is executed as a final statement.

pub mod driver;

pub use driver::{ConnectionParams, Driver, DriverError, DriverRegistry, ScriptConnection, SqliteDriver};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::consts::CLASSPATH_PREFIX;
use crate::environment::RunEnvironment;

/// Errors that can occur while running the pre-run script.
#[derive(Debug, Error)]
pub enum ScriptError {
  /// A connection parameter required by a configured script is missing.
  #[error("{0} must be specified when a SQL script is configured")]
  MissingParameter(&'static str),

  #[error("SQL script file does not exist: {0}")]
  NotFound(String),

  #[error("failed to read SQL script {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("unknown database driver: {name} (registered: {registered})")]
  UnknownDriver { name: String, registered: String },

  #[error("failed to connect to {url}: {source}")]
  Connect {
    url: String,
    #[source]
    source: DriverError,
  },

  #[error("SQL statement failed: {statement}: {source}")]
  Statement {
    statement: String,
    #[source]
    source: DriverError,
  },

  #[error("failed to commit SQL script: {0}")]
  Commit(#[source] DriverError),
}

impl ScriptError {
  /// Whether the error stems from the run configuration rather than the
  /// database.
  pub fn is_configuration_error(&self) -> bool {
    matches!(self, ScriptError::MissingParameter(_) | ScriptError::NotFound(_))
  }
}

/// Split a script into statements.
pub fn split_statements(script: &str) -> Vec<String> {
  let mut statements = Vec::new();
  let mut current = String::new();

  for line in script.lines() {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("--") {
      continue;
    }

    if let Some(body) = trimmed.strip_suffix(';') {
      current.push_str(body);
      let statement = current.trim();
      if !statement.is_empty() {
        statements.push(statement.to_string());
      }
      current.clear();
    } else {
      current.push_str(trimmed);
      current.push(' ');
    }
  }

  let rest = current.trim();
  if !rest.is_empty() {
    statements.push(rest.to_string());
  }

  statements
}

/// Locate the script on disk, resolving `classpath:` locations through the
/// run environment.
fn locate_script(location: &str, env: &RunEnvironment) -> Result<PathBuf, ScriptError> {
  match location.strip_prefix(CLASSPATH_PREFIX) {
    Some(name) => env
      .find_resource(name)
      .ok_or_else(|| ScriptError::NotFound(location.to_string())),
    None => {
      let path = Path::new(location);
      if path.is_file() {
        Ok(path.to_path_buf())
      } else {
        Err(ScriptError::NotFound(location.to_string()))
      }
    }
  }
}

/// Execute the configured SQL script, if there is one.
///
/// Returns the number of statements executed (zero when no script is
/// configured).
///
/// # Errors
///
/// Returns an error if:
/// - the driver or URL is missing, or the script cannot be found
/// - the driver is unknown or the connection cannot be opened
/// - any statement fails (the transaction is rolled back)
pub fn run_script_if_necessary(
  config: &RunConfig,
  env: &RunEnvironment,
  drivers: &DriverRegistry,
) -> Result<usize, ScriptError> {
  let Some(location) = config.sql_script.as_deref() else {
    return Ok(0);
  };

  let driver_name = config
    .jdbc_driver
    .as_deref()
    .ok_or(ScriptError::MissingParameter("jdbc driver"))?;
  let url = config
    .jdbc_url
    .as_deref()
    .ok_or(ScriptError::MissingParameter("jdbc url"))?;

  let path = locate_script(location, env)?;
  let script = fs::read_to_string(&path).map_err(|source| ScriptError::Read {
    path: path.clone(),
    source,
  })?;
  let statements = split_statements(&script);

  info!(script = %path.display(), statements = statements.len(), driver = driver_name, "running SQL script");

  let driver = drivers
    .get(driver_name)
    .ok_or_else(|| ScriptError::UnknownDriver {
      name: driver_name.to_string(),
      registered: drivers.names().collect::<Vec<_>>().join(", "),
    })?;
  let params = ConnectionParams {
    url,
    user: config.jdbc_user_id.as_deref(),
    password: config.jdbc_password.as_deref(),
  };
  let mut conn = driver.connect(&params).map_err(|source| ScriptError::Connect {
    url: url.to_string(),
    source,
  })?;

  for statement in &statements {
    debug!(statement = %statement, "executing statement");
    conn.execute(statement).map_err(|source| ScriptError::Statement {
      statement: statement.clone(),
      source,
    })?;
  }
  conn.commit().map_err(ScriptError::Commit)?;

  info!(statements = statements.len(), "SQL script complete");
  Ok(statements.len())
}
