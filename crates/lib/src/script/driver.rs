//! Database drivers for the pre-run script.
//!
//! A [`Driver`] opens a [`ScriptConnection`] from a URL and credentials. The
//! connection runs every statement of a script inside one transaction; a
//! connection dropped without [`ScriptConnection::commit`] rolls back.

use std::collections::BTreeMap;

use rusqlite::Connection;
use tracing::{debug, warn};

/// Error type reported by driver implementations.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Connection parameters taken from the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionParams<'a> {
  pub url: &'a str,
  pub user: Option<&'a str>,
  pub password: Option<&'a str>,
}

/// An open connection scoped to one script execution.
pub trait ScriptConnection {
  /// Execute one statement inside the script's transaction.
  fn execute(&mut self, statement: &str) -> Result<(), DriverError>;

  /// Commit every statement executed so far.
  fn commit(self: Box<Self>) -> Result<(), DriverError>;
}

/// Opens connections for one kind of database.
pub trait Driver {
  fn connect(&self, params: &ConnectionParams<'_>) -> Result<Box<dyn ScriptConnection>, DriverError>;
}

/// Drivers available to the script executor, by name.
pub struct DriverRegistry {
  drivers: BTreeMap<String, Box<dyn Driver>>,
}

impl DriverRegistry {
  /// A registry with no drivers.
  pub fn empty() -> Self {
    Self {
      drivers: BTreeMap::new(),
    }
  }

  /// A registry with the built-in SQLite driver under `sqlite` and
  /// `org.sqlite.JDBC`.
  pub fn with_builtin() -> Self {
    let mut registry = Self::empty();
    registry.register("sqlite", SqliteDriver);
    registry.register("org.sqlite.JDBC", SqliteDriver);
    registry
  }

  pub fn register(&mut self, name: &str, driver: impl Driver + 'static) {
    self.drivers.insert(name.to_string(), Box::new(driver));
  }

  pub fn get(&self, name: &str) -> Option<&dyn Driver> {
    self.drivers.get(name).map(|d| d.as_ref())
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.drivers.keys().map(String::as_str)
  }
}

impl Default for DriverRegistry {
  fn default() -> Self {
    Self::with_builtin()
  }
}

/// SQLite driver backed by `rusqlite`.
///
/// Accepts `jdbc:sqlite:<path>`, `sqlite:<path>` or a plain path; `:memory:`
/// opens an in-memory database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
  fn database_path(url: &str) -> &str {
    url
      .strip_prefix("jdbc:sqlite:")
      .or_else(|| url.strip_prefix("sqlite:"))
      .unwrap_or(url)
  }
}

impl Driver for SqliteDriver {
  fn connect(&self, params: &ConnectionParams<'_>) -> Result<Box<dyn ScriptConnection>, DriverError> {
    if params.user.is_some() || params.password.is_some() {
      debug!("sqlite ignores user and password");
    }

    let path = Self::database_path(params.url);
    let conn = Connection::open(path)?;
    conn.execute_batch("BEGIN")?;
    debug!(path = %path, "opened sqlite connection");

    Ok(Box::new(SqliteConnection { conn }))
  }
}

struct SqliteConnection {
  conn: Connection,
}

impl ScriptConnection for SqliteConnection {
  fn execute(&mut self, statement: &str) -> Result<(), DriverError> {
    self.conn.execute_batch(statement)?;
    Ok(())
  }

  fn commit(self: Box<Self>) -> Result<(), DriverError> {
    self.conn.execute_batch("COMMIT")?;
    Ok(())
  }
}

impl Drop for SqliteConnection {
  fn drop(&mut self) {
    if !self.conn.is_autocommit()
      && let Err(e) = self.conn.execute_batch("ROLLBACK")
    {
      warn!(error = %e, "failed to roll back sqlite transaction");
    }
  }
}
