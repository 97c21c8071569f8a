//! Diagnostic sink for end-user visible reporting.

use std::cell::RefCell;

use tracing::{error, info, warn};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Info,
  Warning,
  Error,
}

/// Receives every message the run wants an operator to see.
pub trait DiagnosticSink {
  fn info(&self, message: &str);
  fn warn(&self, message: &str);
  fn error(&self, message: &str);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
  fn info(&self, message: &str) {
    info!("{message}");
  }

  fn warn(&self, message: &str) {
    warn!("{message}");
  }

  fn error(&self, message: &str) {
    error!("{message}");
  }
}

/// Keeps diagnostics in memory, in the order they were reported.
#[derive(Debug, Default)]
pub struct RecordingSink {
  messages: RefCell<Vec<(Severity, String)>>,
}

impl RecordingSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn messages(&self) -> Vec<(Severity, String)> {
    self.messages.borrow().clone()
  }

  /// Messages of one severity, in order.
  pub fn with_severity(&self, severity: Severity) -> Vec<String> {
    self
      .messages
      .borrow()
      .iter()
      .filter(|(s, _)| *s == severity)
      .map(|(_, m)| m.clone())
      .collect()
  }

  fn push(&self, severity: Severity, message: &str) {
    self.messages.borrow_mut().push((severity, message.to_string()));
  }
}

impl DiagnosticSink for RecordingSink {
  fn info(&self, message: &str) {
    self.push(Severity::Info, message);
  }

  fn warn(&self, message: &str) {
    self.push(Severity::Warning, message);
  }

  fn error(&self, message: &str) {
    self.push(Severity::Error, message);
  }
}
