//! Configuration document parsing.
//!
//! A [`ConfigurationParser`] turns the configuration file into a
//! [`GeneratorConfig`]. Problems that do not prevent generation are appended
//! to the run's warning list; anything else fails the parse with every
//! discrete message collected in one [`ParseError`].

pub mod properties;
pub mod xml;

pub use xml::XmlConfigurationParser;

use std::path::Path;

use thiserror::Error;

use crate::environment::RunEnvironment;
use crate::generate::{GeneratorConfig, Warnings};

/// The configuration document could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("configuration could not be parsed ({} errors)", errors.len())]
pub struct ParseError {
  pub errors: Vec<String>,
}

impl ParseError {
  pub fn single(message: impl Into<String>) -> Self {
    Self {
      errors: vec![message.into()],
    }
  }
}

pub trait ConfigurationParser {
  /// Parse the document at `path`.
  ///
  /// `env` resolves property resources and supplies host properties for
  /// placeholder substitution.
  fn parse(&self, path: &Path, env: &RunEnvironment, warnings: &mut Warnings) -> Result<GeneratorConfig, ParseError>;
}
