//! Table and context filters.
//!
//! Filters arrive as comma delimited text (`"user, order"`). An empty filter
//! places no restriction on the run.

use std::collections::BTreeSet;

/// A normalized set of identifiers restricting a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter(BTreeSet<String>);

impl Filter {
  /// True when the filter places no restriction.
  pub fn is_unrestricted(&self) -> bool {
    self.0.is_empty()
  }

  /// Whether `name` passes the filter.
  pub fn allows(&self, name: &str) -> bool {
    self.is_unrestricted() || self.0.contains(name)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.contains(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  /// Comma joined form, sorted, as handed to external engines.
  pub fn joined(&self) -> String {
    self.iter().collect::<Vec<_>>().join(",")
  }
}

impl<S: Into<String>> FromIterator<S> for Filter {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Filter(iter.into_iter().map(Into::into).collect())
  }
}

/// Parse comma delimited text into a filter.
///
/// Tokens are trimmed and empty tokens dropped. Absent or blank input yields an
/// empty filter.
pub fn parse_filter(raw: Option<&str>) -> Filter {
  raw
    .map(|s| {
      s.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
    })
    .unwrap_or_default()
}
