//! Property files and `${name}` placeholder substitution.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

/// Parse `key=value` property text.
///
/// Lines starting with `#` or `!` are comments. The key ends at the first `=`
/// or `:`; a line without either is a key with an empty value. A trailing `\`
/// continues the value on the next line.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
  let mut properties = BTreeMap::new();
  let mut pending = String::new();

  for line in text.lines() {
    let trimmed = line.trim_start();
    if pending.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!')) {
      continue;
    }

    if let Some(head) = trimmed.strip_suffix('\\') {
      pending.push_str(head);
      continue;
    }
    pending.push_str(trimmed);

    let entry = std::mem::take(&mut pending);
    let (key, value) = match entry.find(['=', ':']) {
      Some(at) => (&entry[..at], &entry[at + 1..]),
      None => (entry.as_str(), ""),
    };
    let key = key.trim();
    if !key.is_empty() {
      properties.insert(key.to_string(), value.trim().to_string());
    }
  }

  properties
}

pub fn load_properties(path: &Path) -> io::Result<BTreeMap<String, String>> {
  Ok(parse_properties(&fs::read_to_string(path)?))
}

/// Layered property lookup: document properties shadow host properties.
#[derive(Debug, Clone, Copy)]
pub struct PropertyScope<'a> {
  document: &'a BTreeMap<String, String>,
  host: &'a BTreeMap<String, String>,
}

impl<'a> PropertyScope<'a> {
  pub fn new(document: &'a BTreeMap<String, String>, host: &'a BTreeMap<String, String>) -> Self {
    Self { document, host }
  }

  pub fn get(&self, name: &str) -> Option<&'a str> {
    self
      .document
      .get(name)
      .or_else(|| self.host.get(name))
      .map(String::as_str)
  }

  /// Replace every `${name}` in `text`.
  ///
  /// Placeholders that resolve to nothing are left as written and their names
  /// added to `unresolved`. An unterminated `${` is literal text.
  pub fn substitute(&self, text: &str, unresolved: &mut BTreeSet<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
      out.push_str(&rest[..start]);
      let after = &rest[start + 2..];
      let Some(end) = after.find('}') else {
        out.push_str(&rest[start..]);
        return out;
      };

      let name = after[..end].trim();
      match self.get(name) {
        Some(value) => out.push_str(value),
        None => {
          unresolved.insert(name.to_string());
          out.push_str(&rest[start..start + 2 + end + 1]);
        }
      }
      rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
  }
}
