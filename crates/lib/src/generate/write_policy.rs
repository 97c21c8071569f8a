//! Write policy for generated files.
//!
//! The policy resolves where a target's files go and decides, per candidate
//! file, whether to write it, leave an existing file alone, or merge. XML files
//! are always merged, whatever the overwrite flag says.

use std::collections::HashSet;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;
use tracing::debug;

use crate::consts::OUTPUT_PROJECT_SENTINEL;

/// What to do with one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
  Write,
  Skip,
  Merge,
}

#[derive(Debug, Error)]
pub enum MergeError {
  #[error("malformed XML: {0}")]
  Xml(#[from] quick_xml::Error),

  #[error("generated document has no root element")]
  NoRoot,
}

/// Decides how generated files land on disk.
pub trait WritePolicy {
  /// Directory for a target. Nothing is created: directories appear when the
  /// first file is committed into them.
  fn target_directory(&self, target_project: &str, target_package: &str) -> io::Result<PathBuf>;

  fn decide(&self, target: &Path) -> WriteDecision;

  /// Merge a freshly generated file into the existing one.
  fn merge(&self, existing: &str, generated: &str) -> Result<String, MergeError>;

  /// Lets a policy interrupt generation between files.
  fn is_cancelled(&self) -> bool {
    false
  }
}

/// The write policy used unless a caller supplies another.
#[derive(Debug, Clone)]
pub struct DefaultWritePolicy {
  output_directory: PathBuf,
  base_directory: PathBuf,
  overwrite: bool,
}

impl DefaultWritePolicy {
  /// `base_directory` anchors relative `targetProject` values.
  pub fn new(output_directory: impl Into<PathBuf>, base_directory: impl Into<PathBuf>, overwrite: bool) -> Self {
    Self {
      output_directory: output_directory.into(),
      base_directory: base_directory.into(),
      overwrite,
    }
  }
}

fn is_xml(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

impl WritePolicy for DefaultWritePolicy {
  fn target_directory(&self, target_project: &str, target_package: &str) -> io::Result<PathBuf> {
    let project = if target_project.is_empty() || target_project == OUTPUT_PROJECT_SENTINEL {
      self.output_directory.clone()
    } else {
      let dir = self.base_directory.join(target_project);
      if !dir.is_dir() {
        return Err(io::Error::new(
          io::ErrorKind::NotFound,
          format!("target project directory {} does not exist", dir.display()),
        ));
      }
      dir
    };

    let directory = target_package
      .split('.')
      .filter(|segment| !segment.is_empty())
      .fold(project, |dir, segment| dir.join(segment));

    debug!(directory = %directory.display(), "resolved target directory");
    Ok(directory)
  }

  fn decide(&self, target: &Path) -> WriteDecision {
    if is_xml(target) {
      WriteDecision::Merge
    } else if !target.exists() || self.overwrite {
      WriteDecision::Write
    } else {
      WriteDecision::Skip
    }
  }

  fn merge(&self, existing: &str, generated: &str) -> Result<String, MergeError> {
    merge_xml(existing, generated)
  }
}

/// A top-level element below the document root.
struct ChildElement {
  id: Option<String>,
  span: Range<usize>,
}

fn id_attribute(start: &BytesStart<'_>) -> Result<Option<String>, quick_xml::Error> {
  match start.try_get_attribute("id")? {
    Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
    None => Ok(None),
  }
}

/// Children of the root element, and the offset where the root's end tag
/// starts.
fn root_children(doc: &str) -> Result<(Vec<ChildElement>, Option<usize>), quick_xml::Error> {
  let mut reader = Reader::from_str(doc);
  let mut children = Vec::new();
  let mut open: Option<(usize, Option<String>)> = None;
  let mut root_end = None;
  let mut depth = 0usize;

  loop {
    let before = reader.buffer_position();
    match reader.read_event()? {
      Event::Start(start) => {
        depth += 1;
        if depth == 2 {
          open = Some((before, id_attribute(&start)?));
        }
      }
      Event::Empty(start) if depth == 1 => {
        children.push(ChildElement {
          id: id_attribute(&start)?,
          span: before..reader.buffer_position(),
        });
      }
      Event::End(_) => {
        if depth == 2
          && let Some((from, id)) = open.take()
        {
          children.push(ChildElement {
            id,
            span: from..reader.buffer_position(),
          });
        }
        if depth == 1 {
          root_end = Some(before);
        }
        depth = depth.saturating_sub(1);
      }
      Event::Eof => break,
      _ => {}
    }
  }

  Ok((children, root_end))
}

/// Merge a regenerated XML document with the existing one.
///
/// Root children of the existing document whose `id` does not occur in the
/// generated document are kept, appended before the generated root's end tag.
/// Children without an `id` are regenerated content and are not carried over.
pub fn merge_xml(existing: &str, generated: &str) -> Result<String, MergeError> {
  let (old_children, _) = root_children(existing)?;
  let (new_children, root_end) = root_children(generated)?;
  let root_end = root_end.ok_or(MergeError::NoRoot)?;

  let generated_ids: HashSet<&str> = new_children.iter().filter_map(|c| c.id.as_deref()).collect();
  let carried: Vec<&str> = old_children
    .iter()
    .filter(|c| c.id.as_deref().is_some_and(|id| !generated_ids.contains(id)))
    .map(|c| &existing[c.span.clone()])
    .collect();

  if carried.is_empty() {
    return Ok(generated.to_string());
  }

  debug!(kept = carried.len(), "carrying existing elements into merged document");
  let mut merged = String::with_capacity(generated.len() + carried.iter().map(|c| c.len() + 3).sum::<usize>());
  merged.push_str(&generated[..root_end]);
  for element in carried {
    merged.push_str("  ");
    merged.push_str(element);
    merged.push('\n');
  }
  merged.push_str(&generated[root_end..]);
  Ok(merged)
}
