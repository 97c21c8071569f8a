//! Lookup contexts and the thread's ambient context.
//!
//! A [`LookupContext`] is a deduplicated set of search roots. One of them can be
//! installed as the thread's ambient context for collaborators that look roots
//! up implicitly rather than receiving them. [`AmbientGuard`] scopes such an
//! installation: the context active when the guard was created comes back when
//! the guard is dropped, whichever way the scope is left.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

thread_local! {
  static AMBIENT: RefCell<Option<Rc<LookupContext>>> = const { RefCell::new(None) };
}

/// A deduplicated set of search roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupContext {
  entries: BTreeSet<PathBuf>,
}

impl LookupContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, entry: impl Into<PathBuf>) -> bool {
    self.entries.insert(entry.into())
  }

  pub fn remove(&mut self, entry: &Path) -> bool {
    self.entries.remove(entry)
  }

  pub fn contains(&self, entry: &Path) -> bool {
    self.entries.contains(entry)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn entries(&self) -> impl Iterator<Item = &Path> {
    self.entries.iter().map(PathBuf::as_path)
  }

  /// Find a named resource under the directory roots of this context.
  ///
  /// Roots are searched in order; archive entries are not searched.
  pub fn find(&self, name: &str) -> Option<PathBuf> {
    let relative = name.trim_start_matches('/');
    self
      .entries
      .iter()
      .filter(|root| root.is_dir())
      .map(|root| root.join(relative))
      .find(|candidate| candidate.is_file())
  }

  /// The entries joined with the platform's path list separator.
  pub fn to_search_path(&self) -> Result<OsString, std::env::JoinPathsError> {
    std::env::join_paths(self.entries.iter())
  }
}

impl<P: Into<PathBuf>> FromIterator<P> for LookupContext {
  fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
    Self {
      entries: iter.into_iter().map(Into::into).collect(),
    }
  }
}

impl<P: Into<PathBuf>> Extend<P> for LookupContext {
  fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
    self.entries.extend(iter.into_iter().map(Into::into));
  }
}

/// The ambient context of the current thread, if one is installed.
pub fn ambient() -> Option<Rc<LookupContext>> {
  AMBIENT.with(|cell| cell.borrow().clone())
}

fn replace_ambient(context: Option<Rc<LookupContext>>) -> Option<Rc<LookupContext>> {
  AMBIENT.with(|cell| cell.replace(context))
}

/// Saves the ambient context on creation and restores it on drop.
///
/// The guard is tied to the thread that created it.
pub struct AmbientGuard {
  saved: Option<Rc<LookupContext>>,
  _thread_bound: PhantomData<Rc<()>>,
}

impl AmbientGuard {
  /// Remember the current ambient context without changing it.
  pub fn save() -> Self {
    let saved = ambient();
    debug!(saved_entries = saved.as_ref().map(|c| c.len()), "saved ambient lookup context");
    Self {
      saved,
      _thread_bound: PhantomData,
    }
  }

  /// Replace the ambient context for the rest of the guard's scope.
  pub fn install(&mut self, context: LookupContext) {
    debug!(entries = context.len(), "installing ambient lookup context");
    replace_ambient(Some(Rc::new(context)));
  }
}

impl Drop for AmbientGuard {
  fn drop(&mut self) {
    replace_ambient(self.saved.take());
    debug!("restored ambient lookup context");
  }
}
