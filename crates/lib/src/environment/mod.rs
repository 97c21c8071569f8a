//! Run environment resolution.
//!
//! Decides which lookup roots a generator run may see:
//! - the dependency classpath, selected by the two scope flags of
//!   [`RunConfig`] and installed as the thread's ambient context
//! - the host's resource directories, registered with the run's
//!   [`ResourceRegistry`] so the configuration parser can resolve property
//!   files that live in source resource folders
//!
//! Both are also handed to collaborators explicitly through [`RunEnvironment`].

mod context;

pub use context::{AmbientGuard, LookupContext, ambient};

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::RunConfig;
use crate::project::{DependencyResolutionRequired, HostBuild};

/// External lookups consulted when resolving named resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
  lookups: Vec<LookupContext>,
}

impl ResourceRegistry {
  pub fn add_external_lookup(&mut self, context: LookupContext) {
    self.lookups.push(context);
  }

  /// Resolve a named resource against the registered lookups, in
  /// registration order.
  pub fn find(&self, name: &str) -> Option<PathBuf> {
    self.lookups.iter().find_map(|lookup| lookup.find(name))
  }

  pub fn roots(&self) -> impl Iterator<Item = &std::path::Path> {
    self.lookups.iter().flat_map(LookupContext::entries)
  }
}

/// Everything the parser and engine need to know about where to look.
#[derive(Debug, Clone, Default)]
pub struct RunEnvironment {
  classpath: Option<LookupContext>,
  resources: ResourceRegistry,
  properties: BTreeMap<String, String>,
}

impl RunEnvironment {
  pub fn new(
    classpath: Option<LookupContext>,
    resources: ResourceRegistry,
    properties: BTreeMap<String, String>,
  ) -> Self {
    Self {
      classpath,
      resources,
      properties,
    }
  }

  /// The classpath visible to the run: the resolved entry set when the scope
  /// flags asked for one, otherwise the thread's ambient context.
  pub fn classpath(&self) -> LookupContext {
    match &self.classpath {
      Some(resolved) => resolved.clone(),
      None => ambient().map(|c| (*c).clone()).unwrap_or_default(),
    }
  }

  pub fn resources(&self) -> &ResourceRegistry {
    &self.resources
  }

  /// Host properties available for placeholder substitution.
  pub fn properties(&self) -> &BTreeMap<String, String> {
    &self.properties
  }

  /// Resolve a named resource: resource directories first, then the classpath.
  pub fn find_resource(&self, name: &str) -> Option<PathBuf> {
    self.resources.find(name).or_else(|| self.classpath().find(name))
  }
}

/// Compute the classpath entry set selected by the scope flags.
///
/// Returns `None` when neither flag is set. The host's classes and
/// test-classes output directories are never part of the result: they are
/// usually not materialized yet when generation runs.
pub fn resolve_classpath(
  config: &RunConfig,
  host: &dyn HostBuild,
) -> Result<Option<LookupContext>, DependencyResolutionRequired> {
  if !config.includes_dependencies() {
    debug!("no dependency scope requested, keeping ambient lookup context");
    return Ok(None);
  }

  let mut entries = LookupContext::new();
  if config.include_compile_dependencies {
    entries.extend(host.compile_classpath_elements()?);
  }
  if config.include_all_dependencies {
    entries.extend(host.test_classpath_elements()?);
  }

  entries.remove(host.output_directory());
  entries.remove(host.test_output_directory());

  info!(
    entries = entries.len(),
    compile = config.include_compile_dependencies,
    all = config.include_all_dependencies,
    "resolved generator classpath"
  );
  Ok(Some(entries))
}

/// A lookup context seeded from the host's declared resource directories.
pub fn resource_context(host: &dyn HostBuild) -> LookupContext {
  host.resource_directories().into_iter().collect()
}

/// Resolve the run environment and install the classpath into `guard`.
///
/// The resource context is registered regardless of the scope flags.
pub fn prepare(
  config: &RunConfig,
  host: &dyn HostBuild,
  guard: &mut AmbientGuard,
) -> Result<RunEnvironment, DependencyResolutionRequired> {
  let classpath = resolve_classpath(config, host)?;
  if let Some(entries) = &classpath {
    guard.install(entries.clone());
  }

  let mut resources = ResourceRegistry::default();
  let resource_roots = resource_context(host);
  debug!(roots = resource_roots.len(), "registering resource directories");
  resources.add_external_lookup(resource_roots);

  Ok(RunEnvironment::new(classpath, resources, host.properties().clone()))
}
