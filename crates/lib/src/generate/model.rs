//! Structured generator configuration.
//!
//! Produced by a [`ConfigurationParser`](crate::parse::ConfigurationParser) and
//! handed to the engine. Serializable so that out-of-process engines receive it
//! as JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::filter::Filter;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
  /// Properties loaded from the document's `<properties>` element.
  #[serde(default)]
  pub properties: BTreeMap<String, String>,

  /// Extra classpath entries declared by the document.
  #[serde(default)]
  pub classpath_entries: Vec<PathBuf>,

  #[serde(default)]
  pub contexts: Vec<ContextConfig>,
}

impl GeneratorConfig {
  pub fn context(&self, id: &str) -> Option<&ContextConfig> {
    self.contexts.iter().find(|c| c.id == id)
  }

  /// Contexts that pass `filter`, in document order.
  pub fn selected_contexts<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a ContextConfig> + 'a {
    self.contexts.iter().filter(move |c| filter.allows(&c.id))
  }
}

/// A named group of tables generated together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
  pub id: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_runtime: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub connection: Option<JdbcConnection>,

  #[serde(default)]
  pub targets: Vec<GeneratorTarget>,

  #[serde(default)]
  pub tables: Vec<TableConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdbcConnection {
  pub driver_class: String,
  pub connection_url: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_id: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
}

/// Kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
  JavaModel,
  SqlMap,
  JavaClient,
}

impl TargetKind {
  /// The configuration element declaring this kind of target.
  pub fn element_name(self) -> &'static str {
    match self {
      TargetKind::JavaModel => "javaModelGenerator",
      TargetKind::SqlMap => "sqlMapGenerator",
      TargetKind::JavaClient => "javaClientGenerator",
    }
  }

  pub fn from_element_name(name: &str) -> Option<Self> {
    [TargetKind::JavaModel, TargetKind::SqlMap, TargetKind::JavaClient]
      .into_iter()
      .find(|kind| kind.element_name() == name)
  }
}

impl fmt::Display for TargetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.element_name())
  }
}

/// Where one kind of artifact is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorTarget {
  pub kind: TargetKind,
  pub target_package: String,
  pub target_project: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub catalog: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub schema: Option<String>,

  pub table_name: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub domain_object_name: Option<String>,
}

impl TableConfig {
  /// `catalog.schema.table`, leaving out absent parts.
  pub fn fully_qualified_name(&self) -> String {
    [self.catalog.as_deref(), self.schema.as_deref(), Some(self.table_name.as_str())]
      .into_iter()
      .flatten()
      .collect::<Vec<_>>()
      .join(".")
  }
}
