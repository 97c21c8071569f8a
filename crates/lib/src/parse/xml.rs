//! XML generator configuration documents.
//!
//! ```xml
//! <generatorConfiguration>
//!   <properties resource="db.properties"/>
//!   <classPathEntry location="${driver.jar}"/>
//!   <context id="ctx1" targetRuntime="MyBatis3">
//!     <jdbcConnection driverClass="org.sqlite.JDBC" connectionURL="${jdbc.url}"/>
//!     <javaModelGenerator targetPackage="com.example.model" targetProject="MAPGEN"/>
//!     <sqlMapGenerator targetPackage="com.example.mapper" targetProject="MAPGEN"/>
//!     <table tableName="user" domainObjectName="User"/>
//!   </context>
//! </generatorConfiguration>
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, info};

use crate::environment::RunEnvironment;
use crate::generate::{
  ContextConfig, GeneratorConfig, GeneratorTarget, JdbcConnection, TableConfig, TargetKind, Warnings,
};

use super::properties::{PropertyScope, load_properties};
use super::{ConfigurationParser, ParseError};

const ROOT_ELEMENT: &str = "generatorConfiguration";

/// The default [`ConfigurationParser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlConfigurationParser;

impl XmlConfigurationParser {
  pub fn new() -> Self {
    Self
  }
}

/// Minimal element tree; text content is not needed by the configuration.
#[derive(Debug)]
struct Element {
  name: String,
  attributes: Vec<(String, String)>,
  children: Vec<Element>,
  line: usize,
}

impl Element {
  fn from_start(start: &BytesStart<'_>, line: usize) -> Result<Self, quick_xml::Error> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
      let attr = attr?;
      attributes.push((
        String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
        attr.unescape_value()?.into_owned(),
      ));
    }
    Ok(Self {
      name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
      attributes,
      children: Vec::new(),
      line,
    })
  }

  fn raw_attribute(&self, name: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(key, _)| key == name)
      .map(|(_, value)| value.as_str())
  }
}

fn line_at(doc: &str, offset: usize) -> usize {
  doc.as_bytes()[..offset.min(doc.len())]
    .iter()
    .filter(|&&b| b == b'\n')
    .count()
    + 1
}

/// Read the document into an element tree.
fn read_tree(doc: &str) -> Result<Element, String> {
  let mut reader = Reader::from_str(doc);
  let mut stack: Vec<Element> = Vec::new();
  let mut root = None;

  loop {
    let offset = reader.buffer_position();
    let event = reader
      .read_event()
      .map_err(|e| format!("malformed XML at line {}: {e}", line_at(doc, reader.buffer_position())))?;
    let attr_err = |e: quick_xml::Error| format!("malformed XML at line {}: {e}", line_at(doc, offset));

    match event {
      Event::Start(start) => stack.push(Element::from_start(&start, line_at(doc, offset)).map_err(attr_err)?),
      Event::Empty(start) => {
        let element = Element::from_start(&start, line_at(doc, offset)).map_err(attr_err)?;
        match stack.last_mut() {
          Some(parent) => parent.children.push(element),
          None => root = Some(element),
        }
      }
      Event::End(_) => {
        if let Some(element) = stack.pop() {
          match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => root = Some(element),
          }
        }
      }
      Event::Eof => break,
      _ => {}
    }
  }

  if let Some(open) = stack.last() {
    return Err(format!(
      "malformed XML: element <{}> opened at line {} is never closed",
      open.name, open.line
    ));
  }
  root.ok_or_else(|| "configuration document has no root element".to_string())
}

/// Accumulates errors and warnings while the tree is converted.
struct Builder<'a> {
  path: &'a Path,
  env: &'a RunEnvironment,
  errors: Vec<String>,
  unresolved: BTreeSet<String>,
}

impl<'a> Builder<'a> {
  fn error(&mut self, element: &Element, message: impl std::fmt::Display) {
    self.errors.push(format!("line {}: {message}", element.line));
  }

  fn attribute(&mut self, scope: PropertyScope<'_>, element: &Element, name: &str) -> Option<String> {
    element
      .raw_attribute(name)
      .map(|raw| scope.substitute(raw, &mut self.unresolved))
  }

  fn required(&mut self, scope: PropertyScope<'_>, element: &Element, name: &str) -> Option<String> {
    match self.attribute(scope, element, name) {
      Some(value) if !value.trim().is_empty() => Some(value),
      _ => {
        self.error(element, format!("<{}> requires attribute {name}", element.name));
        None
      }
    }
  }

  /// Load the document's `<properties>` element, if any.
  fn load_document_properties(&mut self, root: &Element) -> BTreeMap<String, String> {
    let declared: Vec<&Element> = root.children.iter().filter(|c| c.name == "properties").collect();
    let Some(&element) = declared.first() else {
      return BTreeMap::new();
    };
    if declared.len() > 1 {
      self.error(declared[1], "only one <properties> element is allowed");
    }

    let location = match (element.raw_attribute("resource"), element.raw_attribute("url")) {
      (Some(resource), None) => match self.env.find_resource(resource) {
        Some(path) => path,
        None => {
          self.error(element, format!("properties resource {resource} was not found"));
          return BTreeMap::new();
        }
      },
      (None, Some(url)) => match self.resolve_url(url) {
        Some(path) => path,
        None => {
          self.error(element, format!("unsupported properties url {url}"));
          return BTreeMap::new();
        }
      },
      _ => {
        self.error(element, "<properties> requires exactly one of the attributes resource or url");
        return BTreeMap::new();
      }
    };

    match load_properties(&location) {
      Ok(properties) => {
        debug!(path = %location.display(), count = properties.len(), "loaded configuration properties");
        properties
      }
      Err(e) => {
        self.error(element, format!("cannot read properties {}: {e}", location.display()));
        BTreeMap::new()
      }
    }
  }

  /// Plain paths and `file:` URLs; relative paths are anchored at the
  /// document's directory.
  fn resolve_url(&self, url: &str) -> Option<PathBuf> {
    let location = url
      .strip_prefix("file://")
      .or_else(|| url.strip_prefix("file:"))
      .unwrap_or(url);
    if location.contains("://") {
      return None;
    }
    let path = Path::new(location);
    Some(match self.path.parent() {
      Some(dir) if path.is_relative() => dir.join(path),
      _ => path.to_path_buf(),
    })
  }

  fn context(&mut self, scope: PropertyScope<'_>, element: &Element) -> Option<ContextConfig> {
    let id = self.required(scope, element, "id")?;
    let mut context = ContextConfig {
      id,
      target_runtime: self.attribute(scope, element, "targetRuntime"),
      ..ContextConfig::default()
    };

    for child in &element.children {
      match child.name.as_str() {
        "jdbcConnection" => {
          let driver_class = self.required(scope, child, "driverClass");
          let connection_url = self.required(scope, child, "connectionURL");
          if let (Some(driver_class), Some(connection_url)) = (driver_class, connection_url) {
            context.connection = Some(JdbcConnection {
              driver_class,
              connection_url,
              user_id: self.attribute(scope, child, "userId"),
              password: self.attribute(scope, child, "password"),
            });
          }
        }
        "table" => {
          if let Some(table_name) = self.required(scope, child, "tableName") {
            context.tables.push(TableConfig {
              catalog: self.attribute(scope, child, "catalog"),
              schema: self.attribute(scope, child, "schema"),
              table_name,
              domain_object_name: self.attribute(scope, child, "domainObjectName"),
            });
          }
        }
        name => match TargetKind::from_element_name(name) {
          Some(kind) => {
            let target_package = self.required(scope, child, "targetPackage");
            let target_project = self.required(scope, child, "targetProject");
            if let (Some(target_package), Some(target_project)) = (target_package, target_project) {
              context.targets.push(GeneratorTarget {
                kind,
                target_package,
                target_project,
              });
            }
          }
          None => debug!(element = name, context = %context.id, "ignoring configuration element"),
        },
      }
    }

    Some(context)
  }

  fn build(&mut self, root: &Element) -> GeneratorConfig {
    let properties = self.load_document_properties(root);
    let env = self.env;
    let host = env.properties();
    let scope = PropertyScope::new(&properties, host);

    let mut config = GeneratorConfig::default();
    let mut seen = HashSet::new();

    for child in &root.children {
      match child.name.as_str() {
        "properties" => {}
        "classPathEntry" => {
          if let Some(location) = self.required(scope, child, "location") {
            config.classpath_entries.push(PathBuf::from(location));
          }
        }
        "context" => {
          if let Some(context) = self.context(scope, child) {
            if seen.insert(context.id.clone()) {
              config.contexts.push(context);
            } else {
              self.error(child, format!("duplicate context id {}", context.id));
            }
          }
        }
        name => debug!(element = name, "ignoring configuration element"),
      }
    }

    if config.contexts.is_empty() && self.errors.is_empty() {
      self.error(root, "configuration declares no <context>");
    }

    config.properties = properties;
    config
  }
}

impl ConfigurationParser for XmlConfigurationParser {
  fn parse(&self, path: &Path, env: &RunEnvironment, warnings: &mut Warnings) -> Result<GeneratorConfig, ParseError> {
    info!(path = %path.display(), "parsing generator configuration");

    let doc = fs::read_to_string(path)
      .map_err(|e| ParseError::single(format!("cannot read {}: {e}", path.display())))?;
    let root = read_tree(&doc).map_err(ParseError::single)?;
    if root.name != ROOT_ELEMENT {
      return Err(ParseError::single(format!(
        "root element must be <{ROOT_ELEMENT}>, found <{}>",
        root.name
      )));
    }

    let mut builder = Builder {
      path,
      env,
      errors: Vec::new(),
      unresolved: BTreeSet::new(),
    };
    let config = builder.build(&root);

    if !builder.errors.is_empty() {
      return Err(ParseError { errors: builder.errors });
    }

    warnings.extend(
      builder
        .unresolved
        .into_iter()
        .map(|name| format!("Property ${{{name}}} is not defined and was left unresolved")),
    );
    debug!(contexts = config.contexts.len(), "generator configuration parsed");
    Ok(config)
  }
}
