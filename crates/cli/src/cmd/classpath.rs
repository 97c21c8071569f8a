//! Implementation of the `mapgen classpath` command.
//!
//! Shows which lookup roots a run with the same scope flags would expose to
//! the generator, and which resource directories property files are resolved
//! against.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mapgen_lib::config::RunConfig;
use mapgen_lib::environment::{resolve_classpath, resource_context};

use crate::output::{Mark, OutputFormat, print_field, print_json, print_mark, print_path};

use super::load_project;

#[derive(Debug, Args)]
pub struct ClasspathArgs {
  /// Host project model
  #[arg(long, env = "MAPGEN_PROJECT", default_value = "mapgen-project.json")]
  pub project: PathBuf,

  /// Expose compile-scope dependencies to the generator
  #[arg(long, env = "MAPGEN_INCLUDE_COMPILE_DEPENDENCIES")]
  pub include_compile_dependencies: bool,

  /// Expose dependencies of every scope to the generator
  #[arg(long, env = "MAPGEN_INCLUDE_ALL_DEPENDENCIES")]
  pub include_all_dependencies: bool,
}

pub fn cmd_classpath(args: &ClasspathArgs, format: OutputFormat) -> Result<()> {
  let (model, _) = load_project(&args.project)?;
  let config = RunConfig {
    include_compile_dependencies: args.include_compile_dependencies,
    include_all_dependencies: args.include_all_dependencies,
    ..RunConfig::with_defaults(&model.basedir, &model.build.directory)
  };

  let classpath = resolve_classpath(&config, &model).context("Cannot resolve generator classpath")?;
  let resources = resource_context(&model);

  if format.is_json() {
    return print_json(&serde_json::json!({
      "classpath": classpath.as_ref().map(|c| c.entries().collect::<Vec<_>>()),
      "resources": resources.entries().collect::<Vec<_>>(),
    }));
  }

  match &classpath {
    None => print_mark(
      Mark::Note,
      "No dependency scope requested; the generator sees the ambient lookup context",
    ),
    Some(entries) => {
      print_mark(Mark::Done, &format!("Classpath: {} entries", entries.len()));
      entries.entries().for_each(print_path);
    }
  }

  println!();
  print_field("Resource directories", resources.len());
  resources.entries().for_each(print_path);

  Ok(())
}
