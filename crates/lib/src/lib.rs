//! mapgen-lib: Core types and logic for mapgen
//!
//! This crate runs a source-code generator as one step of a larger build:
//! - `environment`: lookup roots the generator may see, and the ambient context guard
//! - `filter`: table and context filters parsed from delimited text
//! - `script`: optional SQL script executed before generation
//! - `parse`: configuration document parsing
//! - `generate`: the generator engine seam, write policy and progress reporting
//! - `run`: the coordinator that sequences a run and aggregates its outcome
//! - `integrate`: registration of generated output with the host build

pub mod config;
pub mod consts;
pub mod diagnostics;
pub mod environment;
pub mod filter;
pub mod generate;
pub mod integrate;
pub mod parse;
pub mod project;
pub mod run;
pub mod script;
pub mod util;
