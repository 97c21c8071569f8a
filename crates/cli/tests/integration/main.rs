//! CLI integration tests for mapgen.

mod common;

mod classpath_tests;
#[cfg(unix)]
mod generate_tests;
