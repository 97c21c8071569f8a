//! Test utilities for mapgen-lib.

use crate::generate::CommandEngine;

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// A command engine whose generator program is `script`, run by the shell.
pub fn shell_engine(script: &str) -> CommandEngine {
  let (program, args) = shell_cmd(script);
  CommandEngine::new(program).with_args(args)
}
