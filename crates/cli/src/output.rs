//! Terminal output for run summaries.
//!
//! Command results go to stdout; failures and warnings go to stderr next to the
//! log lines, so `--format json` output stays parseable.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// How a summary line reads: what finished, what failed, what needs a look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
  Done,
  Failed,
  Attention,
  Note,
}

impl Mark {
  fn glyph(self) -> &'static str {
    match self {
      Mark::Done => "✓",
      Mark::Failed => "✗",
      Mark::Attention => "⚠",
      Mark::Note => "•",
    }
  }

  fn stream(self) -> Stream {
    match self {
      Mark::Done | Mark::Note => Stream::Stdout,
      Mark::Failed | Mark::Attention => Stream::Stderr,
    }
  }
}

/// Print one summary line headed by `mark`.
pub fn print_mark(mark: Mark, message: &str) {
  let raw = mark.glyph();
  let glyph = raw.if_supports_color(mark.stream(), |g| match mark {
    Mark::Done => g.green().to_string(),
    Mark::Failed => g.red().to_string(),
    Mark::Attention => g.yellow().to_string(),
    Mark::Note => g.blue().to_string(),
  });

  match mark {
    Mark::Done | Mark::Note => println!("{glyph} {message}"),
    Mark::Failed | Mark::Attention => eprintln!("{glyph} {message}"),
  }
}

/// An indented `label: value` line of a run summary.
pub fn print_field(label: &str, value: impl std::fmt::Display) {
  println!("  {}: {value}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()));
}

/// An indented lookup root or file.
pub fn print_path(path: &Path) {
  println!("  {} {}", Mark::Note.glyph(), path.display());
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize summary")?;
  println!("{json}");
  Ok(())
}

/// Run time as shown in the summary: `850ms`, `2.40s`, `1m 5s`.
pub fn format_elapsed(elapsed: Duration) -> String {
  let secs = elapsed.as_secs();
  match secs {
    0 => format!("{}ms", elapsed.subsec_millis()),
    1..60 => format!("{secs}.{:02}s", elapsed.subsec_millis() / 10),
    _ => format!("{}m {}s", secs / 60, secs % 60),
  }
}

pub fn yes_no(value: bool) -> &'static str {
  if value { "yes" } else { "no" }
}
