//! Shared error types used across the translation pipeline.
//!
//! Two channels never mix: lexical and syntax errors go straight to an
//! [`ErrorChannel`] the moment they are found, while semantic problems are
//! queued as [`Diagnostic`]s and flushed through the same channel only once the
//! whole program has been seen.

use std::path::PathBuf;

use snafu::Snafu;

use crate::diagnostics::Diagnostic;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("line {line}: invalid character '{ch}'"))]
  InvalidCharacter { line: usize, ch: char },

  #[snafu(display("line {line}: syntax error: expected {expected}, but got \"{got}\""))]
  Syntax {
    line: usize,
    expected: String,
    got: String,
  },

  #[snafu(display("syntax error: input ended before the program was complete"))]
  UnexpectedEof,

  #[snafu(display("{diagnostic}"))]
  Semantic { diagnostic: Diagnostic },

  #[snafu(display("compilation produced no output ({} error(s))", errors.len()))]
  Rejected { errors: Vec<CompileError> },

  #[snafu(display("{} is not a valid input file: names must end with \".ou\"", path.display()))]
  InvalidExtension { path: PathBuf },

  #[snafu(display("could not read {}: {source}", path.display()))]
  ReadSource {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("could not write {}: {source}", path.display()))]
  WriteOutput {
    path: PathBuf,
    source: std::io::Error,
  },
}

impl CompileError {
  /// Build a syntax error describing what the parser wanted at `line`.
  pub fn syntax(line: usize, expected: impl Into<String>, got: impl Into<String>) -> Self {
    Self::Syntax {
      line,
      expected: expected.into(),
      got: got.into(),
    }
  }

  pub fn is_semantic(&self) -> bool {
    matches!(self, Self::Semantic { .. })
  }
}

/// Sink for errors that are reported as soon as they are detected.
pub trait ErrorChannel {
  fn report(&mut self, error: CompileError);
}

impl ErrorChannel for Vec<CompileError> {
  fn report(&mut self, error: CompileError) {
    self.push(error);
  }
}

/// Writes every report to stderr immediately.
#[derive(Debug, Default)]
pub struct StderrChannel {
  reported: usize,
}

impl StderrChannel {
  pub fn reported(&self) -> usize {
    self.reported
  }
}

impl ErrorChannel for StderrChannel {
  fn report(&mut self, error: CompileError) {
    self.reported += 1;
    eprintln!("{error}");
  }
}
