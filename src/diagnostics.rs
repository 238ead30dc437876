//! Deferred semantic diagnostics.
//!
//! Semantic checks never abort translation. Each problem is queued here in the
//! order it was detected, and the program gate drains the whole queue at the end.

use std::collections::VecDeque;
use std::fmt;

/// A semantic error tied to the source line of the offending statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  pub line: usize,
  pub message: String,
}

impl Diagnostic {
  pub fn new(line: usize, message: impl Into<String>) -> Self {
    Self {
      line,
      message: message.into(),
    }
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ERROR in line {}: {}", self.line, self.message)
  }
}

/// FIFO of diagnostics owned by a single translation.
#[derive(Debug, Default)]
pub struct DiagnosticQueue {
  messages: VecDeque<Diagnostic>,
}

impl DiagnosticQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, diagnostic: Diagnostic) {
    tracing::debug!(line = diagnostic.line, text = %diagnostic.message, "queued diagnostic");
    self.messages.push_back(diagnostic);
  }

  pub fn is_empty(&self) -> bool {
    self.messages.is_empty()
  }

  pub fn len(&self) -> usize {
    self.messages.len()
  }

  /// Remove every queued diagnostic, oldest first.
  pub fn drain(&mut self) -> impl Iterator<Item = Diagnostic> + '_ {
    self.messages.drain(..)
  }
}
