//! Crate root: wires together the translation pipeline.
//!
//! - `tokenizer` scans the source into a lazy token stream.
//! - `parser` drives the grammar and calls into `codegen` as each production completes.
//! - `codegen` holds the semantic actions, backed by `symtab` and `diagnostics`.
//! - `quad` models the emitted instructions.
//! - `error` centralises error types and the immediate error channel.

pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod parser;
pub mod quad;
pub mod symtab;
pub mod tokenizer;
pub mod ty;

pub use diagnostics::Diagnostic;
pub use error::{CompileError, CompileResult, ErrorChannel, StderrChannel};
pub use quad::Program;

/// Outcome of translating one source text.
#[derive(Debug)]
pub struct Translation {
  /// The quad program, or `None` if a syntax or semantic error was reported.
  pub quad: Option<String>,
  /// Every reported error in the order it reached the channel.
  pub errors: Vec<CompileError>,
}

impl Translation {
  pub fn semantic_errors(&self) -> impl Iterator<Item = &CompileError> {
    self.errors.iter().filter(|err| err.is_semantic())
  }
}

/// Translate `source`, reporting errors to `channel` as they are found.
pub fn translate_into(source: &str, channel: &mut dyn ErrorChannel) -> Option<String> {
  parser::Translator::new(source, channel)
    .run()
    .map(|program| program.to_string())
}

/// Translate `source`, collecting every reported error.
pub fn translate(source: &str) -> Translation {
  let mut errors: Vec<CompileError> = Vec::new();
  let quad = translate_into(source, &mut errors);
  Translation { quad, errors }
}

/// Translate `source` into quad code, failing when no program was produced.
///
/// Invalid characters are skipped by the scanner and do not by themselves
/// suppress output; use [`translate`] to see them alongside a program.
pub fn compile_to_quad(source: &str) -> CompileResult<String> {
  let Translation { quad, errors } = translate(source);
  quad.ok_or(CompileError::Rejected { errors })
}
