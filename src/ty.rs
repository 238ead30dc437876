use std::fmt;

/// The two value kinds of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
  Int,
  Real,
}

impl Primitive {
  /// Single-letter prefix carried by typed opcodes (`IADD`, `RPRT`, ...).
  pub fn prefix(self) -> char {
    match self {
      Primitive::Int => 'I',
      Primitive::Real => 'R',
    }
  }

  /// Type of a numeral written in source: anything with a decimal point is real.
  pub fn of_numeral(text: &str) -> Self {
    if text.contains('.') {
      Primitive::Real
    } else {
      Primitive::Int
    }
  }

  pub fn keyword(self) -> &'static str {
    match self {
      Primitive::Int => "int",
      Primitive::Real => "float",
    }
  }
}

impl fmt::Display for Primitive {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.prefix())
  }
}
