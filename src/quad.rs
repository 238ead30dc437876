//! The quad instruction set and its textual rendering.
//!
//! Every instruction prints as one line: a typed opcode followed by its
//! operands, a bare `label:` line, or one of the untyped control opcodes.

use std::fmt;

use crate::ty::Primitive;

/// Typed arithmetic opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl ArithOp {
  pub fn mnemonic(self) -> &'static str {
    match self {
      ArithOp::Add => "ADD",
      ArithOp::Sub => "SUB",
      ArithOp::Mul => "MLT",
      ArithOp::Div => "DIV",
    }
  }

  /// Map an ADDOP/MULOP lexeme onto its opcode.
  pub fn from_symbol(symbol: &str) -> Option<Self> {
    match symbol {
      "+" => Some(ArithOp::Add),
      "-" => Some(ArithOp::Sub),
      "*" => Some(ArithOp::Mul),
      "/" => Some(ArithOp::Div),
      _ => None,
    }
  }
}

/// Comparisons the machine implements directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
  Eql,
  Nql,
  Lss,
  Grt,
}

impl CompareOp {
  pub fn mnemonic(self) -> &'static str {
    match self {
      CompareOp::Eql => "EQL",
      CompareOp::Nql => "NQL",
      CompareOp::Lss => "LSS",
      CompareOp::Grt => "GRT",
    }
  }
}

/// Relational operators as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
  Eq,
  Ne,
  Lt,
  Gt,
  Le,
  Ge,
}

impl RelOp {
  pub fn from_symbol(symbol: &str) -> Option<Self> {
    match symbol {
      "==" => Some(RelOp::Eq),
      "!=" => Some(RelOp::Ne),
      "<" => Some(RelOp::Lt),
      ">" => Some(RelOp::Gt),
      "<=" => Some(RelOp::Le),
      ">=" => Some(RelOp::Ge),
      _ => None,
    }
  }
}

/// A value slot: a declared variable, a temporary, or a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
  Name(String),
  Numeral(String),
}

impl Operand {
  pub fn name(name: impl Into<String>) -> Self {
    Operand::Name(name.into())
  }

  pub fn numeral(text: impl Into<String>) -> Self {
    Operand::Numeral(text.into())
  }
}

impl fmt::Display for Operand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operand::Name(name) => f.write_str(name),
      Operand::Numeral(text) => f.write_str(text),
    }
  }
}

/// One line of quad code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
  Assign {
    ty: Primitive,
    dst: String,
    src: Operand,
  },
  Arith {
    op: ArithOp,
    ty: Primitive,
    dst: String,
    lhs: Operand,
    rhs: Operand,
  },
  Compare {
    op: CompareOp,
    ty: Primitive,
    dst: String,
    lhs: Operand,
    rhs: Operand,
  },
  Convert {
    from: Primitive,
    to: Primitive,
    dst: String,
    src: Operand,
  },
  Input {
    ty: Primitive,
    dst: String,
  },
  Print {
    ty: Primitive,
    src: Operand,
  },
  Jump {
    target: String,
  },
  JumpIfZero {
    target: String,
    cond: Operand,
  },
  Label(String),
  Halt,
}

impl fmt::Display for Instr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Instr::Assign { ty, dst, src } => write!(f, "{ty}ASN {dst} {src}"),
      Instr::Arith {
        op,
        ty,
        dst,
        lhs,
        rhs,
      } => write!(f, "{ty}{} {dst} {lhs} {rhs}", op.mnemonic()),
      Instr::Compare {
        op,
        ty,
        dst,
        lhs,
        rhs,
      } => write!(f, "{ty}{} {dst} {lhs} {rhs}", op.mnemonic()),
      Instr::Convert { from, to, dst, src } => write!(f, "{from}TO{to} {dst} {src}"),
      Instr::Input { ty, dst } => write!(f, "{ty}INP {dst}"),
      Instr::Print { ty, src } => write!(f, "{ty}PRT {src}"),
      Instr::Jump { target } => write!(f, "JUMP {target}"),
      Instr::JumpIfZero { target, cond } => write!(f, "JMPZ {target} {cond}"),
      Instr::Label(name) => write!(f, "{name}:"),
      Instr::Halt => f.write_str("HALT"),
    }
  }
}

/// Synthesized attribute of an expression: the code computing it and the
/// operand that holds the result afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadResult {
  pub code: Vec<Instr>,
  pub value: Operand,
}

impl QuadResult {
  pub fn new(code: Vec<Instr>, value: Operand) -> Self {
    Self { code, value }
  }

  /// A leaf: a name or literal that needs no code.
  pub fn leaf(value: Operand) -> Self {
    Self {
      code: Vec::new(),
      value,
    }
  }
}

/// A finished program, always terminated by `HALT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
  instrs: Vec<Instr>,
}

impl Program {
  pub fn new(mut body: Vec<Instr>) -> Self {
    body.push(Instr::Halt);
    Self { instrs: body }
  }

  pub fn instrs(&self) -> &[Instr] {
    &self.instrs
  }
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for instr in &self.instrs {
      writeln!(f, "{instr}")?;
    }
    Ok(())
  }
}
