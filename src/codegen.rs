//! Semantic actions: type reconciliation and quad emission.
//!
//! Each helper consumes the synthesized results of its children and returns a
//! new one; nothing is patched after the fact. Booleans are integer 0/1 values
//! and are combined with plain arithmetic opcodes.

use crate::diagnostics::{Diagnostic, DiagnosticQueue};
use crate::quad::{ArithOp, CompareOp, Instr, Operand, Program, QuadResult, RelOp};
use crate::symtab::SymbolTable;
use crate::ty::Primitive;

/// State owned by one translation: the symbol table and the deferred queue.
#[derive(Debug, Default)]
pub struct CodeGen {
  symbols: SymbolTable,
  diagnostics: DiagnosticQueue,
}

impl CodeGen {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  pub fn diagnostics(&self) -> &DiagnosticQueue {
    &self.diagnostics
  }

  pub fn diagnostics_mut(&mut self) -> &mut DiagnosticQueue {
    &mut self.diagnostics
  }

  /// Populate the table; declarations never emit code.
  pub fn declare(&mut self, names: &[String], ty: Primitive) {
    for name in names {
      tracing::debug!(symbol = %name, ty = ty.keyword(), "declared");
      self.symbols.declare(name, ty);
    }
  }

  fn error(&mut self, line: usize, message: impl Into<String>) {
    self.diagnostics.push(Diagnostic::new(line, message));
  }

  fn operand_type(&mut self, line: usize, operand: &Operand) -> Option<Primitive> {
    let ty = self.symbols.lookup_type(operand);
    if ty.is_none() {
      self.error(line, format!("Cannot determine type of {operand}."));
    }
    ty
  }

  fn temp(&mut self, ty: Primitive) -> (String, Operand) {
    let name = self.symbols.fresh_temp(ty);
    let operand = Operand::name(name.clone());
    (name, operand)
  }

  /// Choose the operating type of a binary operation. When the operand types
  /// differ the integer side is widened into a fresh real temporary.
  fn reconcile(
    &mut self,
    line: usize,
    lhs: Operand,
    rhs: Operand,
    code: &mut Vec<Instr>,
  ) -> (Primitive, Operand, Operand) {
    let left = self.operand_type(line, &lhs);
    let right = self.operand_type(line, &rhs);
    // An unknown side takes the other side's type so no cast is invented for it.
    let left = left.or(right).unwrap_or(Primitive::Int);
    let right = right.unwrap_or(left);

    match (left, right) {
      (Primitive::Int, Primitive::Real) => {
        let widened = self.widen(lhs, code);
        (Primitive::Real, widened, rhs)
      }
      (Primitive::Real, Primitive::Int) => {
        let widened = self.widen(rhs, code);
        (Primitive::Real, lhs, widened)
      }
      (ty, _) => (ty, lhs, rhs),
    }
  }

  fn widen(&mut self, operand: Operand, code: &mut Vec<Instr>) -> Operand {
    let (dst, widened) = self.temp(Primitive::Real);
    code.push(Instr::Convert {
      from: Primitive::Int,
      to: Primitive::Real,
      dst,
      src: operand,
    });
    widened
  }

  /// `lhs op rhs` for `+ - * /`.
  pub fn arith(&mut self, line: usize, op: ArithOp, lhs: QuadResult, rhs: QuadResult) -> QuadResult {
    let mut code = lhs.code;
    code.extend(rhs.code);
    let (ty, a, b) = self.reconcile(line, lhs.value, rhs.value, &mut code);
    let (dst, value) = self.temp(ty);
    code.push(Instr::Arith {
      op,
      ty,
      dst,
      lhs: a,
      rhs: b,
    });
    QuadResult::new(code, value)
  }

  /// Relational comparison producing an integer 0/1. `<=` and `>=` have no
  /// opcode of their own and expand to `(a == b) || (a < b)` and its mirror.
  pub fn relational(&mut self, line: usize, op: RelOp, lhs: QuadResult, rhs: QuadResult) -> QuadResult {
    let mut code = lhs.code;
    code.extend(rhs.code);
    let (ty, a, b) = self.reconcile(line, lhs.value, rhs.value, &mut code);

    let direct = match op {
      RelOp::Eq => Some(CompareOp::Eql),
      RelOp::Ne => Some(CompareOp::Nql),
      RelOp::Lt => Some(CompareOp::Lss),
      RelOp::Gt => Some(CompareOp::Grt),
      RelOp::Le | RelOp::Ge => None,
    };
    if let Some(cmp) = direct {
      let value = self.compare(cmp, ty, a, b, &mut code);
      return QuadResult::new(code, value);
    }

    let strict = match op {
      RelOp::Le => CompareOp::Lss,
      _ => CompareOp::Grt,
    };
    let equal = self.compare(CompareOp::Eql, ty, a.clone(), b.clone(), &mut code);
    let ordered = self.compare(strict, ty, a, b, &mut code);
    let either = self.or(QuadResult::leaf(equal), QuadResult::leaf(ordered));
    code.extend(either.code);
    QuadResult::new(code, either.value)
  }

  fn compare(
    &mut self,
    op: CompareOp,
    ty: Primitive,
    lhs: Operand,
    rhs: Operand,
    code: &mut Vec<Instr>,
  ) -> Operand {
    let (dst, value) = self.temp(Primitive::Int);
    code.push(Instr::Compare {
      op,
      ty,
      dst,
      lhs,
      rhs,
    });
    value
  }

  /// `(x + y) > 0`.
  pub fn or(&mut self, lhs: QuadResult, rhs: QuadResult) -> QuadResult {
    let mut code = lhs.code;
    code.extend(rhs.code);
    let (dst, value) = self.temp(Primitive::Int);
    code.push(Instr::Arith {
      op: ArithOp::Add,
      ty: Primitive::Int,
      dst: dst.clone(),
      lhs: lhs.value,
      rhs: rhs.value,
    });
    code.push(Instr::Compare {
      op: CompareOp::Grt,
      ty: Primitive::Int,
      dst,
      lhs: value.clone(),
      rhs: Operand::numeral("0"),
    });
    QuadResult::new(code, value)
  }

  /// `x * y`.
  pub fn and(&mut self, lhs: QuadResult, rhs: QuadResult) -> QuadResult {
    let mut code = lhs.code;
    code.extend(rhs.code);
    let (dst, value) = self.temp(Primitive::Int);
    code.push(Instr::Arith {
      op: ArithOp::Mul,
      ty: Primitive::Int,
      dst,
      lhs: lhs.value,
      rhs: rhs.value,
    });
    QuadResult::new(code, value)
  }

  /// `1 - x`.
  pub fn not(&mut self, operand: QuadResult) -> QuadResult {
    let mut code = operand.code;
    let (dst, value) = self.temp(Primitive::Int);
    code.push(Instr::Arith {
      op: ArithOp::Sub,
      ty: Primitive::Int,
      dst,
      lhs: Operand::numeral("1"),
      rhs: operand.value,
    });
    QuadResult::new(code, value)
  }

  /// Explicit `cast<int>` / `cast<float>`; always emits the conversion.
  pub fn cast(&mut self, line: usize, target: Primitive, operand: QuadResult) -> QuadResult {
    self.operand_type(line, &operand.value);
    let from = match target {
      Primitive::Int => Primitive::Real,
      Primitive::Real => Primitive::Int,
    };
    let mut code = operand.code;
    let (dst, value) = self.temp(target);
    code.push(Instr::Convert {
      from,
      to: target,
      dst,
      src: operand.value,
    });
    QuadResult::new(code, value)
  }

  /// `name = expr;`. Types must match exactly; on any error the whole
  /// statement is dropped.
  pub fn assign(&mut self, line: usize, name: &str, expr: QuadResult) -> Vec<Instr> {
    let Some(target) = self.symbols.get(name) else {
      self.error(line, format!("Unknown type for {name}."));
      return Vec::new();
    };
    let Some(source) = self.operand_type(line, &expr.value) else {
      return Vec::new();
    };
    if target != source {
      self.error(line, "Operands must be of same type.");
      return Vec::new();
    }

    let mut code = expr.code;
    code.push(Instr::Assign {
      ty: target,
      dst: name.to_string(),
      src: expr.value,
    });
    code
  }

  pub fn input(&mut self, line: usize, name: &str) -> Vec<Instr> {
    match self.symbols.get(name) {
      Some(ty) => vec![Instr::Input {
        ty,
        dst: name.to_string(),
      }],
      None => {
        self.error(line, format!("Unknown type for {name}."));
        Vec::new()
      }
    }
  }

  pub fn output(&mut self, line: usize, expr: QuadResult) -> Vec<Instr> {
    let Some(ty) = self.operand_type(line, &expr.value) else {
      return Vec::new();
    };
    let mut code = expr.code;
    code.push(Instr::Print {
      ty,
      src: expr.value,
    });
    code
  }

  /// ```text
  ///   <cond>
  ///   JMPZ else cond
  ///   <then>
  ///   JUMP end
  /// else:
  ///   <otherwise>
  /// end:
  /// ```
  pub fn if_else(&mut self, cond: QuadResult, then: Vec<Instr>, otherwise: Vec<Instr>) -> Vec<Instr> {
    let else_label = self.symbols.fresh_label();
    let end_label = self.symbols.fresh_label();

    let mut code = cond.code;
    code.push(Instr::JumpIfZero {
      target: else_label.clone(),
      cond: cond.value,
    });
    code.extend(then);
    code.push(Instr::Jump {
      target: end_label.clone(),
    });
    code.push(Instr::Label(else_label));
    code.extend(otherwise);
    code.push(Instr::Label(end_label));
    code
  }

  /// Test-at-bottom loop:
  ///
  /// ```text
  ///   JUMP test
  /// start:
  ///   <body>
  /// test:
  ///   <cond>
  ///   ISUB cond 1 cond
  ///   JMPZ start cond
  /// ```
  pub fn while_loop(&mut self, cond: QuadResult, body: Vec<Instr>) -> Vec<Instr> {
    let start_label = self.symbols.fresh_label();
    let test_label = self.symbols.fresh_label();

    let mut code = vec![
      Instr::Jump {
        target: test_label.clone(),
      },
      Instr::Label(start_label.clone()),
    ];
    code.extend(body);
    code.push(Instr::Label(test_label));
    code.extend(cond.code);

    // Conditions are always integer temporaries, so the flag is negated in place.
    let flag = match &cond.value {
      Operand::Name(name) => name.clone(),
      Operand::Numeral(_) => self.symbols.fresh_temp(Primitive::Int),
    };
    code.push(Instr::Arith {
      op: ArithOp::Sub,
      ty: Primitive::Int,
      dst: flag.clone(),
      lhs: Operand::numeral("1"),
      rhs: cond.value,
    });
    code.push(Instr::JumpIfZero {
      target: start_label,
      cond: Operand::name(flag),
    });
    code
  }

  /// The diagnostics gate: any queued diagnostic suppresses the program and
  /// is handed back, oldest first.
  pub fn finish(&mut self, body: Vec<Instr>) -> Result<Program, Vec<Diagnostic>> {
    if self.diagnostics.is_empty() {
      return Ok(Program::new(body));
    }
    tracing::debug!(count = self.diagnostics.len(), "output suppressed by diagnostics");
    Err(self.diagnostics.drain().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn gen_with(decls: &[(&str, Primitive)]) -> CodeGen {
    let mut generator = CodeGen::new();
    for (name, ty) in decls {
      generator.declare(&[name.to_string()], *ty);
    }
    generator
  }

  fn var(name: &str) -> QuadResult {
    QuadResult::leaf(Operand::name(name))
  }

  fn lines(code: &[Instr]) -> Vec<String> {
    code.iter().map(ToString::to_string).collect()
  }

  #[test]
  fn same_types_need_no_cast() {
    let mut generator = gen_with(&[("a", Primitive::Int), ("b", Primitive::Int)]);
    let sum = generator.arith(1, ArithOp::Add, var("a"), var("b"));
    assert_eq!(lines(&sum.code), vec!["IADD t0 a b"]);
    assert_eq!(sum.value, Operand::name("t0"));
    assert_eq!(generator.symbols().get("t0"), Some(Primitive::Int));
  }

  #[test]
  fn mixed_operands_widen_the_integer_side() {
    let mut generator = gen_with(&[("i", Primitive::Int), ("r", Primitive::Real)]);
    let product = generator.arith(1, ArithOp::Mul, var("r"), var("i"));
    assert_eq!(lines(&product.code), vec!["ITOR t0 i", "RMLT t1 r t0"]);
    assert_eq!(generator.symbols().get("t1"), Some(Primitive::Real));

    let diff = generator.arith(1, ArithOp::Sub, QuadResult::leaf(Operand::numeral("2")), var("r"));
    assert_eq!(lines(&diff.code), vec!["ITOR t2 2", "RSUB t3 t2 r"]);
  }

  #[test]
  fn comparisons_yield_integer_flags() {
    let mut generator = gen_with(&[("x", Primitive::Real), ("y", Primitive::Real)]);
    let less = generator.relational(1, RelOp::Lt, var("x"), var("y"));
    assert_eq!(lines(&less.code), vec!["RLSS t0 x y"]);
    assert_eq!(generator.symbols().get("t0"), Some(Primitive::Int));
  }

  #[test]
  fn greater_or_equal_expands_into_two_compares_and_an_or() {
    let mut generator = gen_with(&[("a", Primitive::Int), ("b", Primitive::Int)]);
    let ge = generator.relational(1, RelOp::Ge, var("a"), var("b"));
    assert_eq!(
      lines(&ge.code),
      vec!["IEQL t0 a b", "IGRT t1 a b", "IADD t2 t0 t1", "IGRT t2 t2 0"]
    );
    assert_eq!(ge.value, Operand::name("t2"));

    let le = generator.relational(1, RelOp::Le, var("a"), var("b"));
    assert_eq!(
      lines(&le.code),
      vec!["IEQL t3 a b", "ILSS t4 a b", "IADD t5 t3 t4", "IGRT t5 t5 0"]
    );
  }

  #[test]
  fn boolean_connectives_are_arithmetic() {
    let mut generator = gen_with(&[("p", Primitive::Int), ("q", Primitive::Int)]);
    assert_eq!(lines(&generator.and(var("p"), var("q")).code), vec!["IMLT t0 p q"]);
    assert_eq!(
      lines(&generator.or(var("p"), var("q")).code),
      vec!["IADD t1 p q", "IGRT t1 t1 0"]
    );
    assert_eq!(lines(&generator.not(var("p")).code), vec!["ISUB t2 1 p"]);
  }

  #[test]
  fn explicit_casts_always_convert() {
    let mut generator = gen_with(&[("i", Primitive::Int)]);
    let to_int = generator.cast(1, Primitive::Int, var("i"));
    assert_eq!(lines(&to_int.code), vec!["RTOI t0 i"]);
    let to_real = generator.cast(1, Primitive::Real, var("i"));
    assert_eq!(lines(&to_real.code), vec!["ITOR t1 i"]);
    assert_eq!(generator.symbols().get("t1"), Some(Primitive::Real));
  }

  #[test]
  fn cast_keeps_the_operand_code() {
    let mut generator = gen_with(&[("a", Primitive::Real), ("b", Primitive::Real)]);
    let sum = generator.arith(1, ArithOp::Add, var("a"), var("b"));
    let cast = generator.cast(1, Primitive::Int, sum);
    assert_eq!(lines(&cast.code), vec!["RADD t0 a b", "RTOI t1 t0"]);
  }

  #[test]
  fn assignment_mismatch_is_queued_and_dropped() {
    let mut generator = gen_with(&[("x", Primitive::Int), ("y", Primitive::Real)]);
    let code = generator.assign(4, "x", var("y"));
    assert!(code.is_empty());
    let queued: Vec<String> = generator.diagnostics_mut().drain().map(|d| d.to_string()).collect();
    assert_eq!(queued, vec!["ERROR in line 4: Operands must be of same type."]);
  }

  #[test]
  fn assignment_of_matching_type_emits_asn() {
    let mut generator = gen_with(&[("x", Primitive::Real)]);
    let code = generator.assign(1, "x", QuadResult::leaf(Operand::numeral("1.5")));
    assert_eq!(lines(&code), vec!["RASN x 1.5"]);
  }

  #[test]
  fn undeclared_names_are_diagnosed() {
    let mut generator = gen_with(&[("a", Primitive::Int)]);
    assert!(generator.input(2, "ghost").is_empty());
    assert!(generator.output(3, var("phantom")).is_empty());
    assert!(generator.assign(5, "nobody", var("a")).is_empty());

    let queued: Vec<String> = generator.diagnostics_mut().drain().map(|d| d.to_string()).collect();
    assert_eq!(
      queued,
      vec![
        "ERROR in line 2: Unknown type for ghost.",
        "ERROR in line 3: Cannot determine type of phantom.",
        "ERROR in line 5: Unknown type for nobody.",
      ]
    );
  }

  #[test]
  fn input_and_output_are_typed() {
    let mut generator = gen_with(&[("r", Primitive::Real)]);
    assert_eq!(lines(&generator.input(1, "r")), vec!["RINP r"]);
    assert_eq!(
      lines(&generator.output(1, QuadResult::leaf(Operand::numeral("3")))),
      vec!["IPRT 3"]
    );
  }

  #[test]
  fn if_else_layout() {
    let mut generator = gen_with(&[("a", Primitive::Int)]);
    let cond = generator.relational(1, RelOp::Eq, var("a"), QuadResult::leaf(Operand::numeral("0")));
    let then = generator.input(1, "a");
    let otherwise = generator.output(1, var("a"));
    let code = generator.if_else(cond, then, otherwise);
    assert_eq!(
      lines(&code),
      vec![
        "IEQL t0 a 0",
        "JMPZ L0 t0",
        "IINP a",
        "JUMP L1",
        "L0:",
        "IPRT a",
        "L1:"
      ]
    );
  }

  #[test]
  fn while_tests_at_the_bottom() {
    let mut generator = gen_with(&[("n", Primitive::Int)]);
    let body = generator.input(1, "n");
    let cond = generator.relational(1, RelOp::Gt, var("n"), QuadResult::leaf(Operand::numeral("0")));
    let code = generator.while_loop(cond, body);
    assert_eq!(
      lines(&code),
      vec![
        "JUMP L1",
        "L0:",
        "IINP n",
        "L1:",
        "IGRT t0 n 0",
        "ISUB t0 1 t0",
        "JMPZ L0 t0"
      ]
    );
  }

  #[test]
  fn finish_gates_on_diagnostics() {
    let mut clean = CodeGen::new();
    let program = clean.finish(Vec::new()).map(|p| p.to_string());
    assert_eq!(program, Ok("HALT\n".to_string()));

    let mut dirty = CodeGen::new();
    dirty.input(1, "a");
    dirty.input(2, "b");
    let diagnostics = dirty.finish(Vec::new()).err().unwrap_or_default();
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].line, 1);
    assert!(dirty.diagnostics().is_empty());
  }

  #[test]
  fn cast_of_undeclared_name_is_diagnosed() {
    let mut generator = CodeGen::new();
    generator.cast(6, Primitive::Int, var("ghost"));
    let queued: Vec<String> = generator.diagnostics_mut().drain().map(|d| d.to_string()).collect();
    assert_eq!(queued, vec!["ERROR in line 6: Cannot determine type of ghost."]);
  }

  #[test]
  fn unknown_arithmetic_operand_takes_the_other_side_type() {
    let mut generator = gen_with(&[("r", Primitive::Real)]);
    let sum = generator.arith(2, ArithOp::Add, var("z"), var("r"));
    assert_eq!(lines(&sum.code), vec!["RADD t0 z r"]);
    assert_eq!(generator.symbols().get("t0"), Some(Primitive::Real));

    let both_unknown = generator.arith(3, ArithOp::Mul, var("p"), var("q"));
    assert_eq!(lines(&both_unknown.code), vec!["IMLT t1 p q"]);
    assert_eq!(generator.symbols().get("t1"), Some(Primitive::Int));

    let queued: Vec<String> = generator.diagnostics_mut().drain().map(|d| d.to_string()).collect();
    assert_eq!(
      queued,
      vec![
        "ERROR in line 2: Cannot determine type of z.",
        "ERROR in line 3: Cannot determine type of p.",
        "ERROR in line 3: Cannot determine type of q.",
      ]
    );
  }

  #[test]
  fn unknown_relational_operand_compares_with_the_known_type() {
    let mut generator = gen_with(&[("x", Primitive::Real)]);
    let cmp = generator.relational(4, RelOp::Lt, var("x"), var("w"));
    assert_eq!(lines(&cmp.code), vec!["RLSS t0 x w"]);
    assert_eq!(generator.symbols().get("t0"), Some(Primitive::Int));

    let queued: Vec<String> = generator.diagnostics_mut().drain().map(|d| d.to_string()).collect();
    assert_eq!(queued, vec!["ERROR in line 4: Cannot determine type of w."]);
  }
}
