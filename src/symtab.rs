//! Symbol table plus the temporary and label generators.
//!
//! There is a single flat scope. Temporaries are bound here exactly like
//! declared variables so later type lookups need not tell them apart.

use std::collections::HashMap;

use crate::quad::Operand;
use crate::ty::Primitive;

#[derive(Debug, Default)]
pub struct SymbolTable {
  types: HashMap<String, Primitive>,
  next_temp: usize,
  next_label: usize,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Bind `name` to `ty`. A second declaration silently replaces the first.
  pub fn declare(&mut self, name: &str, ty: Primitive) {
    if let Some(previous) = self.types.insert(name.to_string(), ty)
      && previous != ty
    {
      tracing::debug!(symbol = %name, from = %previous, to = %ty, "redeclaration replaced type");
    }
  }

  pub fn get(&self, name: &str) -> Option<Primitive> {
    self.types.get(name).copied()
  }

  /// Numerals are typed by their spelling, names by the table.
  pub fn lookup_type(&self, operand: &Operand) -> Option<Primitive> {
    match operand {
      Operand::Numeral(text) => Some(Primitive::of_numeral(text)),
      Operand::Name(name) => self.get(name),
    }
  }

  /// Allocate the next unused `tN` name and bind it to `ty`.
  pub fn fresh_temp(&mut self, ty: Primitive) -> String {
    loop {
      let candidate = format!("t{}", self.next_temp);
      self.next_temp += 1;
      if !self.types.contains_key(&candidate) {
        tracing::trace!(temp = %candidate, %ty, "new temporary");
        self.types.insert(candidate.clone(), ty);
        return candidate;
      }
    }
  }

  pub fn fresh_label(&mut self) -> String {
    let label = format!("L{}", self.next_label);
    self.next_label += 1;
    label
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn numerals_need_no_binding() {
    let table = SymbolTable::new();
    assert_eq!(table.lookup_type(&Operand::numeral("7")), Some(Primitive::Int));
    assert_eq!(table.lookup_type(&Operand::numeral("7.0")), Some(Primitive::Real));
    assert_eq!(table.lookup_type(&Operand::name("x")), None);
  }

  #[test]
  fn redeclaration_overwrites() {
    let mut table = SymbolTable::new();
    table.declare("x", Primitive::Int);
    table.declare("x", Primitive::Real);
    assert_eq!(table.get("x"), Some(Primitive::Real));
  }

  #[test]
  fn temporaries_are_typed_and_skip_user_names() {
    let mut table = SymbolTable::new();
    table.declare("t1", Primitive::Real);

    let first = table.fresh_temp(Primitive::Int);
    let second = table.fresh_temp(Primitive::Real);
    assert_eq!(first, "t0");
    assert_eq!(second, "t2");
    assert_eq!(table.get("t0"), Some(Primitive::Int));
    assert_eq!(table.get("t1"), Some(Primitive::Real));
    assert_eq!(table.lookup_type(&Operand::name("t2")), Some(Primitive::Real));
  }

  #[test]
  fn labels_use_their_own_counter() {
    let mut table = SymbolTable::new();
    table.fresh_temp(Primitive::Int);
    assert_eq!(table.fresh_label(), "L0");
    assert_eq!(table.fresh_label(), "L1");
    assert_eq!(table.fresh_temp(Primitive::Int), "t1");
  }
}
