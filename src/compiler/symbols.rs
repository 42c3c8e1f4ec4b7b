use crate::builtins;
use ahash::AHashMap as HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolScope {
  Global,
  Local,
  Free,
  Builtin,
  // The name of the function currently being compiled, for self-reference.
  Function,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
  pub name: String,
  pub scope: SymbolScope,
  pub index: usize,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
  outer: Option<Box<SymbolTable>>,
  store: HashMap<String, Symbol>,
  pub num_definitions: usize,
  free_symbols: Vec<Symbol>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// The root table of a fresh compiler, with every builtin pre-bound at
  /// its registry index.
  pub fn with_builtins() -> Self {
    let mut table = Self::new();
    for (index, builtin) in builtins::BUILTINS.iter().enumerate() {
      table.define_builtin(index, builtin.name);
    }
    table
  }

  pub fn is_global(&self) -> bool {
    self.outer.is_none()
  }

  /// Wrap this table as the outer scope of a new one.
  pub fn enclose(self) -> Self {
    Self {
      outer: Some(Box::new(self)),
      ..Self::default()
    }
  }

  /// Discard the innermost scope, returning the outer table and the free
  /// symbols the discarded scope captured, in capture order.
  pub fn pop(self) -> (Self, Vec<Symbol>) {
    let outer = self.outer.map_or_else(Self::default, |outer| *outer);
    (outer, self.free_symbols)
  }

  pub fn define(&mut self, name: &str) -> Symbol {
    let symbol = Symbol {
      name: name.to_string(),
      scope: if self.is_global() {
        SymbolScope::Global
      } else {
        SymbolScope::Local
      },
      index: self.num_definitions,
    };

    self.store.insert(name.to_string(), symbol.clone());
    self.num_definitions += 1;
    symbol
  }

  pub fn define_builtin(&mut self, index: usize, name: &'static str) -> Symbol {
    debug_assert!(self.is_global());

    let symbol = Symbol {
      name: name.to_string(),
      scope: SymbolScope::Builtin,
      index,
    };
    self.store.insert(name.to_string(), symbol.clone());
    symbol
  }

  pub fn define_function_name(&mut self, name: &str) -> Symbol {
    let symbol = Symbol {
      name: name.to_string(),
      scope: SymbolScope::Function,
      index: 0,
    };
    self.store.insert(name.to_string(), symbol.clone());
    symbol
  }

  fn define_free(&mut self, original: Symbol) -> Symbol {
    self.free_symbols.push(original.clone());

    let symbol = Symbol {
      name: original.name.clone(),
      scope: SymbolScope::Free,
      index: self.free_symbols.len() - 1,
    };

    // Memoised in the store, so resolving the same name again reuses the
    // existing capture slot.
    self.store.insert(original.name, symbol.clone());
    symbol
  }

  pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
    if let Some(symbol) = self.store.get(name) {
      return Some(symbol.clone());
    }

    let outer_symbol = self.outer.as_mut()?.resolve(name)?;
    match outer_symbol.scope {
      SymbolScope::Global | SymbolScope::Builtin => Some(outer_symbol),
      _ => Some(self.define_free(outer_symbol)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn should_define_globals_at_the_root() {
    let mut table = SymbolTable::new();

    let a = table.define("a");
    assert_eq!(a.scope, SymbolScope::Global);
    assert_eq!(a.index, 0);

    let b = table.define("b");
    assert_eq!(b.scope, SymbolScope::Global);
    assert_eq!(b.index, 1);
  }

  #[test]
  fn should_define_locals_in_enclosed_tables() {
    let mut table = SymbolTable::new();
    table.define("a");

    let mut table = table.enclose();
    let b = table.define("b");
    assert_eq!(b.scope, SymbolScope::Local);
    assert_eq!(b.index, 0);
  }

  #[test]
  fn should_resolve_globals_through_nested_scopes() {
    let mut table = SymbolTable::new();
    table.define("a");
    let mut table = table.enclose().enclose();

    let a = table.resolve("a").unwrap();
    assert_eq!(a.scope, SymbolScope::Global);
    assert_eq!(a.index, 0);
  }

  #[test]
  fn should_convert_enclosing_locals_to_free() {
    let mut table = SymbolTable::new();
    table.define("a");

    let mut middle = table.enclose();
    middle.define("b");

    let mut inner = middle.enclose();
    inner.define("c");

    let a = inner.resolve("a").unwrap();
    assert_eq!(a.scope, SymbolScope::Global);

    let b = inner.resolve("b").unwrap();
    assert_eq!(b.scope, SymbolScope::Free);
    assert_eq!(b.index, 0);

    let c = inner.resolve("c").unwrap();
    assert_eq!(c.scope, SymbolScope::Local);

    let (_, free) = inner.pop();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].name, "b");
    assert_eq!(free[0].scope, SymbolScope::Local);
  }

  #[test]
  fn should_reuse_free_slots_for_repeat_resolutions() {
    let mut table = SymbolTable::new().enclose();
    table.define("a");

    let mut inner = table.enclose();
    let first = inner.resolve("a").unwrap();
    let second = inner.resolve("a").unwrap();

    assert_eq!(first, second);
    let (_, free) = inner.pop();
    assert_eq!(free.len(), 1);
  }

  #[test]
  fn should_capture_free_variables_transitively() {
    let mut table = SymbolTable::new().enclose();
    table.define("a");

    let middle = table.enclose();
    let mut inner = middle.enclose();

    let a = inner.resolve("a").unwrap();
    assert_eq!(a.scope, SymbolScope::Free);

    let (middle, free) = inner.pop();
    assert_eq!(free[0].scope, SymbolScope::Free);

    let (_, free) = middle.pop();
    assert_eq!(free[0].scope, SymbolScope::Local);
  }

  #[test]
  fn should_resolve_builtins_everywhere_without_capture() {
    let mut table = SymbolTable::new();
    table.define_builtin(0, "len");

    let mut inner = table.enclose().enclose();
    let len = inner.resolve("len").unwrap();
    assert_eq!(len.scope, SymbolScope::Builtin);
    assert_eq!(len.index, 0);

    let (_, free) = inner.pop();
    assert!(free.is_empty());
  }

  #[test]
  fn should_resolve_function_name_in_own_scope() {
    let mut table = SymbolTable::new().enclose();
    table.define_function_name("outer");

    let outer = table.resolve("outer").unwrap();
    assert_eq!(outer.scope, SymbolScope::Function);
  }

  #[test]
  fn should_shadow_function_name_with_later_definition() {
    let mut table = SymbolTable::new().enclose();
    table.define_function_name("f");
    table.define("f");

    let f = table.resolve("f").unwrap();
    assert_eq!(f.scope, SymbolScope::Local);
  }

  #[test]
  fn should_capture_enclosing_function_name_as_free() {
    let mut outer = SymbolTable::new().enclose();
    outer.define_function_name("outer");

    let mut inner = outer.enclose();
    let symbol = inner.resolve("outer").unwrap();
    assert_eq!(symbol.scope, SymbolScope::Free);
  }

  #[test]
  fn should_seed_builtin_registry() {
    let mut table = SymbolTable::with_builtins();

    let len = table.resolve("len").unwrap();
    assert_eq!(len.scope, SymbolScope::Builtin);
    assert_eq!(len.index, 0);

    let push = table.resolve("push").unwrap();
    assert_eq!(push.index, 5);
  }
}
