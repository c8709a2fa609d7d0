//! Lexical scopes of the function being generated.

use minic_ir::Value;
use minic_parser::ast::TypeName;
use std::collections::HashMap;

/// Storage of a parameter or local variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Local {
    pub ty: TypeName,
    /// Address of the `alloca` slot.
    pub ptr: Value,
}

/// A stack of name to storage maps. The innermost scope is the last one.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, Local>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Drops every scope. Used when leaving a function, including on error.
    pub fn clear(&mut self) {
        self.scopes.clear();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Binds `name` in the innermost scope.
    /// Returns `false` (and binds nothing) if the innermost scope already has `name`.
    pub fn declare(&mut self, name: &str, local: Local) -> bool {
        match self.scopes.last_mut() {
            Some(scope) if !scope.contains_key(name) => {
                scope.insert(name.to_string(), local);
                true
            }
            _ => false,
        }
    }

    /// Finds the innermost binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<Local> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minic_ir::{Reg, Type};

    fn local(ty: TypeName, reg: u32) -> Local {
        Local {
            ty,
            ptr: Value::Reg(Reg(reg), Type::Ptr),
        }
    }

    #[test]
    fn test_shadowing_is_confined_to_scope() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        assert!(scopes.declare("x", local(TypeName::Int, 0)));

        scopes.push();
        assert!(scopes.declare("x", local(TypeName::Float, 1)));
        assert_eq!(scopes.lookup("x"), Some(local(TypeName::Float, 1)));
        scopes.pop();

        assert_eq!(scopes.lookup("x"), Some(local(TypeName::Int, 0)));
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        assert!(scopes.declare("x", local(TypeName::Int, 0)));
        assert!(!scopes.declare("x", local(TypeName::Bool, 1)));
        assert_eq!(scopes.lookup("x"), Some(local(TypeName::Int, 0)));
    }

    #[test]
    fn test_declare_without_scope_fails() {
        let mut scopes = ScopeStack::new();
        assert!(!scopes.declare("x", local(TypeName::Int, 0)));
        assert_eq!(scopes.lookup("x"), None);

        scopes.push();
        scopes.push();
        assert_eq!(scopes.depth(), 2);
        scopes.clear();
        assert_eq!(scopes.depth(), 0);
    }
}
