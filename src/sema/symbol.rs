//! Scope stack and variable bindings used by `SemaDefs`.
//!
//! A flat per-file name set (like `names.rs`'s `collect_stmt_names`, which
//! only needed to know a name existed) isn't enough here: Enact's block
//! expressions nest and shadow (§4.5 "Scoping"), so this is a real lexical
//! scope stack instead.

use crate::ty::Type;
use std::collections::HashMap;

/// Whether a binding may be reassigned after its initializing expression
/// runs (§3: "immutable bindings may not be reassigned; the boxed form is
/// single-assignment"). Only `Immutable`/`Mutable` are reachable from
/// surface syntax today — `imm`/`mut` are the only two binding keywords the
/// lexer knows (§9) — `SingleAssignmentBoxed` is named here because the
/// resolved binding model described in the design notes has three states,
/// but nothing in this front-end constructs it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Immutable,
    SingleAssignmentBoxed,
    Mutable,
}

#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub ty: Type,
    pub mutability: Mutability,
    pub initialized: bool,
}

/// A name bound in some scope: either a value (`VariableInfo`) or a type
/// reachable as a value too (a struct's own name denotes its constructor,
/// see `crate::sema::defs`).
#[derive(Debug, Clone)]
pub enum Binding {
    Variable(VariableInfo),
}

#[derive(Default)]
struct Scope {
    bindings: HashMap<String, Binding>,
}

/// A stack of scopes, innermost last. The bottom frame is the module's
/// global scope and is never popped.
pub struct SymbolTable {
    frames: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            frames: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.frames.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        assert!(self.frames.len() > 1, "cannot pop the global scope");
        self.frames.pop();
    }

    /// Declares into the innermost scope, shadowing any outer binding of
    /// the same name. Used for locals (params, `for` loop variables,
    /// `imm`/`mut` statements inside a block) where redeclaration is
    /// ordinary shadowing, not an error.
    pub fn declare(&mut self, name: impl Into<String>, binding: Binding) {
        self.frames
            .last_mut()
            .expect("at least one scope frame")
            .bindings
            .insert(name.into(), binding);
    }

    /// Declares into the outermost (global) scope. Returns `false` if the
    /// name is already bound there — `SemaDecls` has already rejected
    /// global redeclarations by the time `SemaDefs` runs, so this is only
    /// ever expected to succeed.
    pub fn declare_global(&mut self, name: impl Into<String>, binding: Binding) -> bool {
        let globals = &mut self.frames[0].bindings;
        let name = name.into();
        if globals.contains_key(&name) {
            return false;
        }
        globals.insert(name, binding);
        true
    }

    pub fn resolve(&self, name: &str) -> Option<&Binding> {
        self.frames
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name))
    }

    pub fn resolve_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|scope| scope.bindings.get_mut(name))
    }
}
