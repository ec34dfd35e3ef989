//! First semantic pass: register every top-level name before resolving any
//! type.
//!
//! Mirrors `analyze.rs`'s "Pass 1 (parallel): per-file checks" — there,
//! pass 1 walks each file collecting definitions before pass 2
//! cross-references them. Here there is one file, so pass 1 collects
//! top-level declarations instead of per-file ones, but the two-pass shape
//! (collect names, then resolve against the full set) is the same idea
//! (§4.4).

use crate::ast::{Module, Stmt};
use crate::diagnostics::{CompileContext, ErrorKind};
use crate::token::Token;
use std::collections::HashMap;

/// Which kind of top-level declaration a name refers to, and the index of
/// that declaration within `Module::decls` — `SemaDefs` re-borrows the
/// declaration by index rather than this pass cloning it out.
#[derive(Debug, Clone, Copy)]
pub enum GlobalDeclKind {
    Struct(usize),
    Enum(usize),
    Trait(usize),
    Function(usize),
    Variable(usize),
}

pub type GlobalTable = HashMap<String, GlobalDeclKind>;

pub struct SemaDecls;

impl SemaDecls {
    /// Walks `module.decls` once, registering every name introduced at the
    /// top level. Does not descend into function bodies, variable
    /// initializers, or impl blocks — those are resolved by `SemaDefs`,
    /// which needs the full name set built here before it can resolve a
    /// single typename (§9: two-pass semantic analysis).
    pub fn run(ctx: &mut CompileContext, module: &Module) -> GlobalTable {
        let mut globals = GlobalTable::new();

        for (i, stmt) in module.decls.iter().enumerate() {
            let (name, kind): (&Token, GlobalDeclKind) = match stmt {
                Stmt::Struct { name, .. } => (name, GlobalDeclKind::Struct(i)),
                Stmt::Enum { name, .. } => (name, GlobalDeclKind::Enum(i)),
                Stmt::Trait { name, .. } => (name, GlobalDeclKind::Trait(i)),
                Stmt::Function(f) => (&f.name, GlobalDeclKind::Function(i)),
                Stmt::Variable { name, .. } => (name, GlobalDeclKind::Variable(i)),
                // `impl` introduces no new name of its own; it attaches
                // methods to a name declared elsewhere (resolved in
                // `SemaDefs`, once every struct/trait name is known).
                Stmt::Impl { .. } => continue,
                Stmt::Return { keyword, .. } => {
                    ctx.error(
                        ErrorKind::SyntaxError,
                        keyword.clone(),
                        "'return' is not allowed at the top level.",
                    );
                    continue;
                }
                Stmt::Break { keyword, .. } => {
                    ctx.error(
                        ErrorKind::SyntaxError,
                        keyword.clone(),
                        "'break' is not allowed at the top level.",
                    );
                    continue;
                }
                Stmt::Continue { keyword } => {
                    ctx.error(
                        ErrorKind::SyntaxError,
                        keyword.clone(),
                        "'continue' is not allowed at the top level.",
                    );
                    continue;
                }
                // A bare expression statement is a legal top-level
                // declaration (mirrors the original driver's implicit
                // top-level script scope, §6 REPL: one line is "a complete
                // compilation unit") — it introduces no name, so nothing
                // to register here; `SemaDefs` analyzes it in place.
                Stmt::Expression { .. } => continue,
            };

            if let Some(existing) = globals.get(&name.lexeme) {
                let _ = existing;
                ctx.error(
                    ErrorKind::NameError,
                    name.clone(),
                    format!("'{}' is already declared at the top level.", name.lexeme),
                );
                continue;
            }

            globals.insert(name.lexeme.clone(), kind);
        }

        globals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CompileContext;
    use crate::parser;

    fn globals_of(src: &str) -> (GlobalTable, bool) {
        let mut ctx = CompileContext::new(src);
        let module = parser::parse(&mut ctx, src);
        let globals = SemaDecls::run(&mut ctx, &module);
        (globals, ctx.had_error())
    }

    #[test]
    fn test_collects_struct_and_function_names() {
        let (globals, had_error) = globals_of("struct Point { x int; y int; }\nfunc main() int { 0 }");
        assert!(!had_error);
        assert!(matches!(globals.get("Point"), Some(GlobalDeclKind::Struct(_))));
        assert!(matches!(globals.get("main"), Some(GlobalDeclKind::Function(_))));
    }

    #[test]
    fn test_duplicate_top_level_name_is_name_error() {
        let (_, had_error) = globals_of("func add() int { 0 }\nfunc add() int { 1 }");
        assert!(had_error);
    }

    #[test]
    fn test_top_level_expression_statement_introduces_no_name() {
        let (globals, had_error) = globals_of("1 + 1;");
        assert!(!had_error);
        assert!(globals.is_empty());
    }
}
