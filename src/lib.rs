//! Enact front-end library: lexer, typename parser, Pratt expression/
//! statement parser, and the two-pass semantic analyzer.
//!
//! Exposed as a library crate (in addition to the `enact` binary) so the
//! binary and `tests/integration.rs` both drive the same pipeline —
//! `src/main.rs` calls into `src/lib.rs`-exported modules rather than
//! duplicating pipeline logic in the binary.

pub mod ast;
pub mod ast_printer;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod sema;
pub mod token;
pub mod ty;
pub mod typename;

use ast::Module;
use diagnostics::CompileContext;
use sema::decls::SemaDecls;
use sema::defs::SemaDefs;

/// Which phase of the pipeline a compilation stopped at without reaching a
/// fully type-checked module (§7 "The session returns a result enumeration
/// `{ok, parse-error, analysis-error, compile-error, runtime-error}`").
///
/// `CompileError`/`RuntimeError` name phases this crate does not implement
/// (bytecode emission and the VM, §1 "Explicitly out of scope") — no
/// pipeline stage here ever produces them, but the variants are kept so a
/// downstream emitter can extend this enum's matching code without a
/// breaking rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    ParseError,
    AnalysisError,
    CompileError,
    RuntimeError,
}

/// Runs the full front-end pipeline over one compilation unit: lex + parse,
/// then (if parsing produced no errors) `SemaDecls` followed by `SemaDefs`.
///
/// Mirrors `CompileContext`'s ordering guarantee (§5: "SemaDecls completes
/// before SemaDefs begins") and the propagation policy of §7: a phase that
/// reports any error skips the next phase rather than running it against a
/// malformed tree.
pub fn compile(source: &str) -> (CompileContext, Module, Outcome) {
    let mut ctx = CompileContext::new(source);
    let mut module = parser::parse(&mut ctx, source);

    if ctx.had_error() {
        return (ctx, module, Outcome::ParseError);
    }

    let globals = SemaDecls::run(&mut ctx, &module);
    if ctx.had_error() {
        return (ctx, module, Outcome::AnalysisError);
    }

    SemaDefs::run(&mut ctx, &mut module, &globals);
    let outcome = if ctx.had_error() {
        Outcome::AnalysisError
    } else {
        Outcome::Ok
    };
    (ctx, module, outcome)
}

/// Renders every diagnostic accumulated on `ctx` via [`CompileContext::render`],
/// in the order they were reported.
pub fn render_diagnostics(ctx: &CompileContext) -> String {
    ctx.diagnostics()
        .iter()
        .map(|d| ctx.render(d))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders every diagnostic accumulated on `ctx` as a JSON document, for
/// the CLI's `--json` flag — a `diagnostics` array plus a `count`, built
/// with `serde_json::json!` rather than a bespoke `Serialize` struct since
/// the shape is small and call-site-local.
pub fn render_diagnostics_json(ctx: &CompileContext) -> String {
    let items: Vec<serde_json::Value> = ctx
        .diagnostics()
        .iter()
        .map(|d| {
            serde_json::json!({
                "kind": d.kind.to_string(),
                "line": d.token.pos.line,
                "col": d.token.pos.col,
                "message": d.message,
            })
        })
        .collect();

    let output = serde_json::json!({
        "diagnostics": items,
        "count": ctx.diagnostics().len(),
    });

    serde_json::to_string_pretty(&output).expect("serde_json::Value is always serialisable")
}
