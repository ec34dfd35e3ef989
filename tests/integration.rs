//! End-to-end scenarios (`spec.md` §8, S1-S6) driven two ways: directly
//! against the library's `compile()` entry point, and as a subprocess
//! against the `enact` binary for the CLI-level contracts (exit codes,
//! file I/O, REPL) that only the binary exposes.

use enactc::{compile, diagnostics::ErrorKind, render_diagnostics, Outcome};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn enact_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_enact"))
}

// ── S1: minimal function, inferred body type ─────────────────────────────────

#[test]
fn s1_minimal_function_inferred_body_type() {
    let (ctx, module, outcome) = compile("func add(a int, b int) int { a + b }");
    assert_eq!(outcome, Outcome::Ok, "{}", render_diagnostics(&ctx));
    assert_eq!(module.decls.len(), 1);

    let enactc::ast::Stmt::Function(f) = &module.decls[0] else {
        panic!("expected a FunctionStmt");
    };
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.return_typename.name(), "int");

    let body = f.body.as_ref().expect("function body required");
    let enactc::ast::ExprKind::Block { expr, .. } = &body.kind else {
        panic!("function body must be a block expression");
    };
    assert_eq!(expr.ty.as_ref().unwrap().to_typename().name(), "int");
}

// ── S2: immutable reassignment error ─────────────────────────────────────────

#[test]
fn s2_immutable_reassignment_error() {
    let (ctx, _module, outcome) = compile("imm x = 3; x = 4;");
    assert_eq!(outcome, Outcome::AnalysisError);
    let diags = ctx.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, ErrorKind::ImmutabilityError);
    assert!(diags[0].message.contains('x'), "{}", diags[0].message);
}

#[test]
fn mut_reassignment_is_allowed() {
    let (ctx, _module, outcome) = compile("mut x = 3; x = 4;");
    assert_eq!(outcome, Outcome::Ok, "{}", render_diagnostics(&ctx));
}

// ── S3: trait conformance ─────────────────────────────────────────────────────

#[test]
fn s3_trait_conformance() {
    let source = r#"
trait Show { func render() string; }
struct P { name string; }
impl Show for P { func render() string { "p" } }
"#;
    let (ctx, _module, outcome) = compile(source);
    assert_eq!(outcome, Outcome::Ok, "{}", render_diagnostics(&ctx));
}

// ── S4: missing method breaks trait conformance ──────────────────────────────

#[test]
fn s4_missing_trait_method() {
    let source = r#"
trait Show { func render() string; }
struct P { name string; }
impl Show for P { }
"#;
    let (ctx, _module, outcome) = compile(source);
    assert_eq!(outcome, Outcome::AnalysisError);
    let diags = ctx.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, ErrorKind::TraitNotSatisfied);
    assert!(diags[0].message.contains("render"), "{}", diags[0].message);
    assert!(diags[0].message.contains("Show"), "{}", diags[0].message);
}

// ── S5: precedence and associativity ─────────────────────────────────────────

#[test]
fn s5_precedence_and_associativity() {
    let (ctx, module, outcome) =
        compile("imm x = 1 + 2 * 3 == 7 and not false;");
    assert_eq!(outcome, Outcome::Ok, "{}", render_diagnostics(&ctx));

    let enactc::ast::Stmt::Variable { initializer, .. } = &module.decls[0] else {
        panic!("expected a Variable stmt");
    };
    assert_eq!(
        initializer.ty.as_ref().unwrap().to_typename().name(),
        "bool"
    );

    // `((1 + (2 * 3)) == 7) and (not false)`
    let enactc::ast::ExprKind::Logical { left, right, .. } = &initializer.kind else {
        panic!("top-level operator must be `and`");
    };
    let enactc::ast::ExprKind::Binary { left: eq_left, .. } = &left.kind else {
        panic!("left of `and` must be `==`");
    };
    let enactc::ast::ExprKind::Binary { oper, .. } = &eq_left.kind else {
        panic!("left of `==` must be `+`");
    };
    assert_eq!(oper.lexeme, "+");
    let enactc::ast::ExprKind::Unary { oper, .. } = &right.kind else {
        panic!("right of `and` must be `not false`");
    };
    assert_eq!(oper.lexeme, "not");
}

// ── S6: string interpolation ──────────────────────────────────────────────────

#[test]
fn s6_string_interpolation() {
    let source = r#"imm name = "al"; imm age = 9; imm s = "hi \(name), age \(age)";"#;
    let (ctx, module, outcome) = compile(source);
    assert_eq!(outcome, Outcome::Ok, "{}", render_diagnostics(&ctx));

    let enactc::ast::Stmt::Variable { initializer, .. } = &module.decls[2] else {
        panic!("expected the third statement to be `s`'s declaration");
    };
    assert_eq!(
        initializer.ty.as_ref().unwrap().to_typename().name(),
        "string"
    );
    let enactc::ast::ExprKind::Interpolation(parts) = &initializer.kind else {
        panic!("expected an Interpolation expression");
    };
    let expr_parts: Vec<_> = parts
        .iter()
        .filter_map(|p| match p {
            enactc::ast::InterpPart::Expr(e) => Some(e),
            enactc::ast::InterpPart::Str(_) => None,
        })
        .collect();
    assert_eq!(expr_parts.len(), 2, "expected two spliced expressions");
}

// ── additional analyzer contracts ────────────────────────────────────────────

#[test]
fn call_argument_count_mismatch_is_type_error() {
    let (ctx, _module, outcome) = compile("func f(a int) int { a } imm x = f(1, 2);");
    assert_eq!(outcome, Outcome::AnalysisError);
    assert_eq!(ctx.diagnostics()[0].kind, ErrorKind::TypeError);
}

#[test]
fn break_outside_loop_is_flow_error() {
    let (ctx, _module, outcome) = compile("func f() int { break; 0 }");
    assert_eq!(outcome, Outcome::AnalysisError);
    assert!(ctx
        .diagnostics()
        .iter()
        .any(|d| d.kind == ErrorKind::FlowError));
}

#[test]
fn return_type_mismatch_is_type_error() {
    let (ctx, _module, outcome) = compile(r#"func f() int { return "oops"; }"#);
    assert_eq!(outcome, Outcome::AnalysisError);
    assert!(ctx
        .diagnostics()
        .iter()
        .any(|d| d.kind == ErrorKind::TypeError));
}

#[test]
fn syntax_error_synchronises_and_keeps_parsing() {
    // A malformed struct is followed by a well-formed function; the parser
    // must recover and still see the second top-level declaration.
    let (ctx, module, outcome) = compile("struct { x int; } func ok() int { 1 }");
    assert_eq!(outcome, Outcome::ParseError);
    assert!(ctx.had_error());
    assert!(module
        .decls
        .iter()
        .any(|d| matches!(d, enactc::ast::Stmt::Function(f) if f.name.lexeme == "ok")));
}

#[test]
fn redeclaration_at_global_scope_is_name_error() {
    let (ctx, _module, outcome) = compile("struct P { x int; } struct P { y int; }");
    assert_eq!(outcome, Outcome::AnalysisError);
    assert!(ctx
        .diagnostics()
        .iter()
        .any(|d| d.kind == ErrorKind::NameError));
}

#[test]
fn diagnostic_rendering_has_caret_and_message() {
    let (ctx, _module, outcome) = compile("imm x = 3; x = 4;");
    assert_eq!(outcome, Outcome::AnalysisError);
    let rendered = render_diagnostics(&ctx);
    assert!(rendered.contains("[line 1] Error at '=':"));
    assert!(rendered.contains('^'));
}

// ── CLI (binary subprocess) ───────────────────────────────────────────────────

fn write_temp(name: &str, content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn cli_exit_code_0_on_clean_file() {
    let (_dir, path) = write_temp("ok.enact", "func add(a int, b int) int { a + b }");
    let status = Command::new(enact_bin()).arg(&path).status().unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn cli_exit_code_76_on_analysis_error() {
    let (_dir, path) = write_temp("bad.enact", "imm x = 3; x = 4;");
    let status = Command::new(enact_bin()).arg(&path).status().unwrap();
    assert_eq!(status.code(), Some(76));
}

#[test]
fn cli_exit_code_75_on_parse_error() {
    let (_dir, path) = write_temp("bad.enact", "struct { x int; }");
    let status = Command::new(enact_bin()).arg(&path).status().unwrap();
    assert_eq!(status.code(), Some(75));
}

#[test]
fn cli_exit_code_70_on_missing_file() {
    let status = Command::new(enact_bin())
        .arg("/nonexistent/path/to/nothing.enact")
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(70));
}

#[test]
fn cli_exit_code_65_on_unknown_flag() {
    let status = Command::new(enact_bin())
        .arg("--not-a-real-flag")
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(65));
}

#[test]
fn cli_prints_diagnostics_to_stderr() {
    let (_dir, path) = write_temp("bad.enact", "imm x = 3; x = 4;");
    let out = Command::new(enact_bin()).arg(&path).output().unwrap();
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("cannot"), "{stderr}");
}

#[test]
fn cli_json_flag_emits_parseable_diagnostic_json() {
    let (_dir, path) = write_temp("bad.enact", "imm x = 3; x = 4;");
    let out = Command::new(enact_bin())
        .arg(&path)
        .arg("--json")
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&out.stderr);
    let parsed: serde_json::Value = serde_json::from_str(&stderr).expect("valid JSON");
    assert_eq!(parsed["count"], 1);
    assert_eq!(parsed["diagnostics"][0]["kind"], "ImmutabilityError");
}

#[test]
fn cli_debug_print_ast_flag_prints_ast() {
    let (_dir, path) = write_temp("ok.enact", "func main() int { 0 }");
    let out = Command::new(enact_bin())
        .arg(&path)
        .arg("--debug-print-ast")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("(func main() int"), "{stdout}");
}

#[test]
fn cli_repl_compiles_one_line_at_a_time() {
    let mut child = Command::new(enact_bin())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"imm x = 1 + 2;\n")
        .unwrap();
    drop(child.stdin.take());

    let out = child.wait_with_output().unwrap();
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("enact > "));
}
