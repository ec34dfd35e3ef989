//! Indented s-expression AST dump, reachable via `--debug-print-ast`.
//!
//! Grounded on `original_source/lib/AstPrinter.cpp`: that printer walks the
//! original visitor-based `Stmt`/`Expr` hierarchy, accumulating an indent
//! string as it recurses into blocks and printing `(Kind ...)` groups. This
//! is the same shape over the tagged-variant AST (`crate::ast`) — a `match`
//! takes the place of the visitor double-dispatch, since there's no need
//! for one here (§9 "Polymorphic AST").

use crate::ast::{Expr, ExprKind, FunctionStmt, InterpPart, Module, Pattern, Stmt};

pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    for stmt in &module.decls {
        print_stmt(stmt, 0, &mut out);
        out.push('\n');
    }
    out
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn print_function(f: &FunctionStmt, depth: usize, out: &mut String) {
    indent(depth, out);
    out.push_str(&format!(
        "(func {}({}) {}",
        f.name.lexeme,
        f.params
            .iter()
            .map(|p| format!("{} {}", p.name.lexeme, p.typename.name()))
            .collect::<Vec<_>>()
            .join(", "),
        f.return_typename.name(),
    ));
    match &f.body {
        Some(body) => {
            out.push('\n');
            print_expr(body, depth + 1, out);
            out.push('\n');
            indent(depth, out);
            out.push(')');
        }
        None => out.push(')'),
    }
}

fn print_stmt(stmt: &Stmt, depth: usize, out: &mut String) {
    indent(depth, out);
    match stmt {
        Stmt::Break { value, .. } => {
            out.push_str("(Stmt::Break");
            if let Some(v) = value {
                out.push(' ');
                let mut inner = String::new();
                print_expr(v, 0, &mut inner);
                out.push_str(inner.trim_start());
            }
            out.push(')');
        }
        Stmt::Continue { .. } => out.push_str("(Stmt::Continue)"),
        Stmt::Enum { name, variants } => {
            out.push_str(&format!("(Stmt::Enum {}", name.lexeme));
            for v in variants {
                out.push_str(&format!(
                    " ({}{})",
                    v.name.lexeme,
                    v.typename.as_ref().map(|t| format!(" {}", t.name())).unwrap_or_default()
                ));
            }
            out.push(')');
        }
        Stmt::Expression { expr } => {
            out.push_str("(Stmt::Expression\n");
            print_expr(expr, depth + 1, out);
            out.push('\n');
            indent(depth, out);
            out.push(')');
        }
        Stmt::Function(f) => {
            let mut body = String::new();
            print_function(f, depth, &mut body);
            out.push_str(body.trim_start());
        }
        Stmt::Impl {
            typename,
            trait_typename,
            methods,
        } => {
            out.push_str(&format!("(Stmt::Impl {}", typename.name()));
            if let Some(t) = trait_typename {
                out.push_str(&format!(" : {}", t.name()));
            }
            out.push_str(" (\n");
            for m in methods {
                print_function(m, depth + 1, out);
                out.push('\n');
            }
            indent(depth, out);
            out.push(')');
            out.push(')');
        }
        Stmt::Return { value, .. } => {
            out.push_str("(Stmt::Return");
            if let Some(v) = value {
                out.push(' ');
                let mut inner = String::new();
                print_expr(v, 0, &mut inner);
                out.push_str(inner.trim_start());
            }
            out.push(')');
        }
        Stmt::Struct { name, fields } => {
            out.push_str(&format!("(Stmt::Struct {}", name.lexeme));
            for field in fields {
                out.push_str(&format!(" ({} {})", field.name.lexeme, field.typename.name()));
            }
            out.push(')');
        }
        Stmt::Trait { name, methods } => {
            out.push_str(&format!("(Stmt::Trait {} (\n", name.lexeme));
            for m in methods {
                print_function(m, depth + 1, out);
                out.push('\n');
            }
            indent(depth, out);
            out.push(')');
            out.push(')');
        }
        Stmt::Variable { name, typename, initializer, .. } => {
            if typename.is_empty() {
                out.push_str(&format!("(Stmt::Variable {}\n", name.lexeme));
            } else {
                out.push_str(&format!(
                    "(Stmt::Variable {} {}\n",
                    name.lexeme,
                    typename.name(),
                ));
            }
            print_expr(initializer, depth + 1, out);
            out.push('\n');
            indent(depth, out);
            out.push(')');
        }
    }
}

fn print_expr(expr: &Expr, depth: usize, out: &mut String) {
    indent(depth, out);
    match &expr.kind {
        ExprKind::Integer(v) => out.push_str(&format!("(Expr::Integer {v})")),
        ExprKind::Float(v) => out.push_str(&format!("(Expr::Float {v})")),
        ExprKind::Str(s) => out.push_str(&format!("(Expr::Str {s:?})")),
        ExprKind::Interpolation(parts) => {
            out.push_str("(Expr::Interpolation");
            for part in parts {
                match part {
                    InterpPart::Str(s) => out.push_str(&format!(" {s:?}")),
                    InterpPart::Expr(e) => {
                        out.push(' ');
                        let mut inner = String::new();
                        print_expr(e, 0, &mut inner);
                        out.push_str(&inner);
                    }
                }
            }
            out.push(')');
        }
        ExprKind::Boolean(v) => out.push_str(&format!("(Expr::Boolean {v})")),
        ExprKind::Nothing => out.push_str("(Expr::Nothing)"),
        ExprKind::Unit => out.push_str("(Expr::Unit)"),
        ExprKind::Symbol(tok) => out.push_str(&format!("(Expr::Symbol {})", tok.lexeme)),
        ExprKind::Group(e) => {
            out.push_str("(Expr::Group ");
            let mut inner = String::new();
            print_expr(e, 0, &mut inner);
            out.push_str(&inner);
            out.push(')');
        }
        ExprKind::Tuple(elems) => {
            out.push_str("(Expr::Tuple");
            for e in elems {
                out.push(' ');
                let mut inner = String::new();
                print_expr(e, 0, &mut inner);
                out.push_str(&inner);
            }
            out.push(')');
        }
        ExprKind::Unary { oper, operand } => {
            out.push_str(&format!("(Expr::Unary {} ", oper.lexeme));
            let mut inner = String::new();
            print_expr(operand, 0, &mut inner);
            out.push_str(&inner);
            out.push(')');
        }
        ExprKind::Reference { oper, operand, .. } => {
            out.push_str(&format!("(Expr::Reference {} ", oper.lexeme));
            let mut inner = String::new();
            print_expr(operand, 0, &mut inner);
            out.push_str(&inner);
            out.push(')');
        }
        ExprKind::Binary { left, oper, right } => {
            out.push_str(&format!("(Expr::Binary {} ", oper.lexeme));
            let mut l = String::new();
            print_expr(left, 0, &mut l);
            out.push_str(&l);
            out.push(' ');
            let mut r = String::new();
            print_expr(right, 0, &mut r);
            out.push_str(&r);
            out.push(')');
        }
        ExprKind::Logical { left, oper, right } => {
            out.push_str(&format!("(Expr::Logical {} ", oper.lexeme));
            let mut l = String::new();
            print_expr(left, 0, &mut l);
            out.push_str(&l);
            out.push(' ');
            let mut r = String::new();
            print_expr(right, 0, &mut r);
            out.push_str(&r);
            out.push(')');
        }
        ExprKind::Range { start, end, inclusive, .. } => {
            out.push_str(&format!("(Expr::Range {} ", if *inclusive { "..=" } else { ".." }));
            let mut s = String::new();
            print_expr(start, 0, &mut s);
            out.push_str(&s);
            out.push(' ');
            let mut e = String::new();
            print_expr(end, 0, &mut e);
            out.push_str(&e);
            out.push(')');
        }
        ExprKind::Cast {
            value,
            typename,
            is_type_check,
            ..
        } => {
            let op = if *is_type_check { "is" } else { "as" };
            out.push_str(&format!("(Expr::Cast {op} {} ", typename.name()));
            let mut inner = String::new();
            print_expr(value, 0, &mut inner);
            out.push_str(&inner);
            out.push(')');
        }
        ExprKind::Assign { target, value, .. } => {
            out.push_str("(Expr::Assign ");
            let mut t = String::new();
            print_expr(target, 0, &mut t);
            out.push_str(&t);
            out.push(' ');
            let mut v = String::new();
            print_expr(value, 0, &mut v);
            out.push_str(&v);
            out.push(')');
        }
        ExprKind::Call { callee, arguments, .. } => {
            out.push_str("(Expr::Call ");
            let mut c = String::new();
            print_expr(callee, 0, &mut c);
            out.push_str(&c);
            for a in arguments {
                out.push(' ');
                let mut inner = String::new();
                print_expr(a, 0, &mut inner);
                out.push_str(&inner);
            }
            out.push(')');
        }
        ExprKind::Get { object, name, .. } => {
            out.push_str("(Expr::Get ");
            let mut o = String::new();
            print_expr(object, 0, &mut o);
            out.push_str(&o);
            out.push_str(&format!(" {})", name.lexeme));
        }
        ExprKind::Block { stmts, expr } => {
            out.push_str("(Expr::Block (\n");
            for s in stmts {
                print_stmt(s, depth + 1, out);
                out.push('\n');
            }
            print_expr(expr, depth + 1, out);
            out.push('\n');
            indent(depth, out);
            out.push(')');
            out.push(')');
        }
        ExprKind::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            out.push_str("(Expr::If ");
            let mut c = String::new();
            print_expr(condition, 0, &mut c);
            out.push_str(&c);
            out.push('\n');
            print_expr(then_branch, depth + 1, out);
            if let Some(e) = else_branch {
                out.push('\n');
                print_expr(e, depth + 1, out);
            }
            out.push('\n');
            indent(depth, out);
            out.push(')');
        }
        ExprKind::While { condition, body, .. } => {
            out.push_str("(Expr::While ");
            let mut c = String::new();
            print_expr(condition, 0, &mut c);
            out.push_str(&c);
            out.push('\n');
            print_expr(body, depth + 1, out);
            out.push('\n');
            indent(depth, out);
            out.push(')');
        }
        ExprKind::For { name, object, body, .. } => {
            out.push_str(&format!("(Expr::For {} ", name.lexeme));
            let mut o = String::new();
            print_expr(object, 0, &mut o);
            out.push_str(&o);
            out.push('\n');
            print_expr(body, depth + 1, out);
            out.push('\n');
            indent(depth, out);
            out.push(')');
        }
        ExprKind::Switch { value, cases, .. } => {
            out.push_str("(Expr::Switch ");
            let mut v = String::new();
            print_expr(value, 0, &mut v);
            out.push_str(&v);
            out.push_str(" (\n");
            for case in cases {
                indent(depth + 1, out);
                match &case.pattern {
                    Pattern::Wildcard(_) => out.push_str("(_ "),
                    Pattern::Value(v) => {
                        out.push('(');
                        let mut inner = String::new();
                        print_expr(v, 0, &mut inner);
                        out.push_str(&inner);
                        out.push(' ');
                    }
                }
                let mut body = String::new();
                print_expr(&case.body, 0, &mut body);
                out.push_str(&body);
                out.push(')');
                out.push('\n');
            }
            indent(depth, out);
            out.push(')');
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CompileContext;
    use crate::parser;

    #[test]
    fn test_prints_struct_and_function() {
        let src = "struct Point { x int; y int; }\nfunc main() int { 0 }";
        let mut ctx = CompileContext::new(src);
        let module = parser::parse(&mut ctx, src);
        let dump = print_module(&module);
        assert!(dump.contains("(Stmt::Struct Point (x int) (y int))"));
        assert!(dump.contains("func main() int"));
    }

    #[test]
    fn test_prints_binary_expression() {
        let src = "1 + 2;";
        let mut ctx = CompileContext::new(src);
        let module = parser::parse(&mut ctx, src);
        let dump = print_module(&module);
        assert!(dump.contains("(Expr::Binary + (Expr::Integer 1) (Expr::Integer 2))"));
    }
}
