//! The AST: three sibling tagged-variant sum types — `Stmt`, `Expr`,
//! `Pattern` — plus `Module`, the top-level aggregate.
//!
//! A flat `ExprInfo`/`ExprKind` design (as in `ast.rs`, enough for
//! statement-level checks with no need for deep expression trees) isn't
//! enough for Enact's block-and-expression grammar, so this is a
//! genuinely recursive tree instead. Replaces `original_source`'s
//! visitor-per-category class hierarchy (`Stmt.h`/`Expr.h`) with one
//! `match`-friendly enum per category (§9).

use crate::token::Token;
use crate::typename::Typename;
use crate::ty::Type;

#[derive(Debug, Clone)]
pub struct Module {
    pub decls: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Token,
    pub typename: Typename,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: Token,
    pub typename: Typename,
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: Token,
    pub typename: Option<Typename>,
}

#[derive(Debug, Clone)]
pub struct FunctionStmt {
    pub name: Token,
    pub return_typename: Typename,
    pub params: Vec<Param>,
    /// Absent for trait-method signatures (`func name(...) T;`).
    pub body: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Break {
        keyword: Token,
        value: Option<Expr>,
    },
    Continue {
        keyword: Token,
    },
    Enum {
        name: Token,
        variants: Vec<EnumVariant>,
    },
    Expression {
        expr: Expr,
    },
    Function(FunctionStmt),
    Impl {
        typename: Typename,
        trait_typename: Option<Typename>,
        methods: Vec<FunctionStmt>,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Struct {
        name: Token,
        fields: Vec<Field>,
    },
    Trait {
        name: Token,
        methods: Vec<FunctionStmt>,
    },
    Variable {
        keyword: Token,
        name: Token,
        typename: Typename,
        initializer: Expr,
    },
}

/// A switch-expression pattern: either a value to compare against, or the
/// wildcard `_`/`default` case (§3: "patterns are either a value expression
/// or a wildcard").
#[derive(Debug, Clone)]
pub enum Pattern {
    Wildcard(Token),
    Value(Expr),
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub pattern: Pattern,
    pub predicate: Option<Expr>,
    pub body: Expr,
}

/// One piece of an interpolated string: either a literal fragment or a
/// spliced expression (§3, §8 S6).
#[derive(Debug, Clone)]
pub enum InterpPart {
    Str(String),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Integer(i64),
    Float(f64),
    Str(String),
    Interpolation(Vec<InterpPart>),
    Boolean(bool),
    Nothing,
    Unit,
    Symbol(Token),
    Group(Box<Expr>),
    Tuple(Vec<Expr>),
    Unary {
        oper: Token,
        operand: Box<Expr>,
    },
    Reference {
        oper: Token,
        permission: Option<Token>,
        region: Option<Token>,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        oper: Token,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        oper: Token,
        right: Box<Expr>,
    },
    Range {
        start: Box<Expr>,
        oper: Token,
        end: Box<Expr>,
        inclusive: bool,
    },
    Cast {
        value: Box<Expr>,
        oper: Token,
        typename: Typename,
        is_type_check: bool,
    },
    Assign {
        target: Box<Expr>,
        oper: Token,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        paren: Token,
    },
    Get {
        object: Box<Expr>,
        name: Token,
        oper: Token,
    },
    Block {
        stmts: Vec<Stmt>,
        expr: Box<Expr>,
    },
    If {
        keyword: Token,
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    While {
        keyword: Token,
        condition: Box<Expr>,
        body: Box<Expr>,
    },
    For {
        keyword: Token,
        name: Token,
        object: Box<Expr>,
        body: Box<Expr>,
    },
    Switch {
        keyword: Token,
        value: Box<Expr>,
        cases: Vec<SwitchCase>,
    },
}

/// An expression node. `ty` starts `None` and is filled in by `SemaDefs`
/// as it walks the tree (§8 invariant 1: every node in the decorated AST
/// has a non-null resolved type once analysis succeeds).
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub where_token: Token,
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, where_token: Token) -> Self {
        Self {
            kind,
            where_token,
            ty: None,
        }
    }

    pub fn unit(where_token: Token) -> Self {
        Expr::new(ExprKind::Unit, where_token)
    }
}

/// Walks every statement reachable from `stmt`, invoking `f` on each
/// (including `stmt` itself), depth-first — the same recursive-walk shape
/// as `names.rs`'s `collect_stmt_names`, generalized into a caller-supplied
/// visitor (§9 "Polymorphic AST" note: the visitor disappears into a
/// `match`, but a walk helper is still useful for callers that want every
/// node without writing the recursion themselves).
pub fn walk_stmt<F: FnMut(&Stmt)>(stmt: &Stmt, f: &mut F) {
    f(stmt);
    match stmt {
        Stmt::Break { value, .. } | Stmt::Return { value, .. } => {
            if let Some(v) = value {
                walk_expr(v, &mut |e| walk_expr_into_stmts(e, f));
            }
        }
        Stmt::Continue { .. } | Stmt::Enum { .. } | Stmt::Struct { .. } => {}
        Stmt::Expression { expr } => walk_expr(expr, &mut |e| walk_expr_into_stmts(e, f)),
        Stmt::Function(func) => {
            if let Some(body) = &func.body {
                walk_expr(body, &mut |e| walk_expr_into_stmts(e, f));
            }
        }
        Stmt::Impl { methods, .. } | Stmt::Trait { methods, .. } => {
            for m in methods {
                if let Some(body) = &m.body {
                    walk_expr(body, &mut |e| walk_expr_into_stmts(e, f));
                }
            }
        }
        Stmt::Variable { initializer, .. } => {
            walk_expr(initializer, &mut |e| walk_expr_into_stmts(e, f))
        }
    }
}

fn walk_expr_into_stmts<F: FnMut(&Stmt)>(expr: &Expr, f: &mut F) {
    if let ExprKind::Block { stmts, .. } = &expr.kind {
        for s in stmts {
            walk_stmt(s, f);
        }
    }
}

/// Walks every expression reachable from `expr`, invoking `f` on each
/// (including `expr` itself), depth-first. Does **not** descend into
/// nested statements' own sub-expressions inside a block — pair with
/// [`walk_stmt`] for a full-module traversal.
pub fn walk_expr<F: FnMut(&Expr)>(expr: &Expr, f: &mut F) {
    f(expr);
    match &expr.kind {
        ExprKind::Integer(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Boolean(_)
        | ExprKind::Nothing
        | ExprKind::Unit
        | ExprKind::Symbol(_) => {}
        ExprKind::Interpolation(parts) => {
            for p in parts {
                if let InterpPart::Expr(e) = p {
                    walk_expr(e, f);
                }
            }
        }
        ExprKind::Group(e) | ExprKind::Unary { operand: e, .. } => walk_expr(e, f),
        ExprKind::Reference { operand, .. } => walk_expr(operand, f),
        ExprKind::Tuple(elems) => {
            for e in elems {
                walk_expr(e, f);
            }
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        ExprKind::Range { start, end, .. } => {
            walk_expr(start, f);
            walk_expr(end, f);
        }
        ExprKind::Cast { value, .. } => walk_expr(value, f),
        ExprKind::Assign { target, value, .. } => {
            walk_expr(target, f);
            walk_expr(value, f);
        }
        ExprKind::Call {
            callee, arguments, ..
        } => {
            walk_expr(callee, f);
            for a in arguments {
                walk_expr(a, f);
            }
        }
        ExprKind::Get { object, .. } => walk_expr(object, f),
        ExprKind::Block { expr, .. } => walk_expr(expr, f),
        ExprKind::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            walk_expr(condition, f);
            walk_expr(then_branch, f);
            if let Some(e) = else_branch {
                walk_expr(e, f);
            }
        }
        ExprKind::While {
            condition, body, ..
        } => {
            walk_expr(condition, f);
            walk_expr(body, f);
        }
        ExprKind::For { object, body, .. } => {
            walk_expr(object, f);
            walk_expr(body, f);
        }
        ExprKind::Switch { value, cases, .. } => {
            walk_expr(value, f);
            for case in cases {
                if let Pattern::Value(v) = &case.pattern {
                    walk_expr(v, f);
                }
                if let Some(pred) = &case.predicate {
                    walk_expr(pred, f);
                }
                walk_expr(&case.body, f);
            }
        }
    }
}
