//! Recursive-descent statement parser, Pratt-style expression parser.
//!
//! Grounded on `original_source/include/enact/parser/Parser.h`'s explicit
//! per-precedence-level method ladder (`parsePrecAssignment` down to
//! `parsePrecPrimary`): reimplemented here as a chain of methods, each
//! delegating to the next tighter level and consuming matched operator
//! tokens in a loop — the tagged-variant rendering of the same ladder, with
//! no visitor (§9). `peek`/`eat`/`advance` follow `fast_parser/lexer.rs`'s
//! token-stream vocabulary, reused here for the parser's own one-token
//! lookahead over the `Lexer`.
//!
//! [`ParseError`] is a distinguished control-transfer value, not a panic
//! (`original_source`'s `class ParseError : public std::runtime_error`):
//! a failed sub-production returns `Err(ParseError)`, and the statement
//! loop (top-level or inside a block) catches it and calls [`Parser::synchronise`].

use crate::ast::*;
use crate::diagnostics::{CompileContext, ErrorKind};
use crate::lexer::Lexer;
use crate::token::{Token, TokenType};

/// Parser-enforced argument/parameter/type-parameter cap (§4.3, §4.5).
pub const MAX_ARGS: usize = 255;

/// Tokens the parser resynchronises on after a syntax error (§4.3): each
/// starts a statement, so skipping to one limits cascaded errors.
const RECOVERY_SET: &[TokenType] = &[
    TokenType::Enum,
    TokenType::For,
    TokenType::Func,
    TokenType::Imm,
    TokenType::Impl,
    TokenType::Mut,
    TokenType::Struct,
    TokenType::Trait,
];

/// A non-panicking control-transfer signal for an unrecoverable parse
/// failure in the current production; the caller synchronises and moves on.
#[derive(Debug)]
pub struct ParseError;

pub struct Parser<'ctx, 'src> {
    ctx: &'ctx mut CompileContext,
    lexer: Lexer<'src>,
    current: Token,
    previous: Token,
}

/// Parse a complete source string into a [`Module`], recovering from
/// syntax errors statement-by-statement (§4.3).
pub fn parse(ctx: &mut CompileContext, source: &str) -> Module {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(ctx, lexer);
    let mut decls = Vec::new();
    while !parser.is_at_end() {
        match parser.parse_module_stmt() {
            Ok(stmt) => decls.push(stmt),
            Err(ParseError) => parser.synchronise(),
        }
    }
    Module { decls }
}

impl<'ctx, 'src> Parser<'ctx, 'src> {
    pub fn new(ctx: &'ctx mut CompileContext, mut lexer: Lexer<'src>) -> Self {
        let current = Self::next_real_token(ctx, &mut lexer);
        let previous = current.clone();
        Self {
            ctx,
            lexer,
            current,
            previous,
        }
    }

    /// Scans past any `Error` tokens (reporting each as a `LexError`)
    /// until it finds a token the parser can act on.
    fn next_real_token(ctx: &mut CompileContext, lexer: &mut Lexer<'src>) -> Token {
        loop {
            let tok = lexer.scan_token();
            if tok.ty == TokenType::Error {
                let message = tok.lexeme.clone();
                ctx.error(ErrorKind::LexError, tok, message);
                continue;
            }
            return tok;
        }
    }

    pub(crate) fn peek_ty(&self) -> TokenType {
        self.current.ty
    }

    pub(crate) fn check(&self, ty: TokenType) -> bool {
        self.current.ty == ty
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current.ty == TokenType::Eof
    }

    /// Drops the current token (reporting embedded lex errors along the
    /// way) and returns it.
    pub(crate) fn advance(&mut self) -> Token {
        self.previous = self.current.clone();
        self.current = Self::next_real_token(self.ctx, &mut self.lexer);
        self.previous.clone()
    }

    pub(crate) fn eat(&mut self, ty: TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes `ty` or reports a `SyntaxError` and returns the
    /// (unconsumed) current token as a stand-in so the caller can build a
    /// partial node rather than abort.
    pub(crate) fn expect(&mut self, ty: TokenType, msg: &str) -> Token {
        if self.check(ty) {
            return self.advance();
        }
        self.error_at_current(msg);
        self.current.clone()
    }

    pub(crate) fn error_at_current(&mut self, msg: &str) {
        let tok = self.current.clone();
        self.ctx.error(ErrorKind::SyntaxError, tok, msg.to_string());
    }

    /// Skip to the next recovery-set token (§4.3).
    pub fn synchronise(&mut self) {
        while !self.is_at_end() {
            if RECOVERY_SET.contains(&self.current.ty) {
                return;
            }
            self.advance();
        }
    }

    fn stmt_starts_item(&self) -> bool {
        matches!(
            self.peek_ty(),
            TokenType::Func
                | TokenType::Struct
                | TokenType::Enum
                | TokenType::Trait
                | TokenType::Impl
                | TokenType::Imm
                | TokenType::Mut
                | TokenType::Return
                | TokenType::Break
                | TokenType::Continue
        )
    }

    // ── statements ──────────────────────────────────────────────────────

    pub fn parse_module_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_ty() {
            TokenType::Func => {
                self.advance();
                Ok(Stmt::Function(self.parse_function_stmt(false)?))
            }
            TokenType::Struct => {
                self.advance();
                self.parse_struct_stmt()
            }
            TokenType::Enum => {
                self.advance();
                self.parse_enum_stmt()
            }
            TokenType::Trait => {
                self.advance();
                self.parse_trait_stmt()
            }
            TokenType::Impl => {
                self.advance();
                self.parse_impl_stmt()
            }
            TokenType::Imm | TokenType::Mut => {
                let keyword = self.advance();
                self.parse_variable_stmt(keyword)
            }
            TokenType::Return => self.parse_return_stmt(),
            TokenType::Break => self.parse_break_stmt(),
            TokenType::Continue => self.parse_continue_stmt(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenType::Semicolon, "Expect ';' after expression statement.");
                Ok(Stmt::Expression { expr })
            }
        }
    }

    fn parse_function_stmt(&mut self, trait_context: bool) -> Result<FunctionStmt, ParseError> {
        let name = self.expect(TokenType::Identifier, "Expect function name.");
        self.expect(TokenType::LeftParen, "Expect '(' after function name.");
        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    self.error_at_current("Cannot have more than 255 parameters.");
                }
                let pname = self.expect(TokenType::Identifier, "Expect parameter name.");
                let ptype = self.expect_typename("Expect parameter type.", false);
                params.push(Param {
                    name: pname,
                    typename: ptype,
                });
                if !self.eat(TokenType::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenType::RightParen, "Expect ')' after parameters.");
        let return_typename = self.expect_typename("Expect return type.", true);
        let body = if trait_context && self.eat(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_body_block()?)
        };
        Ok(FunctionStmt {
            name,
            return_typename,
            params,
            body,
        })
    }

    fn parse_struct_stmt(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect(TokenType::Identifier, "Expect struct name.");
        self.expect(TokenType::LeftBrace, "Expect '{' before struct body.");
        let mut fields = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            let mark = self.current.pos;
            let fname = self.expect(TokenType::Identifier, "Expect field name.");
            let ftype = self.expect_typename("Expect field type.", false);
            self.expect(TokenType::Semicolon, "Expect ';' after field declaration.");
            fields.push(Field {
                name: fname,
                typename: ftype,
            });
            if self.current.pos == mark {
                self.advance();
            }
        }
        self.expect(TokenType::RightBrace, "Expect '}' after struct body.");
        Ok(Stmt::Struct { name, fields })
    }

    fn parse_enum_stmt(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect(TokenType::Identifier, "Expect enum name.");
        self.expect(TokenType::LeftBrace, "Expect '{' before enum body.");
        let mut variants = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            let mark = self.current.pos;
            let vname = self.expect(TokenType::Identifier, "Expect variant name.");
            let vtype = if self.typename_can_start() {
                Some(self.expect_typename("Expect variant type.", false))
            } else {
                None
            };
            self.expect(TokenType::Semicolon, "Expect ';' after variant declaration.");
            variants.push(EnumVariant {
                name: vname,
                typename: vtype,
            });
            if self.current.pos == mark {
                self.advance();
            }
        }
        self.expect(TokenType::RightBrace, "Expect '}' after enum body.");
        Ok(Stmt::Enum { name, variants })
    }

    fn parse_trait_stmt(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect(TokenType::Identifier, "Expect trait name.");
        self.expect(TokenType::LeftBrace, "Expect '{' before trait body.");
        let mut methods = Vec::new();
        while self.check(TokenType::Func) {
            self.advance();
            methods.push(self.parse_function_stmt(true)?);
        }
        self.expect(TokenType::RightBrace, "Expect '}' after trait body.");
        Ok(Stmt::Trait { name, methods })
    }

    fn parse_impl_stmt(&mut self) -> Result<Stmt, ParseError> {
        let first = self.expect_typename("Expect type to implement.", false);
        let (typename, trait_typename) = if self.eat(TokenType::For) {
            (self.expect_typename("Expect type after 'for'.", false), Some(first))
        } else {
            (first, None)
        };
        self.expect(TokenType::LeftBrace, "Expect '{' before impl body.");
        let mut methods = Vec::new();
        while self.check(TokenType::Func) {
            self.advance();
            methods.push(self.parse_function_stmt(false)?);
        }
        self.expect(TokenType::RightBrace, "Expect '}' after impl body.");
        Ok(Stmt::Impl {
            typename,
            trait_typename,
            methods,
        })
    }

    fn parse_variable_stmt(&mut self, keyword: Token) -> Result<Stmt, ParseError> {
        let name = self.expect(TokenType::Identifier, "Expect variable name.");
        let typename = self.expect_typename("Expect variable type.", true);
        self.expect(TokenType::Equal, "Expect '=' after variable name.");
        let initializer = self.parse_expression()?;
        self.expect(TokenType::Semicolon, "Expect ';' after variable declaration.");
        Ok(Stmt::Variable {
            keyword,
            name,
            typename,
            initializer,
        })
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenType::Semicolon, "Expect ';' after return statement.");
        Ok(Stmt::Return { keyword, value })
    }

    fn parse_break_stmt(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenType::Semicolon, "Expect ';' after break statement.");
        Ok(Stmt::Break { keyword, value })
    }

    fn parse_continue_stmt(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        self.expect(TokenType::Semicolon, "Expect ';' after continue statement.");
        Ok(Stmt::Continue { keyword })
    }

    // ── block / expression-as-statement ────────────────────────────────

    fn parse_block_expr(&mut self) -> Result<Expr, ParseError> {
        let lbrace = self.expect(TokenType::LeftBrace, "Expect '{' to start block.");
        let mut stmts = Vec::new();
        let mut trailing: Option<Expr> = None;

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if self.stmt_starts_item() {
                match self.parse_module_stmt() {
                    Ok(stmt) => stmts.push(stmt),
                    Err(ParseError) => self.synchronise(),
                }
                continue;
            }

            let expr = match self.parse_expression() {
                Ok(e) => e,
                Err(ParseError) => {
                    self.synchronise();
                    continue;
                }
            };
            if self.eat(TokenType::Semicolon) {
                stmts.push(Stmt::Expression { expr });
            } else if self.check(TokenType::RightBrace) {
                trailing = Some(expr);
                break;
            } else {
                self.error_at_current("Expect ';' or '}' after expression.");
                trailing = Some(expr);
                break;
            }
        }

        let rbrace = self.expect(TokenType::RightBrace, "Expect '}' after block.");
        let trailing = trailing.unwrap_or_else(|| Expr::unit(rbrace));
        Ok(Expr::new(
            ExprKind::Block {
                stmts,
                expr: Box::new(trailing),
            },
            lbrace,
        ))
    }

    /// A body wherever the grammar expects a block: either `{ … }` or the
    /// `=> expr` shorthand, which is sugar for `{ expr }`.
    fn parse_body_block(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenType::LeftBrace) {
            return self.parse_block_expr();
        }
        let arrow = self.expect(TokenType::EqualGreater, "Expect '{' or '=>' to start block.");
        let expr = self.parse_expression()?;
        Ok(Expr::new(
            ExprKind::Block {
                stmts: Vec::new(),
                expr: Box::new(expr),
            },
            arrow,
        ))
    }

    // ── expressions: Pratt precedence ladder ───────────────────────────
    // assignment > or > and > equality > comparison > cast > range >
    // bitor > bitxor > bitand > additive > multiplicative > shift > unary
    // > call/field > primary (low to high, per spec.md §4.3).

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_or()?;
        if self.check(TokenType::Equal) {
            let oper = self.advance();
            let value = self.parse_assignment()?; // right-associative
            let where_token = expr.where_token.clone();
            return Ok(Expr::new(
                ExprKind::Assign {
                    target: Box::new(expr),
                    oper,
                    value: Box::new(value),
                },
                where_token,
            ));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_and()?;
        while self.check(TokenType::Or) {
            let oper = self.advance();
            let right = self.parse_and()?;
            let wt = expr.where_token.clone();
            expr = Expr::new(
                ExprKind::Logical {
                    left: Box::new(expr),
                    oper,
                    right: Box::new(right),
                },
                wt,
            );
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_equality()?;
        while self.check(TokenType::And) {
            let oper = self.advance();
            let right = self.parse_equality()?;
            let wt = expr.where_token.clone();
            expr = Expr::new(
                ExprKind::Logical {
                    left: Box::new(expr),
                    oper,
                    right: Box::new(right),
                },
                wt,
            );
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_comparison()?;
        while matches!(self.peek_ty(), TokenType::EqualEqual | TokenType::BangEqual) {
            let oper = self.advance();
            let right = self.parse_comparison()?;
            expr = self.make_binary(expr, oper, right);
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_cast()?;
        while matches!(
            self.peek_ty(),
            TokenType::Less | TokenType::LessEqual | TokenType::Greater | TokenType::GreaterEqual
        ) {
            let oper = self.advance();
            let right = self.parse_cast()?;
            expr = self.make_binary(expr, oper, right);
        }
        Ok(expr)
    }

    fn parse_cast(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_range()?;
        while matches!(self.peek_ty(), TokenType::As | TokenType::Is) {
            let oper = self.advance();
            let is_type_check = oper.ty == TokenType::Is;
            let typename = self.expect_typename("Expect type after cast operator.", false);
            let wt = expr.where_token.clone();
            expr = Expr::new(
                ExprKind::Cast {
                    value: Box::new(expr),
                    oper,
                    typename,
                    is_type_check,
                },
                wt,
            );
        }
        Ok(expr)
    }

    fn parse_range(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_bitor()?;
        if matches!(self.peek_ty(), TokenType::DotDot | TokenType::DotDotDot) {
            let oper = self.advance();
            let inclusive = oper.ty == TokenType::DotDotDot;
            let end = self.parse_bitor()?;
            let wt = expr.where_token.clone();
            return Ok(Expr::new(
                ExprKind::Range {
                    start: Box::new(expr),
                    oper,
                    end: Box::new(end),
                    inclusive,
                },
                wt,
            ));
        }
        Ok(expr)
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_bitxor()?;
        while self.check(TokenType::Pipe) {
            let oper = self.advance();
            let right = self.parse_bitxor()?;
            expr = self.make_binary(expr, oper, right);
        }
        Ok(expr)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_bitand()?;
        while self.check(TokenType::Caret) {
            let oper = self.advance();
            let right = self.parse_bitand()?;
            expr = self.make_binary(expr, oper, right);
        }
        Ok(expr)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_additive()?;
        while self.check(TokenType::Ampersand) {
            let oper = self.advance();
            let right = self.parse_additive()?;
            expr = self.make_binary(expr, oper, right);
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_multiplicative()?;
        while matches!(self.peek_ty(), TokenType::Plus | TokenType::Minus) {
            let oper = self.advance();
            let right = self.parse_multiplicative()?;
            expr = self.make_binary(expr, oper, right);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_shift()?;
        while matches!(self.peek_ty(), TokenType::Star | TokenType::Slash) {
            let oper = self.advance();
            let right = self.parse_shift()?;
            expr = self.make_binary(expr, oper, right);
        }
        Ok(expr)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        while matches!(self.peek_ty(), TokenType::LessLess | TokenType::GreaterGreater) {
            let oper = self.advance();
            let right = self.parse_unary()?;
            expr = self.make_binary(expr, oper, right);
        }
        Ok(expr)
    }

    fn make_binary(&self, left: Expr, oper: Token, right: Expr) -> Expr {
        let wt = left.where_token.clone();
        Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                oper,
                right: Box::new(right),
            },
            wt,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_ty() {
            TokenType::Minus | TokenType::Not | TokenType::Tilde | TokenType::Star => {
                let oper = self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        oper: oper.clone(),
                        operand: Box::new(operand),
                    },
                    oper,
                ))
            }
            TokenType::Ampersand => {
                let oper = self.advance();
                let permission = if matches!(self.peek_ty(), TokenType::Imm | TokenType::Mut) {
                    Some(self.advance())
                } else {
                    None
                };
                let region = if matches!(
                    self.peek_ty(),
                    TokenType::So | TokenType::Rc | TokenType::Gc
                ) {
                    Some(self.advance())
                } else {
                    None
                };
                let operand = self.parse_unary()?;
                Ok(Expr::new(
                    ExprKind::Reference {
                        oper: oper.clone(),
                        permission,
                        region,
                        operand: Box::new(operand),
                    },
                    oper,
                ))
            }
            _ => self.parse_call(),
        }
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(TokenType::LeftParen) {
                self.advance();
                let mut arguments = Vec::new();
                if !self.check(TokenType::RightParen) {
                    loop {
                        if arguments.len() >= MAX_ARGS {
                            self.error_at_current("Cannot have more than 255 arguments.");
                        }
                        arguments.push(self.parse_expression()?);
                        if !self.eat(TokenType::Comma) {
                            break;
                        }
                    }
                }
                let paren = self.expect(TokenType::RightParen, "Expect ')' after arguments.");
                let wt = expr.where_token.clone();
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        arguments,
                        paren,
                    },
                    wt,
                );
            } else if self.check(TokenType::Dot) {
                let oper = self.advance();
                let name = self.expect(TokenType::Identifier, "Expect property name after '.'.");
                let wt = expr.where_token.clone();
                expr = Expr::new(
                    ExprKind::Get {
                        object: Box::new(expr),
                        name,
                        oper,
                    },
                    wt,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_ty() {
            TokenType::Integer => {
                let tok = self.advance();
                let value = tok.lexeme.parse::<i64>().unwrap_or(0);
                Ok(Expr::new(ExprKind::Integer(value), tok))
            }
            TokenType::Float => {
                let tok = self.advance();
                let value = tok.lexeme.parse::<f64>().unwrap_or(0.0);
                Ok(Expr::new(ExprKind::Float(value), tok))
            }
            TokenType::String => {
                let tok = self.advance();
                let value = tok.lexeme.clone();
                Ok(Expr::new(ExprKind::Str(value), tok))
            }
            TokenType::Interpolation => self.parse_interpolation(),
            TokenType::True => {
                let tok = self.advance();
                Ok(Expr::new(ExprKind::Boolean(true), tok))
            }
            TokenType::False => {
                let tok = self.advance();
                Ok(Expr::new(ExprKind::Boolean(false), tok))
            }
            TokenType::Nothing => {
                let tok = self.advance();
                Ok(Expr::new(ExprKind::Nothing, tok))
            }
            TokenType::Identifier | TokenType::This => {
                let tok = self.advance();
                Ok(Expr::new(ExprKind::Symbol(tok.clone()), tok))
            }
            TokenType::LeftBrace => self.parse_block_expr(),
            TokenType::If => self.parse_if_expr(),
            TokenType::While => self.parse_while_expr(),
            TokenType::For => self.parse_for_expr(),
            TokenType::Switch => self.parse_switch_expr(),
            TokenType::LeftParen => self.parse_paren_expr(),
            _ => {
                self.error_at_current("Expect expression.");
                Err(ParseError)
            }
        }
    }

    fn parse_interpolation(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance();
        let mut parts = vec![InterpPart::Str(start.lexeme.clone())];
        loop {
            let expr = self.parse_expression()?;
            parts.push(InterpPart::Expr(expr));
            match self.peek_ty() {
                TokenType::Interpolation => {
                    let frag = self.advance();
                    parts.push(InterpPart::Str(frag.lexeme));
                }
                TokenType::String => {
                    let frag = self.advance();
                    parts.push(InterpPart::Str(frag.lexeme));
                    break;
                }
                _ => {
                    self.error_at_current("Expect string interpolation to continue.");
                    break;
                }
            }
        }
        Ok(Expr::new(ExprKind::Interpolation(parts), start))
    }

    fn parse_if_expr(&mut self) -> Result<Expr, ParseError> {
        let keyword = self.advance();
        let condition = self.parse_expression()?;
        let then_branch = self.parse_body_block()?;
        let else_branch = if self.eat(TokenType::Else) {
            if self.check(TokenType::If) {
                Some(Box::new(self.parse_if_expr()?))
            } else {
                Some(Box::new(self.parse_body_block()?))
            }
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::If {
                keyword: keyword.clone(),
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            keyword,
        ))
    }

    fn parse_while_expr(&mut self) -> Result<Expr, ParseError> {
        let keyword = self.advance();
        let condition = self.parse_expression()?;
        let body = self.parse_body_block()?;
        Ok(Expr::new(
            ExprKind::While {
                keyword: keyword.clone(),
                condition: Box::new(condition),
                body: Box::new(body),
            },
            keyword,
        ))
    }

    fn parse_for_expr(&mut self) -> Result<Expr, ParseError> {
        let keyword = self.advance();
        let name = self.expect(TokenType::Identifier, "Expect loop variable name.");
        self.expect(TokenType::In, "Expect 'in' after loop variable.");
        let object = self.parse_expression()?;
        let body = self.parse_body_block()?;
        Ok(Expr::new(
            ExprKind::For {
                keyword: keyword.clone(),
                name,
                object: Box::new(object),
                body: Box::new(body),
            },
            keyword,
        ))
    }

    fn parse_switch_expr(&mut self) -> Result<Expr, ParseError> {
        let keyword = self.advance();
        let value = self.parse_expression()?;
        self.expect(TokenType::LeftBrace, "Expect '{' after switch value.");
        let mut cases = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            let pattern = if self.eat(TokenType::Default) {
                Pattern::Wildcard(self.previous.clone())
            } else {
                self.expect(TokenType::Case, "Expect 'case' or 'default'.");
                Pattern::Value(self.parse_expression()?)
            };
            let predicate = if self.eat(TokenType::When) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect(TokenType::EqualGreater, "Expect '=>' after case pattern.");
            let body = self.parse_expression()?;
            self.expect(TokenType::Semicolon, "Expect ';' after case body.");
            cases.push(SwitchCase {
                pattern,
                predicate,
                body,
            });
        }
        self.expect(TokenType::RightBrace, "Expect '}' after switch body.");
        Ok(Expr::new(
            ExprKind::Switch {
                keyword: keyword.clone(),
                value: Box::new(value),
                cases,
            },
            keyword,
        ))
    }

    /// `()` is unit, `(expr)` is grouping, `(expr, expr, ...)` (≥ 2
    /// elements) is a tuple (§4.3's last invariant).
    fn parse_paren_expr(&mut self) -> Result<Expr, ParseError> {
        let paren = self.advance();
        if self.eat(TokenType::RightParen) {
            return Ok(Expr::new(ExprKind::Unit, paren));
        }
        let first = self.parse_expression()?;
        if self.check(TokenType::Comma) {
            let mut elements = vec![first];
            while self.eat(TokenType::Comma) {
                if self.check(TokenType::RightParen) {
                    break;
                }
                elements.push(self.parse_expression()?);
            }
            self.expect(TokenType::RightParen, "Expect ')' after tuple elements.");
            Ok(Expr::new(ExprKind::Tuple(elements), paren))
        } else {
            self.expect(TokenType::RightParen, "Expect ')' after expression.");
            Ok(Expr::new(ExprKind::Group(Box::new(first)), paren))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CompileContext;

    fn parse_ok(src: &str) -> (Module, bool) {
        let mut ctx = CompileContext::new(src);
        let module = parse(&mut ctx, src);
        (module, ctx.had_error())
    }

    #[test]
    fn test_s1_minimal_function() {
        let (module, had_error) = parse_ok("func add(a int, b int) int { a + b }");
        assert!(!had_error);
        assert_eq!(module.decls.len(), 1);
        let Stmt::Function(f) = &module.decls[0] else {
            panic!("expected function statement");
        };
        assert_eq!(f.name.lexeme, "add");
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[0].typename.name(), "int");
        assert_eq!(f.return_typename.name(), "int");
        let body = f.body.as_ref().expect("function body");
        let ExprKind::Block { expr, .. } = &body.kind else {
            panic!("expected block body");
        };
        assert!(matches!(expr.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_s5_precedence_and_associativity() {
        let (module, had_error) = parse_ok("imm x = 1 + 2 * 3 == 7 and not false;");
        assert!(!had_error);
        let Stmt::Variable { initializer, .. } = &module.decls[0] else {
            panic!("expected variable statement");
        };
        // Top-level operator must be `and` (logical), proving `==` binds
        // tighter than `and`, and `*` binds tighter than `+`.
        let ExprKind::Logical { left, oper, .. } = &initializer.kind else {
            panic!("expected top-level logical expression, got {:?}", initializer.kind);
        };
        assert_eq!(oper.ty, TokenType::And);
        assert!(matches!(left.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_string_interpolation_parses_alternating_parts() {
        let (module, had_error) = parse_ok("imm s = \"hi \\(name), age \\(age)\";");
        assert!(!had_error);
        let Stmt::Variable { initializer, .. } = &module.decls[0] else {
            panic!("expected variable statement");
        };
        let ExprKind::Interpolation(parts) = &initializer.kind else {
            panic!("expected interpolation expression");
        };
        // str, expr, str, expr, str — a trailing (possibly empty) string
        // fragment always closes the splice chain.
        assert_eq!(parts.len(), 5);
        assert!(matches!(parts[0], InterpPart::Str(_)));
        assert!(matches!(parts[1], InterpPart::Expr(_)));
        assert!(matches!(parts[2], InterpPart::Str(_)));
        assert!(matches!(parts[3], InterpPart::Expr(_)));
        assert!(matches!(parts[4], InterpPart::Str(_)));
    }

    #[test]
    fn test_trait_and_impl_parse() {
        let src = "trait Show { func render() string; }\n\
                   struct P { name string; }\n\
                   impl Show for P { func render() string { \"p\" } }";
        let (module, had_error) = parse_ok(src);
        assert!(!had_error);
        assert_eq!(module.decls.len(), 3);
        assert!(matches!(module.decls[0], Stmt::Trait { .. }));
        assert!(matches!(module.decls[1], Stmt::Struct { .. }));
        let Stmt::Impl {
            trait_typename,
            methods,
            ..
        } = &module.decls[2]
        else {
            panic!("expected impl statement");
        };
        assert!(trait_typename.is_some());
        assert_eq!(methods.len(), 1);
    }

    #[test]
    fn test_switch_expr_with_default() {
        let src = "func f(x int) string { switch x { case 1 => \"one\"; default => \"other\"; } }";
        let (module, had_error) = parse_ok(src);
        assert!(!had_error);
        let Stmt::Function(f) = &module.decls[0] else {
            panic!("expected function");
        };
        let body = f.body.as_ref().unwrap();
        let ExprKind::Block { expr, .. } = &body.kind else {
            panic!("expected block");
        };
        let ExprKind::Switch { cases, .. } = &expr.kind else {
            panic!("expected switch expression");
        };
        assert_eq!(cases.len(), 2);
        assert!(matches!(cases[1].pattern, Pattern::Wildcard(_)));
    }

    #[test]
    fn test_tuple_vs_group_vs_unit() {
        let (module, _) = parse_ok("imm a = (); imm b = (1); imm c = (1, 2);");
        let Stmt::Variable { initializer: a, .. } = &module.decls[0] else {
            panic!()
        };
        let Stmt::Variable { initializer: b, .. } = &module.decls[1] else {
            panic!()
        };
        let Stmt::Variable { initializer: c, .. } = &module.decls[2] else {
            panic!()
        };
        assert!(matches!(a.kind, ExprKind::Unit));
        assert!(matches!(b.kind, ExprKind::Group(_)));
        assert!(matches!(&c.kind, ExprKind::Tuple(elems) if elems.len() == 2));
    }

    #[test]
    fn test_reference_expression() {
        let (module, had_error) = parse_ok("imm x = &mut so y;");
        assert!(!had_error);
        let Stmt::Variable { initializer, .. } = &module.decls[0] else {
            panic!()
        };
        let ExprKind::Reference {
            permission, region, ..
        } = &initializer.kind
        else {
            panic!("expected reference expression");
        };
        assert!(permission.is_some());
        assert!(region.is_some());
    }

    #[test]
    fn test_syntax_error_recovers_and_continues() {
        let (module, had_error) = parse_ok("func ( { } func good() int { 1 }");
        assert!(had_error);
        // The malformed first function is skipped via synchronisation; the
        // well-formed second one still parses.
        assert!(module
            .decls
            .iter()
            .any(|d| matches!(d, Stmt::Function(f) if f.name.lexeme == "good")));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let (module, had_error) = parse_ok("func f() nothing { a = b = c; }");
        assert!(!had_error);
        let Stmt::Function(f) = &module.decls[0] else {
            panic!()
        };
        let body = f.body.as_ref().unwrap();
        let ExprKind::Block { stmts, .. } = &body.kind else {
            panic!()
        };
        let Stmt::Expression { expr } = &stmts[0] else {
            panic!()
        };
        let ExprKind::Assign { value, .. } = &expr.kind else {
            panic!("expected assign expression")
        };
        assert!(matches!(value.kind, ExprKind::Assign { .. }));
    }
}
