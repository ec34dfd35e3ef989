//! Surface type syntax: parsed but not resolved.
//!
//! A `Typename` only knows its own shape — `Array[Int]`, `&mut so Point`,
//! `(Int, Int) => Bool` — not what `Type` it denotes. Resolution happens in
//! `SemaDefs` (`crate::sema::defs`), which turns a `Typename` tree into a
//! `Type` via `crate::ty`.
//!
//! Typenames are cloned freely (grounded on `original_source`'s
//! `Typename::clone()` returning `std::unique_ptr<Typename>` via a copy
//! constructor per variant) and each carries a `where_token` used only for
//! diagnostics.

use crate::parser::{Parser, MAX_ARGS};
use crate::token::{Token, TokenType};

#[derive(Debug, Clone, PartialEq)]
pub enum Typename {
    /// A bare name, e.g. `Int`, `Point`.
    Basic { name: String, where_token: Token },
    /// `Ctor[P0, P1, ...]`, e.g. `Array[Int]`.
    Parametric {
        constructor: Box<Typename>,
        parameters: Vec<Typename>,
    },
    /// `(E0, E1, ...)`; a 1-element tuple degrades to its element at parse
    /// time (see `parse_primary`), so this variant always has 0 or ≥2
    /// elements. 0 elements is the unit typename `()`.
    Tuple {
        elements: Vec<Typename>,
        where_token: Token,
    },
    /// `(P0, P1, ...) => R`, surface syntax `A, B => R` or `(A, B) => R`.
    Function {
        ret: Box<Typename>,
        params: Vec<Typename>,
    },
    /// `&[perm] [region] T`.
    Reference {
        permission: Option<Token>,
        region: Option<Token>,
        referent: Box<Typename>,
    },
    /// `?T`.
    Optional { wrapped: Box<Typename> },
    /// `$Name`, a type variable.
    Variable { name: String, where_token: Token },
}

impl Typename {
    /// The empty basic typename used where an annotation is optional and
    /// absent (`expect_typename` with `empty_allowed = true` and nothing to
    /// parse). Carries no position worth reporting.
    pub fn empty() -> Self {
        Typename::Basic {
            name: String::new(),
            where_token: Token::synthetic(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Typename::Basic { name, .. } if name.is_empty())
    }

    /// The derived surface-syntax name used in diagnostics, built the way
    /// `original_source/lib/parser/Typename.cpp`'s constructors build their
    /// cached `m_name` string.
    pub fn name(&self) -> String {
        match self {
            Typename::Basic { name, .. } => name.clone(),
            Typename::Parametric {
                constructor,
                parameters,
            } => {
                let params = parameters
                    .iter()
                    .map(Typename::name)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}[{params}]", constructor.name())
            }
            Typename::Tuple { elements, .. } => {
                let inner = elements
                    .iter()
                    .map(Typename::name)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({inner})")
            }
            Typename::Function { ret, params } => {
                let wrap = params.len() != 1;
                let inner = params
                    .iter()
                    .map(Typename::name)
                    .collect::<Vec<_>>()
                    .join(", ");
                if wrap {
                    format!("({inner}) => {}", ret.name())
                } else {
                    format!("{inner} => {}", ret.name())
                }
            }
            Typename::Reference {
                permission,
                region,
                referent,
            } => {
                let perm = permission.as_ref().map(|t| t.lexeme.as_str()).unwrap_or("");
                let region = region.as_ref().map(|t| t.lexeme.as_str()).unwrap_or("");
                let sep1 = if perm.is_empty() { "" } else { " " };
                let sep2 = if region.is_empty() { "" } else { " " };
                format!("&{perm}{sep1}{region}{sep2}{}", referent.name())
            }
            Typename::Optional { wrapped } => format!("?{}", wrapped.name()),
            Typename::Variable { name, .. } => format!("${name}"),
        }
    }

    /// The token diagnostics should anchor to: the head of the construct,
    /// propagated through wrapper variants rather than re-anchored.
    pub fn where_token(&self) -> &Token {
        match self {
            Typename::Basic { where_token, .. } => where_token,
            Typename::Parametric { constructor, .. } => constructor.where_token(),
            Typename::Tuple { where_token, .. } => where_token,
            Typename::Function { ret, .. } => ret.where_token(),
            Typename::Reference { referent, .. } => referent.where_token(),
            Typename::Optional { wrapped } => wrapped.where_token(),
            Typename::Variable { where_token, .. } => where_token,
        }
    }
}

impl<'ctx, 'src> Parser<'ctx, 'src> {
    /// Entry point used wherever a type annotation is expected. When
    /// `empty_allowed` is set and no typename can start here, returns
    /// `Typename::empty()` instead of reporting a syntax error (used for
    /// `let x = ...` style optional annotations).
    pub fn expect_typename(&mut self, msg: &str, empty_allowed: bool) -> Typename {
        if empty_allowed && !self.typename_can_start() {
            return Typename::empty();
        }
        self.typename_prec_function(msg)
    }

    pub(crate) fn typename_can_start(&self) -> bool {
        matches!(
            self.peek_ty(),
            TokenType::Identifier
                | TokenType::Nothing
                | TokenType::Dollar
                | TokenType::LeftParen
                | TokenType::Ampersand
                | TokenType::Question
        )
    }

    // Precedence 1: function typename. `A, B => R` or `(A, B) => R`.
    fn typename_prec_function(&mut self, msg: &str) -> Typename {
        let left = self.typename_prec_unary(msg);

        if self.eat(TokenType::EqualGreater) {
            let ret = self.typename_prec_function(msg);
            let params = match left {
                Typename::Tuple { elements, .. } => elements,
                other => vec![other],
            };
            return Typename::Function {
                ret: Box::new(ret),
                params,
            };
        }

        left
    }

    // Precedence 2: unary. `&[perm] [region] T` and `?T`.
    fn typename_prec_unary(&mut self, msg: &str) -> Typename {
        if self.eat(TokenType::Ampersand) {
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
            let referent = self.typename_prec_unary(msg);
            return Typename::Reference {
                permission,
                region,
                referent: Box::new(referent),
            };
        }

        if self.eat(TokenType::Question) {
            let wrapped = self.typename_prec_unary(msg);
            return Typename::Optional {
                wrapped: Box::new(wrapped),
            };
        }

        self.typename_prec_parametric(msg)
    }

    // Precedence 3: parametric. `T[A, B, ...]`.
    fn typename_prec_parametric(&mut self, msg: &str) -> Typename {
        let constructor = self.typename_prec_primary(msg);

        if self.eat(TokenType::LeftSquare) {
            let mut parameters = Vec::new();
            if !self.check(TokenType::RightSquare) {
                loop {
                    if parameters.len() >= MAX_ARGS {
                        self.error_at_current("Cannot have more than 255 type parameters.");
                    }
                    parameters.push(self.typename_prec_function(msg));
                    if !self.eat(TokenType::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenType::RightSquare, "Expect ']' after type parameters.");
            return Typename::Parametric {
                constructor: Box::new(constructor),
                parameters,
            };
        }

        constructor
    }

    // Precedence 4: primary. identifier, `$name`, `(...)`.
    fn typename_prec_primary(&mut self, msg: &str) -> Typename {
        match self.peek_ty() {
            TokenType::Identifier | TokenType::Nothing => {
                let tok = self.advance();
                Typename::Basic {
                    name: tok.lexeme.clone(),
                    where_token: tok,
                }
            }
            TokenType::Dollar => {
                self.advance();
                let tok = self.expect(TokenType::Identifier, "Expect type variable name after '$'.");
                Typename::Variable {
                    name: tok.lexeme.clone(),
                    where_token: tok,
                }
            }
            TokenType::LeftParen => {
                let paren = self.advance();
                if self.eat(TokenType::RightParen) {
                    return Typename::Tuple {
                        elements: Vec::new(),
                        where_token: paren,
                    };
                }
                let mut elements = vec![self.typename_prec_function(msg)];
                while self.eat(TokenType::Comma) {
                    elements.push(self.typename_prec_function(msg));
                }
                self.expect(TokenType::RightParen, "Expect ')' after typename group.");
                if elements.len() == 1 {
                    elements.into_iter().next().expect("len checked above")
                } else {
                    Typename::Tuple {
                        elements,
                        where_token: paren,
                    }
                }
            }
            _ => {
                self.error_at_current(msg);
                Typename::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CompileContext;
    use crate::lexer::Lexer;

    fn parse_typename(src: &str) -> (Typename, bool) {
        let mut ctx = CompileContext::new(src);
        let lexer = Lexer::new(src);
        let mut parser = Parser::new(&mut ctx, lexer);
        let tn = parser.expect_typename("Expect typename.", false);
        (tn, ctx.had_error())
    }

    #[test]
    fn test_basic_typename() {
        let (tn, had_error) = parse_typename("Int");
        assert!(!had_error);
        assert_eq!(tn.name(), "Int");
    }

    #[test]
    fn test_parametric_typename() {
        let (tn, _) = parse_typename("Array[Int]");
        assert_eq!(tn.name(), "Array[Int]");
    }

    #[test]
    fn test_tuple_typename_collapses_single_element() {
        let (tn, _) = parse_typename("(Int)");
        assert_eq!(tn.name(), "Int");
    }

    #[test]
    fn test_unit_typename() {
        let (tn, _) = parse_typename("()");
        assert_eq!(tn.name(), "()");
    }

    #[test]
    fn test_tuple_typename() {
        let (tn, _) = parse_typename("(Int, Bool)");
        assert_eq!(tn.name(), "(Int, Bool)");
    }

    #[test]
    fn test_function_typename_single_param_no_parens() {
        let (tn, _) = parse_typename("Int => Bool");
        assert_eq!(tn.name(), "Int => Bool");
    }

    #[test]
    fn test_function_typename_multi_param_parenthesized() {
        let (tn, _) = parse_typename("(Int, Int) => Int");
        assert_eq!(tn.name(), "(Int, Int) => Int");
    }

    #[test]
    fn test_reference_typename() {
        let (tn, _) = parse_typename("&mut so Point");
        assert_eq!(tn.name(), "&mut so Point");
    }

    #[test]
    fn test_optional_typename() {
        let (tn, _) = parse_typename("?Int");
        assert_eq!(tn.name(), "?Int");
    }

    #[test]
    fn test_type_variable() {
        let (tn, _) = parse_typename("$T");
        assert_eq!(tn.name(), "$T");
    }

    #[test]
    fn test_empty_allowed_returns_empty_typename() {
        let mut ctx = CompileContext::new(";");
        let lexer = Lexer::new(";");
        let mut parser = Parser::new(&mut ctx, lexer);
        let tn = parser.expect_typename("unused", true);
        assert!(tn.is_empty());
        assert!(!ctx.had_error());
    }
}
