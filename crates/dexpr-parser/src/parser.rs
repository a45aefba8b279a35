//! dexpr parser - hand-written recursive descent.
//!
//! Precedence ladder (low to high): assignment, conditional `?:`,
//! null-coalesce `??`, logical-or, logical-and, bitwise-or, bitwise-xor,
//! bitwise-and, equality, relational / type-test, shift, additive,
//! multiplicative, unary, cast, postfix, primary.

use crate::ast::{BinaryOp, Expr, Spanned, SpannedExpr, UnaryOp};
use crate::lexer::{Span, SpannedToken, Token};
use crate::TypeProbe;

/// Parse error with span information.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

/// Recursive descent parser for dexpr expressions.
pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    /// Probe for registered type aliases; needed to tell a cast
    /// `(T) expr` apart from a parenthesised expression.
    probe: &'a dyn TypeProbe,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given token stream.
    pub fn new(tokens: &'a [SpannedToken], probe: &'a dyn TypeProbe) -> Self {
        Self {
            tokens,
            pos: 0,
            probe,
        }
    }

    // === Utility Methods ===

    /// Peek at the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    /// Peek at the token `n` positions ahead.
    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    /// Get the span of the current token.
    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    /// Get the span representing end-of-input.
    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        end..end
    }

    /// Advance to the next token, returning the current one.
    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token matches the given token.
    fn check(&self, token: &Token) -> bool {
        self.peek().map_or(false, |t| t == token)
    }

    /// Consume the current token if it matches, returning true if consumed.
    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token, returning an error if not found.
    fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        if self.check(token) {
            let span = self.peek_span();
            self.advance();
            Ok(span)
        } else {
            Err(ParseError {
                message: match self.peek() {
                    Some(found) => format!("expected '{}', found '{}'", token, found),
                    None => format!("expected '{}', found end of input", token),
                },
                span: self.peek_span(),
            })
        }
    }

    /// Expect an identifier naming a type (after `is`, `as`, `typeof(`,
    /// `default(` and inside casts).
    fn expect_type_name(&mut self) -> Result<(String, Span), ParseError> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                let span = self.peek_span();
                self.advance();
                Ok((name, span))
            }
            other => Err(ParseError {
                message: match other {
                    Some(found) => format!("expected type name, found '{}'", found),
                    None => "expected type name, found end of input".to_string(),
                },
                span: self.peek_span(),
            }),
        }
    }

    /// Check if we've reached the end of the token stream.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // === Expression Parsing ===

    /// Parse an expression (entry point).
    pub fn parse_expr(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_assignment()
    }

    /// Parse assignment: expr = expr (right-associative).
    ///
    /// The parser always accepts `=`; whether assignment is enabled, and
    /// whether the target is an l-value, is the binder's decision.
    fn parse_assignment(&mut self) -> Result<SpannedExpr, ParseError> {
        let target = self.parse_conditional()?;

        if self.match_token(&Token::Assign) {
            let value = self.parse_assignment()?;
            let span = target.span.start..value.span.end;
            Ok(Spanned::new(
                Expr::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                span,
            ))
        } else {
            Ok(target)
        }
    }

    /// Parse conditional: expr ? expr : expr
    fn parse_conditional(&mut self) -> Result<SpannedExpr, ParseError> {
        let cond = self.parse_coalesce()?;

        if self.match_token(&Token::Question) {
            let then_expr = self.parse_expr()?;
            self.expect(&Token::Colon)?;
            let else_expr = self.parse_expr()?;
            let span = cond.span.start..else_expr.span.end;

            Ok(Spanned::new(
                Expr::Conditional {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                span,
            ))
        } else {
            Ok(cond)
        }
    }

    /// Parse null-coalesce: expr ?? expr (right-associative).
    fn parse_coalesce(&mut self) -> Result<SpannedExpr, ParseError> {
        let left = self.parse_or()?;

        if self.match_token(&Token::QuestionQuestion) {
            let right = self.parse_coalesce()?;
            let span = left.span.start..right.span.end;
            Ok(Spanned::new(
                Expr::Binary {
                    op: BinaryOp::Coalesce,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            ))
        } else {
            Ok(left)
        }
    }

    /// Parse a left-associative binary level given the operator mapping
    /// and the next-tighter level.
    fn parse_binary_level(
        &mut self,
        match_op: impl Fn(&Token) -> Option<BinaryOp>,
        next: impl Fn(&mut Self) -> Result<SpannedExpr, ParseError>,
    ) -> Result<SpannedExpr, ParseError> {
        let mut left = next(self)?;

        while let Some(op) = self.peek().and_then(&match_op) {
            self.advance();
            let right = next(self)?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Parse logical OR: expr || expr
    fn parse_or(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::OrOr).then_some(BinaryOp::Or),
            Self::parse_and,
        )
    }

    /// Parse logical AND: expr && expr
    fn parse_and(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::AndAnd).then_some(BinaryOp::And),
            Self::parse_bit_or,
        )
    }

    /// Parse bitwise OR: expr | expr
    fn parse_bit_or(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::Pipe).then_some(BinaryOp::BitOr),
            Self::parse_bit_xor,
        )
    }

    /// Parse bitwise XOR: expr ^ expr
    fn parse_bit_xor(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::Caret).then_some(BinaryOp::BitXor),
            Self::parse_bit_and,
        )
    }

    /// Parse bitwise AND: expr & expr
    fn parse_bit_and(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(
            |t| matches!(t, Token::Amp).then_some(BinaryOp::BitAnd),
            Self::parse_equality,
        )
    }

    /// Parse equality: == !=
    fn parse_equality(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::EqEq => Some(BinaryOp::Eq),
                Token::Ne => Some(BinaryOp::Ne),
                _ => None,
            },
            Self::parse_relational,
        )
    }

    /// Parse relational operators and type tests: < <= > >= is as
    fn parse_relational(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_shift()?;

        loop {
            let op = match self.peek() {
                Some(Token::Lt) => Some(BinaryOp::Lt),
                Some(Token::Le) => Some(BinaryOp::Le),
                Some(Token::Gt) => Some(BinaryOp::Gt),
                Some(Token::Ge) => Some(BinaryOp::Ge),
                _ => None,
            };

            if let Some(op) = op {
                self.advance();
                let right = self.parse_shift()?;
                let span = left.span.start..right.span.end;
                left = Spanned::new(
                    Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                );
            } else if self.match_token(&Token::Is) {
                let (type_name, type_span) = self.expect_type_name()?;
                let span = left.span.start..type_span.end;
                left = Spanned::new(
                    Expr::Is {
                        expr: Box::new(left),
                        type_name,
                    },
                    span,
                );
            } else if self.match_token(&Token::As) {
                let (type_name, type_span) = self.expect_type_name()?;
                let span = left.span.start..type_span.end;
                left = Spanned::new(
                    Expr::As {
                        expr: Box::new(left),
                        type_name,
                    },
                    span,
                );
            } else {
                break;
            }
        }

        Ok(left)
    }

    /// Parse shift operators: << >>
    fn parse_shift(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::Shl => Some(BinaryOp::Shl),
                Token::Shr => Some(BinaryOp::Shr),
                _ => None,
            },
            Self::parse_additive,
        )
    }

    /// Parse additive operators: + -
    fn parse_additive(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::Plus => Some(BinaryOp::Add),
                Token::Minus => Some(BinaryOp::Sub),
                _ => None,
            },
            Self::parse_multiplicative,
        )
    }

    /// Parse multiplicative operators: * / %
    fn parse_multiplicative(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_binary_level(
            |t| match t {
                Token::Star => Some(BinaryOp::Mul),
                Token::Slash => Some(BinaryOp::Div),
                Token::Percent => Some(BinaryOp::Mod),
                _ => None,
            },
            Self::parse_unary,
        )
    }

    /// Parse unary operators and casts: - ! ~ + (T)expr
    fn parse_unary(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;

        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Not) => Some(UnaryOp::Not),
            Some(Token::Tilde) => Some(UnaryOp::BitNot),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let expr = self.parse_unary()?;
            let span = start..expr.span.end;
            return Ok(Spanned::new(
                Expr::Unary {
                    op,
                    expr: Box::new(expr),
                },
                span,
            ));
        }

        // Unary plus is accepted and dropped.
        if self.match_token(&Token::Plus) {
            return self.parse_unary();
        }

        if let Some(cast) = self.try_parse_cast()? {
            return Ok(cast);
        }

        self.parse_postfix()
    }

    /// Try to parse `(TypeName) unary-expr`.
    ///
    /// A parenthesised name is a cast only when the probe recognises it as
    /// a registered type alias AND the token after `)` can begin a cast
    /// operand. `(x) - y` stays a subtraction even when `x` names a type.
    fn try_parse_cast(&mut self) -> Result<Option<SpannedExpr>, ParseError> {
        let name = match (self.peek(), self.peek_at(1), self.peek_at(2)) {
            (Some(Token::LParen), Some(Token::Ident(name)), Some(Token::RParen))
                if self.probe.is_type_name(name) =>
            {
                name.clone()
            }
            _ => return Ok(None),
        };

        if !self.peek_at(3).map_or(false, starts_cast_operand) {
            return Ok(None);
        }

        let start = self.peek_span().start;
        self.advance(); // (
        self.advance(); // name
        self.advance(); // )

        let expr = self.parse_unary()?;
        let span = start..expr.span.end;
        Ok(Some(Spanned::new(
            Expr::Cast {
                type_name: name,
                expr: Box::new(expr),
            },
            span,
        )))
    }

    /// Parse postfix operators: . [] ()
    fn parse_postfix(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            if self.check(&Token::LParen) {
                expr = self.parse_call(expr)?;
            } else if self.check(&Token::LBracket) {
                expr = self.parse_index(expr)?;
            } else if self.check(&Token::Dot) {
                expr = self.parse_member(expr)?;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse a call: expr(args...)
    fn parse_call(&mut self, callee: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = callee.span.start;
        self.expect(&Token::LParen)?;

        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.parse_expr()?);
            while self.match_token(&Token::Comma) {
                args.push(self.parse_expr()?);
            }
        }

        let end_span = self.expect(&Token::RParen)?;

        Ok(Spanned::new(
            Expr::Call {
                expr: Box::new(callee),
                args,
            },
            start..end_span.end,
        ))
    }

    /// Parse an index operation: expr[index]
    fn parse_index(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::LBracket)?;
        let index = self.parse_expr()?;
        let end_span = self.expect(&Token::RBracket)?;

        Ok(Spanned::new(
            Expr::Index {
                expr: Box::new(base),
                index: Box::new(index),
            },
            start..end_span.end,
        ))
    }

    /// Parse member access: expr.name
    fn parse_member(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::Dot)?;

        let (name, end) = match self.advance() {
            Some((Token::Ident(name), span)) => (name.clone(), span.end),
            other => {
                return Err(ParseError {
                    message: match other {
                        Some((t, _)) => format!("expected member name after '.', found '{}'", t),
                        None => "expected member name after '.'".to_string(),
                    },
                    span: self.peek_span(),
                });
            }
        };

        Ok(Spanned::new(
            Expr::Member {
                expr: Box::new(base),
                name,
            },
            start..end,
        ))
    }

    /// Parse an atom: literal, identifier, parenthesised expression,
    /// `typeof(T)` or `default(T)`.
    fn parse_atom(&mut self) -> Result<SpannedExpr, ParseError> {
        let span = self.peek_span();
        let token = self.peek().cloned();

        match token {
            Some(Token::Int(lit)) => {
                self.advance();
                Ok(Spanned::new(
                    Expr::Int {
                        value: lit.value,
                        suffix: lit.suffix,
                    },
                    span,
                ))
            }
            Some(Token::Real(lit)) => {
                self.advance();
                Ok(Spanned::new(
                    Expr::Real {
                        value: lit.value,
                        suffix: lit.suffix,
                    },
                    span,
                ))
            }
            Some(Token::Char(c)) => {
                self.advance();
                Ok(Spanned::new(Expr::Char(c), span))
            }
            Some(Token::String(s)) => {
                self.advance();
                Ok(Spanned::new(Expr::String(s), span))
            }

            Some(Token::Ident(name)) => {
                self.advance();
                Ok(Spanned::new(Expr::Ident(name), span))
            }

            Some(Token::Typeof) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let (type_name, _) = self.expect_type_name()?;
                let end_span = self.expect(&Token::RParen)?;
                Ok(Spanned::new(
                    Expr::TypeOf { type_name },
                    span.start..end_span.end,
                ))
            }

            Some(Token::Default) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let (type_name, _) = self.expect_type_name()?;
                let end_span = self.expect(&Token::RParen)?;
                Ok(Spanned::new(
                    Expr::DefaultOf { type_name },
                    span.start..end_span.end,
                ))
            }

            Some(tok @ (Token::New | Token::Is | Token::As)) => Err(ParseError {
                message: format!("'{}' is a reserved word and cannot be used here", tok),
                span,
            }),

            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }

            Some(token) => Err(ParseError {
                message: format!("unexpected token '{}'", token),
                span,
            }),

            None => Err(ParseError {
                message: "unexpected end of input".to_string(),
                span: self.eof_span(),
            }),
        }
    }
}

/// Tokens that may begin the operand of a cast. A `-` deliberately does
/// not, so `(x) - y` parses as subtraction.
fn starts_cast_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Ident(_)
            | Token::Int(_)
            | Token::Real(_)
            | Token::Char(_)
            | Token::String(_)
            | Token::LParen
            | Token::Not
            | Token::Tilde
            | Token::Typeof
            | Token::Default
    )
}

/// Parse tokens into an AST. Returns the AST or the first error.
pub fn parse_tokens(
    tokens: &[SpannedToken],
    probe: &dyn TypeProbe,
) -> Result<SpannedExpr, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError {
            message: "empty expression".to_string(),
            span: 0..0,
        });
    }

    let mut parser = Parser::new(tokens, probe);
    let ast = parser.parse_expr()?;
    if parser.at_end() {
        Ok(ast)
    } else {
        Err(ParseError {
            message: format!(
                "unexpected token '{}' after expression",
                parser.peek().expect("not at end")
            ),
            span: parser.peek_span(),
        })
    }
}
