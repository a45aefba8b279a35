//! Lexer and parser for the dexpr expression language.
//!
//! This crate turns source text into an untyped, spanned AST. Semantic
//! binding (name resolution, overload selection, typing) happens in the
//! `dexpr` core crate; the only semantic knowledge the parser needs is a
//! [`TypeProbe`] telling it which identifiers name registered types, so
//! that `(T) expr` casts can be told apart from parenthesised expressions.

pub mod ast;
pub mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr, Span, Spanned, SpannedExpr, UnaryOp};
pub use lexer::{
    lex, lex_lossy, IntLiteral, IntSuffix, LexError, RealLiteral, RealSuffix, SpannedToken, Token,
};
pub use parser::{parse_tokens, ParseError, Parser};

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

/// Probe for registered type aliases.
///
/// Implemented by the core's registry; any `Fn(&str) -> bool` works too.
pub trait TypeProbe {
    /// Returns true when `name` is a registered type alias.
    fn is_type_name(&self, name: &str) -> bool;
}

impl<F: Fn(&str) -> bool> TypeProbe for F {
    fn is_type_name(&self, name: &str) -> bool {
        self(name)
    }
}

/// A probe that recognises no type names. Casts never parse under it.
pub struct NoTypes;

impl TypeProbe for NoTypes {
    fn is_type_name(&self, _name: &str) -> bool {
        false
    }
}

/// Parse an expression from source.
///
/// Lexes and parses in one step; the first lexing or parsing failure is
/// returned with its byte span.
pub fn parse(input: &str, probe: &dyn TypeProbe) -> Result<SpannedExpr, ParseError> {
    let tokens = lexer::lex(input).map_err(|e| ParseError {
        message: e.message,
        span: e.span,
    })?;

    parser::parse_tokens(&tokens, probe)
}
