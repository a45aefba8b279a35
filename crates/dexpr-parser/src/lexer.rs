//! dexpr lexer using logos.

use logos::Logos;

/// A span in the source input (byte offsets).
pub type Span = std::ops::Range<usize>;

/// A token with its source span.
pub type SpannedToken = (Token, Span);

/// Lexer error with span information.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Type suffix on an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntSuffix {
    /// No suffix: smallest of i32 / i64 / u64 that holds the value.
    #[default]
    None,
    /// `u` / `U`: u32, widening to u64 when the value requires it.
    Unsigned,
    /// `l` / `L`: i64.
    Long,
    /// `ul` / `lu` (any case): u64.
    UnsignedLong,
}

/// Type suffix on a real literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RealSuffix {
    /// No suffix: f64.
    #[default]
    None,
    /// `f` / `F`: f32.
    Single,
    /// `d` / `D`: f64.
    Double,
    /// `m` / `M`: the decimal form.
    Decimal,
}

/// An integer literal: magnitude plus suffix. The sign, if any, is a
/// separate unary operator token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntLiteral {
    pub value: u64,
    pub suffix: IntSuffix,
}

/// A real literal: value plus suffix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealLiteral {
    pub value: f64,
    pub suffix: RealSuffix,
}

/// dexpr tokens.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // === Numeric Literals ===
    // Order matters: more specific patterns first

    // Real with decimal point and optional exponent/suffix: 1.5, 1.5e10, 1.5f
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?[fFdDmM]?", lex_real, priority = 6)]
    // Real with exponent only: 1e10, 1E-5f
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fFdDmM]?", lex_real, priority = 5)]
    // Real by suffix only: 1f, 2d, 3m
    #[regex(r"[0-9]+[fFdDmM]", lex_real_suffix_only, priority = 4)]
    Real(RealLiteral),

    // Hex int with optional suffix: 0x1F, 0x1Ful
    #[regex(r"0[xX][0-9a-fA-F]+([uU][lL]?|[lL][uU]?)?", lex_hex_int, priority = 3)]
    // Decimal int with optional suffix: 123, 123u, 123UL
    #[regex(r"[0-9]+([uU][lL]?|[lL][uU]?)?", lex_decimal_int, priority = 2)]
    Int(IntLiteral),

    // === Character Literals ===
    #[token("'", lex_char)]
    Char(char),

    // === String Literals ===
    #[token("\"", lex_string)]
    String(String),

    // === Keywords ===
    #[token("is")]
    Is,
    #[token("as")]
    As,
    #[token("typeof")]
    Typeof,
    #[token("default")]
    Default,
    #[token("new")]
    New,

    // === Identifier ===
    // `true`, `false` and `null` deliberately lex as identifiers; they are
    // resolved through the registry like any other known identifier.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    // === Operators (multi-char first) ===
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("??")]
    QuestionQuestion,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("=")]
    Assign,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(lit) => write!(f, "{}", lit.value),
            Token::Real(lit) => write!(f, "{}", lit.value),
            Token::Char(c) => write!(f, "'{}'", c),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Is => write!(f, "is"),
            Token::As => write!(f, "as"),
            Token::Typeof => write!(f, "typeof"),
            Token::Default => write!(f, "default"),
            Token::New => write!(f, "new"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::EqEq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::QuestionQuestion => write!(f, "??"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Not => write!(f, "!"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::Tilde => write!(f, "~"),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::Assign => write!(f, "="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
        }
    }
}

// === Lexer Callbacks for Numbers ===

/// Split a numeric slice into (digits, integer suffix).
fn split_int_suffix(s: &str) -> (&str, IntSuffix) {
    let trimmed = s.trim_end_matches(['u', 'U', 'l', 'L']);
    let suffix = &s[trimmed.len()..];
    let has_u = suffix.contains(['u', 'U']);
    let has_l = suffix.contains(['l', 'L']);
    let suffix = match (has_u, has_l) {
        (true, true) => IntSuffix::UnsignedLong,
        (true, false) => IntSuffix::Unsigned,
        (false, true) => IntSuffix::Long,
        (false, false) => IntSuffix::None,
    };
    (trimmed, suffix)
}

fn lex_decimal_int(lex: &mut logos::Lexer<Token>) -> Option<IntLiteral> {
    let (digits, suffix) = split_int_suffix(lex.slice());
    let value = digits.parse().ok()?;
    Some(IntLiteral { value, suffix })
}

fn lex_hex_int(lex: &mut logos::Lexer<Token>) -> Option<IntLiteral> {
    let (digits, suffix) = split_int_suffix(lex.slice());
    let value = u64::from_str_radix(&digits[2..], 16).ok()?; // skip 0x
    Some(IntLiteral { value, suffix })
}

fn lex_real(lex: &mut logos::Lexer<Token>) -> Option<RealLiteral> {
    let s = lex.slice();
    let (digits, suffix) = match s.as_bytes().last()? {
        b'f' | b'F' => (&s[..s.len() - 1], RealSuffix::Single),
        b'd' | b'D' => (&s[..s.len() - 1], RealSuffix::Double),
        b'm' | b'M' => (&s[..s.len() - 1], RealSuffix::Decimal),
        _ => (s, RealSuffix::None),
    };
    let value = digits.parse().ok()?;
    Some(RealLiteral { value, suffix })
}

fn lex_real_suffix_only(lex: &mut logos::Lexer<Token>) -> Option<RealLiteral> {
    lex_real(lex)
}

// === Lexer Callbacks for Char and String ===

fn lex_char(lex: &mut logos::Lexer<Token>) -> Option<char> {
    let remainder = lex.remainder();
    let mut chars = remainder.chars();
    let mut consumed = 0;

    let first = chars.next()?;
    consumed += first.len_utf8();
    let value = if first == '\\' {
        let (c, used) = lex_escape(&mut chars)?;
        consumed += used;
        c
    } else if first == '\'' || first == '\n' {
        return None; // empty literal or unterminated
    } else {
        first
    };

    match chars.next() {
        Some('\'') => {
            lex.bump(consumed + 1);
            Some(value)
        }
        _ => None, // more than one character, or unterminated
    }
}

fn lex_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let remainder = lex.remainder();
    let mut chars = remainder.chars();
    let mut result = std::string::String::new();
    let mut consumed = 0;

    while let Some(c) = chars.next() {
        consumed += c.len_utf8();
        if c == '"' {
            lex.bump(consumed);
            return Some(result);
        } else if c == '\\' {
            let (escaped, used) = lex_escape(&mut chars)?;
            consumed += used;
            result.push(escaped);
        } else if c == '\n' {
            return None; // newline not allowed inside a string literal
        } else {
            result.push(c);
        }
    }

    None // unclosed string
}

/// Lex one escape sequence (the leading backslash is already consumed).
/// Returns the decoded char and the number of bytes consumed.
fn lex_escape(chars: &mut std::str::Chars<'_>) -> Option<(char, usize)> {
    let escape_char = chars.next()?;
    let mut consumed = escape_char.len_utf8();
    let c = match escape_char {
        '\\' => '\\',
        '"' => '"',
        '\'' => '\'',
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0C',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0B',
        'x' => {
            // \xH..HHHH - 1 to 4 hex digits
            let mut hex = std::string::String::new();
            let mut peekable = chars.clone();
            while hex.len() < 4 {
                match peekable.next() {
                    Some(h) if h.is_ascii_hexdigit() => {
                        chars.next();
                        hex.push(h);
                    }
                    _ => break,
                }
            }
            if hex.is_empty() {
                return None;
            }
            consumed += hex.len();
            let val = u32::from_str_radix(&hex, 16).ok()?;
            char::from_u32(val)?
        }
        'u' => {
            // \uXXXX - exactly 4 hex digits
            let hex: String = chars.by_ref().take(4).collect();
            if hex.len() != 4 {
                return None;
            }
            consumed += hex.len();
            let val = u32::from_str_radix(&hex, 16).ok()?;
            char::from_u32(val)?
        }
        'U' => {
            // \UXXXXXXXX - exactly 8 hex digits
            let hex: String = chars.by_ref().take(8).collect();
            if hex.len() != 8 {
                return None;
            }
            consumed += hex.len();
            let val = u32::from_str_radix(&hex, 16).ok()?;
            char::from_u32(val)?
        }
        _ => return None, // invalid escape
    };
    Some((c, consumed))
}

// === Public Lexer API ===

/// Tokenize the input string.
pub fn lex(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                return Err(LexError {
                    message: format!("unexpected character '{}'", &input[span.clone()]),
                    span,
                })
            }
        }
    }

    Ok(tokens)
}

/// Tokenize the input, skipping unlexable characters.
///
/// Best-effort form used by identifier detection, where a malformed tail
/// must not hide the names that lexed fine.
pub fn lex_lossy(input: &str) -> Vec<SpannedToken> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(input);

    while let Some(result) = lexer.next() {
        if let Ok(token) = result {
            tokens.push((token, lexer.span()));
        }
    }

    tokens
}
