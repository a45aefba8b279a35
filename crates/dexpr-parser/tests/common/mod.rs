//! Common test utilities for dexpr-parser integration tests.

use dexpr_parser::{parse, NoTypes, ParseError, SpannedExpr};

/// Parse input with no known types and assert it succeeds.
#[allow(dead_code)]
pub fn assert_parses(input: &str) -> SpannedExpr {
    match parse(input, &NoTypes) {
        Ok(ast) => ast,
        Err(e) => panic!("failed to parse '{}': {}", input, e),
    }
}

/// Parse input with no known types and assert it fails.
#[allow(dead_code)]
pub fn assert_parse_error(input: &str) -> ParseError {
    match parse(input, &NoTypes) {
        Ok(ast) => panic!("expected parse error for '{}', but got: {:?}", input, ast),
        Err(e) => e,
    }
}
