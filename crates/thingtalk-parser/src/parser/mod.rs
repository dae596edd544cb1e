//! Hand-written recursive descent parser for ThingTalk.
//!
//! ## Architecture
//!
//! - `stream`: TokenStream wrapper with lookahead
//! - `error`: ParseError
//! - `types`: type expressions
//! - `value`: literals, placeholders and computations
//! - `filter`: boolean filters
//! - `invocation`: device references, calls and parameters
//! - `table` / `stream_expr`: query-side and trigger-side expressions
//! - `rule`: rules, actions and permission rules
//! - `program`: declarations, datasets and the top level
//!
//! ## Public API
//!
//! ```rust,ignore
//! pub fn parse(source: &str) -> Result<Program, ParseError>
//! pub fn parse_with_file_id(source: &str, file_id: u16) -> Result<Program, ParseError>
//! ```

mod error;
mod stream;

pub use error::{ParseError, ParseErrorKind};
use stream::TokenStream;

mod filter;
mod invocation;
mod program;
mod rule;
mod stream_expr;
mod table;
mod value;

/// Token utility functions for canonical keyword-to-string mappings.
///
/// Decides which tokens may stand for plain names and which tokens spell
/// filter operators.
pub mod token_utils;
mod types;

use logos::Logos;
use std::ops::Range;
use thingtalk_ast::foundation::Span;
use thingtalk_ast::Program;
use thingtalk_lexer::Token;

/// Parse a complete program.
///
/// Empty input (or input that is only comments) is an empty program.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    parse_with_file_id(source, 0)
}

/// Parse a complete program, tagging spans with `file_id`.
pub fn parse_with_file_id(source: &str, file_id: u16) -> Result<Program, ParseError> {
    let tokens = lex(source, file_id)?;
    let mut stream = TokenStream::new(&tokens, file_id);
    program::parse_program(&mut stream)
}

/// Tokenize `source` into (token, byte range) pairs.
///
/// Fails on the first character sequence that is not a token.
pub fn lex(source: &str, file_id: u16) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    Token::lexer(source)
        .spanned()
        .map(|(result, range)| match result {
            Ok(token) => Ok((token, range)),
            Err(()) => Err(ParseError::invalid_syntax(
                format!("unrecognized input '{}'", &source[range.clone()]),
                Span::new(file_id, range.start as u32, range.end as u32, 0),
            )),
        })
        .collect()
}
