//! Token helpers shared by the sub-parsers.
//!
//! Reserved words may still appear where the grammar expects a plain name:
//! enum symbols (`enum(on)`), parameter names, annotation keys. These
//! helpers are the one place that decides which tokens count as names and
//! which tokens are filter operators.

use thingtalk_ast::FilterOp;
use thingtalk_lexer::Token;

/// Text of a reserved word.
///
/// # Examples
/// ```
/// use thingtalk_lexer::Token;
/// use thingtalk_parser::parser::token_utils::keyword_to_string;
///
/// assert_eq!(keyword_to_string(&Token::On), Some("on".to_string()));
/// assert_eq!(keyword_to_string(&Token::FatArrow), None);
/// ```
pub fn keyword_to_string(token: &Token) -> Option<String> {
    token.is_keyword().then(|| token.to_string())
}

/// Text of a token usable as a name: an identifier or a reserved word.
pub fn name_of(token: &Token) -> Option<String> {
    match token {
        Token::Ident(id) => Some(id.to_string()),
        other => keyword_to_string(other),
    }
}

/// Infix filter operator written by this token.
pub fn infix_filter_op(token: &Token) -> Option<FilterOp> {
    match token {
        Token::EqEq => Some(FilterOp::Eq),
        Token::BangEq => Some(FilterOp::Neq),
        Token::Gt => Some(FilterOp::Gt),
        Token::GtEq => Some(FilterOp::Gte),
        Token::Lt => Some(FilterOp::Lt),
        Token::LtEq => Some(FilterOp::Lte),
        Token::Substr => Some(FilterOp::Substr),
        Token::RevSubstr => Some(FilterOp::RevSubstr),
        _ => None,
    }
}

/// Function-style filter operator (`contains(f, v)`) named by this token.
pub fn function_filter_op(token: &Token) -> Option<FilterOp> {
    match token {
        Token::Ident(id) => FilterOp::from_function_name(id),
        _ => None,
    }
}
