//! Boolean filters: `||` binds loosest, then `&&`, then `!`.

use super::token_utils::infix_filter_op;
use super::value::{parse_dotted_tail, parse_value};
use super::{ParseError, TokenStream};
use thingtalk_ast::{ComputeFilter, ComputeOp, Filter, FilterOp, Value};
use thingtalk_lexer::Token;

pub(super) fn parse_filter(stream: &mut TokenStream) -> Result<Filter, ParseError> {
    let mut operands = vec![parse_and(stream)?];
    while stream.eat(&Token::OrOr) {
        operands.push(parse_and(stream)?);
    }
    Ok(Filter::or(operands))
}

fn parse_and(stream: &mut TokenStream) -> Result<Filter, ParseError> {
    let mut operands = vec![parse_unary(stream)?];
    while stream.eat(&Token::AndAnd) {
        operands.push(parse_unary(stream)?);
    }
    Ok(Filter::and(operands))
}

fn parse_unary(stream: &mut TokenStream) -> Result<Filter, ParseError> {
    if stream.eat(&Token::Bang) {
        return Ok(Filter::negate(parse_unary(stream)?));
    }
    parse_atom(stream)
}

fn parse_atom(stream: &mut TokenStream) -> Result<Filter, ParseError> {
    match stream.peek() {
        Some(Token::True) => {
            stream.advance();
            Ok(Filter::True)
        }
        Some(Token::False) => {
            stream.advance();
            Ok(Filter::False)
        }
        Some(Token::LParen) => {
            stream.advance();
            let filter = parse_filter(stream)?;
            stream.expect(Token::RParen)?;
            Ok(filter)
        }
        Some(Token::Ident(name)) if stream.check_nth(1, &Token::LParen) => {
            let name = name.to_string();
            if let Some(op) = FilterOp::from_function_name(&name) {
                stream.advance();
                return parse_function_atom(stream, op);
            }
            if ComputeOp::from_name(&name).is_some() {
                let lhs = parse_value(stream)?;
                let op = expect_infix_op(stream)?;
                let rhs = parse_value(stream)?;
                return Ok(Filter::Compute(ComputeFilter { lhs, op, rhs }));
            }
            Err(ParseError::invalid_syntax(
                format!("unknown filter function '{}'", name),
                stream.current_span(),
            ))
        }
        Some(Token::Ident(_)) => {
            let first = stream.expect_ident("in filter")?;
            let name = parse_dotted_tail(stream, first)?;
            let op = expect_infix_op(stream)?;
            let value = parse_value(stream)?;
            Ok(Filter::atom(&name, op, value))
        }
        other => Err(ParseError::unexpected_token(
            other,
            "where a filter was expected",
            stream.current_span(),
        )),
    }
}

/// `op(field, value)`; a computed first operand makes a computed filter.
fn parse_function_atom(stream: &mut TokenStream, op: FilterOp) -> Result<Filter, ParseError> {
    stream.expect(Token::LParen)?;
    let lhs = parse_value(stream)?;
    stream.expect(Token::Comma)?;
    let rhs = parse_value(stream)?;
    stream.expect(Token::RParen)?;
    Ok(match lhs {
        Value::VarRef(name) => Filter::atom(&name, op, rhs),
        lhs => Filter::Compute(ComputeFilter { lhs, op, rhs }),
    })
}

fn expect_infix_op(stream: &mut TokenStream) -> Result<FilterOp, ParseError> {
    match stream.peek().and_then(infix_filter_op) {
        Some(op) => {
            stream.advance();
            Ok(op)
        }
        None => Err(ParseError::unexpected_token(
            stream.peek(),
            "where a comparison operator was expected",
            stream.current_span(),
        )),
    }
}
