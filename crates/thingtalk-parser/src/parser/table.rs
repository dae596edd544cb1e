//! Table expressions.
//!
//! Levels, loosest first:
//! 0. `t join t [on (...)]`
//! 1. `aggregate ... of t`, `sort ... of t`, `[f, g] of t`, `compute ... of t`, `t, filter`
//! 2. `t[i, j]`, `t[base:limit]`
//! 3. calls, `result(...)`, `( t )`

use super::filter::parse_filter;
use super::invocation::{parse_function_ref, parse_invocation, parse_params};
use super::value::{parse_dotted_tail, parse_value};
use super::{ParseError, TokenStream};
use thingtalk_ast::{AggregateOp, InputParam, SortDirection, Table, Value};
use thingtalk_lexer::Token;

pub(super) fn parse_table(stream: &mut TokenStream) -> Result<Table, ParseError> {
    let mut table = parse_table1(stream)?;
    while stream.eat(&Token::Join) {
        let right = parse_table1(stream)?;
        let on = parse_join_on(stream)?;
        table = Table::Join {
            left: Box::new(table),
            right: Box::new(right),
            on,
        };
    }
    Ok(table)
}

/// Optional `on (param=value, ...)` of a join.
pub(super) fn parse_join_on(stream: &mut TokenStream) -> Result<Vec<InputParam>, ParseError> {
    if stream.eat(&Token::On) {
        parse_params(stream)
    } else {
        Ok(Vec::new())
    }
}

pub(super) fn parse_table1(stream: &mut TokenStream) -> Result<Table, ParseError> {
    let start = stream.current_pos();
    match stream.peek() {
        Some(Token::Aggregate) => {
            stream.advance();
            let op_name = stream.expect_ident("where an aggregation was expected")?;
            let op = AggregateOp::from_name(&op_name).ok_or_else(|| {
                ParseError::invalid_syntax(
                    format!("unknown aggregation '{}'", op_name),
                    stream.span_from(start),
                )
            })?;
            let field = if stream.check(&Token::Of) {
                None
            } else {
                Some(parse_field_name(stream)?)
            };
            stream.expect(Token::Of)?;
            let table = parse_table1(stream)?;
            Ok(Table::Aggregate {
                op,
                field,
                table: Box::new(table),
            })
        }
        Some(Token::Sort) => {
            stream.advance();
            let field = parse_field_name(stream)?;
            let direction = if stream.check_word("asc") {
                SortDirection::Asc
            } else if stream.check_word("desc") {
                SortDirection::Desc
            } else {
                return Err(ParseError::unexpected_token(
                    stream.peek(),
                    "(expected 'asc' or 'desc')",
                    stream.current_span(),
                ));
            };
            stream.advance();
            stream.expect(Token::Of)?;
            let table = parse_table1(stream)?;
            Ok(Table::Sort {
                field,
                direction,
                table: Box::new(table),
            })
        }
        Some(Token::LBracket) => {
            stream.advance();
            let mut fields = vec![parse_field_name(stream)?];
            while stream.eat(&Token::Comma) {
                fields.push(parse_field_name(stream)?);
            }
            stream.expect(Token::RBracket)?;
            stream.expect(Token::Of)?;
            let table = parse_table1(stream)?;
            Ok(Table::Projection {
                table: Box::new(table),
                fields,
            })
        }
        Some(Token::Compute) => {
            stream.advance();
            let expr = parse_value(stream)?;
            let alias = if stream.eat(&Token::As) {
                Some(stream.expect_name("after 'as'")?)
            } else {
                None
            };
            stream.expect(Token::Of)?;
            let table = parse_table1(stream)?;
            Ok(Table::Compute {
                table: Box::new(table),
                expr,
                alias,
            })
        }
        _ => {
            let table = parse_table2(stream)?;
            if stream.eat(&Token::Comma) {
                let filter = parse_filter(stream)?;
                return Ok(Table::filtered(table, filter));
            }
            Ok(table)
        }
    }
}

pub(super) fn parse_table2(stream: &mut TokenStream) -> Result<Table, ParseError> {
    let mut table = parse_table3(stream)?;
    while stream.eat(&Token::LBracket) {
        let first = parse_value(stream)?;
        if stream.eat(&Token::Colon) {
            let limit = parse_value(stream)?;
            stream.expect(Token::RBracket)?;
            table = Table::Slice {
                table: Box::new(table),
                base: first,
                limit,
            };
            continue;
        }
        let mut indices = vec![first];
        while stream.eat(&Token::Comma) {
            indices.push(parse_value(stream)?);
        }
        stream.expect(Token::RBracket)?;
        table = Table::Index {
            table: Box::new(table),
            indices,
        };
    }
    Ok(table)
}

fn parse_table3(stream: &mut TokenStream) -> Result<Table, ParseError> {
    match stream.peek() {
        Some(Token::DeviceRef(_)) => Ok(Table::Invocation(parse_invocation(stream)?)),
        Some(Token::Result) => {
            stream.advance();
            stream.expect(Token::LParen)?;
            let (kind, channel) = parse_function_ref(stream)?;
            let index = if stream.eat(&Token::LBracket) {
                let index = parse_value(stream)?;
                stream.expect(Token::RBracket)?;
                index
            } else {
                Value::Number(-1.0)
            };
            stream.expect(Token::RParen)?;
            Ok(Table::ResultRef {
                kind,
                channel,
                index,
                schema: None,
            })
        }
        Some(Token::LParen) => {
            stream.advance();
            let table = parse_table(stream)?;
            stream.expect(Token::RParen)?;
            Ok(table)
        }
        Some(Token::Ident(_)) if stream.check_nth(1, &Token::LParen) => {
            let name = stream.expect_ident("in call")?;
            let in_params = parse_params(stream)?;
            Ok(Table::VarRef {
                name,
                in_params,
                schema: None,
            })
        }
        other => Err(ParseError::unexpected_token(
            other,
            "where a query was expected",
            stream.current_span(),
        )),
    }
}

fn parse_field_name(stream: &mut TokenStream) -> Result<String, ParseError> {
    let first = stream.expect_name("where a field name was expected")?;
    parse_dotted_tail(stream, first)
}
