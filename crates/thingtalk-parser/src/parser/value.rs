//! Value literals, references and placeholders.

use super::filter::parse_filter;
use super::types::parse_entity_type;
use super::{ParseError, TokenStream};
use thingtalk_ast::{ComputeOp, DateEdge, DateValue, LocationValue, Value};
use thingtalk_lexer::Token;

pub(super) fn parse_value(stream: &mut TokenStream) -> Result<Value, ParseError> {
    let value = parse_primary(stream)?;
    if stream.eat(&Token::Filter) {
        stream.expect(Token::LBrace)?;
        let filter = parse_filter(stream)?;
        stream.expect(Token::RBrace)?;
        return Ok(Value::ArrayFilter {
            value: Box::new(value),
            filter: Box::new(filter),
        });
    }
    Ok(value)
}

fn parse_primary(stream: &mut TokenStream) -> Result<Value, ParseError> {
    let start = stream.current_pos();
    let Some(token) = stream.advance().cloned() else {
        return Err(ParseError::unexpected_token(
            None,
            "where a value was expected",
            stream.current_span(),
        ));
    };

    match token {
        Token::DollarQuestion => Ok(Value::undefined()),
        Token::True => Ok(Value::Boolean(true)),
        Token::False => Ok(Value::Boolean(false)),
        Token::Null => Ok(Value::Null),
        Token::Number(n) => Ok(Value::Number(n)),
        Token::Measure(m) => Ok(Value::Measure(m.value, m.unit.to_string())),
        Token::String(s) => parse_string_or_entity(stream, s.to_string()),
        Token::LBracket => {
            let mut values = Vec::new();
            if !stream.check(&Token::RBracket) {
                values.push(parse_value(stream)?);
                while stream.eat(&Token::Comma) {
                    values.push(parse_value(stream)?);
                }
            }
            stream.expect(Token::RBracket)?;
            Ok(Value::Array(values))
        }
        Token::DollarIdent(name) => match &*name {
            "undefined" => {
                if stream.check(&Token::Dot) && stream.check_word_nth(1, "remote") {
                    stream.advance();
                    stream.advance();
                    Ok(Value::Undefined(false))
                } else {
                    Ok(Value::undefined())
                }
            }
            "event" => {
                if stream.eat(&Token::Dot) {
                    Ok(Value::Event(Some(stream.expect_name("after '$event.'")?)))
                } else {
                    Ok(Value::Event(None))
                }
            }
            "context" => {
                stream.expect(Token::Dot)?;
                stream.expect_word("location")?;
                stream.expect(Token::Dot)?;
                let tag = stream.expect_name("after '$context.location.'")?;
                Ok(Value::Location(LocationValue::Relative(tag)))
            }
            other => Err(ParseError::invalid_syntax(
                format!("unknown special value '${}'", other),
                stream.span_from(start),
            )),
        },
        Token::Ident(name) => parse_word(stream, &name, start),
        other => Err(ParseError::unexpected_token(
            Some(&other),
            "where a value was expected",
            stream.span_from(start),
        )),
    }
}

/// `"v"`, `"v"^^ns:type` or `"v"^^ns:type("display")`.
fn parse_string_or_entity(stream: &mut TokenStream, value: String) -> Result<Value, ParseError> {
    if !stream.eat(&Token::CaretCaret) {
        return Ok(Value::String(value));
    }
    let ty = parse_entity_type(stream)?;
    let display = if stream.eat(&Token::LParen) {
        let display = expect_string(stream)?;
        stream.expect(Token::RParen)?;
        Some(display)
    } else {
        None
    };
    Ok(Value::Entity { value, ty, display })
}

/// Values introduced by a word: constructors, computations and references.
fn parse_word(stream: &mut TokenStream, word: &str, start: usize) -> Result<Value, ParseError> {
    if !stream.check(&Token::LParen) {
        return parse_var_ref(stream, word.to_string());
    }

    match word {
        "enum" => {
            stream.expect(Token::LParen)?;
            let symbol = stream.expect_name("in enum value")?;
            stream.expect(Token::RParen)?;
            Ok(Value::Enum(symbol))
        }
        "makeDate" => {
            stream.expect(Token::LParen)?;
            if stream.eat(&Token::RParen) {
                return Ok(Value::Date(DateValue::Now));
            }
            let year = expect_integer(stream)?;
            stream.expect(Token::Comma)?;
            let month = expect_integer(stream)?;
            stream.expect(Token::Comma)?;
            let day = expect_integer(stream)?;
            stream.expect(Token::RParen)?;
            Ok(Value::Date(DateValue::Absolute {
                year: to_year(stream, year, start)?,
                month: to_unsigned(stream, month, start)?,
                day: to_unsigned(stream, day, start)?,
            }))
        }
        "start_of" | "end_of" => {
            stream.expect(Token::LParen)?;
            let unit = stream.expect_ident("where a time unit was expected")?;
            stream.expect(Token::RParen)?;
            let edge = if word == "start_of" {
                DateEdge::StartOf
            } else {
                DateEdge::EndOf
            };
            Ok(Value::Date(DateValue::Edge { edge, unit }))
        }
        "makeTime" => {
            stream.expect(Token::LParen)?;
            let hour = expect_integer(stream)?;
            stream.expect(Token::Comma)?;
            let minute = expect_integer(stream)?;
            stream.expect(Token::RParen)?;
            Ok(Value::Time {
                hour: to_unsigned(stream, hour, start)?,
                minute: to_unsigned(stream, minute, start)?,
            })
        }
        "makeLocation" => {
            stream.expect(Token::LParen)?;
            let lat = expect_number(stream)?;
            stream.expect(Token::Comma)?;
            let lon = expect_number(stream)?;
            let display = if stream.eat(&Token::Comma) {
                Some(expect_string(stream)?)
            } else {
                None
            };
            stream.expect(Token::RParen)?;
            Ok(Value::Location(LocationValue::Absolute { lat, lon, display }))
        }
        _ => match ComputeOp::from_name(word) {
            Some(op) => {
                stream.expect(Token::LParen)?;
                let mut operands = vec![parse_value(stream)?];
                while stream.eat(&Token::Comma) {
                    operands.push(parse_value(stream)?);
                }
                stream.expect(Token::RParen)?;
                if operands.len() != op.arity() {
                    return Err(ParseError::invalid_syntax(
                        format!(
                            "'{}' takes {} argument(s), found {}",
                            op.name(),
                            op.arity(),
                            operands.len()
                        ),
                        stream.span_from(start),
                    ));
                }
                Ok(Value::Computation { op, operands })
            }
            None => Err(ParseError::invalid_syntax(
                format!("unknown value constructor '{}'", word),
                stream.span_from(start),
            )),
        },
    }
}

/// `name` or a join-qualified `first.name`.
pub(super) fn parse_var_ref(stream: &mut TokenStream, first: String) -> Result<Value, ParseError> {
    Ok(Value::VarRef(parse_dotted_tail(stream, first)?))
}

/// Complete a join-qualified name (`first.x`, `second.x`) started by `first`.
pub(super) fn parse_dotted_tail(
    stream: &mut TokenStream,
    mut first: String,
) -> Result<String, ParseError> {
    let qualified = first == "first" || first == "second";
    if qualified && stream.check(&Token::Dot) && matches!(stream.peek_nth(1), Some(Token::Ident(_))) {
        stream.advance();
        first.push('.');
        first.push_str(&stream.expect_ident("in field name")?);
    }
    Ok(first)
}

pub(super) fn expect_string(stream: &mut TokenStream) -> Result<String, ParseError> {
    match stream.peek() {
        Some(Token::String(s)) => {
            let s = s.to_string();
            stream.advance();
            Ok(s)
        }
        other => Err(ParseError::unexpected_token(
            other,
            "where a string was expected",
            stream.current_span(),
        )),
    }
}

fn expect_number(stream: &mut TokenStream) -> Result<f64, ParseError> {
    match stream.peek() {
        Some(Token::Number(n)) => {
            let n = *n;
            stream.advance();
            Ok(n)
        }
        other => Err(ParseError::unexpected_token(
            other,
            "where a number was expected",
            stream.current_span(),
        )),
    }
}

fn expect_integer(stream: &mut TokenStream) -> Result<i64, ParseError> {
    let start = stream.current_pos();
    let n = expect_number(stream)?;
    if n.fract() != 0.0 {
        return Err(ParseError::invalid_syntax(
            format!("expected an integer, found {}", n),
            stream.span_from(start),
        ));
    }
    Ok(n as i64)
}

fn to_unsigned(stream: &TokenStream, n: i64, start: usize) -> Result<u32, ParseError> {
    u32::try_from(n).map_err(|_| {
        ParseError::invalid_syntax(
            format!("expected a non-negative integer, found {}", n),
            stream.span_from(start),
        )
    })
}

fn to_year(stream: &TokenStream, n: i64, start: usize) -> Result<i32, ParseError> {
    i32::try_from(n).map_err(|_| {
        ParseError::invalid_syntax(
            format!("year {} is out of range", n),
            stream.span_from(start),
        )
    })
}
