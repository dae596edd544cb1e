//! Stream expressions.
//!
//! Levels, loosest first:
//! 0. `s join t [on (...)]`
//! 1. `edge s on new`, `edge s on filter`, `s, filter`
//! 2. `monitor t`, `attimer(...)`, `timer(...)`, calls, `( s )`

use super::filter::parse_filter;
use super::invocation::{parse_invocation, parse_params};
use super::table::{parse_join_on, parse_table1, parse_table2};
use super::{ParseError, TokenStream};
use thingtalk_ast::{InputParam, Stream, Value};
use thingtalk_lexer::Token;

pub(super) fn parse_stream(stream: &mut TokenStream) -> Result<Stream, ParseError> {
    let mut result = parse_stream1(stream)?;
    while stream.eat(&Token::Join) {
        let table = parse_table1(stream)?;
        let on = parse_join_on(stream)?;
        result = Stream::Join {
            stream: Box::new(result),
            table: Box::new(table),
            on,
        };
    }
    Ok(result)
}

fn parse_stream1(stream: &mut TokenStream) -> Result<Stream, ParseError> {
    if stream.eat(&Token::Edge) {
        let inner = Box::new(parse_stream2(stream)?);
        stream.expect(Token::On)?;
        if stream.eat(&Token::New) {
            return Ok(Stream::EdgeNew { stream: inner });
        }
        let filter = parse_filter(stream)?;
        return Ok(Stream::EdgeFilter {
            stream: inner,
            filter,
        });
    }

    let inner = parse_stream2(stream)?;
    if stream.eat(&Token::Comma) {
        let filter = parse_filter(stream)?;
        return Ok(Stream::filtered(inner, filter));
    }
    Ok(inner)
}

fn parse_stream2(stream: &mut TokenStream) -> Result<Stream, ParseError> {
    let start = stream.current_pos();
    match stream.peek() {
        Some(Token::Monitor) => {
            stream.advance();
            let table = parse_table2(stream)?;
            Ok(Stream::Monitor {
                table: Box::new(table),
            })
        }
        Some(Token::AtTimer) => {
            stream.advance();
            let mut args = TimerArgs::new(parse_params(stream)?);
            let time = args.take("time");
            let expiration_date = args.take("expiration_date");
            args.finish(stream, "attimer", start)?;
            let time = time.ok_or_else(|| missing(stream, "attimer", "time", start))?;
            Ok(Stream::AtTimer {
                time,
                expiration_date,
            })
        }
        Some(Token::Timer) => {
            stream.advance();
            let mut args = TimerArgs::new(parse_params(stream)?);
            let base = args.take("base");
            let interval = args.take("interval");
            args.finish(stream, "timer", start)?;
            Ok(Stream::Timer {
                base: base.ok_or_else(|| missing(stream, "timer", "base", start))?,
                interval: interval.ok_or_else(|| missing(stream, "timer", "interval", start))?,
            })
        }
        Some(Token::LParen) => {
            stream.advance();
            let inner = parse_stream(stream)?;
            stream.expect(Token::RParen)?;
            Ok(inner)
        }
        Some(Token::DeviceRef(_)) => Ok(Stream::Invocation(parse_invocation(stream)?)),
        Some(Token::Ident(_)) if stream.check_nth(1, &Token::LParen) => {
            let name = stream.expect_ident("in call")?;
            let in_params = parse_params(stream)?;
            Ok(Stream::VarRef {
                name,
                in_params,
                schema: None,
            })
        }
        other => Err(ParseError::unexpected_token(
            other,
            "where a stream was expected",
            stream.current_span(),
        )),
    }
}

/// Named arguments of a builtin timer.
struct TimerArgs(Vec<InputParam>);

impl TimerArgs {
    fn new(params: Vec<InputParam>) -> Self {
        Self(params)
    }

    fn take(&mut self, name: &str) -> Option<Value> {
        let index = self.0.iter().position(|p| p.name == name)?;
        Some(self.0.remove(index).value)
    }

    /// Fail on any argument that was not taken.
    fn finish(self, stream: &TokenStream, timer: &str, start: usize) -> Result<(), ParseError> {
        match self.0.first() {
            Some(extra) => Err(ParseError::invalid_syntax(
                format!("unknown parameter '{}' of {}", extra.name, timer),
                stream.span_from(start),
            )),
            None => Ok(()),
        }
    }
}

fn missing(stream: &TokenStream, timer: &str, param: &str, start: usize) -> ParseError {
    ParseError::invalid_syntax(
        format!("{} requires '{}'", timer, param),
        stream.span_from(start),
    )
}
