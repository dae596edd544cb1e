//! Device references and calls.
//!
//! A device reference token carries the whole dotted text after `@`. Class
//! kinds contain dots themselves (`com.yandex.translate`), so the channel is
//! found by looking at what follows:
//!
//! - `@kind(attrs).channel(params)`: the token is the kind;
//! - `@kind.channel(params)`: the last segment is the channel.

use super::value::parse_value;
use super::{ParseError, TokenStream};
use thingtalk_ast::{DeviceSelector, InputParam, Invocation, Selector, Value};
use thingtalk_lexer::Token;

pub(super) fn parse_invocation(stream: &mut TokenStream) -> Result<Invocation, ParseError> {
    let start = stream.current_pos();
    let text = expect_device_ref(stream)?;

    let has_attributes = stream.matching_paren(0).is_some_and(|close| {
        stream.check_nth(close + 1, &Token::Dot)
            && stream
                .peek_nth(close + 2)
                .is_some_and(|t| super::token_utils::name_of(t).is_some())
    });

    if has_attributes {
        let attributes = parse_params(stream)?;
        stream.expect(Token::Dot)?;
        let channel = stream.expect_name("where a channel name was expected")?;
        let in_params = parse_params(stream)?;
        let selector = device_selector(stream, &text, attributes, start)?;
        return Ok(Invocation::new(selector, &channel, in_params));
    }

    let (kind, channel) = split_channel(stream, &text, start)?;
    let in_params = parse_params(stream)?;
    Ok(Invocation::new(Selector::device(&kind), &channel, in_params))
}

/// `@kind.channel` without arguments, as used by `result(...)` and
/// permission rules.
pub(super) fn parse_function_ref(stream: &mut TokenStream) -> Result<(String, String), ParseError> {
    let start = stream.current_pos();
    let text = expect_device_ref(stream)?;
    split_channel(stream, &text, start)
}

pub(super) fn expect_device_ref(stream: &mut TokenStream) -> Result<String, ParseError> {
    match stream.peek() {
        Some(Token::DeviceRef(text)) => {
            let text = text.to_string();
            stream.advance();
            Ok(text)
        }
        other => Err(ParseError::unexpected_token(
            other,
            "where a device reference was expected",
            stream.current_span(),
        )),
    }
}

fn split_channel(
    stream: &TokenStream,
    text: &str,
    start: usize,
) -> Result<(String, String), ParseError> {
    match text.rsplit_once('.') {
        Some((kind, channel)) if !kind.is_empty() && !channel.is_empty() => {
            Ok((kind.to_string(), channel.to_string()))
        }
        _ => Err(ParseError::invalid_syntax(
            format!("'@{}' does not name a channel", text),
            stream.span_from(start),
        )),
    }
}

/// Lift `id` and `principal` out of the attribute list.
fn device_selector(
    stream: &TokenStream,
    kind: &str,
    attributes: Vec<InputParam>,
    start: usize,
) -> Result<Selector, ParseError> {
    let mut selector = DeviceSelector::new(kind);
    for attr in attributes {
        match attr.name.as_str() {
            "id" | "principal" => {
                let Value::String(value) = attr.value else {
                    return Err(ParseError::invalid_syntax(
                        format!("device attribute '{}' must be a string", attr.name),
                        stream.span_from(start),
                    ));
                };
                if attr.name == "id" {
                    selector.id = Some(value);
                } else {
                    selector.principal = Some(value);
                }
            }
            _ => selector.attributes.push(attr),
        }
    }
    Ok(Selector::Device(selector))
}

/// `(name=value, ...)`
pub(super) fn parse_params(stream: &mut TokenStream) -> Result<Vec<InputParam>, ParseError> {
    stream.expect(Token::LParen)?;
    let mut params: Vec<InputParam> = Vec::new();
    if stream.eat(&Token::RParen) {
        return Ok(params);
    }
    loop {
        let start = stream.current_pos();
        let name = stream.expect_name("where a parameter name was expected")?;
        if params.iter().any(|p| p.name == name) {
            return Err(ParseError::invalid_syntax(
                format!("duplicate parameter '{}'", name),
                stream.span_from(start),
            ));
        }
        stream.expect(Token::Eq)?;
        let value = parse_value(stream)?;
        params.push(InputParam::new(&name, value));
        if !stream.eat(&Token::Comma) {
            break;
        }
    }
    stream.expect(Token::RParen)?;
    Ok(params)
}
