//! Type expressions: `String`, `Entity(tt:username)`, `Enum(on,off)`,
//! `Measure(C)`, `Array(Time)`.

use super::{ParseError, TokenStream};
use thingtalk_ast::Type;
use thingtalk_lexer::Token;

pub(super) fn parse_type(stream: &mut TokenStream) -> Result<Type, ParseError> {
    let start = stream.current_pos();
    let name = stream.expect_ident("where a type was expected")?;
    let ty = match name.as_str() {
        "String" => Type::String,
        "Number" => Type::Number,
        "Boolean" => Type::Boolean,
        "Date" => Type::Date,
        "Time" => Type::Time,
        "Location" => Type::Location,
        "Any" => Type::Any,
        "Event" => Type::Event,
        "Feed" => Type::Feed,
        "Entity" => {
            stream.expect(Token::LParen)?;
            let subtype = parse_entity_type(stream)?;
            stream.expect(Token::RParen)?;
            Type::Entity(subtype)
        }
        "Enum" => {
            stream.expect(Token::LParen)?;
            let mut symbols = vec![stream.expect_name("in enum type")?];
            while stream.eat(&Token::Comma) {
                symbols.push(stream.expect_name("in enum type")?);
            }
            stream.expect(Token::RParen)?;
            Type::Enum(symbols)
        }
        "Measure" => {
            stream.expect(Token::LParen)?;
            let unit = stream.expect_ident("where a unit was expected")?;
            stream.expect(Token::RParen)?;
            Type::Measure(unit)
        }
        "Array" => {
            stream.expect(Token::LParen)?;
            let inner = parse_type(stream)?;
            stream.expect(Token::RParen)?;
            inner.array_of()
        }
        other => {
            return Err(ParseError::invalid_syntax(
                format!("unknown type '{}'", other),
                stream.span_from(start),
            ))
        }
    };
    Ok(ty)
}

/// Namespaced entity type: `tt:username`, `com.spotify:song`.
pub(super) fn parse_entity_type(stream: &mut TokenStream) -> Result<String, ParseError> {
    let mut prefix = stream.expect_ident("in entity type")?;
    while stream.eat(&Token::Dot) {
        prefix.push('.');
        prefix.push_str(&stream.expect_ident("in entity type")?);
    }
    stream.expect(Token::Colon)?;
    let name = stream.expect_name("in entity type")?;
    Ok(format!("{}:{}", prefix, name))
}
