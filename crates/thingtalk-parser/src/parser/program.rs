//! Top level: the executor prefix, declarations, datasets, rules and
//! permission rules.

use super::invocation::expect_device_ref;
use super::rule::{at_permission, parse_action, parse_permission, parse_rule};
use super::stream_expr::parse_stream;
use super::table::parse_table;
use super::types::parse_type;
use super::value::{expect_string, parse_value};
use super::{ParseError, TokenStream};
use indexmap::IndexMap;
use thingtalk_ast::{
    Annotations, Dataset, Declaration, DeclarationBody, DeclarationKind, Example, Program, Type,
};
use thingtalk_lexer::Token;

pub(super) fn parse_program(stream: &mut TokenStream) -> Result<Program, ParseError> {
    let mut program = Program::new();

    if stream.check_word("executor") && stream.check_nth(1, &Token::Eq) {
        stream.advance();
        stream.advance();
        program.principal = Some(parse_value(stream)?);
        stream.expect(Token::Colon)?;
    }

    while !stream.at_end() {
        match stream.peek() {
            Some(Token::Let) => program.declarations.push(parse_declaration(stream)?),
            Some(Token::Dataset) => program.datasets.push(parse_dataset(stream)?),
            _ if at_permission(stream) => {
                program.permissions.push(parse_permission(stream)?);
                end_statement(stream)?;
            }
            _ => {
                program.rules.push(parse_rule(stream)?);
                end_statement(stream)?;
            }
        }
    }
    Ok(program)
}

/// Statement terminator: `;`, or nothing before `}` / end of input / after a
/// block.
fn end_statement(stream: &mut TokenStream) -> Result<(), ParseError> {
    if stream.eat(&Token::Semicolon)
        || stream.at_end()
        || stream.check(&Token::RBrace)
        || stream.previous() == Some(&Token::RBrace)
    {
        return Ok(());
    }
    Err(ParseError::expected_token(
        Token::Semicolon,
        stream.peek().cloned(),
        stream.current_span(),
    ))
}

/// `let kind name[(p : T, ...)] := body annotations;`
fn parse_declaration(stream: &mut TokenStream) -> Result<Declaration, ParseError> {
    stream.expect(Token::Let)?;
    let kind = parse_declaration_kind(stream)?;
    let name = stream.expect_name("where a declaration name was expected")?;
    let params = parse_formals(stream)?;
    stream.expect(Token::ColonEq)?;
    let body = parse_body(stream, kind)?;
    let annotations = parse_annotations(stream)?;
    end_statement(stream)?;
    Ok(Declaration {
        name,
        params,
        body,
        annotations,
    })
}

fn parse_declaration_kind(stream: &mut TokenStream) -> Result<DeclarationKind, ParseError> {
    let start = stream.current_pos();
    let word = stream.expect_ident("where 'program', 'query', 'stream' or 'action' was expected")?;
    DeclarationKind::from_name(&word).ok_or_else(|| {
        ParseError::invalid_syntax(
            format!("unknown declaration kind '{}'", word),
            stream.span_from(start),
        )
    })
}

/// Optional `(name : Type, ...)`.
fn parse_formals(stream: &mut TokenStream) -> Result<IndexMap<String, Type>, ParseError> {
    let mut params = IndexMap::new();
    if !stream.eat(&Token::LParen) {
        return Ok(params);
    }
    if stream.eat(&Token::RParen) {
        return Ok(params);
    }
    loop {
        let start = stream.current_pos();
        let name = stream.expect_name("where a parameter name was expected")?;
        stream.expect(Token::Colon)?;
        let ty = parse_type(stream)?;
        if params.insert(name.clone(), ty).is_some() {
            return Err(ParseError::invalid_syntax(
                format!("duplicate parameter '{}'", name),
                stream.span_from(start),
            ));
        }
        if !stream.eat(&Token::Comma) {
            break;
        }
    }
    stream.expect(Token::RParen)?;
    Ok(params)
}

fn parse_body(
    stream: &mut TokenStream,
    kind: DeclarationKind,
) -> Result<DeclarationBody, ParseError> {
    Ok(match kind {
        DeclarationKind::Program => {
            if !stream.eat(&Token::LBrace) {
                return Ok(DeclarationBody::Program(vec![parse_rule(stream)?]));
            }
            let mut rules = Vec::new();
            while !stream.eat(&Token::RBrace) {
                rules.push(parse_rule(stream)?);
                end_statement(stream)?;
            }
            DeclarationBody::Program(rules)
        }
        DeclarationKind::Query => DeclarationBody::Query(parse_table(stream)?),
        DeclarationKind::Stream => DeclarationBody::Stream(parse_stream(stream)?),
        DeclarationKind::Action => DeclarationBody::Action(parse_action(stream)?),
    })
}

/// `#_[key=value]` and `#[key=value]`, any number, in any order.
fn parse_annotations(stream: &mut TokenStream) -> Result<Annotations, ParseError> {
    let mut annotations = Annotations::default();
    loop {
        let natural = if stream.eat(&Token::NlAnnotation) {
            true
        } else if stream.eat(&Token::ImplAnnotation) {
            false
        } else {
            return Ok(annotations);
        };
        let start = stream.current_pos();
        let key = stream.expect_name("where an annotation name was expected")?;
        stream.expect(Token::Eq)?;
        let value = parse_value(stream)?;
        stream.expect(Token::RBracket)?;

        let map = if natural {
            &mut annotations.nl
        } else {
            &mut annotations.implementation
        };
        if map.insert(key.clone(), value).is_some() {
            return Err(ParseError::invalid_syntax(
                format!("duplicate annotation '{}'", key),
                stream.span_from(start),
            ));
        }
    }
}

/// `dataset @kind language "xx" { example* }`
fn parse_dataset(stream: &mut TokenStream) -> Result<Dataset, ParseError> {
    stream.expect(Token::Dataset)?;
    let kind = expect_device_ref(stream)?;
    stream.expect_word("language")?;
    let language = expect_string(stream)?;
    stream.expect(Token::LBrace)?;
    let mut examples = Vec::new();
    while !stream.eat(&Token::RBrace) {
        examples.push(parse_example(stream)?);
    }
    end_statement(stream)?;
    Ok(Dataset {
        kind,
        language,
        examples,
    })
}

fn parse_example(stream: &mut TokenStream) -> Result<Example, ParseError> {
    let kind = parse_declaration_kind(stream)?;
    let params = parse_formals(stream)?;
    stream.expect(Token::ColonEq)?;
    let body = parse_body(stream, kind)?;
    let annotations = parse_annotations(stream)?;
    end_statement(stream)?;
    Ok(Example {
        params,
        body,
        annotations,
    })
}
