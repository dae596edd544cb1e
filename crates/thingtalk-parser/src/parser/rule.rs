//! Rules, actions and permission rules.

use super::filter::parse_filter;
use super::invocation::{expect_device_ref, parse_function_ref, parse_invocation, parse_params};
use super::stream_expr::parse_stream;
use super::table::parse_table;
use super::token_utils::{function_filter_op, infix_filter_op};
use super::{ParseError, TokenStream};
use thingtalk_ast::{
    Action, Filter, Invocation, PermissionFunction, PermissionRule, Rule, RuleTrigger, Selector,
    Table,
};
use thingtalk_lexer::Token;

/// `trigger => query* => action`
pub(super) fn parse_rule(stream: &mut TokenStream) -> Result<Rule, ParseError> {
    let trigger = if stream.eat(&Token::Now) {
        RuleTrigger::Now
    } else if stream.eat(&Token::OnInput) {
        RuleTrigger::OnInput
    } else {
        RuleTrigger::Stream(parse_stream(stream)?)
    };
    stream.expect(Token::FatArrow)?;

    let mut queries = Vec::new();
    loop {
        if matches!(
            stream.peek(),
            Some(Token::Notify | Token::Return | Token::LBrace)
        ) {
            let actions = parse_actions(stream)?;
            return Ok(Rule {
                trigger,
                queries,
                actions,
            });
        }

        // A call is a query if another stage follows it, else the action.
        let start = stream.current_pos();
        let table = parse_table(stream)?;
        if stream.eat(&Token::FatArrow) {
            queries.push(table);
            continue;
        }
        let action = table_to_action(stream, table, start)?;
        return Ok(Rule {
            trigger,
            queries,
            actions: vec![action],
        });
    }
}

/// A single action or a `{ a; b; }` block.
pub(super) fn parse_actions(stream: &mut TokenStream) -> Result<Vec<Action>, ParseError> {
    if !stream.eat(&Token::LBrace) {
        return Ok(vec![parse_action(stream)?]);
    }
    let mut actions = Vec::new();
    loop {
        actions.push(parse_action(stream)?);
        if stream.eat(&Token::Semicolon) {
            if stream.eat(&Token::RBrace) {
                break;
            }
            continue;
        }
        stream.expect(Token::RBrace)?;
        break;
    }
    Ok(actions)
}

pub(super) fn parse_action(stream: &mut TokenStream) -> Result<Action, ParseError> {
    match stream.peek() {
        Some(Token::Notify) => {
            stream.advance();
            Ok(Action::Invocation(Invocation::notify()))
        }
        Some(Token::Return) => {
            stream.advance();
            Ok(Action::Invocation(Invocation::new(
                Selector::Builtin,
                "return",
                Vec::new(),
            )))
        }
        Some(Token::DeviceRef(_)) => Ok(Action::Invocation(parse_invocation(stream)?)),
        Some(Token::Ident(_)) if stream.check_nth(1, &Token::LParen) => {
            let name = stream.expect_ident("in call")?;
            let in_params = parse_params(stream)?;
            Ok(Action::VarRef {
                name,
                in_params,
                schema: None,
            })
        }
        other => Err(ParseError::unexpected_token(
            other,
            "where an action was expected",
            stream.current_span(),
        )),
    }
}

fn table_to_action(
    stream: &TokenStream,
    table: Table,
    start: usize,
) -> Result<Action, ParseError> {
    match table {
        Table::Invocation(inv) if inv.filter.is_true() => Ok(Action::Invocation(inv)),
        Table::VarRef {
            name, in_params, ..
        } => Ok(Action::VarRef {
            name,
            in_params,
            schema: None,
        }),
        _ => Err(ParseError::invalid_syntax(
            "expected an action after '=>'",
            stream.span_from(start),
        )),
    }
}

/// Check whether the next statement is a permission rule.
///
/// A permission rule opens with its principal filter, which no rule trigger
/// can start with: a constant, a negation, a comparison, a filter function,
/// or a parenthesized expression followed by `:`.
pub(super) fn at_permission(stream: &TokenStream) -> bool {
    let Some(first) = stream.peek() else {
        return false;
    };
    match first {
        Token::True | Token::False | Token::Bang => true,
        Token::Ident(_) => {
            stream.peek_nth(1).and_then(infix_filter_op).is_some()
                || (function_filter_op(first).is_some() && stream.check_nth(1, &Token::LParen))
        }
        Token::LParen => stream
            .matching_paren(0)
            .is_some_and(|close| stream.check_nth(close + 1, &Token::Colon)),
        _ => false,
    }
}

/// `principal_filter : query => action`
pub(super) fn parse_permission(stream: &mut TokenStream) -> Result<PermissionRule, ParseError> {
    let principal = parse_filter(stream)?;
    stream.expect(Token::Colon)?;
    let query = parse_permission_function(stream, Token::Now)?;
    stream.expect(Token::FatArrow)?;
    let action = parse_permission_function(stream, Token::Notify)?;
    Ok(PermissionRule {
        principal,
        query,
        action,
    })
}

/// `builtin`, `*`, `@kind.*` or `@kind.channel[, filter]`.
fn parse_permission_function(
    stream: &mut TokenStream,
    builtin: Token,
) -> Result<PermissionFunction, ParseError> {
    if stream.eat(&builtin) {
        return Ok(PermissionFunction::Builtin);
    }
    if stream.eat(&Token::Star) {
        return Ok(PermissionFunction::Star);
    }
    if !matches!(stream.peek(), Some(Token::DeviceRef(_))) {
        return Err(ParseError::unexpected_token(
            stream.peek(),
            "where a permission function was expected",
            stream.current_span(),
        ));
    }

    if stream.check_nth(1, &Token::Dot) && stream.check_nth(2, &Token::Star) {
        let kind = expect_device_ref(stream)?;
        stream.advance();
        stream.advance();
        return Ok(PermissionFunction::ClassStar(kind));
    }

    let (kind, channel) = parse_function_ref(stream)?;
    let filter = if stream.eat(&Token::Comma) {
        parse_filter(stream)?
    } else {
        Filter::True
    };
    Ok(PermissionFunction::Specified {
        kind,
        channel,
        filter,
        schema: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lex;
    use thingtalk_ast::{FilterOp, Stream, Value};

    fn rule(source: &str) -> Result<Rule, ParseError> {
        let tokens = lex(source, 0)?;
        let mut stream = TokenStream::new(&tokens, 0);
        parse_rule(&mut stream)
    }

    fn permission(source: &str) -> Result<PermissionRule, ParseError> {
        let tokens = lex(source, 0)?;
        let mut stream = TokenStream::new(&tokens, 0);
        assert!(at_permission(&stream), "not detected as a permission: {}", source);
        parse_permission(&mut stream)
    }

    #[test]
    fn test_query_then_notify() {
        let r = rule("now => @com.xkcd.get_comic() => notify").unwrap();
        assert_eq!(r.trigger, RuleTrigger::Now);
        assert_eq!(r.queries.len(), 1);
        assert_eq!(r.actions, vec![Action::Invocation(Invocation::notify())]);
    }

    #[test]
    fn test_last_call_is_the_action() {
        let r = rule("attimer(time=$?) => @com.twitter.post()").unwrap();
        assert!(matches!(
            r.trigger,
            RuleTrigger::Stream(Stream::AtTimer { .. })
        ));
        assert!(r.queries.is_empty());
        assert!(matches!(&r.actions[0], Action::Invocation(inv) if inv.channel == "post"));
    }

    #[test]
    fn test_action_block_with_call() {
        let r = rule("oninput => { p1(); notify; }").unwrap();
        assert_eq!(r.trigger, RuleTrigger::OnInput);
        assert_eq!(r.actions.len(), 2);
        assert!(matches!(&r.actions[0], Action::VarRef { name, .. } if name == "p1"));
    }

    #[test]
    fn test_filtered_action_is_rejected() {
        let err = rule(r#"now => @com.twitter.post(), status == "x""#).unwrap_err();
        assert!(err.message.contains("expected an action"));
        assert!(rule("now => { }").is_err());
    }

    #[test]
    fn test_permission_forms() {
        let p = permission("source == $? : now => @com.twitter.post").unwrap();
        assert_eq!(p.principal, Filter::atom("source", FilterOp::Eq, Value::undefined()));
        assert_eq!(p.query, PermissionFunction::Builtin);
        assert!(matches!(p.action, PermissionFunction::Specified { ref channel, .. } if channel == "post"));

        let p = permission("true : * => @com.twitter.*").unwrap();
        assert_eq!(p.query, PermissionFunction::Star);
        assert_eq!(p.action, PermissionFunction::ClassStar("com.twitter".into()));

        let p = permission(r#"in_array(source, [$?, $?]) : @com.bing.web_search, query =~ "cats" => notify"#)
            .unwrap();
        assert!(matches!(p.query, PermissionFunction::Specified { ref filter, .. } if !filter.is_true()));
        assert_eq!(p.action, PermissionFunction::Builtin);
    }

    #[test]
    fn test_rules_are_not_permissions() {
        for source in ["now => notify", "p1() => notify", "(monitor @a.b()) => notify"] {
            let tokens = lex(source, 0).unwrap();
            assert!(!at_permission(&TokenStream::new(&tokens, 0)), "{}", source);
        }
    }
}
