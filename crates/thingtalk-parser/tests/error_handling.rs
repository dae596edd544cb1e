//! Error handling tests for the ThingTalk parser.
//!
//! Parsing stops at the first error and reports it with a byte span.

use thingtalk_parser::{parse, ParseError, ParseErrorKind};

/// Helper to verify that parsing fails.
fn expect_error(source: &str) -> ParseError {
    match parse(source) {
        Ok(program) => panic!("Expected parse error, but parsing succeeded: {:?}", program),
        Err(error) => error,
    }
}

#[test]
fn test_unrecognized_character() {
    let err = expect_error("now => notify; %");
    assert_eq!(err.kind, ParseErrorKind::InvalidSyntax);
    assert!(err.message.contains("unrecognized input"));
    assert_eq!(err.span.start, 15);
}

#[test]
fn test_unclosed_parameter_list() {
    let err = expect_error("now => @com.xkcd.get_comic(number=1 => notify;");
    assert_eq!(err.kind, ParseErrorKind::UnexpectedToken);
}

#[test]
fn test_unclosed_block_is_eof() {
    let err = expect_error("oninput => { notify;");
    assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
}

#[test]
fn test_missing_action() {
    let err = expect_error("now => @com.xkcd.get_comic(), title =~ \"x\";");
    assert!(err.message.contains("expected an action"), "{}", err);
}

#[test]
fn test_missing_arrow() {
    let err = expect_error("monitor (@com.xkcd.get_comic()) notify;");
    assert!(err.message.contains("'=>'"), "{}", err);
}

#[test]
fn test_bad_values() {
    assert!(expect_error("now => @a.b(x=makeTime(25.5, 0));").message.contains("integer"));
    assert!(expect_error("now => @a.b(x=$frobnicate);").message.contains("$frobnicate"));
    assert!(expect_error("now => @a.b(x=\"bad\\q\");").message.contains("unrecognized input"));
}

#[test]
fn test_bad_types() {
    let err = expect_error("let query q(p : Strin) := @com.xkcd.get_comic();");
    assert!(err.message.contains("unknown type 'Strin'"));
}

#[test]
fn test_timer_parameters() {
    assert!(expect_error("timer(base=makeDate()) => notify;").message.contains("interval"));
    assert!(expect_error("attimer(expiration_date=makeDate()) => notify;").message.contains("time"));
}

#[test]
fn test_channel_required() {
    let err = expect_error("now => @thermostat() => notify;");
    assert!(err.message.contains("does not name a channel"));
}

#[test]
fn test_display_includes_location() {
    let err = expect_error("now => ;");
    let text = err.to_string();
    assert!(text.starts_with("syntax error:"), "{}", text);
    assert!(text.contains("7..8"), "{}", text);
}
