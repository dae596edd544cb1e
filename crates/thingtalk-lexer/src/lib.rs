// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for ThingTalk.
//!
//! Tokenization is done with logos. Whitespace and both comment styles are
//! skipped. Keywords are reserved; words with a meaning only in certain
//! positions (`program`, `asc`, `enum`, `makeDate`, ...) lex as identifiers
//! and are recognized by the parser.
//!
//! ```
//! # use thingtalk_lexer::Token;
//! # use logos::Logos;
//! let tokens: Vec<Result<Token, ()>> = Token::lexer("now => @com.xkcd.get_comic() => notify;").collect();
//! assert!(tokens.iter().all(|t| t.is_ok()));
//! ```

use logos::Logos;
use std::rc::Rc;

/// Number with a unit suffix, e.g. `21C` or `1.5kg`.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureLiteral {
    pub value: f64,
    pub unit: Rc<str>,
}

/// ThingTalk token.
///
/// Token strings for keywords, operators and delimiters are listed once in
/// `TOKEN_STRINGS`, indexed by discriminant. Data tokens come last.
#[derive(Logos, Debug, Clone, PartialEq)]
#[repr(u16)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token {
    // === Keywords ===

    // Rule structure
    #[token("now")]
    Now,
    #[token("oninput")]
    OnInput,
    #[token("notify")]
    Notify,
    #[token("return")]
    Return,
    #[token("let")]
    Let,
    #[token("dataset")]
    Dataset,

    // Streams
    #[token("monitor")]
    Monitor,
    #[token("edge")]
    Edge,
    #[token("on")]
    On,
    #[token("new")]
    New,
    #[token("attimer")]
    AtTimer,
    #[token("timer")]
    Timer,

    // Tables
    #[token("join")]
    Join,
    #[token("of")]
    Of,
    #[token("aggregate")]
    Aggregate,
    #[token("sort")]
    Sort,
    #[token("compute")]
    Compute,
    #[token("as")]
    As,
    #[token("filter")]
    Filter,
    #[token("result")]
    Result,

    // Literals
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // === Operators ===
    #[token("=>")]
    FatArrow,
    #[token(":=")]
    ColonEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token(">=")]
    GtEq,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token("<")]
    Lt,
    /// `=~`, "contains substring"
    #[token("=~")]
    Substr,
    /// `~=`, "is a substring of"
    #[token("~=")]
    RevSubstr,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,
    #[token("^^")]
    CaretCaret,
    #[token("$?")]
    DollarQuestion,

    // === Punctuation ===
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("*")]
    Star,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    /// Opens a natural-language annotation
    #[token("#_[")]
    NlAnnotation,
    /// Opens an implementation annotation
    #[token("#[")]
    ImplAnnotation,

    // === Data tokens (not in TOKEN_STRINGS) ===
    /// Plain number; a leading minus is part of the literal.
    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"-?[0-9]+(\.[0-9]+)?[a-zA-Z][a-zA-Z0-9]*", |lex| split_measure(lex.slice()))]
    Measure(MeasureLiteral),

    /// Single or double quoted string, unescaped.
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    String(Rc<str>),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| Rc::from(lex.slice()))]
    Ident(Rc<str>),

    /// `$name`, stored without the `$`
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| Rc::from(&lex.slice()[1..]))]
    DollarIdent(Rc<str>),

    /// `@kind` or `@kind.channel`, stored without the `@`.
    ///
    /// Class kinds may contain dots and dashes, so whether the last segment
    /// is a channel is decided by the parser.
    #[regex(r"@[a-zA-Z_][a-zA-Z0-9_\-]*(\.[a-zA-Z0-9_\-]+)*", |lex| Rc::from(&lex.slice()[1..]))]
    DeviceRef(Rc<str>),
}

fn split_measure(s: &str) -> Option<MeasureLiteral> {
    let split = s.find(|c: char| c.is_ascii_alphabetic())?;
    let value = s[..split].parse::<f64>().ok()?;
    Some(MeasureLiteral {
        value,
        unit: Rc::from(&s[split..]),
    })
}

fn unquote(s: &str) -> Option<Rc<str>> {
    let content = &s[1..s.len() - 1];
    unescape_string(content).map(|s| Rc::from(s.as_str()))
}

/// Unescape a string literal content.
fn unescape_string(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some(_) | None => return None,
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

/// Escape a string for printing inside double quotes.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

/// Display strings of the simple tokens, in discriminant order.
///
/// The `#[token("...")]` attributes above must match these strings.
const TOKEN_STRINGS: &[&str] = &[
    "now", "oninput", "notify", "return", "let", "dataset", // rules
    "monitor", "edge", "on", "new", "attimer", "timer", // streams
    "join", "of", "aggregate", "sort", "compute", "as", "filter", "result", // tables
    "true", "false", "null", // literals
    "=>", ":=", "==", "!=", ">=", "<=", ">", "<", "=~", "~=", "&&", "||", "!", "=", "^^",
    "$?", // operators
    ":", ".", ",", ";", "*", "(", ")", "{", "}", "[", "]", "#_[", "#[", // punctuation
];

impl Token {
    /// Discriminant of the token, an index into `TOKEN_STRINGS` for simple tokens.
    fn token_string_index(&self) -> usize {
        // Token is #[repr(u16)], so the tag is the leading u16
        let discriminant = unsafe { *(self as *const Token as *const u16) };
        discriminant as usize
    }

    /// Whether this token is a reserved word.
    pub fn is_keyword(&self) -> bool {
        self.token_string_index() <= Token::Null.token_string_index()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Measure(m) => write!(f, "{}{}", m.value, m.unit),
            Token::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Token::Ident(id) => write!(f, "{}", id),
            Token::DollarIdent(id) => write!(f, "${}", id),
            Token::DeviceRef(r) => write!(f, "@{}", r),
            _ => {
                let s = TOKEN_STRINGS
                    .get(self.token_string_index())
                    .copied()
                    .unwrap_or("<token>");
                write!(f, "{}", s)
            }
        }
    }
}
