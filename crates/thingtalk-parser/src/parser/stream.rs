//! Token stream wrapper for the recursive descent parser.

use super::token_utils::name_of;
use super::ParseError;
use std::ops::Range;
use thingtalk_ast::foundation::Span;
use thingtalk_lexer::Token;

/// Token stream with lookahead and position tracking.
///
/// Each token is paired with its byte range in the source so errors point
/// at the offending text.
pub struct TokenStream<'src> {
    tokens: &'src [(Token, Range<usize>)],
    pos: usize,
    file_id: u16,
}

impl<'src> TokenStream<'src> {
    pub fn new(tokens: &'src [(Token, Range<usize>)], file_id: u16) -> Self {
        Self {
            tokens,
            pos: 0,
            file_id,
        }
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    /// Peek at the nth token ahead without consuming.
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(tok, _)| tok)
    }

    /// The last consumed token.
    pub fn previous(&self) -> Option<&Token> {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(tok, _)| tok)
    }

    /// Advance to the next token and return the current one.
    pub fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|(tok, _)| tok);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token has the same kind as `expected`.
    pub fn check(&self, expected: &Token) -> bool {
        self.check_nth(0, expected)
    }

    pub fn check_nth(&self, n: usize, expected: &Token) -> bool {
        matches!(self.peek_nth(n), Some(t) if std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    /// Consume the current token if it has the kind of `expected`.
    pub fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Expect a specific token and advance if it matches.
    pub fn expect(&mut self, expected: Token) -> Result<Span, ParseError> {
        if self.check(&expected) {
            let start = self.pos;
            self.advance();
            Ok(self.span_from(start))
        } else {
            Err(ParseError::expected_token(
                expected,
                self.peek().cloned(),
                self.current_span(),
            ))
        }
    }

    /// Check for an identifier with the given text.
    ///
    /// Used for contextual words such as `program` or `asc`.
    pub fn check_word(&self, word: &str) -> bool {
        self.check_word_nth(0, word)
    }

    pub fn check_word_nth(&self, n: usize, word: &str) -> bool {
        matches!(self.peek_nth(n), Some(Token::Ident(id)) if &**id == word)
    }

    pub fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.check_word(word) {
            self.pos += 1;
            Ok(())
        } else {
            Err(ParseError::unexpected_token(
                self.peek(),
                &format!("(expected '{}')", word),
                self.current_span(),
            ))
        }
    }

    /// Expect a plain identifier.
    pub fn expect_ident(&mut self, context: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(id)) => {
                let id = id.to_string();
                self.pos += 1;
                Ok(id)
            }
            other => Err(ParseError::unexpected_token(
                other,
                context,
                self.current_span(),
            )),
        }
    }

    /// Expect an identifier or a reserved word used as a name.
    pub fn expect_name(&mut self, context: &str) -> Result<String, ParseError> {
        match self.peek().and_then(name_of) {
            Some(name) => {
                self.pos += 1;
                Ok(name)
            }
            None => Err(ParseError::unexpected_token(
                self.peek(),
                context,
                self.current_span(),
            )),
        }
    }

    /// Offset (relative to the current position) of the `)` matching the
    /// `(` found at offset `open`.
    pub fn matching_paren(&self, open: usize) -> Option<usize> {
        if !self.check_nth(open, &Token::LParen) {
            return None;
        }
        let mut depth = 0usize;
        let mut n = open;
        while let Some(tok) = self.peek_nth(n) {
            match tok {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(n);
                    }
                }
                _ => {}
            }
            n += 1;
        }
        None
    }

    /// Check if we've reached the end of the token stream.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Get the current position in the token stream.
    pub fn current_pos(&self) -> usize {
        self.pos
    }

    /// Span from the token at `start` to the last consumed token.
    pub fn span_from(&self, start: usize) -> Span {
        let start_byte = match self.tokens.get(start) {
            Some((_, range)) => range.start,
            None => return self.current_span(),
        };
        let end_byte = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, range)| range.end)
            .filter(|end| *end >= start_byte)
            .unwrap_or(start_byte);
        Span::new(self.file_id, start_byte as u32, end_byte as u32, 0)
    }

    /// Span of the current token, or an empty span at end of input.
    pub fn current_span(&self) -> Span {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some((_, range)) if self.pos < self.tokens.len() => {
                Span::new(self.file_id, range.start as u32, range.end as u32, 0)
            }
            Some((_, range)) => Span::new(self.file_id, range.end as u32, range.end as u32, 0),
            None => Span::zero(self.file_id),
        }
    }
}
