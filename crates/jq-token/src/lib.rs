//! Token definitions shared by the lexer and parser.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

use std::sync::Arc;

/// Token produced by the lexer and consumed by the parser.
///
/// The source text is kept in an `Arc<str>` so lookahead and the cache's
/// key (the compiled expression keeps the original source around for
/// diagnostics) can be cloned cheaply.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token classification.
    pub kind: TokenKind,
    /// Verbatim source text of the token.
    pub text: Arc<str>,
    /// Byte offset of the first byte.
    pub start: usize,
    /// Byte offset one past the last byte.
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<Arc<str>>, start: usize, end: usize) -> Self {
        Token { kind, text: text.into(), start, end }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// Token classification for the query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    String,
    Number,
    True,
    False,
    Null,
    Regex,

    // Names
    Name,
    EscapedName,
    Variable,

    // Keywords
    And,
    Or,
    In,

    // Grouping delimiters
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,

    // Punctuation
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pipe,
    Caret,
    Ampersand,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Range,
    Apply,
    Bind,
    DoubleStar,
    Coalesce,

    // Special
    Eof,
    Error,
}

impl TokenKind {
    /// Whether this token kind can be a field name in prefix position (the
    /// keywords `and`/`or`/`in` double as bareword field names — real-world
    /// data routinely has fields with these exact names).
    pub fn is_keyword_name(self) -> bool {
        matches!(self, TokenKind::And | TokenKind::Or | TokenKind::In)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_span() {
        let tok = Token::new(TokenKind::Name, "foo", 3, 6);
        assert_eq!(tok.start, 3);
        assert_eq!(tok.end, 6);
        assert_eq!(&*tok.text, "foo");
    }

    #[test]
    fn eof_detection() {
        let tok = Token::new(TokenKind::Eof, "", 10, 10);
        assert!(tok.is_eof());
    }
}
