//! Context-aware lexer for the query language.
//!
//! The lexer exposes a single operation, [`Lexer::next`], which takes an
//! `allow_regex` flag supplied by the parser: the grammar position
//! determines whether a leading `/` starts a regex literal or is the
//! division operator, so the lexer cannot decide this on its own (mirrors
//! the division-vs-regex disambiguation a context-aware lexer always needs,
//! just driven by the caller instead of an internal mode stack).
//!
//! Once an error token is produced it is latched: every subsequent `next`
//! call returns EOF without re-scanning, so the parser doesn't need to
//! special-case "already failed" at every call site.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

use jq_diagnostics_codes::DiagnosticCode;
use jq_error::ParseError;
use jq_token::{Token, TokenKind};

/// Scans UTF-8 source text into a token stream.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    error: Option<ParseError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer { source, bytes: source.as_bytes(), pos: 0, error: None }
    }

    /// The latched error, if `next` has ever produced an [`TokenKind::Error`]
    /// token.
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Current byte offset. Used by the parser to capture a lambda's `<...>`
    /// parameter signature verbatim (that mini-language has its own nested
    /// `<`/`>` depth rules the token stream isn't shaped for).
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Reposition the scanner, e.g. after the parser has manually scanned
    /// past a verbatim span using the raw source text. Clears any latched
    /// error since the caller is resuming a still-valid parse, not
    /// continuing past a lexical failure.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
        self.error = None;
    }

    fn fail(&mut self, code: DiagnosticCode, message: impl Into<String>, start: usize) -> Token {
        let end = self.pos;
        let text = self.source[start..end.max(start)].to_string();
        let err = ParseError::new(code, message, start).with_token(text.clone());
        self.error = Some(err);
        self.pos = self.bytes.len();
        Token::new(TokenKind::Error, text, start, end)
    }

    fn eof_token(&self) -> Token {
        Token::new(TokenKind::Eof, "", self.pos, self.pos)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0B) => {
                    self.pos += 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    self.pos += 2;
                    let mut closed = false;
                    while self.pos < self.bytes.len() {
                        if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                            self.pos += 2;
                            closed = true;
                            break;
                        }
                        self.pos += 1;
                    }
                    if !closed {
                        return Some(self.fail(
                            DiagnosticCode::UnterminatedComment,
                            "unterminated block comment",
                            start,
                        ));
                    }
                }
                _ => return None,
            }
        }
    }

    /// Scan the next token. `allow_regex` must be `true` exactly when the
    /// parser is in a position that admits a regex literal (i.e. a prefix
    /// position), so a leading `/` is read as `TokenKind::Regex` rather than
    /// `TokenKind::Slash`.
    pub fn next(&mut self, allow_regex: bool) -> Token {
        if self.error.is_some() {
            return self.eof_token();
        }
        if let Some(err_tok) = self.skip_whitespace_and_comments() {
            return err_tok;
        }
        let start = self.pos;
        let Some(b) = self.peek() else {
            return self.eof_token();
        };

        if allow_regex && b == b'/' {
            return self.scan_regex(start);
        }

        match b {
            b'"' | b'\'' => self.scan_string(start, b),
            b'`' => self.scan_escaped_name(start),
            b'$' => self.scan_variable(start),
            b'0'..=b'9' => self.scan_number(start),
            _ if is_operator_byte(b) => self.scan_operator(start),
            _ => self.scan_name(start),
        }
    }

    fn scan_operator(&mut self, start: usize) -> Token {
        let two = (self.peek(), self.peek_at(1));
        let (kind, len) = match two {
            (Some(b'!'), Some(b'=')) => (TokenKind::NotEqual, 2),
            (Some(b'<'), Some(b'=')) => (TokenKind::LessEqual, 2),
            (Some(b'>'), Some(b'=')) => (TokenKind::GreaterEqual, 2),
            (Some(b'.'), Some(b'.')) => (TokenKind::Range, 2),
            (Some(b'~'), Some(b'>')) => (TokenKind::Apply, 2),
            (Some(b':'), Some(b'=')) => (TokenKind::Bind, 2),
            (Some(b'*'), Some(b'*')) => (TokenKind::DoubleStar, 2),
            (Some(b'?'), Some(b'?')) => (TokenKind::Coalesce, 2),
            (Some(b'['), _) => (TokenKind::LeftBracket, 1),
            (Some(b']'), _) => (TokenKind::RightBracket, 1),
            (Some(b'{'), _) => (TokenKind::LeftBrace, 1),
            (Some(b'}'), _) => (TokenKind::RightBrace, 1),
            (Some(b'('), _) => (TokenKind::LeftParen, 1),
            (Some(b')'), _) => (TokenKind::RightParen, 1),
            (Some(b'.'), _) => (TokenKind::Dot, 1),
            (Some(b','), _) => (TokenKind::Comma, 1),
            (Some(b':'), _) => (TokenKind::Colon, 1),
            (Some(b';'), _) => (TokenKind::Semicolon, 1),
            (Some(b'?'), _) => (TokenKind::Question, 1),
            (Some(b'+'), _) => (TokenKind::Plus, 1),
            (Some(b'-'), _) => (TokenKind::Minus, 1),
            (Some(b'*'), _) => (TokenKind::Star, 1),
            (Some(b'/'), _) => (TokenKind::Slash, 1),
            (Some(b'%'), _) => (TokenKind::Percent, 1),
            (Some(b'|'), _) => (TokenKind::Pipe, 1),
            (Some(b'^'), _) => (TokenKind::Caret, 1),
            (Some(b'&'), _) => (TokenKind::Ampersand, 1),
            (Some(b'='), _) => (TokenKind::Equal, 1),
            (Some(b'<'), _) => (TokenKind::Less, 1),
            (Some(b'>'), _) => (TokenKind::Greater, 1),
            _ => unreachable!("scan_operator called on non-operator byte"),
        };
        self.pos += len;
        Token::new(kind, &self.source[start..self.pos], start, self.pos)
    }

    fn scan_string(&mut self, start: usize, quote: u8) -> Token {
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return self.fail(
                        DiagnosticCode::UnterminatedString,
                        "unterminated string literal",
                        start,
                    );
                }
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.scan_escape(start) {
                        Ok(c) => value.push(c),
                        Err(tok) => return tok,
                    }
                }
                _ => {
                    let ch = self.next_char();
                    value.push(ch);
                }
            }
        }
        Token::new(TokenKind::String, value, start, self.pos)
    }

    /// Consumes and returns the next character. Callers only invoke this
    /// once `peek` has confirmed a byte is present, so the fallback
    /// replacement character is unreachable in practice.
    fn next_char(&mut self) -> char {
        let rest = &self.source[self.pos..];
        let ch = rest.chars().next().unwrap_or('\u{FFFD}');
        self.pos += ch.len_utf8();
        ch
    }

    fn scan_escape(&mut self, string_start: usize) -> Result<char, Token> {
        let Some(c) = self.advance() else {
            return Err(self.fail(
                DiagnosticCode::UnterminatedString,
                "unterminated string literal",
                string_start,
            ));
        };
        match c {
            b'n' => Ok('\n'),
            b't' => Ok('\t'),
            b'r' => Ok('\r'),
            b'b' => Ok('\u{0008}'),
            b'f' => Ok('\u{000C}'),
            b'\\' => Ok('\\'),
            b'"' => Ok('"'),
            b'\'' => Ok('\''),
            b'/' => Ok('/'),
            b'u' => {
                let hi = self.scan_hex4(string_start)?;
                if (0xD800..=0xDBFF).contains(&hi) {
                    // High surrogate: a low surrogate must follow as its own
                    // `\uXXXX` escape, per the UTF-16 surrogate-pair rule.
                    if self.peek() == Some(b'\\') && self.peek_at(1) == Some(b'u') {
                        self.pos += 2;
                        let lo = self.scan_hex4(string_start)?;
                        if (0xDC00..=0xDFFF).contains(&lo) {
                            let c = 0x10000 + (hi - 0xD800) * 0x400 + (lo - 0xDC00);
                            return char::from_u32(c).ok_or_else(|| {
                                self.fail(
                                    DiagnosticCode::BadEscape,
                                    "invalid surrogate pair",
                                    string_start,
                                )
                            });
                        }
                    }
                    return Err(self.fail(
                        DiagnosticCode::BadEscape,
                        "unpaired UTF-16 high surrogate",
                        string_start,
                    ));
                }
                char::from_u32(hi).ok_or_else(|| {
                    self.fail(DiagnosticCode::BadEscape, "invalid unicode escape", string_start)
                })
            }
            other => Err(self.fail(
                DiagnosticCode::BadEscape,
                format!("invalid escape sequence '\\{}'", other as char),
                string_start,
            )),
        }
    }

    fn scan_hex4(&mut self, string_start: usize) -> Result<u32, Token> {
        let start = self.pos;
        for _ in 0..4 {
            match self.peek() {
                Some(b) if b.is_ascii_hexdigit() => self.pos += 1,
                _ => {
                    return Err(self.fail(
                        DiagnosticCode::BadEscape,
                        "incomplete unicode escape",
                        string_start,
                    ))
                }
            }
        }
        Ok(u32::from_str_radix(&self.source[start..self.pos], 16).unwrap_or(0))
    }

    fn scan_escaped_name(&mut self, start: usize) -> Token {
        self.pos += 1;
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return self.fail(
                        DiagnosticCode::UnterminatedString,
                        "unterminated escaped name",
                        start,
                    );
                }
                Some(b'`') => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    self.next_char();
                }
            }
        }
        let text = &self.source[start + 1..self.pos - 1];
        Token::new(TokenKind::EscapedName, text, start, self.pos)
    }

    fn scan_variable(&mut self, start: usize) -> Token {
        self.pos += 1;
        if self.peek() == Some(b'$') {
            self.pos += 1;
            return Token::new(TokenKind::Variable, &self.source[start..self.pos], start, self.pos);
        }
        while self.peek().is_some_and(is_name_continue_byte) {
            self.pos += 1;
        }
        Token::new(TokenKind::Variable, &self.source[start..self.pos], start, self.pos)
    }

    fn scan_number(&mut self, start: usize) -> Token {
        if self.peek() == Some(b'0') {
            self.pos += 1;
            // JSON grammar: no leading zeros except the literal `0` itself.
        } else {
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|b| b.is_ascii_digit()) {
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = mark;
            }
        }
        let text = &self.source[start..self.pos];
        if text.parse::<f64>().is_err() {
            return self.fail(
                DiagnosticCode::NumberOutOfRange,
                format!("'{text}' is not a valid number"),
                start,
            );
        }
        Token::new(TokenKind::Number, text, start, self.pos)
    }

    fn scan_name(&mut self, start: usize) -> Token {
        while self.peek().is_some_and(|b| !is_operator_byte(b) && !is_whitespace_byte(b)) {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        let kind = match text {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "in" => TokenKind::In,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Name,
        };
        Token::new(kind, text, start, self.pos)
    }

    /// Scans a `/pattern/flags` regex literal. Bracket/brace/paren depth is
    /// tracked so a `/` inside a character class (e.g. `/[a/b]/`) is not
    /// mistaken for the terminator.
    fn scan_regex(&mut self, start: usize) -> Token {
        self.pos += 1;
        let pattern_start = self.pos;
        let mut depth = 0i32;
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return self.fail(
                        DiagnosticCode::UnterminatedRegex,
                        "unterminated regex literal",
                        start,
                    );
                }
                Some(b'\\') => {
                    self.pos += 1;
                    if self.peek().is_none() {
                        return self.fail(
                            DiagnosticCode::UnterminatedRegex,
                            "unterminated regex literal",
                            start,
                        );
                    }
                    self.next_char();
                }
                Some(b'[' | b'{' | b'(') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b']' | b'}' | b')') => {
                    depth -= 1;
                    self.pos += 1;
                }
                Some(b'/') if depth <= 0 => {
                    break;
                }
                _ => {
                    self.next_char();
                }
            }
        }
        let pattern = self.source[pattern_start..self.pos].to_string();
        self.pos += 1; // closing '/'

        let flags_start = self.pos;
        while self.peek().is_some_and(|b| matches!(b, b'i' | b'm' | b's')) {
            self.pos += 1;
        }
        let flags = &self.source[flags_start..self.pos];

        let text = if flags.is_empty() {
            format!("/{pattern}/")
        } else {
            format!("(?{flags})/{pattern}/")
        };
        Token::new(TokenKind::Regex, text, start, self.pos)
    }
}

fn is_operator_byte(b: u8) -> bool {
    matches!(
        b,
        b'[' | b']'
            | b'{'
            | b'}'
            | b'('
            | b')'
            | b'.'
            | b','
            | b':'
            | b';'
            | b'?'
            | b'+'
            | b'-'
            | b'*'
            | b'/'
            | b'%'
            | b'|'
            | b'^'
            | b'&'
            | b'='
            | b'<'
            | b'>'
            | b'"'
            | b'\''
            | b'`'
            | b'$'
    )
}

fn is_whitespace_byte(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0B)
}

fn is_name_continue_byte(b: u8) -> bool {
    !is_operator_byte(b) && !is_whitespace_byte(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next(true);
            let eof = tok.is_eof();
            out.push(tok.kind);
            if eof {
                break;
            }
        }
        out
    }

    #[test]
    fn two_char_operators_win_over_prefixes() {
        let mut lexer = Lexer::new("!= <= >= .. ~> := ** ??");
        let mut kinds = Vec::new();
        loop {
            let tok = lexer.next(false);
            if tok.is_eof() {
                break;
            }
            kinds.push(tok.kind);
        }
        assert_eq!(
            kinds,
            vec![
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Range,
                TokenKind::Apply,
                TokenKind::Bind,
                TokenKind::DoubleStar,
                TokenKind::Coalesce,
            ]
        );
    }

    #[test]
    fn dot_not_followed_by_digit_stays_a_dot_for_ranges() {
        let mut lexer = Lexer::new("1..5");
        assert_eq!(lexer.next(false).kind, TokenKind::Number);
        assert_eq!(lexer.next(false).kind, TokenKind::Range);
        assert_eq!(lexer.next(false).kind, TokenKind::Number);
    }

    #[test]
    fn string_escapes_decode_surrogate_pairs() {
        let mut lexer = Lexer::new(r#""😀""#);
        let tok = lexer.next(false);
        assert_eq!(tok.kind, TokenKind::String);
        assert_eq!(&*tok.text, "\u{1F600}");
    }

    #[test]
    fn unterminated_string_is_an_error_then_latches_to_eof() {
        let mut lexer = Lexer::new("\"abc");
        assert_eq!(lexer.next(false).kind, TokenKind::Error);
        assert!(lexer.error().is_some());
        assert_eq!(lexer.next(false).kind, TokenKind::Eof);
    }

    #[test]
    fn unclosed_comment_is_an_error() {
        let mut lexer = Lexer::new("/* never closes");
        assert_eq!(lexer.next(true).kind, TokenKind::Error);
    }

    #[test]
    fn regex_tracks_bracket_depth_for_embedded_slash() {
        let mut lexer = Lexer::new("/[a/b]/i");
        let tok = lexer.next(true);
        assert_eq!(tok.kind, TokenKind::Regex);
        assert_eq!(&*tok.text, "(?i)/[a/b]/");
    }

    #[test]
    fn keywords_recognized_post_hoc_from_name() {
        assert_eq!(kinds("and or in true false null"), vec![
            TokenKind::And,
            TokenKind::Or,
            TokenKind::In,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Null,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn escaped_name_reads_verbatim_to_backtick() {
        let mut lexer = Lexer::new("`hello world`");
        let tok = lexer.next(false);
        assert_eq!(tok.kind, TokenKind::EscapedName);
        assert_eq!(&*tok.text, "hello world");
    }

    #[test]
    fn double_dollar_is_its_own_variable() {
        let mut lexer = Lexer::new("$$");
        let tok = lexer.next(false);
        assert_eq!(tok.kind, TokenKind::Variable);
        assert_eq!(&*tok.text, "$$");
    }

    #[test]
    fn leading_zero_number_stops_after_zero() {
        let mut lexer = Lexer::new("0.5");
        let tok = lexer.next(false);
        assert_eq!(tok.kind, TokenKind::Number);
        assert_eq!(&*tok.text, "0.5");
    }
}
