// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The lexer implementation using logos.
//!
//! Logos recognizes the fixed-shape tokens. Comments, numbers and the three
//! quoted forms are finished by hand from the remainder, so malformed input
//! is reported to the log and skipped without stopping the scan.

use std::collections::VecDeque;

use kiln_ast::token::{Token, TokenKind, TokenValue};
use kiln_ast::{Range, Source};
use kiln_diagnostics::{codes, Diagnostic, Log, ToDiagnostic};
use logos::Logos;
use thiserror::Error;

/// Raw token type for logos - literal bodies are scanned in a second step.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,
    #[token("/*")]
    BlockComment,

    // Keywords are classified after the match, from the word text.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Word,

    // === Literal openers ===
    #[regex("0[xX]", |_| 16u32)]
    #[regex("0[bB]", |_| 2u32)]
    #[regex("0[oO]", |_| 8u32)]
    RadixPrefix(u32),
    #[regex("[0-9]+")]
    Digits,
    #[token("'")]
    CharQuote,
    #[token("\"")]
    StringQuote,
    #[token("`")]
    Backtick,

    // === Operators ===
    #[token("**", |_| TokenKind::StarStar)]
    #[token("*", |_| TokenKind::Star)]
    #[token("/", |_| TokenKind::Slash)]
    #[token("%", |_| TokenKind::Percent)]
    #[token("+", |_| TokenKind::Plus)]
    #[token("-", |_| TokenKind::Minus)]
    #[token("<<", |_| TokenKind::LtLt)]
    #[token(">>", |_| TokenKind::GtGt)]
    #[token("<", |_| TokenKind::Lt)]
    #[token(">", |_| TokenKind::Gt)]
    #[token("<=", |_| TokenKind::LtEq)]
    #[token(">=", |_| TokenKind::GtEq)]
    #[token("==", |_| TokenKind::EqEq)]
    #[token("!=", |_| TokenKind::BangEq)]
    #[token("&", |_| TokenKind::Amp)]
    #[token("^", |_| TokenKind::Caret)]
    #[token("|", |_| TokenKind::Pipe)]
    #[token("&&", |_| TokenKind::AmpAmp)]
    #[token("..", |_| TokenKind::DotDot)]
    #[token("||", |_| TokenKind::PipePipe)]
    #[token("??", |_| TokenKind::QuestionQuestion)]
    #[token("=", |_| TokenKind::Eq)]
    #[token("+=", |_| TokenKind::PlusEq)]
    #[token("-=", |_| TokenKind::MinusEq)]
    #[token("*=", |_| TokenKind::StarEq)]
    #[token("/=", |_| TokenKind::SlashEq)]
    #[token("%=", |_| TokenKind::PercentEq)]
    #[token("**=", |_| TokenKind::StarStarEq)]
    #[token("<<=", |_| TokenKind::LtLtEq)]
    #[token(">>=", |_| TokenKind::GtGtEq)]
    #[token("&=", |_| TokenKind::AmpEq)]
    #[token("^=", |_| TokenKind::CaretEq)]
    #[token("|=", |_| TokenKind::PipeEq)]
    #[token("&&=", |_| TokenKind::AmpAmpEq)]
    #[token("||=", |_| TokenKind::PipePipeEq)]
    #[token("??=", |_| TokenKind::QuestionQuestionEq)]
    #[token("!", |_| TokenKind::Bang)]
    #[token("~", |_| TokenKind::Tilde)]
    #[token("++", |_| TokenKind::PlusPlus)]
    #[token("--", |_| TokenKind::MinusMinus)]
    #[token("?", |_| TokenKind::Question)]
    #[token("?.", |_| TokenKind::QuestionDot)]
    #[token(".", |_| TokenKind::Dot)]
    #[token("...", |_| TokenKind::DotDotDot)]
    #[token("->", |_| TokenKind::Arrow)]
    #[token("=>", |_| TokenKind::FatArrow)]
    #[token("@", |_| TokenKind::At)]
    // === Delimiters ===
    #[token("(", |_| TokenKind::LParen)]
    #[token(")", |_| TokenKind::RParen)]
    #[token("[", |_| TokenKind::LBracket)]
    #[token("]", |_| TokenKind::RBracket)]
    #[token("{", |_| TokenKind::LBrace)]
    #[token("}", |_| TokenKind::RBrace)]
    #[token(":", |_| TokenKind::Colon)]
    #[token(";", |_| TokenKind::Semi)]
    #[token(",", |_| TokenKind::Comma)]
    Punct(TokenKind),
}

/// On-demand tokenizer over one [`Source`].
///
/// Every call to [`Lexer::next`] returns exactly one token. Once the end of
/// input is reached it keeps returning `Eof`.
pub struct Lexer<'s> {
    source: &'s Source,
    raw: logos::Lexer<'s, RawToken>,
    /// Tokens already scanned but not yet handed out.
    pending: VecDeque<Token>,
    /// Brace depth inside the innermost open `${`; `None` outside one.
    embedded: Option<u32>,
    finished: bool,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s Source) -> Self {
        Self {
            source,
            raw: RawToken::lexer(source.text()),
            pending: VecDeque::new(),
            embedded: None,
            finished: false,
        }
    }

    pub fn source(&self) -> &'s Source {
        self.source
    }

    /// Produce the next token, reporting lexical problems to `log`.
    pub fn next(&mut self, log: &mut dyn Log) -> Token {
        if let Some(token) = self.pending.pop_front() {
            return token;
        }
        if self.finished {
            return self.eof();
        }

        loop {
            let Some(result) = self.raw.next() else {
                return self.end_of_input(log);
            };
            let span = self.raw.span();

            match result {
                Ok(raw) => {
                    if let Some(token) = self.convert_token(raw, span.start, span.end, log) {
                        return token;
                    }
                }
                Err(()) => {
                    let ch = self.source.text()[span.start..].chars().next().unwrap_or('?');
                    let range = self.range(span.start, span.start + ch.len_utf8());
                    log.log(LexError::unexpected_char(ch, range).to_diagnostic());
                }
            }
        }
    }

    /// Convert a raw logos token, finishing literal scans. `None` means
    /// nothing was produced and scanning continues.
    fn convert_token(&mut self, raw: RawToken, start: usize, end: usize, log: &mut dyn Log) -> Option<Token> {
        match raw {
            RawToken::LineComment => None,
            RawToken::BlockComment => {
                self.skip_block_comment(start, log);
                None
            }
            RawToken::Word => Some(self.word(start, end)),
            RawToken::RadixPrefix(radix) => Some(self.radix_integer(radix, start, log)),
            RawToken::Digits => Some(self.decimal_number(start, log)),
            RawToken::CharQuote => self.char_literal(start, log),
            RawToken::StringQuote => Some(self.string_literal(start, log)),
            RawToken::Backtick => Some(self.open_string_expr(start, log)),
            RawToken::Punct(kind) => self.punct(kind, start, end, log),
        }
    }

    fn word(&self, start: usize, end: usize) -> Token {
        let text = &self.source.text()[start..end];
        let range = Some(self.range(start, end));
        match TokenKind::keyword(text) {
            Some(TokenKind::BooleanLiteral) => {
                Token::with_value(TokenKind::BooleanLiteral, range, TokenValue::Bool(text == "true"))
            }
            Some(kind) => Token::new(kind, range),
            None => Token::with_value(TokenKind::Identifier, range, TokenValue::Text(text.to_string())),
        }
    }

    fn punct(&mut self, kind: TokenKind, start: usize, end: usize, log: &mut dyn Log) -> Option<Token> {
        match (kind, self.embedded) {
            (TokenKind::LBrace, Some(depth)) => self.embedded = Some(depth + 1),
            (TokenKind::RBrace, Some(0)) => {
                // Closes the `${`; the template text resumes here.
                self.embedded = None;
                self.scan_segment(true, log);
                return self.pending.pop_front();
            }
            (TokenKind::RBrace, Some(depth)) => self.embedded = Some(depth - 1),
            _ => {}
        }
        Some(Token::new(kind, Some(self.range(start, end))))
    }

    fn end_of_input(&mut self, log: &mut dyn Log) -> Token {
        let end = self.source.len();
        if self.embedded.take().is_some() {
            let range = self.range(end, end);
            log.log(LexError::unterminated("string expression", range, "add a closing '}' and '`'").to_diagnostic());
            return Token::new(TokenKind::CloseStringExpr, Some(range));
        }
        self.finished = true;
        self.eof()
    }

    fn eof(&self) -> Token {
        let end = self.source.len();
        Token::new(TokenKind::Eof, Some(self.range(end, end)))
    }

    // =========================================================================
    // Hand-scanned forms
    // =========================================================================

    /// Byte offset the next raw token starts at.
    fn pos(&self) -> usize {
        self.raw.span().end
    }

    fn rest(&self) -> &'s str {
        let source: &'s Source = self.source;
        &source.text()[self.pos()..]
    }

    fn range(&self, start: usize, end: usize) -> Range {
        self.source.range(start, end)
    }

    fn skip_block_comment(&mut self, start: usize, log: &mut dyn Log) {
        let bytes = self.rest().as_bytes();
        let mut depth = 1;
        let mut i = 0;

        while i < bytes.len() {
            match (bytes[i], bytes.get(i + 1)) {
                (b'/', Some(b'*')) => {
                    depth += 1;
                    i += 2;
                }
                (b'*', Some(b'/')) => {
                    depth -= 1;
                    i += 2;
                    if depth == 0 {
                        self.raw.bump(i);
                        return;
                    }
                }
                _ => i += 1,
            }
        }

        self.raw.bump(bytes.len());
        let range = self.range(start, start + 2);
        log.log(LexError::unterminated("block comment", range, "add a closing '*/'").to_diagnostic());
    }

    fn radix_integer(&mut self, radix: u32, start: usize, log: &mut dyn Log) -> Token {
        let rest = self.rest();
        let digits = rest.chars().take_while(|c| c.is_digit(radix)).count();

        if digits == 0 {
            let junk = rest.bytes().take_while(|b| b.is_ascii_alphanumeric() || *b == b'_').count();
            self.raw.bump(junk);
            let range = self.range(start, self.pos());
            log.log(LexError::malformed_number(radix, range).to_diagnostic());
            return Token::new(TokenKind::Invalid, Some(range));
        }

        self.raw.bump(digits);
        let range = self.range(start, self.pos());
        match u64::from_str_radix(&rest[..digits], radix) {
            Ok(value) => Token::with_value(TokenKind::IntegerLiteral, Some(range), TokenValue::Int(value)),
            Err(_) => {
                log.log(LexError::integer_too_large(range).to_diagnostic());
                Token::new(TokenKind::Invalid, Some(range))
            }
        }
    }

    fn decimal_number(&mut self, start: usize, log: &mut dyn Log) -> Token {
        // After a member `.` only the integer part is taken, so `t.1.0` is a
        // path. `..` and `...` are followed by a whole number.
        let text = self.source.text().as_bytes();
        let after_dot = start > 0 && text[start - 1] == b'.' && (start < 2 || text[start - 2] != b'.');
        let mut is_float = false;

        if !after_dot {
            let bytes = self.rest().as_bytes();
            let digit_at = |i: usize| bytes.get(i).map_or(false, u8::is_ascii_digit);
            let mut i = 0;

            if bytes.first() == Some(&b'.') && digit_at(1) {
                i = 1;
                while digit_at(i) {
                    i += 1;
                }
                is_float = true;
            }
            if matches!(bytes.get(i), Some(b'e' | b'E')) {
                let mut j = i + 1;
                if matches!(bytes.get(j), Some(b'+' | b'-')) {
                    j += 1;
                }
                if digit_at(j) {
                    while digit_at(j) {
                        j += 1;
                    }
                    i = j;
                    is_float = true;
                }
            }
            self.raw.bump(i);
        }

        let end = self.pos();
        let text = &self.source.text()[start..end];
        let range = self.range(start, end);

        if is_float {
            return match text.parse::<f64>() {
                Ok(value) => Token::with_value(TokenKind::FloatLiteral, Some(range), TokenValue::Float(value)),
                Err(_) => {
                    log.log(LexError::malformed_number(10, range).to_diagnostic());
                    Token::new(TokenKind::Invalid, Some(range))
                }
            };
        }
        match text.parse::<u64>() {
            Ok(value) => Token::with_value(TokenKind::IntegerLiteral, Some(range), TokenValue::Int(value)),
            Err(_) => {
                log.log(LexError::integer_too_large(range).to_diagnostic());
                Token::new(TokenKind::Invalid, Some(range))
            }
        }
    }

    fn char_literal(&mut self, start: usize, log: &mut dyn Log) -> Option<Token> {
        let rest = self.rest();
        let (value, consumed) = match rest.chars().next() {
            None | Some('\n') => {
                let range = self.range(start, start + 1);
                log.log(LexError::unterminated("character literal", range, "add a closing '''").to_diagnostic());
                return None;
            }
            Some('\'') => {
                self.raw.bump(1);
                let range = self.range(start, self.pos());
                log.log(LexError::empty_char(range).to_diagnostic());
                return None;
            }
            Some('\\') => {
                let (value, len, known) = parse_escape(&rest[1..]);
                if !known {
                    let range = self.range(start + 1, start + 2 + len);
                    log.log(LexError::unknown_escape(value, range).to_diagnostic());
                }
                (value, 1 + len)
            }
            Some(c) => (c, c.len_utf8()),
        };

        if rest[consumed..].starts_with('\'') {
            self.raw.bump(consumed + 1);
            let range = self.range(start, self.pos());
            return Some(Token::with_value(TokenKind::CharLiteral, Some(range), TokenValue::Char(value)));
        }

        self.raw.bump(consumed);
        let range = self.range(start, self.pos());
        log.log(LexError::unterminated("character literal", range, "add a closing '''").to_diagnostic());
        None
    }

    fn string_literal(&mut self, start: usize, log: &mut dyn Log) -> Token {
        let rest = self.rest();
        let (text, terminated) = match find_unescaped(rest, b'"') {
            Some(i) => (&rest[..i], true),
            None => (rest, false),
        };
        self.raw.bump(text.len() + usize::from(terminated));
        let range = self.range(start, self.pos());

        if !terminated {
            let opening = self.range(start, start + 1);
            log.log(LexError::unterminated("string literal", opening, "add a closing '\"'").to_diagnostic());
        }
        Token::with_value(TokenKind::StringLiteral, Some(range), TokenValue::Text(text.to_string()))
    }

    fn open_string_expr(&mut self, start: usize, log: &mut dyn Log) -> Token {
        let open = Token::new(TokenKind::OpenStringExpr, Some(self.range(start, start + 1)));

        if self.embedded.is_some() {
            // Drain the nested template as one plain segment so the token
            // stream stays balanced.
            let range = self.range(start, start + 1);
            log.log(LexError::nested_string_expr(range).to_diagnostic());

            let rest = self.rest();
            let (text, terminated) = match find_unescaped(rest, b'`') {
                Some(i) => (&rest[..i], true),
                None => (rest, false),
            };
            let seg_start = self.pos();
            self.raw.bump(text.len() + usize::from(terminated));
            let seg_end = seg_start + text.len();
            self.pending.push_back(Token::with_value(
                TokenKind::StringSegment,
                Some(self.range(seg_start, seg_end)),
                TokenValue::Text(text.to_string()),
            ));
            self.pending
                .push_back(Token::new(TokenKind::CloseStringExpr, Some(self.range(seg_end, self.pos()))));
            return open;
        }

        self.scan_segment(false, log);
        open
    }

    /// Scan template text up to the closing backtick or the next `${`,
    /// queueing the produced tokens. `resumed` is set when the text follows
    /// an embedded expression.
    fn scan_segment(&mut self, resumed: bool, log: &mut dyn Log) {
        let base = self.pos();
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i = (i + 2).min(bytes.len()),
                b'`' => {
                    self.push_segment(&rest[..i], base, false);
                    self.raw.bump(i + 1);
                    self.pending
                        .push_back(Token::new(TokenKind::CloseStringExpr, Some(self.range(base + i, base + i + 1))));
                    return;
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    // Text between two embedded expressions is kept even when empty.
                    self.push_segment(&rest[..i], base, resumed);
                    self.raw.bump(i + 2);
                    self.embedded = Some(0);
                    return;
                }
                _ => i += 1,
            }
        }

        self.push_segment(rest, base, false);
        self.raw.bump(bytes.len());
        let end = self.pos();
        log.log(
            LexError::unterminated("string expression", self.range(base, end), "add a closing '`'").to_diagnostic(),
        );
        self.pending
            .push_back(Token::new(TokenKind::CloseStringExpr, Some(self.range(end, end))));
    }

    fn push_segment(&mut self, text: &str, start: usize, keep_empty: bool) {
        if text.is_empty() && !keep_empty {
            return;
        }
        self.pending.push_back(Token::with_value(
            TokenKind::StringSegment,
            Some(self.range(start, start + text.len())),
            TokenValue::Text(text.to_string()),
        ));
    }
}

/// Index of the first `delim` not preceded by a backslash escape.
fn find_unescaped(text: &str, delim: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == delim => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Decode the escape after a backslash. Returns the character, the bytes
/// consumed and whether the escape was recognized.
fn parse_escape(text: &str) -> (char, usize, bool) {
    let Some(first) = text.chars().next() else {
        return ('\\', 0, true);
    };

    let numeric = |digits: &str, radix: u32| u32::from_str_radix(digits, radix).ok().and_then(char::from_u32);

    match first {
        'x' => {
            let len = text[1..].bytes().take(2).take_while(u8::is_ascii_hexdigit).count();
            match numeric(&text[1..1 + len], 16) {
                Some(c) if len > 0 => (c, 1 + len, true),
                _ => ('x', 1, false),
            }
        }
        '0'..='7' => {
            let len = text.bytes().take(3).take_while(|b| (b'0'..=b'7').contains(b)).count();
            match numeric(&text[..len], 8) {
                Some(c) => (c, len, true),
                None => (first, 1, false),
            }
        }
        'n' => ('\n', 1, true),
        't' => ('\t', 1, true),
        'v' => ('\u{0B}', 1, true),
        'r' => ('\r', 1, true),
        'a' => ('\u{07}', 1, true),
        'b' => ('\u{08}', 1, true),
        '\\' | '$' | '\'' | '"' => (first, 1, true),
        other => (other, other.len_utf8(), false),
    }
}

/// A lexer problem with location and friendly message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub range: Range,
    pub message: String,
    pub hint: Option<String>,
    pub code: &'static str,
    /// Reported as a warning; the token is still produced.
    pub is_warning: bool,
}

impl LexError {
    fn new(range: Range, code: &'static str, message: String) -> Self {
        Self { range, message, hint: None, code, is_warning: false }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn unexpected_char(ch: char, range: Range) -> Self {
        Self::new(range, codes::UNEXPECTED_CHARACTER, format!("unexpected character '{}'", ch.escape_debug()))
    }

    fn unterminated(what: &str, range: Range, hint: &str) -> Self {
        Self::new(range, codes::UNTERMINATED_LITERAL, format!("unterminated {}", what)).with_hint(hint)
    }

    fn empty_char(range: Range) -> Self {
        Self::new(range, codes::UNTERMINATED_LITERAL, "empty character literal".to_string())
    }

    fn unknown_escape(ch: char, range: Range) -> Self {
        let mut err = Self::new(range, codes::UNKNOWN_ESCAPE, format!("unknown escape sequence '\\{}'", ch))
            .with_hint("valid: \\n \\t \\v \\r \\a \\b \\\\ \\$ \\' \\\" \\xHH \\NNN");
        err.is_warning = true;
        err
    }

    fn malformed_number(radix: u32, range: Range) -> Self {
        let base = match radix {
            16 => "hexadecimal",
            8 => "octal",
            2 => "binary",
            _ => "number",
        };
        Self::new(range, codes::MALFORMED_NUMBER, format!("malformed {} literal", base))
    }

    fn integer_too_large(range: Range) -> Self {
        Self::new(range, codes::MALFORMED_NUMBER, "integer literal is too large".to_string())
            .with_hint("the largest integer literal is 18446744073709551615")
    }

    fn nested_string_expr(range: Range) -> Self {
        Self::new(range, codes::NESTED_STRING_EXPRESSION, "nested string expressions are not supported".to_string())
            .with_hint("move the inner template into a variable")
    }
}

impl ToDiagnostic for LexError {
    fn to_diagnostic(&self) -> Diagnostic {
        let diag = if self.is_warning {
            Diagnostic::warning(&self.message)
        } else {
            Diagnostic::error(&self.message)
        };
        let diag = diag.with_code(self.code).at(Some(self.range));
        match &self.hint {
            Some(hint) => diag.with_help(hint),
            None => diag,
        }
    }
}
