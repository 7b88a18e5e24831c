//! LiquidCode scanner — converts DSL text into a token stream
//!
//! Handles: type codes, identifiers, string literals, numbers, field,
//! iterator and signal references, color and size names, push-source URLs
//! and the modifier operators.
//! Comments (//) are discarded. Newlines are significant only outside
//! brackets, where they separate statements.
//!
//! Guarantees:
//! - Deterministic: same input always produces same token stream
//! - Every token keeps its raw lexeme and line:column
//! - The stream always ends with exactly one `Eof`

use serde::Serialize;

use crate::error::LexError;
use crate::kinds::BlockKind;

/// Token types for LiquidCode syntax
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Words and literals
    TypeCode(String),
    Ident(String),
    Str(String),
    FieldRef(String),
    /// `:.path` (empty for the current item itself)
    IteratorRef(String),
    /// `:#`
    IndexRef,
    SignalRef(String),
    /// `#name` with the name attached, digits allowed (`#1e40af`)
    ColorName(String),
    /// `%name`, digits allowed (`%2xl`)
    SizeName(String),
    Number(f64),
    Url(String),

    // Grouping
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    LParen,    // (
    RParen,    // )
    Comma,     // ,

    // Modifier operators
    Hash,       // #
    Percent,    // %
    Star,       // *
    Bang,       // !
    Caret,      // ^
    Tilde,      // ~
    Question,   // ?
    Dollar,     // $
    Eq,         // =
    Gt,         // >
    Lt,         // <
    LtGt,       // <>
    Gte,        // >=
    Lte,        // <=
    Slash,      // /
    SlashLt,    // /<
    PlusPlus,   // ++
    MinusMinus, // --
    Minus,      // -

    Newline,
    Eof,
}

/// Position in source text for error reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    /// 1-based
    pub line: usize,
    /// 1-based, in characters
    pub column: usize,
    /// 0-based character offset
    pub offset: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token with its raw lexeme and source position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    /// Character offset just past the token
    pub fn end_offset(&self) -> usize {
        self.span.offset + self.text.chars().count()
    }

    /// True when `next` starts exactly where this token ends
    pub fn touches(&self, next: &Token) -> bool {
        self.end_offset() == next.span.offset
    }

    /// Human-readable form for error messages
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::TypeCode(code) => format!("type code '{}'", code),
            TokenKind::Str(_) => format!("string {}", self.text),
            TokenKind::Number(_) => format!("number {}", self.text),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

/// Scan DSL text into tokens
pub fn scan(text: &str) -> Result<Vec<Token>, LexError> {
    Scanner::new(text).scan()
}

/// Scanner for LiquidCode source text
pub struct Scanner {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    /// Open `[`, `{` and `(` not yet closed
    depth: usize,
}

impl Scanner {
    /// Create a new scanner; a leading byte-order mark is dropped
    pub fn new(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Scanner {
            input: text.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            depth: 0,
        }
    }

    /// Scan the entire input
    pub fn scan(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens: Vec<Token> = Vec::new();

        loop {
            self.skip_blanks_and_comments();
            let span = self.current_span();

            match self.peek() {
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        text: String::new(),
                        span,
                    });
                    break;
                }
                Some('\n') => {
                    self.advance();
                    let at_statement_start = tokens
                        .last()
                        .map_or(true, |t| t.kind == TokenKind::Newline);
                    if self.depth == 0 && !at_statement_start {
                        tokens.push(Token {
                            kind: TokenKind::Newline,
                            text: "\n".to_string(),
                            span,
                        });
                    }
                }
                Some(_) => {
                    let token = self.next_token(span)?;
                    tokens.push(token);
                }
            }
        }

        Ok(tokens)
    }

    // ── Character helpers ──────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        if let Some(c) = ch {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }

    fn slice(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn found_here(&self) -> String {
        match self.peek() {
            Some(c) => format!("'{}'", c.escape_default()),
            None => "end of input".to_string(),
        }
    }

    // ── Whitespace & Comments ──────────────────────────────

    fn skip_blanks_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
                self.advance();
            }

            if self.peek() == Some('/') && self.peek_ahead(1) == Some('/') {
                while let Some(ch) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            break;
        }
    }

    // ── Main dispatch ──────────────────────────────────────

    fn next_token(&mut self, span: Span) -> Result<Token, LexError> {
        let Some(ch) = self.peek() else {
            return Err(LexError {
                position: span,
                found: "end of input".to_string(),
                message: "unexpected end of input".to_string(),
            });
        };
        let next = self.peek_ahead(1);

        let (kind, len) = match ch {
            '[' | '{' | '(' => {
                self.depth += 1;
                let kind = match ch {
                    '[' => TokenKind::LBracket,
                    '{' => TokenKind::LBrace,
                    _ => TokenKind::LParen,
                };
                (kind, 1)
            }
            ']' | '}' | ')' => {
                self.depth = self.depth.saturating_sub(1);
                let kind = match ch {
                    ']' => TokenKind::RBracket,
                    '}' => TokenKind::RBrace,
                    _ => TokenKind::RParen,
                };
                (kind, 1)
            }
            ',' => (TokenKind::Comma, 1),
            '#' if next.is_some_and(is_word_char) => {
                return Ok(self.read_attached_name(span, TokenKind::ColorName))
            }
            '%' if next.is_some_and(is_word_char) => {
                return Ok(self.read_attached_name(span, TokenKind::SizeName))
            }
            '#' => (TokenKind::Hash, 1),
            '%' => (TokenKind::Percent, 1),
            '*' => (TokenKind::Star, 1),
            '!' => (TokenKind::Bang, 1),
            '^' => (TokenKind::Caret, 1),
            '~' => (TokenKind::Tilde, 1),
            '?' => (TokenKind::Question, 1),
            '$' => (TokenKind::Dollar, 1),
            '=' => (TokenKind::Eq, 1),
            '>' if next == Some('=') => (TokenKind::Gte, 2),
            '>' => (TokenKind::Gt, 1),
            '<' if next == Some('>') => (TokenKind::LtGt, 2),
            '<' if next == Some('=') => (TokenKind::Lte, 2),
            '<' => (TokenKind::Lt, 1),
            '/' if next == Some('<') => (TokenKind::SlashLt, 2),
            '/' => (TokenKind::Slash, 1),
            '+' if next == Some('+') => (TokenKind::PlusPlus, 2),
            '-' if next == Some('-') => (TokenKind::MinusMinus, 2),
            '-' => (TokenKind::Minus, 1),
            '"' => return self.read_string(span),
            ':' | '@' => return self.read_reference(span, ch),
            c if c.is_ascii_digit() => return self.read_number(span),
            c if is_word_start(c) => return Ok(self.read_word(span)),
            '+' => {
                return Err(LexError {
                    position: span,
                    found: "'+'".to_string(),
                    message: "'+' is only valid as '++'".to_string(),
                })
            }
            c if c.is_control() => {
                return Err(LexError {
                    position: span,
                    found: format!("'{}'", c.escape_default()),
                    message: format!("illegal control character U+{:04X}", c as u32),
                })
            }
            c => {
                return Err(LexError {
                    position: span,
                    found: format!("'{}'", c),
                    message: format!("unexpected character '{}'", c),
                })
            }
        };

        let start = self.position;
        for _ in 0..len {
            self.advance();
        }
        Ok(Token {
            kind,
            text: self.slice(start),
            span,
        })
    }

    // ── String literals ────────────────────────────────────

    fn read_string(&mut self, span: Span) -> Result<Token, LexError> {
        let start = self.position;
        self.advance(); // consume opening "
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(LexError {
                        position: span,
                        found: "end of input".to_string(),
                        message: "unterminated string".to_string(),
                    });
                }
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => {
                        return Err(LexError {
                            position: span,
                            found: "end of input".to_string(),
                            message: "unterminated string".to_string(),
                        });
                    }
                },
                Some(c) => value.push(c),
            }
        }

        Ok(Token {
            kind: TokenKind::Str(value),
            text: self.slice(start),
            span,
        })
    }

    // ── Numbers ────────────────────────────────────────────

    fn read_number(&mut self, span: Span) -> Result<Token, LexError> {
        let start = self.position;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = self.slice(start);
        let value: f64 = text.parse().map_err(|_| LexError {
            position: span.clone(),
            found: text.clone(),
            message: format!("invalid number '{}'", text),
        })?;

        Ok(Token {
            kind: TokenKind::Number(value),
            text,
            span,
        })
    }

    // ── Words, references & URLs ───────────────────────────

    fn consume_word(&mut self) {
        while let Some(c) = self.peek() {
            let inner_hyphen =
                c == '-' && self.peek_ahead(1).is_some_and(|n| n.is_ascii_alphanumeric());
            if is_word_char(c) || inner_hyphen {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self, span: Span) -> Token {
        let start = self.position;
        self.consume_word();

        if self.peek() == Some(':') && self.peek_ahead(1) == Some('/') && self.peek_ahead(2) == Some('/')
        {
            while let Some(c) = self.peek() {
                if c.is_whitespace() || matches!(c, ',' | '[' | ']') {
                    break;
                }
                self.advance();
            }
            let text = self.slice(start);
            return Token {
                kind: TokenKind::Url(text.clone()),
                text,
                span,
            };
        }

        let text = self.slice(start);
        let kind = if BlockKind::from_code(&text).is_some() {
            TokenKind::TypeCode(text.clone())
        } else {
            TokenKind::Ident(text.clone())
        };
        Token { kind, text, span }
    }

    /// `#name` or `%name`: an alphanumeric run glued to its operator
    fn read_attached_name(&mut self, span: Span, kind: fn(String) -> TokenKind) -> Token {
        let start = self.position;
        self.advance(); // consume operator
        let name_start = self.position;
        self.consume_word();
        let name = self.slice(name_start);
        Token {
            kind: kind(name),
            text: self.slice(start),
            span,
        }
    }

    fn consume_path(&mut self) {
        self.consume_word();
        while self.peek() == Some('.') && self.peek_ahead(1).is_some_and(is_word_start) {
            self.advance();
            self.consume_word();
        }
    }

    /// `:path.to.field`, `:.item.path`, `:#` or `@signal`
    fn read_reference(&mut self, span: Span, sigil: char) -> Result<Token, LexError> {
        let start = self.position;
        self.advance(); // consume sigil

        if sigil == ':' {
            match self.peek() {
                Some('.') => {
                    self.advance();
                    let path_start = self.position;
                    if self.peek().is_some_and(is_word_start) {
                        self.consume_path();
                    }
                    return Ok(Token {
                        kind: TokenKind::IteratorRef(self.slice(path_start)),
                        text: self.slice(start),
                        span,
                    });
                }
                Some('#') => {
                    self.advance();
                    return Ok(Token {
                        kind: TokenKind::IndexRef,
                        text: self.slice(start),
                        span,
                    });
                }
                _ => {}
            }
        }

        if !self.peek().is_some_and(is_word_start) {
            return Err(LexError {
                position: span,
                found: self.found_here(),
                message: format!("expected identifier after '{}'", sigil),
            });
        }

        let name_start = self.position;
        if sigil == ':' {
            self.consume_path();
        } else {
            self.consume_word();
        }

        let name = self.slice(name_start);
        let kind = if sigil == ':' {
            TokenKind::FieldRef(name)
        } else {
            TokenKind::SignalRef(name)
        };
        Ok(Token {
            kind,
            text: self.slice(start),
            span,
        })
    }
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
