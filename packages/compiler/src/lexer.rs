//! Whitespace-sensitive tokenizer for the component language.

use crate::error::{CompileError, CompilePhase};
use crate::token::{Span, Token, TokenKind};

/// Multi-character operators, longest first so maximal munch works by
/// trying them in order.
const OPERATORS: &[&str] = &[
    "===", "!==", "??=", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++",
    "--", "+", "-", "*", "/", "%", "<", ">", "=", "!",
];

const PUNCTUATION: &[char] = &['{', '}', '(', ')', '[', ']', '.', '#', ',', ':', ';'];

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenizes the whole input. Line breaks become [`TokenKind::Newline`]
    /// tokens; spaces and tabs are skipped but still separate tokens, which
    /// the parser observes through span adjacency.
    pub fn tokenize(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(CompilePhase::Lexer, message, self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn span_from(&self, start: (usize, usize, usize)) -> Span {
        Span {
            line: start.1,
            column: start.2,
            offset: start.0,
            len: self.offset - start.0,
        }
    }

    fn mark(&self) -> (usize, usize, usize) {
        (self.offset, self.line, self.column)
    }

    fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_trivia()?;
        let start = self.mark();
        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: self.span_from(start),
            });
        };

        if c == '\n' {
            self.bump();
            return Ok(Token {
                kind: TokenKind::Newline,
                span: self.span_from(start),
            });
        }

        if c == '\'' || c == '"' || c == '`' {
            return self.string(c, start);
        }

        if c.is_ascii_digit() {
            return Ok(self.number(start));
        }

        if c.is_alphabetic() || c == '_' {
            return Ok(self.ident(start));
        }

        if c == '@' {
            self.bump();
            if self
                .peek()
                .map(|n| n.is_alphabetic() || n == '_')
                .unwrap_or(false)
            {
                let name = self.take_ident_text();
                return Ok(Token {
                    kind: TokenKind::Directive(name),
                    span: self.span_from(start),
                });
            }
            return Err(self.error("expected a directive name after `@`"));
        }

        // operators before punctuation: `.` is punctuation but `++` is not
        for op in OPERATORS {
            if self.source[self.offset..].starts_with(op) {
                // `/` could open a comment; trivia already consumed those
                for _ in 0..op.len() {
                    self.bump();
                }
                return Ok(Token {
                    kind: TokenKind::Op(op),
                    span: self.span_from(start),
                });
            }
        }

        if PUNCTUATION.contains(&c) {
            self.bump();
            return Ok(Token {
                kind: TokenKind::Punct(c),
                span: self.span_from(start),
            });
        }

        if c == '?' {
            self.bump();
            return Ok(Token {
                kind: TokenKind::Op("?"),
                span: self.span_from(start),
            });
        }

        Err(self.error(format!("unexpected character `{c}`")))
    }

    /// Skips spaces, tabs, carriage returns and comments, but not newlines.
    fn skip_trivia(&mut self) -> Result<(), CompileError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek2() == Some('*') => {
                    self.bump();
                    self.bump();
                    let mut closed = false;
                    while let Some(c) = self.bump() {
                        if c == '*' && self.peek() == Some('/') {
                            self.bump();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(self.error("unterminated block comment"));
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn take_ident_text(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    fn ident(&mut self, start: (usize, usize, usize)) -> Token {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Ident(out),
            span: self.span_from(start),
        }
    }

    fn number(&mut self, start: (usize, usize, usize)) -> Token {
        let mut out = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                out.push(c);
                self.bump();
            } else if c == '.'
                && !seen_dot
                && self.peek2().map(|n| n.is_ascii_digit()).unwrap_or(false)
            {
                seen_dot = true;
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Number(out),
            span: self.span_from(start),
        }
    }

    fn string(
        &mut self,
        quote: char,
        start: (usize, usize, usize),
    ) -> Result<Token, CompileError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\n') if quote != '`' => {
                    return Err(self.error("unterminated string literal"));
                }
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
            }
        }
        Ok(Token {
            kind: TokenKind::Str { value, quote },
            span: self.span_from(start),
        })
    }
}
