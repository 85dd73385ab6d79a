//! Main lexer implementation for Tiny.
//!
//! The [`Lexer`] converts source text into [`Token`]s, dispatching on the
//! first character of each token. Lexemes are copied into the arena.

use bumpalo::Bump;
use tinybridge_core::{LexError, Span};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};

pub struct Lexer<'src, 'ast> {
    cursor: Cursor<'src>,
    arena: &'ast Bump,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
        }
    }

    /// Lex the whole source. The last token is always [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token<'ast>>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'ast>, LexError> {
        self.skip_trivia()?;

        let line = self.cursor.line();
        let col = self.cursor.column();
        let start = self.cursor.offset();

        let Some(c) = self.cursor.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", Span::point(line, col)));
        };

        match c {
            '"' => self.scan_string(line, col),
            c if c.is_ascii_digit() => self.scan_number(line, col, start),
            c if is_ident_start(c) => Ok(self.scan_identifier(line, col, start)),
            _ => self.scan_operator(line, col, start),
        }
    }

    // =========================================
    // Internal: Token scanning
    // =========================================

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            self.cursor.eat_while(|c| c.is_whitespace());
            match (self.cursor.peek(), self.cursor.peek_nth(1)) {
                (Some('/'), Some('/')) => self.cursor.eat_while(|c| c != '\n'),
                (Some('/'), Some('*')) => {
                    let span = Span::new(self.cursor.line(), self.cursor.column(), 2);
                    self.cursor.advance();
                    self.cursor.advance();
                    loop {
                        match self.cursor.advance() {
                            Some('*') if self.cursor.eat('/') => break,
                            Some(_) => {}
                            None => return Err(LexError::UnterminatedComment { span }),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn make_token(&self, kind: TokenKind, line: u32, col: u32, start: u32) -> Token<'ast> {
        let text = self.cursor.slice_from(start);
        let span = Span::new(line, col, text.len() as u32);
        Token::new(kind, self.arena.alloc_str(text), span)
    }

    fn scan_identifier(&mut self, line: u32, col: u32, start: u32) -> Token<'ast> {
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.slice_from(start);
        let kind = lookup_keyword(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, line, col, start)
    }

    fn scan_number(&mut self, line: u32, col: u32, start: u32) -> Result<Token<'ast>, LexError> {
        self.cursor.eat_while(|c| c.is_ascii_digit());

        let mut kind = TokenKind::IntLiteral;
        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::FloatLiteral;
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }

        if self.cursor.peek().is_some_and(is_ident_start) {
            let bad_start = self.cursor.offset();
            self.cursor.eat_while(is_ident_continue);
            let suffix = self.cursor.slice_from(bad_start);
            let text = self.cursor.slice_from(start);
            return Err(LexError::InvalidNumber {
                span: Span::new(line, col, text.len() as u32),
                detail: format!("unexpected suffix '{}'", suffix),
            });
        }

        Ok(self.make_token(kind, line, col, start))
    }

    fn scan_string(&mut self, line: u32, col: u32) -> Result<Token<'ast>, LexError> {
        let start = self.cursor.offset();
        self.cursor.advance();

        let mut content = String::new();
        loop {
            match self.cursor.advance() {
                Some('"') => break,
                Some('\\') => {
                    let escape_span = Span::new(self.cursor.line(), self.cursor.column() - 1, 2);
                    let escaped = match self.cursor.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('0') => '\0',
                        Some(other) => {
                            return Err(LexError::InvalidEscape {
                                ch: other,
                                span: escape_span,
                            });
                        }
                        None => {
                            return Err(LexError::UnterminatedString {
                                span: Span::point(line, col),
                            });
                        }
                    };
                    content.push(escaped);
                }
                Some('\n') | None => {
                    return Err(LexError::UnterminatedString {
                        span: Span::point(line, col),
                    });
                }
                Some(c) => content.push(c),
            }
        }

        let len = self.cursor.offset() - start;
        Ok(Token::new(
            TokenKind::StringLiteral,
            self.arena.alloc_str(&content),
            Span::new(line, col, len),
        ))
    }

    fn scan_operator(&mut self, line: u32, col: u32, start: u32) -> Result<Token<'ast>, LexError> {
        let Some(c) = self.cursor.advance() else {
            return Ok(Token::new(TokenKind::Eof, "", Span::point(line, col)));
        };

        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '=' if self.cursor.eat('=') => TokenKind::EqualEqual,
            '=' => TokenKind::Equal,
            '!' if self.cursor.eat('=') => TokenKind::NotEqual,
            '!' => TokenKind::Bang,
            '<' if self.cursor.eat('=') => TokenKind::LessEqual,
            '<' => TokenKind::Less,
            '>' if self.cursor.eat('=') => TokenKind::GreaterEqual,
            '>' => TokenKind::Greater,
            ':' if self.cursor.eat('=') => TokenKind::ColonEqual,
            ':' => TokenKind::Colon,
            '&' if self.cursor.eat('&') => TokenKind::AndAnd,
            '|' if self.cursor.eat('|') => TokenKind::OrOr,
            other => {
                return Err(LexError::UnexpectedChar {
                    ch: other,
                    span: Span::new(line, col, other.len_utf8() as u32),
                });
            }
        };

        Ok(self.make_token(kind, line, col, start))
    }
}
