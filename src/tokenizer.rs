use std::collections::VecDeque;
use std::str::Chars;

use crate::parser::{ParseError, ParseErrorKind};
use crate::token::{Token, TokenKind};

/// Lazy, forward-only tokenizer over a character stream.
///
/// Delimiters and the quote character are registered once while the
/// tokenizer is built; everything else is accumulated into `Text`.
pub struct Tokenizer<I: Iterator<Item = char>> {
    input: I,
    lookahead: VecDeque<char>,
    line: usize,
    delimiters: Vec<(char, TokenKind)>,
    quote: Option<char>,
    finished: bool,
}

impl<'a> Tokenizer<Chars<'a>> {
    /// Tokenizer over a string slice.
    #[must_use]
    pub fn for_str(input: &'a str, start_line: usize) -> Self {
        Self::new(input.chars(), start_line)
    }
}

impl<I: Iterator<Item = char>> Tokenizer<I> {
    /// Create a tokenizer whose first line is numbered `start_line`.
    ///
    /// Blanks separate tokens and no delimiters are registered.
    #[must_use]
    pub const fn new(input: I, start_line: usize) -> Self {
        Self {
            input,
            lookahead: VecDeque::new(),
            line: start_line,
            delimiters: Vec::new(),
            quote: None,
            finished: false,
        }
    }

    /// Register a single-character delimiter producing `kind`.
    #[must_use]
    pub fn delimiter(mut self, ch: char, kind: TokenKind) -> Self {
        self.delimiters.retain(|(c, _)| *c != ch);
        self.delimiters.push((ch, kind));
        self
    }

    /// Register the quote character.
    #[must_use]
    pub const fn quote(mut self, ch: char) -> Self {
        self.quote = Some(ch);
        self
    }

    /// Line number of the next character to be read.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Produce the next token.
    ///
    /// Returns `EndOfInput` once the stream is exhausted, and keeps
    /// returning it on further calls.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` when the input ends inside a quoted string.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_blanks();

        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::EndOfInput, String::new(), self.line));
        };

        if ch == '\n' || (ch == '\r' && self.at_crlf()) {
            return Ok(self.read_newline());
        }

        if Some(ch) == self.quote {
            self.advance();
            return self.read_quoted(ch);
        }

        if let Some(kind) = self.delimiter_kind(ch) {
            self.advance();
            return Ok(Token::new(kind, ch.to_string(), self.line));
        }

        Ok(self.read_text())
    }

    /// Consume the raw remainder of the current line, leaving the
    /// newline itself in the stream.
    pub fn rest_of_line(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.advance();
        }
        if text.ends_with('\r') {
            text.pop();
        }
        text
    }

    fn delimiter_kind(&self, ch: char) -> Option<TokenKind> {
        self.delimiters
            .iter()
            .find(|(c, _)| *c == ch)
            .map(|(_, kind)| *kind)
    }

    fn is_boundary(&self, ch: char) -> bool {
        ch == '\n'
            || Some(ch) == self.quote
            || self.delimiter_kind(ch).is_some()
            || is_blank(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&mut self, offset: usize) -> Option<char> {
        while self.lookahead.len() <= offset {
            let ch = self.input.next()?;
            self.lookahead.push_back(ch);
        }
        self.lookahead.get(offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        self.lookahead.pop_front().or_else(|| self.input.next())
    }

    fn at_crlf(&mut self) -> bool {
        self.peek() == Some('\r') && self.peek_at(1) == Some('\n')
    }

    fn skip_blanks(&mut self) {
        while let Some(ch) = self.peek() {
            if !is_blank(ch) || self.at_crlf() {
                break;
            }
            self.advance();
        }
    }

    fn read_newline(&mut self) -> Token {
        if self.advance() == Some('\r') {
            self.advance();
        }
        let token = Token::new(TokenKind::NewLine, "\n".to_string(), self.line);
        self.line += 1;
        token
    }

    fn read_quoted(&mut self, quote: char) -> Result<Token, ParseError> {
        let start_line = self.line;
        let mut value = String::new();

        loop {
            match self.advance() {
                None => {
                    return Err(ParseError {
                        kind: ParseErrorKind::UnterminatedQuote,
                        line: start_line,
                    });
                }
                Some('\\') => match self.advance() {
                    Some(escaped) => {
                        if escaped == '\n' {
                            self.line += 1;
                        }
                        value.push(escaped);
                    }
                    None => {
                        return Err(ParseError {
                            kind: ParseErrorKind::UnterminatedQuote,
                            line: start_line,
                        });
                    }
                },
                Some(c) if c == quote => break,
                Some(c) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    value.push(c);
                }
            }
        }

        Ok(Token::new(TokenKind::Quoted, value, start_line))
    }

    fn read_text(&mut self) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if self.is_boundary(ch) || self.at_crlf() {
                break;
            }
            text.push(ch);
            self.advance();
        }
        Token::new(TokenKind::Text, text, self.line)
    }
}

impl<I: Iterator<Item = char>> Iterator for Tokenizer<I> {
    type Item = Result<Token, ParseError>;

    /// Yields exactly one `EndOfInput` token, then `None`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        if result
            .as_ref()
            .is_ok_and(|token| token.kind == TokenKind::EndOfInput)
        {
            self.finished = true;
        }
        Some(result)
    }
}

const fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r')
}
