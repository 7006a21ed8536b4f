use std::fmt;

use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A token of the wrong kind was read.
    UnexpectedToken { expected: String, found: String },
    /// Input ended inside a quoted string.
    UnterminatedQuote,
    /// A header line parses but cannot be accepted.
    MalformedHeader { reason: String },
    /// The `Content-Type` header is missing.
    MissingContentType,
    /// The `Content-Type` header names another format.
    ContentTypeMismatch { expected: String, found: String },
    /// The `Content-Type` header carries no `version` attribute.
    MissingVersion,
    /// The `version` attribute does not match.
    VersionMismatch { expected: String, found: String },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { expected, found } => {
                write!(f, "unexpected {found}; expected {expected}")
            }
            Self::UnterminatedQuote => {
                write!(f, "missing closing quote before end of input")
            }
            Self::MalformedHeader { reason } => {
                write!(f, "malformed header: {reason}")
            }
            Self::MissingContentType => {
                write!(f, "could not determine content type")
            }
            Self::ContentTypeMismatch { expected, found } => {
                write!(f, "unsupported content type '{found}', expected '{expected}'")
            }
            Self::MissingVersion => {
                write!(f, "could not determine content version")
            }
            Self::VersionMismatch { expected, found } => {
                write!(f, "unsupported content version '{found}', expected '{expected}'")
            }
        }
    }
}

/// Error produced while tokenizing or parsing, tagged with the
/// source line it refers to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
}

impl ParseError {
    #[must_use]
    pub const fn new(kind: ParseErrorKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// The error text without its location.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Token-level parser on top of a [`Tokenizer`].
///
/// Failures are returned as typed errors; callers that want to keep
/// going record them with [`Parser::add_error`] and resynchronize with
/// [`Parser::reset`].
pub struct Parser<I: Iterator<Item = char>> {
    tokenizer: Tokenizer<I>,
    last: Option<Token>,
    errors: Vec<ParseError>,
}

impl<I: Iterator<Item = char>> Parser<I> {
    #[must_use]
    pub const fn new(tokenizer: Tokenizer<I>) -> Self {
        Self {
            tokenizer,
            last: None,
            errors: Vec::new(),
        }
    }

    /// Read the next token and check that it is one of `kinds`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedToken` naming `description` when the token
    /// kind is not acceptable, or the tokenizer's own error.
    pub fn expect(&mut self, kinds: &[TokenKind], description: &str) -> Result<Token, ParseError> {
        let token = self.next()?;
        if kinds.contains(&token.kind) {
            Ok(token)
        } else {
            Err(ParseError {
                kind: ParseErrorKind::UnexpectedToken {
                    expected: description.to_string(),
                    found: token.describe(),
                },
                line: token.line,
            })
        }
    }

    /// Consume everything up to (not including) the next newline.
    pub fn rest_of_line(&mut self) -> String {
        self.tokenizer.rest_of_line()
    }

    /// Record an error and carry on.
    pub fn add_error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Discard tokens until one of kind `stop` (or end of input) has
    /// been consumed.
    ///
    /// Does nothing when the last consumed token already satisfies
    /// that, so a line whose error was its own newline is not skipped
    /// twice. Resetting to `NewLine` drops the rest of the line raw, so
    /// a stray quote after the error point cannot open a string that
    /// swallows the following lines.
    pub fn reset(&mut self, stop: TokenKind) {
        if stop == TokenKind::NewLine && !self.last_is(stop) {
            self.tokenizer.rest_of_line();
        }
        loop {
            if self.last_is(stop) {
                return;
            }
            if let Err(e) = self.next() {
                self.add_error(e);
            }
        }
    }

    #[must_use]
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    fn last_is(&self, kind: TokenKind) -> bool {
        self.last
            .as_ref()
            .is_some_and(|t| t.kind == kind || t.kind == TokenKind::EndOfInput)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        match self.tokenizer.next_token() {
            Ok(token) => {
                self.last = Some(token.clone());
                Ok(token)
            }
            Err(e) => {
                self.last = None;
                Err(e)
            }
        }
    }
}
