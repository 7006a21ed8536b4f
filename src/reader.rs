//! Reader for a single configuration stream.
//!
//! A stream is a header block followed by a body of `name = value`
//! assignments, comments and blank lines. The body is driven through a
//! small state machine on top of [`Parser`]; a malformed line is
//! recorded and skipped so one pass can report every bad line.

use std::io::{self, BufRead};
use std::vec;

use crate::VarsMap;
use crate::headers::{read_headers, validate_content_type};
use crate::parser::{ParseError, Parser};
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

/// Content type every configuration file must declare.
pub const CONTENT_TYPE: &str = "application/X-atf-config";

/// Format version every configuration file must declare.
pub const FORMAT_VERSION: u32 = 1;

/// Error that stops reading a stream.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The header block is malformed or declares another format.
    #[error("{0}")]
    Format(ParseError),
    /// The body parser produced a token the reader cannot handle.
    #[error("internal error: unexpected {kind} token at line {line}")]
    Internal { kind: TokenKind, line: usize },
}

/// Receives the assignments found in a stream.
pub trait ConfigVisitor {
    /// Called once per `name = value` line, in file order.
    fn got_var(&mut self, name: &str, value: &str);

    /// Called exactly once, after the last assignment.
    fn got_eof(&mut self) {}
}

impl ConfigVisitor for VarsMap {
    fn got_var(&mut self, name: &str, value: &str) {
        self.insert(name.to_string(), value.to_string());
    }
}

/// Variables read from one stream plus the syntax errors recovered on
/// the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub vars: VarsMap,
    pub errors: Vec<ParseError>,
}

impl ConfigFile {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read a stream into a [`ConfigFile`].
///
/// # Errors
///
/// See [`read_config_with`].
pub fn read_config<R: BufRead>(input: R) -> Result<ConfigFile, ReadError> {
    let mut vars = VarsMap::new();
    let errors = read_config_with(input, &mut vars)?;
    Ok(ConfigFile { vars, errors })
}

/// Read a stream, reporting each assignment to `visitor`.
///
/// Returns the syntax errors recovered while reading the body; a later
/// assignment to the same name is reported again, so a collecting
/// visitor ends up with the last value.
///
/// The body is read one line at a time, so assignments before an I/O
/// failure have already reached `visitor` when the error is returned.
///
/// # Errors
///
/// Returns `ReadError::Format` before any variable is reported when the
/// header block is malformed or does not declare [`CONTENT_TYPE`]
/// version [`FORMAT_VERSION`]. I/O failures (including a body line that
/// is not valid UTF-8) and internal errors abort the read.
pub fn read_config_with<R: BufRead, V: ConfigVisitor + ?Sized>(
    mut input: R,
    visitor: &mut V,
) -> Result<Vec<ParseError>, ReadError> {
    let (body_line, headers) = read_headers(&mut input, 1)?;
    validate_content_type(&headers, CONTENT_TYPE, FORMAT_VERSION, 1).map_err(ReadError::Format)?;

    let mut io_error = None;
    let chars = LineChars {
        input,
        line: Vec::new().into_iter(),
        error: &mut io_error,
    };
    let tokenizer = Tokenizer::new(chars, body_line)
        .delimiter('=', TokenKind::Equals)
        .delimiter('#', TokenKind::Hash)
        .quote('"');
    let (result, errors) = {
        let mut reader = BodyReader {
            parser: Parser::new(tokenizer),
            visitor,
        };
        let result = reader.run();
        (result, reader.parser.into_errors())
    };

    // a failed read looks like end of input to the tokenizer
    if let Some(e) = io_error {
        return Err(ReadError::Io(e));
    }
    result?;
    Ok(errors)
}

/// Characters of a `BufRead`, pulled one line at a time.
///
/// Stops at the first read error and parks it in `error`.
struct LineChars<'e, R> {
    input: R,
    line: vec::IntoIter<char>,
    error: &'e mut Option<io::Error>,
}

impl<R: BufRead> Iterator for LineChars<'_, R> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if let Some(ch) = self.line.next() {
                return Some(ch);
            }
            if self.error.is_some() {
                return None;
            }
            let mut buf = String::new();
            match self.input.read_line(&mut buf) {
                Ok(0) => return None,
                Ok(_) => self.line = buf.chars().collect::<Vec<_>>().into_iter(),
                Err(e) => {
                    *self.error = Some(e);
                    return None;
                }
            }
        }
    }
}

#[derive(Debug)]
enum State {
    Scanning,
    InComment,
    ExpectEquals(String),
    ExpectValue(String),
    ExpectEnd,
    Done,
}

enum Interrupt {
    Syntax(ParseError),
    Internal(Token),
}

impl From<ParseError> for Interrupt {
    fn from(error: ParseError) -> Self {
        Self::Syntax(error)
    }
}

struct BodyReader<'v, I: Iterator<Item = char>, V: ConfigVisitor + ?Sized> {
    parser: Parser<I>,
    visitor: &'v mut V,
}

impl<I: Iterator<Item = char>, V: ConfigVisitor + ?Sized> BodyReader<'_, I, V> {
    fn run(&mut self) -> Result<(), ReadError> {
        let mut state = State::Scanning;
        loop {
            state = match self.step(state) {
                Ok(State::Done) => break,
                Ok(next) => next,
                Err(Interrupt::Syntax(error)) => {
                    self.parser.add_error(error);
                    self.parser.reset(TokenKind::NewLine);
                    State::Scanning
                }
                Err(Interrupt::Internal(token)) => {
                    return Err(ReadError::Internal {
                        kind: token.kind,
                        line: token.line,
                    });
                }
            };
        }
        self.visitor.got_eof();
        Ok(())
    }

    fn step(&mut self, state: State) -> Result<State, Interrupt> {
        let p = &mut self.parser;
        match state {
            State::Scanning => {
                let tok = p.expect(
                    &[
                        TokenKind::EndOfInput,
                        TokenKind::Hash,
                        TokenKind::Text,
                        TokenKind::NewLine,
                    ],
                    "end of input, '#', new line or text",
                )?;
                match tok.kind {
                    TokenKind::EndOfInput => Ok(State::Done),
                    TokenKind::Hash => Ok(State::InComment),
                    TokenKind::Text => Ok(State::ExpectEquals(tok.text)),
                    TokenKind::NewLine => Ok(State::Scanning),
                    _ => Err(Interrupt::Internal(tok)),
                }
            }
            State::InComment => {
                p.rest_of_line();
                let tok = p.expect(
                    &[TokenKind::NewLine, TokenKind::EndOfInput],
                    "new line",
                )?;
                Ok(line_end(&tok))
            }
            State::ExpectEquals(name) => {
                p.expect(&[TokenKind::Equals], "equal sign")?;
                Ok(State::ExpectValue(name))
            }
            State::ExpectValue(name) => {
                let tok = p.expect(
                    &[TokenKind::Text, TokenKind::Quoted],
                    "word or quoted string",
                )?;
                self.visitor.got_var(&name, &tok.text);
                Ok(State::ExpectEnd)
            }
            State::ExpectEnd => {
                let tok = p.expect(
                    &[TokenKind::NewLine, TokenKind::Hash, TokenKind::EndOfInput],
                    "new line or comment",
                )?;
                if tok.kind == TokenKind::Hash {
                    Ok(State::InComment)
                } else {
                    Ok(line_end(&tok))
                }
            }
            State::Done => Ok(State::Done),
        }
    }
}

fn line_end(tok: &Token) -> State {
    if tok.kind == TokenKind::EndOfInput {
        State::Done
    } else {
        State::Scanning
    }
}
