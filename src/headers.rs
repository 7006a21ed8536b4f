//! Metadata block at the top of a configuration file.
//!
//! The block is a run of `Name: value; attr=value` lines ended by a
//! blank line. Only `Content-Type` is interpreted: it guards the body
//! format and version before anything else is trusted.

use std::collections::BTreeMap;
use std::io::BufRead;

use crate::parser::{ParseError, ParseErrorKind, Parser};
use crate::reader::ReadError;
use crate::token::TokenKind;
use crate::tokenizer::Tokenizer;

/// Header carrying the body format.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// A single parsed header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
    pub attrs: BTreeMap<String, String>,
}

impl Header {
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// Headers keyed by name.
pub type HeadersMap = BTreeMap<String, Header>;

/// Read the header block, numbering its first line `start_line`.
///
/// Stops after the terminating blank line (or at end of input) and
/// returns the line number the body starts on.
///
/// # Errors
///
/// Returns `ReadError::Io` on read failures and `ReadError::Format`
/// for a header line that does not parse or repeats an earlier one.
pub fn read_headers<R: BufRead>(
    input: &mut R,
    start_line: usize,
) -> Result<(usize, HeadersMap), ReadError> {
    let mut headers = HeadersMap::new();
    let mut line = start_line;
    let mut buf = String::new();

    loop {
        buf.clear();
        if input.read_line(&mut buf)? == 0 {
            break;
        }
        let text = buf.trim_end_matches(['\n', '\r']);
        if text.is_empty() {
            line += 1;
            break;
        }

        let header = parse_header(text, line).map_err(ReadError::Format)?;
        if headers.contains_key(&header.name) {
            return Err(ReadError::Format(ParseError::new(
                ParseErrorKind::MalformedHeader {
                    reason: format!("duplicate header '{}'", header.name),
                },
                line,
            )));
        }
        headers.insert(header.name.clone(), header);
        line += 1;
    }

    Ok((line, headers))
}

/// Check that `Content-Type` names `expected` with a matching
/// `version` attribute.
///
/// # Errors
///
/// Returns a `ParseError` at `line` describing the first mismatch.
pub fn validate_content_type(
    headers: &HeadersMap,
    expected: &str,
    version: u32,
    line: usize,
) -> Result<(), ParseError> {
    let Some(content_type) = headers.get(CONTENT_TYPE_HEADER) else {
        return Err(ParseError::new(ParseErrorKind::MissingContentType, line));
    };

    if content_type.value != expected {
        return Err(ParseError::new(
            ParseErrorKind::ContentTypeMismatch {
                expected: expected.to_string(),
                found: content_type.value.clone(),
            },
            line,
        ));
    }

    let Some(found) = content_type.attr("version") else {
        return Err(ParseError::new(ParseErrorKind::MissingVersion, line));
    };
    let expected_version = version.to_string();
    if found != expected_version {
        return Err(ParseError::new(
            ParseErrorKind::VersionMismatch {
                expected: expected_version,
                found: found.to_string(),
            },
            line,
        ));
    }

    Ok(())
}

fn parse_header(text: &str, line: usize) -> Result<Header, ParseError> {
    let tokenizer = Tokenizer::for_str(text, line)
        .delimiter(':', TokenKind::Colon)
        .delimiter(';', TokenKind::Semicolon)
        .delimiter('=', TokenKind::Equals)
        .quote('"');
    let mut p = Parser::new(tokenizer);

    let name = p.expect(&[TokenKind::Text], "header name")?.text;
    p.expect(&[TokenKind::Colon], "':' after header name")?;
    let value = p
        .expect(&[TokenKind::Text, TokenKind::Quoted], "header value")?
        .text;

    let mut attrs = BTreeMap::new();
    loop {
        let tok = p.expect(
            &[TokenKind::Semicolon, TokenKind::EndOfInput],
            "';' or end of line",
        )?;
        if tok.kind == TokenKind::EndOfInput {
            break;
        }
        let attr = p.expect(&[TokenKind::Text], "attribute name")?.text;
        p.expect(&[TokenKind::Equals], "'=' after attribute name")?;
        let attr_value = p
            .expect(&[TokenKind::Text, TokenKind::Quoted], "attribute value")?
            .text;
        attrs.insert(attr, attr_value);
    }

    Ok(Header { name, value, attrs })
}
