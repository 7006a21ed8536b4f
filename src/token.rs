use std::fmt;

/// Token kinds produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of the input stream.
    EndOfInput,
    /// Line separator.
    NewLine,
    /// Bare word.
    Text,
    /// Double-quoted string, quotes stripped and escapes resolved.
    Quoted,
    /// `=`
    Equals,
    /// `#`
    Hash,
    /// `:` (header lines only).
    Colon,
    /// `;` (header lines only).
    Semicolon,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EndOfInput => "end of input",
            Self::NewLine => "new line",
            Self::Text => "text",
            Self::Quoted => "quoted string",
            Self::Equals => "equal sign",
            Self::Hash => "'#'",
            Self::Colon => "colon",
            Self::Semicolon => "semicolon",
        };
        f.write_str(name)
    }
}

/// A single token with its kind, text, and source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, text: String, line: usize) -> Self {
        Self { kind, text, line }
    }

    /// Human-readable rendering used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::EndOfInput | TokenKind::NewLine => self.kind.to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}
