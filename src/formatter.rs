//! Serializes a variable mapping back into configuration file text.
//!
//! Output always carries the content-type header, and reading it back
//! yields the same mapping.

use crate::VarsMap;
use crate::reader::{CONTENT_TYPE, FORMAT_VERSION};

/// A mapping that cannot be written as a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Names are written bare, so they must be a single non-empty word
    /// without `=`, `#` or `"`.
    #[error("invalid variable name {0:?}")]
    InvalidName(String),
}

/// Format `vars` as a complete configuration file.
///
/// Values that would not survive as a bare word are double-quoted with
/// `"` and `\` escaped.
///
/// # Errors
///
/// Returns `FormatError::InvalidName` for the first name that would not
/// read back as the same name.
pub fn format_config(vars: &VarsMap) -> Result<String, FormatError> {
    let mut out = format!("Content-Type: {CONTENT_TYPE}; version=\"{FORMAT_VERSION}\"\n\n");
    for (name, value) in vars {
        if !is_valid_name(name) {
            return Err(FormatError::InvalidName(name.clone()));
        }
        out.push_str(name);
        out.push_str(" = ");
        format_value(&mut out, value);
        out.push('\n');
    }
    Ok(out)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c.is_whitespace() || matches!(c, '=' | '#' | '"'))
}

fn format_value(out: &mut String, value: &str) {
    if !needs_quotes(value) {
        out.push_str(value);
        return;
    }

    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '=' | '#' | '"' | '\\'))
}
