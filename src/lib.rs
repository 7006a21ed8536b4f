//! Reader, merger and formatter for ATF-style configuration files.
//!
//! A configuration file is a header block declaring its content type
//! followed by `name = value` lines:
//!
//! ```text
//! Content-Type: application/X-atf-config; version="1"
//!
//! # comments run to the end of the line
//! timeout = 30
//! host = "example.org"   # quoted values may contain = # and spaces
//! ```
//!
//! # Quick start
//!
//! ## Read a single file
//!
//! ```
//! use atf_config::read_config;
//!
//! let input = "Content-Type: application/X-atf-config; version=\"1\"\n\n\
//!              timeout = 30\nhost = \"example.org\"\n";
//! let config = read_config(input.as_bytes()).unwrap();
//! assert_eq!(config.vars["timeout"], "30");
//! assert_eq!(config.vars["host"], "example.org");
//! assert!(config.errors.is_empty());
//! ```
//!
//! ## Merge two mappings
//!
//! ```
//! use atf_config::{VarsMap, merge_configs};
//!
//! let lower = VarsMap::from([("a".into(), "1".into()), ("b".into(), "2".into())]);
//! let upper = VarsMap::from([("b".into(), "3".into())]);
//! let merged = merge_configs(&lower, &upper);
//! assert_eq!(merged["a"], "1");
//! assert_eq!(merged["b"], "3");
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use std::collections::BTreeMap;

pub mod formatter;
pub mod headers;
pub mod loader;
pub mod parser;
pub mod reader;
pub mod token;
pub mod tokenizer;

pub use formatter::{FormatError, format_config};
pub use headers::{Header, HeadersMap, read_headers, validate_content_type};
pub use loader::{
    BuiltinConfig, ConfigError, Diagnostic, Environment, Layout, LoadedConfig, Loader,
    ProcessConfig, SystemEnvironment, merge_configs, read_config_files,
};
pub use parser::{ParseError, ParseErrorKind, Parser};
pub use reader::{
    CONTENT_TYPE, ConfigFile, ConfigVisitor, FORMAT_VERSION, ReadError, read_config,
    read_config_with,
};
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;

/// Variable name to value.
pub type VarsMap = BTreeMap<String, String>;
