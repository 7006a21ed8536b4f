//! Locating and merging configuration files.
//!
//! Candidate files are searched in a fixed order: the configured
//! default directory, then the user's dot-directory when a home
//! directory is known. Within each directory the shared file is read
//! before the suite-specific one. Later files override earlier ones.
//!
//! Process settings and environment lookups are passed in as
//! [`ProcessConfig`] and [`Environment`] so the loader itself holds no
//! ambient state.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::VarsMap;
use crate::parser::ParseError;
use crate::reader::{ReadError, read_config};
use crate::token::TokenKind;

/// Key under which the default configuration directory is stored.
pub const CONFDIR_KEY: &str = "atf_confdir";

/// Environment variable overriding the default configuration directory.
pub const CONFDIR_ENV: &str = "ATF_CONFDIR";

/// Default configuration directory when nothing overrides it.
pub const DEFAULT_CONFDIR: &str = match option_env!("ATF_CONFDIR") {
    Some(dir) => dir,
    None => "/etc/atf",
};

/// Read-only access to process-wide settings.
pub trait ProcessConfig {
    fn get(&self, key: &str) -> Option<String>;
}

/// Read-only access to environment variables.
pub trait Environment {
    fn get(&self, name: &str) -> Option<String>;

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl ProcessConfig for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        Self::get(self, key).cloned()
    }
}

impl Environment for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        Self::get(self, name).cloned()
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Built-in process settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinConfig {
    confdir: String,
}

impl BuiltinConfig {
    /// Resolve settings, letting a non-empty `ATF_CONFDIR` override the
    /// build-time default directory.
    #[must_use]
    pub fn from_env(env: &(impl Environment + ?Sized)) -> Self {
        let confdir = env
            .get(CONFDIR_ENV)
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFDIR.to_string());
        Self { confdir }
    }

    #[must_use]
    pub fn confdir(&self) -> &str {
        &self.confdir
    }
}

impl Default for BuiltinConfig {
    fn default() -> Self {
        Self::from_env(&SystemEnvironment)
    }
}

impl ProcessConfig for BuiltinConfig {
    fn get(&self, key: &str) -> Option<String> {
        (key == CONFDIR_KEY).then(|| self.confdir.clone())
    }
}

/// Names used when building the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Process setting holding the default directory.
    pub confdir_key: String,
    /// Environment variable holding the home directory.
    pub home_var: String,
    /// Directory under home searched after the default one.
    pub home_subdir: String,
    /// Stem of the file shared by all suites.
    pub common_name: String,
    /// File extension, without the dot.
    pub extension: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            confdir_key: CONFDIR_KEY.to_string(),
            home_var: "HOME".to_string(),
            home_subdir: ".atf".to_string(),
            common_name: "common".to_string(),
            extension: "conf".to_string(),
        }
    }
}

/// Errors that can occur while loading configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("process setting '{0}' is not defined")]
    MissingSetting(String),

    #[error("failed to read config file at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file at {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("{} syntax error(s) in config file at {}", .errors.len(), .path.display())]
    Syntax {
        path: PathBuf,
        errors: Vec<ParseError>,
    },

    #[error(
        "internal error while reading {}: unexpected {kind} token at line {line}",
        .path.display()
    )]
    Internal {
        path: PathBuf,
        kind: TokenKind,
        line: usize,
    },
}

impl ConfigError {
    fn from_read(path: &Path, error: ReadError) -> Self {
        let path = path.to_path_buf();
        match error {
            ReadError::Io(source) => Self::Io { path, source },
            ReadError::Format(source) => Self::Format { path, source },
            ReadError::Internal { kind, line } => Self::Internal { path, kind, line },
        }
    }
}

/// A syntax error recovered while reading one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub error: ParseError,
}

/// Result of a load: the merged variables, the files that contributed,
/// and any recovered syntax errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedConfig {
    pub vars: VarsMap,
    pub sources: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Searches and merges configuration files for a suite.
pub struct Loader<'a> {
    config: &'a dyn ProcessConfig,
    env: &'a dyn Environment,
    layout: Layout,
    strict: bool,
}

impl<'a> Loader<'a> {
    #[must_use]
    pub fn new(config: &'a dyn ProcessConfig, env: &'a dyn Environment) -> Self {
        Self {
            config,
            env,
            layout: Layout::default(),
            strict: false,
        }
    }

    #[must_use]
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Fail on recovered syntax errors instead of reporting them as
    /// diagnostics.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Directories to search, in override order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSetting` when the default directory
    /// is not configured.
    pub fn config_dirs(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let confdir = self
            .config
            .get(&self.layout.confdir_key)
            .ok_or_else(|| ConfigError::MissingSetting(self.layout.confdir_key.clone()))?;

        let mut dirs = vec![PathBuf::from(confdir)];
        if self.env.has(&self.layout.home_var)
            && let Some(home) = self.env.get(&self.layout.home_var)
        {
            dirs.push(Path::new(&home).join(&self.layout.home_subdir));
        }
        Ok(dirs)
    }

    /// Files to try for `suite`, in override order.
    ///
    /// # Errors
    ///
    /// See [`Loader::config_dirs`].
    pub fn candidate_files(&self, suite: &str) -> Result<Vec<PathBuf>, ConfigError> {
        let ext = &self.layout.extension;
        let common = format!("{}.{ext}", self.layout.common_name);
        let specific = format!("{suite}.{ext}");

        Ok(self
            .config_dirs()?
            .into_iter()
            .flat_map(|dir| [dir.join(&common), dir.join(&specific)])
            .collect())
    }

    /// Read and merge every existing candidate file for `suite`.
    ///
    /// Files that do not exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error naming the file when one exists but cannot be
    /// read, has a bad header, or (in strict mode) has syntax errors.
    pub fn load(&self, suite: &str) -> Result<LoadedConfig, ConfigError> {
        let mut loaded = LoadedConfig::default();
        for path in self.candidate_files(suite)? {
            self.merge_file(&path, &mut loaded)?;
        }
        debug!(
            suite,
            files = loaded.sources.len(),
            vars = loaded.vars.len(),
            "configuration loaded"
        );
        Ok(loaded)
    }

    /// Read one file and merge it over `loaded`.
    ///
    /// # Errors
    ///
    /// See [`Loader::load`].
    pub fn merge_file(&self, path: &Path, loaded: &mut LoadedConfig) -> Result<(), ConfigError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not present, skipping");
                return Ok(());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let parsed =
            read_config(BufReader::new(file)).map_err(|e| ConfigError::from_read(path, e))?;

        if !parsed.errors.is_empty() {
            if self.strict {
                return Err(ConfigError::Syntax {
                    path: path.to_path_buf(),
                    errors: parsed.errors,
                });
            }
            for error in parsed.errors {
                warn!(path = %path.display(), line = error.line, "{}", error.message());
                loaded.diagnostics.push(Diagnostic {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }

        debug!(path = %path.display(), vars = parsed.vars.len(), "merging config file");
        merge_into(&mut loaded.vars, parsed.vars);
        loaded.sources.push(path.to_path_buf());
        Ok(())
    }
}

/// `lower` with every entry of `upper` written over it.
#[must_use]
pub fn merge_configs(lower: &VarsMap, upper: &VarsMap) -> VarsMap {
    let mut merged = lower.clone();
    merge_into(&mut merged, upper.clone());
    merged
}

fn merge_into(dest: &mut VarsMap, src: VarsMap) {
    dest.extend(src);
}

/// Load the configuration for `suite` using the process environment.
///
/// Recovered syntax errors are logged and otherwise ignored.
///
/// # Errors
///
/// See [`Loader::load`].
pub fn read_config_files(suite: &str) -> Result<VarsMap, ConfigError> {
    let env = SystemEnvironment;
    let config = BuiltinConfig::from_env(&env);
    Ok(Loader::new(&config, &env).load(suite)?.vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn dirs_without_home() {
        let config = map(&[(CONFDIR_KEY, "/etc/atf")]);
        let env = map(&[]);
        let dirs = Loader::new(&config, &env).config_dirs().expect("dirs");
        assert_eq!(dirs, vec![PathBuf::from("/etc/atf")]);
    }

    #[test]
    fn dirs_with_home() {
        let config = map(&[(CONFDIR_KEY, "/etc/atf")]);
        let env = map(&[("HOME", "/home/user")]);
        let dirs = Loader::new(&config, &env).config_dirs().expect("dirs");
        assert_eq!(
            dirs,
            vec![PathBuf::from("/etc/atf"), PathBuf::from("/home/user/.atf")]
        );
    }

    #[test]
    fn candidate_order() {
        let config = map(&[(CONFDIR_KEY, "/etc/atf")]);
        let env = map(&[("HOME", "/home/user")]);
        let files = Loader::new(&config, &env)
            .candidate_files("suite")
            .expect("files");
        assert_eq!(
            files,
            vec![
                PathBuf::from("/etc/atf/common.conf"),
                PathBuf::from("/etc/atf/suite.conf"),
                PathBuf::from("/home/user/.atf/common.conf"),
                PathBuf::from("/home/user/.atf/suite.conf"),
            ]
        );
    }

    #[test]
    fn missing_confdir_setting() {
        let config = map(&[]);
        let env = map(&[]);
        let err = Loader::new(&config, &env).config_dirs().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting(ref k) if k == CONFDIR_KEY));
    }

    #[test]
    fn builtin_config_env_override() {
        let env = map(&[(CONFDIR_ENV, "/opt/conf")]);
        let config = BuiltinConfig::from_env(&env);
        assert_eq!(config.get(CONFDIR_KEY).as_deref(), Some("/opt/conf"));
        assert_eq!(config.get("other"), None);
    }

    #[test]
    fn builtin_config_ignores_blank_override() {
        let env = map(&[(CONFDIR_ENV, "  ")]);
        assert_eq!(BuiltinConfig::from_env(&env).confdir(), DEFAULT_CONFDIR);
    }

    #[test]
    fn internal_read_error_keeps_token_and_line() {
        let path = Path::new("/etc/atf/suite.conf");
        let err = ConfigError::from_read(
            path,
            ReadError::Internal {
                kind: TokenKind::Colon,
                line: 7,
            },
        );
        match err {
            ConfigError::Internal { ref path, kind, line } => {
                assert_eq!(path, Path::new("/etc/atf/suite.conf"));
                assert_eq!(kind, TokenKind::Colon);
                assert_eq!(line, 7);
            }
            ref other => panic!("expected internal error, got {other}"),
        }
        assert_eq!(
            err.to_string(),
            "internal error while reading /etc/atf/suite.conf: unexpected colon token at line 7"
        );
    }
}
