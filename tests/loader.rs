//! Searching and merging configuration files on disk.

mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use atf_config::loader::CONFDIR_KEY;
use atf_config::{ConfigError, Layout, Loader, VarsMap};
use common::{vars, write_config};
use tempfile::TempDir;

/// A default config directory and a home directory under one tempdir.
struct Fixture {
    _root: TempDir,
    config: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let confdir = root.path().join("etc");
        let home = root.path().join("home");
        fs::create_dir_all(&confdir).expect("confdir");
        fs::create_dir_all(&home).expect("home");

        let config = BTreeMap::from([(
            CONFDIR_KEY.to_string(),
            confdir.to_string_lossy().into_owned(),
        )]);
        let env = BTreeMap::from([("HOME".to_string(), home.to_string_lossy().into_owned())]);
        Self {
            _root: root,
            config,
            env,
        }
    }

    fn confdir(&self) -> &Path {
        Path::new(&self.config[CONFDIR_KEY])
    }

    fn user_dir(&self) -> std::path::PathBuf {
        Path::new(&self.env["HOME"]).join(".atf")
    }

    fn loader(&self) -> Loader<'_> {
        Loader::new(&self.config, &self.env)
    }

    fn load(&self, suite: &str) -> VarsMap {
        self.loader().load(suite).expect("load").vars
    }
}

// -----------------------------------------------------------
// Search order and override semantics.
// -----------------------------------------------------------

#[test]
fn no_files_gives_empty_mapping() {
    let fx = Fixture::new();
    let loaded = fx.loader().load("custom").expect("load");
    assert!(loaded.vars.is_empty());
    assert!(loaded.sources.is_empty());
    assert!(loaded.diagnostics.is_empty());
}

#[test]
fn nonexistent_directories_are_skipped() {
    let config = BTreeMap::from([(CONFDIR_KEY.to_string(), "/nonexistent/atf/conf".to_string())]);
    let env = BTreeMap::from([("HOME".to_string(), "/nonexistent/home".to_string())]);
    let vars = Loader::new(&config, &env).load("custom").expect("load").vars;
    assert!(vars.is_empty());
}

#[test]
fn home_suite_file_wins_over_default_common() {
    let fx = Fixture::new();
    write_config(&fx.confdir().join("common.conf"), "key = system\nonly_common = 1\n");
    write_config(&fx.user_dir().join("suite.conf"), "key = mine\n");

    assert_eq!(
        fx.load("suite"),
        vars(&[("key", "mine"), ("only_common", "1")])
    );
}

#[test]
fn full_precedence_chain() {
    let fx = Fixture::new();
    write_config(&fx.confdir().join("common.conf"), "a = 1\nb = 1\nc = 1\nd = 1\n");
    write_config(&fx.confdir().join("suite.conf"), "b = 2\nc = 2\nd = 2\n");
    write_config(&fx.user_dir().join("common.conf"), "c = 3\nd = 3\n");
    write_config(&fx.user_dir().join("suite.conf"), "d = 4\n");

    let loaded = fx.loader().load("suite").expect("load");
    assert_eq!(
        loaded.vars,
        vars(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")])
    );
    assert_eq!(loaded.sources.len(), 4);
    assert_eq!(loaded.sources[0], fx.confdir().join("common.conf"));
    assert_eq!(loaded.sources[3], fx.user_dir().join("suite.conf"));
}

#[test]
fn other_suites_are_ignored() {
    let fx = Fixture::new();
    write_config(&fx.confdir().join("other.conf"), "a = other\n");
    write_config(&fx.confdir().join("suite.conf"), "a = suite\n");
    assert_eq!(fx.load("suite"), vars(&[("a", "suite")]));
}

#[test]
fn without_home_only_default_dir_is_read() {
    let fx = Fixture::new();
    write_config(&fx.confdir().join("common.conf"), "a = system\n");
    write_config(&fx.user_dir().join("common.conf"), "a = user\n");

    let env: BTreeMap<String, String> = BTreeMap::new();
    let vars = Loader::new(&fx.config, &env).load("suite").expect("load").vars;
    assert_eq!(vars["a"], "system");
}

#[test]
fn custom_layout() {
    let fx = Fixture::new();
    write_config(&fx.confdir().join("shared.cfg"), "a = 1\n");
    write_config(&fx.confdir().join("common.conf"), "a = ignored\n");

    let layout = Layout {
        common_name: "shared".to_string(),
        extension: "cfg".to_string(),
        ..Layout::default()
    };
    let vars = fx.loader().layout(layout).load("suite").expect("load").vars;
    assert_eq!(vars["a"], "1");
}

// -----------------------------------------------------------
// Failures.
// -----------------------------------------------------------

#[test]
fn bad_header_is_fatal_not_skipped() {
    let fx = Fixture::new();
    let path = fx.confdir().join("common.conf");
    fs::write(&path, "a = 1\n").expect("write");

    let err = fx.loader().load("suite").unwrap_err();
    assert!(matches!(err, ConfigError::Format { path: ref p, .. } if *p == path));
}

#[test]
fn unreadable_file_is_fatal() {
    let fx = Fixture::new();
    // a directory where a file is expected opens but cannot be read
    fs::create_dir_all(fx.confdir().join("suite.conf")).expect("dir");

    let err = fx.loader().load("suite").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn syntax_errors_become_diagnostics() {
    let fx = Fixture::new();
    let path = fx.confdir().join("common.conf");
    write_config(&path, "broken\ngood = yes\n");

    let loaded = fx.loader().load("suite").expect("load");
    assert_eq!(loaded.vars, vars(&[("good", "yes")]));
    assert_eq!(loaded.diagnostics.len(), 1);
    assert_eq!(loaded.diagnostics[0].path, path);
    assert_eq!(loaded.diagnostics[0].error.line, 3);
}

#[test]
fn strict_mode_fails_on_syntax_errors() {
    let fx = Fixture::new();
    write_config(&fx.confdir().join("common.conf"), "broken\ngood = yes\n");

    let err = fx.loader().strict(true).load("suite").unwrap_err();
    match err {
        ConfigError::Syntax { errors, .. } => assert_eq!(errors.len(), 1),
        other => panic!("expected syntax error, got {other}"),
    }
}

#[test]
fn missing_confdir_setting_is_error() {
    let config: BTreeMap<String, String> = BTreeMap::new();
    let env: BTreeMap<String, String> = BTreeMap::new();
    let err = Loader::new(&config, &env).load("suite").unwrap_err();
    assert!(matches!(err, ConfigError::MissingSetting(_)));
}
