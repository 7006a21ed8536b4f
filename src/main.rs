//! CLI tool to inspect and validate configuration files.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use atf_config::{
    BuiltinConfig, ConfigError, Loader, ProcessConfig, SystemEnvironment, format_config,
    loader::CONFDIR_KEY, read_config,
};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "atf-config", version, about = "Read and merge configuration files")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the merged configuration for a suite.
    Show {
        /// Suite whose `<suite>.conf` files are read after `common.conf`.
        suite: String,
        /// Search this directory instead of the default one.
        #[arg(long)]
        confdir: Option<PathBuf>,
        /// Fail when any file has syntax errors.
        #[arg(long)]
        strict: bool,
    },
    /// Check that configuration files are valid.
    Check {
        /// Files to check.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Show {
            suite,
            confdir,
            strict,
        } => show(&suite, confdir.as_deref(), strict),
        Command::Check { files } => check(&files),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn show(suite: &str, confdir: Option<&Path>, strict: bool) -> ExitCode {
    let env = SystemEnvironment;
    let builtin = BuiltinConfig::from_env(&env);
    let overridden;
    let config: &dyn ProcessConfig = match confdir {
        Some(dir) => {
            overridden = atf_config::VarsMap::from([(
                CONFDIR_KEY.to_string(),
                dir.to_string_lossy().into_owned(),
            )]);
            &overridden
        }
        None => &builtin,
    };

    match Loader::new(config, &env).strict(strict).load(suite) {
        Ok(loaded) => {
            debug!(sources = ?loaded.sources, "loaded");
            match format_config(&loaded.vars) {
                Ok(text) => {
                    print!("{text}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(ConfigError::Syntax { path, errors }) => {
            for e in errors {
                eprintln!("{}: {e}", path.display());
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn check(files: &[PathBuf]) -> ExitCode {
    let mut had_error = false;

    for path in files {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                had_error = true;
                continue;
            }
        };

        match read_config(BufReader::new(file)) {
            Ok(cf) if cf.is_clean() => {
                eprintln!("{}: valid ({} variable(s))", path.display(), cf.vars.len());
            }
            Ok(cf) => {
                for e in &cf.errors {
                    eprintln!("{}: {e}", path.display());
                }
                had_error = true;
            }
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                had_error = true;
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
