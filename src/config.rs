//! Runtime configuration.
//!
//! Everything the tracker needs to know about its environment is resolved
//! once at startup and passed down explicitly.

use std::path::PathBuf;

use crate::cli::Cli;

pub const DEFAULT_DB_FILE: &str = "Tasks.json";
pub const DEFAULT_LOG_FILE: &str = "program_log.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// JSON file holding the task list.
    pub db_path: PathBuf,
    /// Plain-text diagnostic log, appended across sessions.
    pub log_path: PathBuf,
    /// Skip echoing diagnostics to the console.
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            quiet: false,
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let defaults = Config::default();
        Config {
            db_path: cli.db.unwrap_or(defaults.db_path),
            log_path: cli.log_file.unwrap_or(defaults.log_path),
            quiet: cli.quiet,
        }
    }
}
