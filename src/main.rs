//! # taskman - personal task tracker
//!
//! An interactive command-line tool for keeping a small list of named tasks.
//! Tasks are stored in a single JSON file (`Tasks.json` by default) and every
//! action is recorded in a plain-text log (`program_log.txt`), with a copy of
//! each log line echoed to the console.
//!
//! ## Usage
//!
//! ```bash
//! # Start the menu with the defaults
//! taskman
//!
//! # Keep tasks and logs somewhere else, file logging only
//! taskman --db ~/notes/tasks.json --log-file ~/notes/taskman.log --quiet
//! ```
//!
//! The menu offers five numbered actions: add, list, delete, mark as
//! completed, and exit. Each action reads the task file, applies the change
//! and writes the file back, so the file on disk always reflects the last
//! finished command.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::io;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod store;
pub mod task;

use cli::Cli;
use cmd::Dispatcher;
use config::Config;
use logging::{init_logging, TracingDiagnostics};

fn main() {
    let config = Config::from(Cli::parse());

    let guards = match init_logging(&config) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Failed to initialise logging: {e}");
            std::process::exit(1);
        }
    };

    let diag = TracingDiagnostics;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut dispatcher = Dispatcher::new(&config, &diag, stdin.lock(), stdout.lock());

    if let Err(e) = dispatcher.run() {
        tracing::error!(target: logging::TARGET, "Terminal I/O failed: {e}");
        drop(dispatcher);
        drop(guards);
        std::process::exit(1);
    }
}
