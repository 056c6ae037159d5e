use std::path::PathBuf;

use clap::Parser;

/// Interactive, file-backed personal task tracker.
/// Storage defaults to ./Tasks.json or a path passed via --db.
#[derive(Parser, Debug)]
#[command(name = "taskman", version, about = "Personal task tracker")]
pub struct Cli {
    /// Path to the JSON task file.
    #[arg(long, env = "TASKMAN_DB")]
    pub db: Option<PathBuf>,

    /// Path to the diagnostic log file.
    #[arg(long, env = "TASKMAN_LOG")]
    pub log_file: Option<PathBuf>,

    /// Only write diagnostics to the log file, not the console.
    #[arg(long, short)]
    pub quiet: bool,
}
