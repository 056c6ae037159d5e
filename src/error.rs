//! Error types for storage and user input.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or writing the task file.
///
/// `Read`, `Parse`, `DuplicateId` and `ZeroId` are load failures: the command must
/// abort without touching the file. `Encode` and `Write` are save failures:
/// whatever the command changed in memory is discarded.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} contains task id {id} more than once", path.display())]
    DuplicateId { path: PathBuf, id: u64 },

    #[error("{} contains task id 0; ids must be positive", path.display())]
    ZeroId { path: PathBuf },

    #[error("failed to encode tasks: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Read { .. }
                | StoreError::Parse { .. }
                | StoreError::DuplicateId { .. }
                | StoreError::ZeroId { .. }
        )
    }

    pub fn is_save_failure(&self) -> bool {
        !self.is_load_failure()
    }
}

/// Operations the in-memory list refuses to perform.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaskError {
    #[error("no task ids left after {last}")]
    IdSpaceExhausted { last: u64 },
}

/// Input rejected before any store access.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("'{0}' is not a valid task id")]
    InvalidId(String),

    #[error("task name cannot be empty")]
    EmptyName,
}
