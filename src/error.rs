//! Error types for rust-sqlsnap

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, comparing or applying a snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot dir {path} does not exist")]
    SnapshotDirNotFound { path: PathBuf },

    #[error("Snapshot dir {path} already exists - use overwrite to replace it")]
    SnapshotDirExists { path: PathBuf },

    #[error("Database {server} {database} already exists - use overwrite to replace it")]
    DatabaseExists { server: String, database: String },

    #[error("Failed to read file: {path}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model snapshot: {path}")]
    SnapshotParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate {kind}: {name}")]
    DuplicateObject { kind: &'static str, name: String },

    #[error("{kind} {name} refers to table {parent}, which is not in the model")]
    MissingParent {
        kind: &'static str,
        name: String,
        parent: String,
    },

    #[error("Foreign key {name} pairs {columns} column(s) with {ref_columns} referenced column(s)")]
    ForeignKeyColumnMismatch {
        name: String,
        columns: usize,
        ref_columns: usize,
    },

    #[error("Error in {id}")]
    PreconditionFailed {
        id: String,
        #[source]
        source: BatchError,
    },

    #[error("Failed to connect to {server}: {message}")]
    ConnectionError { server: String, message: String },

    #[error(transparent)]
    Unresolved(#[from] UnresolvedFailures),
}

/// A single batch rejected by the database engine.
///
/// `line` is 1-based and relative to the batch when the engine reports one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BatchError {
    pub message: String,
    pub line: Option<usize>,
}

impl BatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}

/// A script that failed, tagged with the identifier it was submitted under.
///
/// `line` is relative to the whole script (or data file), not the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    pub id: String,
    pub message: String,
    pub line: Option<usize>,
}

impl fmt::Display for ScriptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {}): {}", self.id, line, self.message),
            None => write!(f, "{}: {}", self.id, self.message),
        }
    }
}

/// Every script that was still failing once the apply loop stopped making progress.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedFailures {
    pub failures: Vec<ScriptFailure>,
}

impl fmt::Display for UnresolvedFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} script(s) could not be applied", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
