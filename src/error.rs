use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a test case while it moves through its lifecycle.
#[derive(Error, Debug)]
pub enum CaseError {
    #[error("{case}: {operation} called while {state}")]
    Lifecycle {
        case: String,
        operation: &'static str,
        state: &'static str,
    },

    #[error("build step `{step}` failed (exit {exit_code:?}): {stderr}")]
    ExternalBuildFailed {
        step: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("test binary {} failed (exit {exit_code:?}): {stderr}", .binary.display())]
    ExternalTestFailed {
        binary: PathBuf,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sql(#[from] SqlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the SQL-assertion helper and its cursors.
#[derive(Error, Debug)]
pub enum SqlError {
    #[error("sql helper is not initialized")]
    NotInitialized,

    #[error("cursor is closed")]
    CursorClosed,

    #[error("`{sql}` rejected: {message}")]
    Rejected { sql: String, message: String },

    #[error("`{sql}` expected to fail but succeeded")]
    UnexpectedSuccess { sql: String },

    #[error("assertion failed on `{sql}`: {message}")]
    Assertion { sql: String, message: String },

    #[error("failed to run sql client {client}: {source}")]
    Client {
        client: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from case registration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{file} is already registered for {platform}")]
    Duplicate { file: String, platform: String },
}
