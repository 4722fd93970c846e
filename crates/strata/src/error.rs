//! Error and Result types for store operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A convenience `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The format string was empty.
    #[error("format string is empty")]
    EmptyFormat,

    /// The format string contained a code outside the closed type set.
    #[error("unknown format code: {0:?}")]
    UnknownFormatCode(char),

    /// A record did not match the declared format (arity, type, or length).
    #[error("record does not match format: {0}")]
    RecordMismatch(String),

    /// A logged timestamp preceded the previous one. The record was not
    /// written; the caller may retry with a corrected clock.
    #[error("timestamp {timestamp} precedes previous timestamp {previous}")]
    TimeOrder {
        /// Timestamp the clock produced for this write.
        timestamp: i32,
        /// Timestamp of the last successful write.
        previous: i32,
    },

    /// A queried time preceded the database's recorded start time.
    #[error("time {time} precedes database start time {start}")]
    BeforeStart {
        /// The queried time.
        time: i32,
        /// The database's recorded start time.
        start: i32,
    },

    /// A filtered query named a field that does not exist.
    #[error("unknown field name: {0}")]
    UnknownField(String),

    /// Create was requested at a root that already holds a database.
    #[error("database already exists at {0}")]
    DatabaseExists(PathBuf),

    /// Resume was requested but the metadata or checkpoint is missing or
    /// malformed.
    #[error("cannot reopen database: {0}")]
    Reopen(String),

    /// Underlying I/O error on any on-disk artifact.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
