use std::path::PathBuf;

use thiserror::Error;

use crate::check::VectorMismatch;

/// Errors that can occur while loading, generating or checking vectors.
#[derive(Error, Debug)]
pub enum VectorError {
    /// I/O error while reading or writing a fixture file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Fixture file is not valid JSON or does not match the vector model.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Published fixture files are never overwritten.
    #[error("refusing to overwrite existing vector file {0}")]
    AlreadyExists(PathBuf),
    /// An identifier does not match its required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Identifier type.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// The vector input cannot be evaluated at all.
    #[error("malformed vector input: {0}")]
    MalformedInput(String),
    /// The set breaks an immutability or supersession rule.
    #[error("invalid vector set: {0}")]
    InvalidSet(String),
    /// A vector did not reproduce.
    #[error("vector {id} failed: {mismatch}")]
    Mismatch {
        /// Vector that failed.
        id: String,
        /// How it diverged.
        mismatch: VectorMismatch,
    },
}
