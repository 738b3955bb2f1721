/*!
Error type shared by the descriptors and the batch driver.
 */
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// Invalid settings, detected before any work starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("{0}: features requested before a successful run")]
    NotCalculated(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{descriptor}: degenerate input: {reason}")]
    DegenerateInput {
        descriptor: &'static str,
        reason: String,
    },

    #[error("{descriptor} does not support {format} images")]
    Unsupported {
        descriptor: &'static str,
        format: String,
    },

    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("row for {file} has {got} values, header has {expected}")]
    RowLength {
        file: String,
        expected: usize,
        got: usize,
    },

    #[error("worker pool did not shut down: {0}")]
    Shutdown(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
