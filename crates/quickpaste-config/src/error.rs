//! Error types for loading, saving and validating the hotkey table.

use std::{path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the config crate.
pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
/// Errors produced while reading, writing or validating the hotkey table.
pub enum Error {
    #[error("read error at {}: {message}", .path.display())]
    /// The config file exists but could not be read.
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },
    #[error("config parse error at {}:{line}:{col}: {message}", .path.display())]
    /// The config document is not a JSON object.
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        col: usize,
        /// Human-readable error message.
        message: String,
    },
    #[error("write error at {}: {message}", .path.display())]
    /// The table could not be serialized or written.
    Write {
        /// Destination path.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },
    #[error("image import failed for {}: {message}", .path.display())]
    /// An image file could not be copied into the managed directory.
    Image {
        /// Source image path.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },
    #[error("invalid hotkey entry: {0}")]
    /// A single entry did not match any known schema.
    Entry(String),
    #[error("invalid action #{index}: {message}")]
    /// An action violates the data model invariants.
    InvalidAction {
        /// Zero-based position in the sequence.
        index: usize,
        /// What is wrong with it.
        message: String,
    },
}
