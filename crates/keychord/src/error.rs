//! Error types and result alias for the keychord crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced while parsing a key combination.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The spec contained no tokens at all.
    #[error("empty key combination")]
    Empty,
    /// The spec only named modifiers.
    #[error("key combination '{0}' has no non-modifier key")]
    MissingKey(String),
}
