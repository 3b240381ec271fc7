use std::{path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the quickpaste engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Loading or saving the hotkey table failed.
    #[error("config error: {0}")]
    Config(#[from] quickpaste_config::Error),

    /// The OS refused a global hook for one chord.
    #[error("cannot register hotkey {combo}: {message}")]
    HookRegistration {
        /// Normalized combo that failed.
        combo: String,
        /// Platform error message.
        message: String,
    },

    /// A step in a binding being saved violates the data model.
    #[error("invalid action #{index}: {message}")]
    InvalidAction {
        /// Zero-based position in the sequence.
        index: usize,
        /// What is wrong with it.
        message: String,
    },

    /// Writing to the system clipboard failed.
    #[error("clipboard error: {0}")]
    Clipboard(String),

    /// Sending synthetic input failed.
    #[error("input error: {0}")]
    Input(String),

    /// An image step could not be read or decoded.
    #[error("image error at {}: {message}", .path.display())]
    Image {
        /// Image path from the step.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// A key step names a key combination that does not parse.
    #[error("invalid key spec: {0}")]
    KeySpec(#[from] keychord::Error),

    /// The executor thread could not be started.
    #[error("failed to start executor: {0}")]
    ExecutorStart(String),

    /// The engine has been shut down.
    #[error("engine is shut down")]
    ShutDown,
}
