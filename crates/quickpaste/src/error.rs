use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Result alias for the quickpaste binary.
pub type Result<T> = StdResult<T, Error>;

/// Errors that stop the daemon or a subcommand.
#[derive(Error, Debug)]
pub enum Error {
    /// The OS hotkey manager could not be created.
    #[error("Failed to create hotkey manager: {0}")]
    HookManager(String),

    /// A thread or runtime could not be started.
    #[error("Failed to start {what}: {source}")]
    Startup {
        /// What was being started.
        what: &'static str,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Engine error.
    #[error(transparent)]
    Engine(#[from] quickpaste_engine::Error),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] quickpaste_config::Error),
}
