//! Error types for terminal interaction and shell execution.

use std::io;

/// Errors raised by console helpers.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Writing to or reading from the terminal failed.
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The command could not be started.
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// An argv-form command had no program.
    #[error("No program given.")]
    EmptyCommand,

    /// The user cancelled an interactive menu.
    #[error("Selection cancelled by user.")]
    Cancelled,
}
