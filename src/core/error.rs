//! Error types for the core module.

use std::process::ExitStatus;

/// Core error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The version-control command ran but reported failure.
    #[error("command `{command}` failed with {status}")]
    GitExit {
        /// The command line that was run.
        command: String,
        /// Exit status reported by the process.
        status: ExitStatus,
    },

    /// The version-control command produced unusable output.
    #[error("invalid output from `{command}`: {reason}")]
    InvalidOutput {
        /// The command line that was run.
        command: String,
        /// What was wrong with the output.
        reason: String,
    },

    /// The branch source answered with nothing but whitespace.
    #[error("branch name is empty")]
    EmptyBranch,

    /// File watcher error.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// The watcher channel closed underneath the session.
    #[error("watcher channel disconnected")]
    WatcherDisconnected,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
