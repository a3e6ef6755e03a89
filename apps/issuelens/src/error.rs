//! Error taxonomy. Every variant is recoverable: a refresh turns these into
//! user-visible notices and carries on.

use std::path::PathBuf;

/// Server configuration could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read configuration file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {} is not valid JSON: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration is missing required field '{field}'")]
    MissingField { field: &'static str },
}

/// The remote branch of a refresh failed outright.
#[derive(Debug, thiserror::Error)]
pub enum RemoteFetchError {
    #[error("issue search request failed: {0}")]
    Request(String),

    #[error("issue search response was malformed: {0}")]
    Decode(String),

    #[error("invalid authorization header: {0}")]
    InvalidHeader(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// The lint engine could not run.
#[derive(Debug, thiserror::Error)]
pub enum LocalAnalysisError {
    #[error("failed to start lint engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("lint engine exited with status {status}: {stderr}")]
    Engine { status: i32, stderr: String },

    #[error("lint engine output was not a valid report: {0}")]
    Decode(String),
}

/// An issue could not be opened in the editor.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("file no longer exists: {}", path.display())]
    FileMissing { path: PathBuf },

    #[error("line {line} is past the end of {} ({lines} lines)", path.display())]
    LineOutOfRange { path: PathBuf, line: u32, lines: usize },
}

/// Persisted severity selection could not be written.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings could not be encoded: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    UnknownSeverity(String),
}
