//! Error types for webacquire.
//!
//! Library crates use [`AcquireError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Failure of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The backend for this strategy is missing or could not be started
    /// (no browser executable, WebDriver endpoint down, extractor tools absent).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend ran but the attempt failed (timeout, non-2xx, refused connection, ...).
    #[error("{0}")]
    Failed(String),
}

impl FetchError {
    /// Create a `Failed` error from any displayable message.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Create an `Unavailable` error from any displayable message.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether the caller should substitute another strategy instead of retrying this one.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Top-level error type for all webacquire operations.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// Malformed or disallowed input URL. Never retried.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A single fetch attempt failed.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Every attempt for one URL failed; carries the last underlying error.
    #[error("all {attempts} attempts failed; last error: {last}")]
    ExhaustedRetries {
        attempts: u32,
        last: Box<AcquireError>,
    },

    /// A fetched document could not be turned into structured content.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AcquireError>;

impl AcquireError {
    /// Create an invalid-URL error from any displayable message.
    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
