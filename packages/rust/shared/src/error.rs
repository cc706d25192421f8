//! Error types for chatmark.
//!
//! Library crates use [`ChatmarkError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Boxed cause carried by [`ChatmarkError::Processing`].
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all chatmark operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatmarkError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A domain value violated its construction invariant.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The parse/render step failed. Carries the original cause.
    #[error("markdown processing failed: {message}")]
    Processing {
        message: String,
        #[source]
        source: BoxedCause,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ChatmarkError>;

impl ChatmarkError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

    /// Wrap a parse/render failure, keeping the original cause.
    pub fn processing(msg: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        Self::Processing {
            message: msg.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ChatmarkError::config("cache capacity must be positive");
        assert_eq!(err.to_string(), "config error: cache capacity must be positive");

        let err = ChatmarkError::validation("enrichment content must not be blank");
        assert!(err.to_string().contains("must not be blank"));
    }

    #[test]
    fn processing_error_keeps_cause() {
        let cause = std::io::Error::other("formatter exploded");
        let err = ChatmarkError::processing("render failed", cause);

        assert_eq!(err.to_string(), "markdown processing failed: render failed");
        let source = err.source().expect("cause is preserved");
        assert_eq!(source.to_string(), "formatter exploded");
    }
}
