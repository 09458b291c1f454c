//! Unified error type for the audiopress conversion pipeline.
//!
//! Every failure a job can hit is classified into one of the variants below,
//! so callers can react programmatically (retry on [`Error::Input`], surface
//! [`Error::ProcessFailed`], abort startup on [`Error::Config`]).  API
//! callers can derive an HTTP status code via [`Error::http_status`].
//!
//! Scratch-area cleanup failures are deliberately *not* an error variant:
//! they are logged as warnings and never replace a job's primary outcome.

use std::fmt;

/// Unified error type covering all failure modes in audiopress.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Fatal startup problem: transcoder missing, zero capacity, bad config.
    ///
    /// Raised once at construction time, never per request.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The input payload is missing, malformed, or of an unsupported type.
    #[error("Input error: {0}")]
    Input(String),

    /// The OS refused to start the external process.
    #[error("Failed to start {tool}: {message}")]
    ProcessStart {
        /// Name of the tool that could not be started.
        tool: String,
        /// Human-readable spawn failure description.
        message: String,
    },

    /// The process ran but did not deliver a usable result: non-zero exit,
    /// or a zero exit that produced no readable target file.
    #[error("Conversion failed [{tool}]: {message}")]
    ProcessFailed {
        /// Name of the tool that failed.
        tool: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// Human-readable failure description (typically a stderr tail).
        message: String,
    },

    /// The job's cancellation signal fired before completion.
    #[error("Cancelled")]
    Cancelled,

    /// A filesystem operation failed while staging or collecting payloads.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for invariant breaches that should not happen.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Config(_) => 500,
            Error::Input(_) => 400,
            Error::ProcessStart { .. } => 502,
            Error::ProcessFailed { .. } => 502,
            // 499: client closed request (nginx convention).
            Error::Cancelled => 499,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Whether this error is the cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Convenience constructor for [`Error::Config`].
    pub fn config(message: impl fmt::Display) -> Self {
        Error::Config(message.to_string())
    }

    /// Convenience constructor for [`Error::Input`].
    pub fn input(message: impl fmt::Display) -> Self {
        Error::Input(message.to_string())
    }

    /// Convenience constructor for [`Error::ProcessStart`].
    pub fn process_start(tool: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::ProcessStart {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::ProcessFailed`].
    pub fn process_failed(
        tool: impl Into<String>,
        exit_code: Option<i32>,
        message: impl fmt::Display,
    ) -> Self {
        Error::ProcessFailed {
            tool: tool.into(),
            exit_code,
            message: message.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_display() {
        let err = Error::config("ffmpeg not found");
        assert_eq!(err.to_string(), "Configuration error: ffmpeg not found");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn input_display() {
        let err = Error::input("mime type 'audio/unknown' is not supported");
        assert_eq!(
            err.to_string(),
            "Input error: mime type 'audio/unknown' is not supported"
        );
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn process_start_display() {
        let err = Error::process_start("ffmpeg", "permission denied");
        assert_eq!(err.to_string(), "Failed to start ffmpeg: permission denied");
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn process_failed_display() {
        let err = Error::process_failed("ffmpeg", Some(1), "invalid data");
        assert_eq!(err.to_string(), "Conversion failed [ffmpeg]: invalid data");
        assert_eq!(err.http_status(), 502);
        match err {
            Error::ProcessFailed { exit_code, .. } => assert_eq!(exit_code, Some(1)),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn cancelled_display() {
        let err = Error::Cancelled;
        assert_eq!(err.to_string(), "Cancelled");
        assert_eq!(err.http_status(), 499);
        assert!(err.is_cancelled());
        assert!(!Error::input("x").is_cancelled());
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn internal_display() {
        let err = Error::Internal("semaphore closed".into());
        assert_eq!(err.to_string(), "Internal error: semaphore closed");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);
    }
}
