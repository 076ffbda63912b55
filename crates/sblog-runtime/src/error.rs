#![forbid(unsafe_code)]

//! Error types for sink, statusbar and log operations.

use std::io;
use std::path::PathBuf;

use sblog_core::HandleError;
use thiserror::Error;

/// Failure of a sink operation.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid sink handle: {0}")]
    InvalidHandle(#[from] HandleError),

    #[error("sink handle is already bound to a live sink")]
    AlreadyBound,

    #[error("sink registry is full ({max} live sinks)")]
    CapacityExceeded { max: usize },

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("sink I/O error: {0}")]
    Io(#[from] io::Error),

    /// A wrapped stream failed earlier and refuses further writes.
    #[error("wrapped stream is in a failed state")]
    StreamFailed,

    /// The sink was destroyed while the caller still held it.
    #[error("sink has been closed")]
    Closed,
}

impl SinkError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a statusbar operation.
#[derive(Debug, Error)]
pub enum StatusbarError {
    #[error("invalid statusbar handle: {0}")]
    InvalidHandle(HandleError),

    #[error("statusbar handle is already bound to a live statusbar")]
    AlreadyBound,

    #[error(
        "bar description lengths differ: {positions} positions, {widths} widths, \
         {prefixes} prefixes, {postfixes} postfixes"
    )]
    SizeMismatch {
        positions: usize,
        widths: usize,
        prefixes: usize,
        postfixes: usize,
    },

    #[error("bar {index} is on row {position}, outside 1..={max}")]
    InvalidPosition { index: usize, position: u32, max: u32 },

    #[error("statusbar registry is full ({max} live statusbars)")]
    CapacityExceeded { max: usize },

    #[error("statusbar sink is invalid: {0}")]
    InvalidSink(HandleError),

    #[error("percentage {0} is outside 0..=100")]
    InvalidPercentage(f64),

    #[error("bar index {index} out of bounds (statusbar has {len} bars)")]
    BarIndexOutOfBounds { index: usize, len: usize },

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl StatusbarError {
    /// Whether the failure concerns handle validity rather than the request.
    #[must_use]
    pub fn is_validity(&self) -> bool {
        matches!(self, Self::InvalidHandle(_) | Self::InvalidSink(_))
    }
}

/// Why the terminal width could not be determined.
#[derive(Debug, Error)]
pub enum WidthError {
    #[error("sink has no terminal descriptor")]
    NoDescriptor,

    #[error("terminal width query failed: {0}")]
    Query(#[source] io::Error),
}

/// Failure of a log call.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log sink: {0}")]
    InvalidSink(HandleError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Bars were redrawn assuming 80 columns.
    #[error(transparent)]
    TerminalWidth(#[from] WidthError),
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;
pub type StatusbarResult<T> = std::result::Result<T, StatusbarError>;
pub type LogResult<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_error_names_path() {
        let err = SinkError::open(
            "/nope/log.txt",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "failed to open /nope/log.txt: missing");
    }

    #[test]
    fn size_mismatch_lists_lengths() {
        let err = StatusbarError::SizeMismatch {
            positions: 2,
            widths: 2,
            prefixes: 1,
            postfixes: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("2 positions"));
        assert!(msg.contains("1 prefixes"));
    }

    #[test]
    fn handle_errors_convert() {
        let err: SinkError = HandleError::InvalidFlag.into();
        assert!(matches!(err, SinkError::InvalidHandle(HandleError::InvalidFlag)));
        assert_eq!(err.to_string(), "invalid sink handle: handle is marked invalid");
    }

    #[test]
    fn validity_classification() {
        assert!(StatusbarError::InvalidHandle(HandleError::ZeroId).is_validity());
        assert!(StatusbarError::InvalidSink(HandleError::InvalidFlag).is_validity());
        assert!(!StatusbarError::InvalidPercentage(101.0).is_validity());
        assert!(!StatusbarError::Sink(SinkError::Closed).is_validity());
    }

    #[test]
    fn log_error_wraps_width() {
        let err: LogError = WidthError::NoDescriptor.into();
        assert_eq!(err.to_string(), "sink has no terminal descriptor");
    }
}
