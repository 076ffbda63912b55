#![forbid(unsafe_code)]

//! Log levels.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Severity of a log line, ordered from quietest to noisiest.
///
/// A message is emitted when its level is not `Off` and is at most the
/// configured minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Off,
    Error,
    Warning,
    Info,
    #[default]
    Debug,
}

impl LogLevel {
    /// Word printed at the start of a log line.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Off => "",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }

    /// Whether a message at `self` passes a `threshold`.
    #[inline]
    #[must_use]
    pub fn passes(self, threshold: LogLevel) -> bool {
        self != Self::Off && threshold != Self::Off && self <= threshold
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("OFF"),
            other => f.write_str(other.prefix()),
        }
    }
}

/// Unrecognised level name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level '{0}'")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "err" | "error" => Ok(Self::Error),
            "wrn" | "warn" | "warning" => Ok(Self::Warning),
            "inf" | "info" => Ok(Self::Info),
            "dbg" | "debug" => Ok(Self::Debug),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}
