#![forbid(unsafe_code)]

//! Limits and toggles consumed by the registries and the log façade.
//!
//! # Example
//!
//! ```
//! use sblog_core::{Config, LogLevel};
//!
//! let config = Config::default()
//!     .with_min_level(LogLevel::Info)
//!     .with_max_statusbars(4);
//! assert_eq!(config.max_statusbars, 4);
//! assert!(config.auto_flush);
//! ```

use crate::level::LogLevel;

/// Environment variable holding the minimum log level.
pub const ENV_LEVEL: &str = "SBLOG_LEVEL";

/// Environment variable that, when set, disables flushing after each
/// cursor operation.
pub const ENV_NO_AUTO_FLUSH: &str = "SBLOG_NO_AUTO_FLUSH";

/// Registry and formatting limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Messages noisier than this are dropped before formatting.
    pub min_level: LogLevel,
    /// Maximum number of live sinks.
    pub max_sinks: usize,
    /// Maximum number of live statusbars.
    pub max_statusbars: usize,
    /// Maximum tag length in bytes (longer tags end in `...`).
    pub max_tag_len: usize,
    /// Maximum bar prefix length in bytes.
    pub max_prefix_len: usize,
    /// Maximum bar postfix length in bytes.
    pub max_postfix_len: usize,
    /// Maximum formatted message length in bytes.
    pub max_message_len: usize,
    /// Maximum bar width in cells.
    pub max_bar_width: usize,
    /// Highest bar row above the cursor; rows start at 1.
    pub max_bar_row: u32,
    /// Flush the sink after every cursor movement and bar draw.
    pub auto_flush: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Debug,
            max_sinks: 16,
            max_statusbars: 32,
            max_tag_len: 64,
            max_prefix_len: 256,
            max_postfix_len: 256,
            max_message_len: 4096,
            max_bar_width: 256,
            max_bar_row: 256,
            auto_flush: true,
        }
    }
}

impl Config {
    /// Defaults overlaid with `SBLOG_LEVEL` and `SBLOG_NO_AUTO_FLUSH`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`. Unparseable levels are
    /// ignored with a warning.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_LEVEL) {
            match raw.parse() {
                Ok(level) => config.min_level = level,
                Err(err) => tracing::warn!(%err, "ignoring {ENV_LEVEL}"),
            }
        }
        if lookup(ENV_NO_AUTO_FLUSH).is_some() {
            config.auto_flush = false;
        }
        config
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use]
    pub fn with_max_sinks(mut self, max: usize) -> Self {
        self.max_sinks = max;
        self
    }

    #[must_use]
    pub fn with_max_statusbars(mut self, max: usize) -> Self {
        self.max_statusbars = max;
        self
    }

    #[must_use]
    pub fn with_max_tag_len(mut self, max: usize) -> Self {
        self.max_tag_len = max;
        self
    }

    #[must_use]
    pub fn with_max_prefix_len(mut self, max: usize) -> Self {
        self.max_prefix_len = max;
        self
    }

    #[must_use]
    pub fn with_max_postfix_len(mut self, max: usize) -> Self {
        self.max_postfix_len = max;
        self
    }

    #[must_use]
    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }

    #[must_use]
    pub fn with_max_bar_width(mut self, max: usize) -> Self {
        self.max_bar_width = max;
        self
    }

    #[must_use]
    pub fn with_max_bar_row(mut self, max: u32) -> Self {
        self.max_bar_row = max;
        self
    }

    #[must_use]
    pub fn with_auto_flush(mut self, on: bool) -> Self {
        self.auto_flush = on;
        self
    }

    /// Whether a message at `level` would be emitted.
    #[inline]
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level.passes(self.min_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.min_level, LogLevel::Debug);
        assert_eq!(c.max_prefix_len, 256);
        assert!(c.auto_flush);
        assert!(c.enabled(LogLevel::Debug));
    }

    #[test]
    fn env_overrides_level_and_flush() {
        let c = Config::from_lookup(lookup(&[
            (ENV_LEVEL, "warning"),
            (ENV_NO_AUTO_FLUSH, "1"),
        ]));
        assert_eq!(c.min_level, LogLevel::Warning);
        assert!(!c.auto_flush);
        assert!(c.enabled(LogLevel::Error));
        assert!(!c.enabled(LogLevel::Info));
    }

    #[test]
    fn bad_level_keeps_default() {
        let c = Config::from_lookup(lookup(&[(ENV_LEVEL, "shouty")]));
        assert_eq!(c.min_level, LogLevel::Debug);
    }

    #[test]
    fn builder_chain() {
        let c = Config::default()
            .with_max_sinks(1)
            .with_max_tag_len(8)
            .with_max_postfix_len(9)
            .with_max_message_len(10)
            .with_max_bar_width(11)
            .with_max_prefix_len(12)
            .with_max_bar_row(13)
            .with_auto_flush(false)
            .with_min_level(LogLevel::Off);
        assert_eq!(
            (c.max_sinks, c.max_tag_len, c.max_postfix_len, c.max_message_len),
            (1, 8, 9, 10)
        );
        assert_eq!((c.max_bar_width, c.max_prefix_len), (11, 12));
        assert_eq!(c.max_bar_row, 13);
        assert!(!c.auto_flush);
        assert!(!c.enabled(LogLevel::Error));
    }
}
