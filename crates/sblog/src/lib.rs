#![forbid(unsafe_code)]

//! sblog: log lines and progress bars on the same terminal.
//!
//! Bars are drawn on rows above the cursor and redrawn in place; log lines
//! are written above them and the bars are redrawn underneath, so neither
//! corrupts the other.
//!
//! # Quick start
//!
//! ```
//! use sblog::prelude::*;
//! use sblog_harness::SharedBuffer;
//!
//! let log = StatusbarLog::new(Config::default());
//! let out = SharedBuffer::new();
//! let mut sink = SinkHandle::default();
//! log.create_stream_sink(&mut sink, WrappedStream::new(out.clone()))?;
//!
//! let mut bars = StatusbarHandle::default();
//! log.create_statusbar(&mut bars, sink, &[BarSpec::new(1, 10).prefix("copy ")])?;
//! for step in 1..=4 {
//!     log.update_statusbar(&bars, 0, f64::from(step) * 25.0)?;
//! }
//! sblog::log_info!(&log, "main", sink, "copied {} files", 4)?;
//! log.destroy_statusbar(&mut bars)?;
//!
//! assert!(out.render(40, 5).full_text().contains("INFO [main]: copied 4 files"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Crates
//!
//! - [`sblog_core`] - handles, slot registries, [`Config`], [`LogLevel`]
//! - [`render`] - sanitizer, cursor sequences, bar lines
//! - [`sblog_runtime`] - sinks, statusbars and [`StatusbarLog`]

#[cfg(feature = "global")]
mod global;

#[cfg(feature = "global")]
pub use global::global;

pub use sblog_core::{
    Config, Handle, HandleError, LogLevel, ParseLevelError, SinkHandle, StatusbarHandle,
};
pub use sblog_render as render;
pub use sblog_runtime::{
    BarLayout, BarSpec, BarState, ColumnProbe, FixedColumns, LogError, LogResult, NoColumns,
    SinkError, SinkRegistry, SinkResult, SinkType, StatusbarError, StatusbarLog,
    StatusbarLogBuilder, StatusbarRegistry, StatusbarResult, TtyProbe, WidthError,
    WrappedStream,
};

/// Everything needed to log and draw bars.
pub mod prelude {
    pub use crate::{
        BarLayout, BarSpec, Config, LogLevel, SinkHandle, StatusbarHandle, StatusbarLog,
        WrappedStream,
    };
}

/// Log at `level` through `ctx`, skipping argument evaluation when the
/// level is filtered out.
///
/// `log!(ctx, level, tag, sink, "fmt", args...)` returns
/// [`LogResult<()>`](LogResult).
#[macro_export]
macro_rules! log {
    ($ctx:expr, $level:expr, $tag:expr, $sink:expr, $($arg:tt)+) => {{
        let ctx: &$crate::StatusbarLog = $ctx;
        let level: $crate::LogLevel = $level;
        if ctx.enabled(level) {
            ctx.log(level, $tag, $sink, ::std::format_args!($($arg)+))
        } else {
            $crate::LogResult::Ok(())
        }
    }};
}

/// [`log!`] at [`LogLevel::Error`].
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $tag:expr, $sink:expr, $($arg:tt)+) => {
        $crate::log!($ctx, $crate::LogLevel::Error, $tag, $sink, $($arg)+)
    };
}

/// [`log!`] at [`LogLevel::Warning`].
#[macro_export]
macro_rules! log_warning {
    ($ctx:expr, $tag:expr, $sink:expr, $($arg:tt)+) => {
        $crate::log!($ctx, $crate::LogLevel::Warning, $tag, $sink, $($arg)+)
    };
}

/// [`log!`] at [`LogLevel::Info`].
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $tag:expr, $sink:expr, $($arg:tt)+) => {
        $crate::log!($ctx, $crate::LogLevel::Info, $tag, $sink, $($arg)+)
    };
}

/// [`log!`] at [`LogLevel::Debug`].
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $tag:expr, $sink:expr, $($arg:tt)+) => {
        $crate::log!($ctx, $crate::LogLevel::Debug, $tag, $sink, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use sblog_harness::SharedBuffer;
    use std::cell::Cell;

    fn setup(config: Config) -> (StatusbarLog, SinkHandle, SharedBuffer) {
        let log = StatusbarLog::new(config);
        let out = SharedBuffer::new();
        let mut sink = SinkHandle::default();
        log.create_stream_sink(&mut sink, WrappedStream::new(out.clone()))
            .unwrap();
        (log, sink, out)
    }

    #[test]
    fn level_macros_write_prefixed_lines() {
        let (log, sink, out) = setup(Config::default());
        crate::log_error!(&log, "t", sink, "e{}", 1).unwrap();
        crate::log_warning!(&log, "t", sink, "w").unwrap();
        crate::log_info!(&log, "t", sink, "i").unwrap();
        crate::log_debug!(&log, "t", sink, "d {x}", x = 4).unwrap();
        assert_eq!(
            out.text(),
            "ERROR [t]: e1\nWARNING [t]: w\nINFO [t]: i\nDEBUG [t]: d 4\n"
        );
    }

    #[test]
    fn filtered_level_skips_arguments() {
        let (log, sink, out) = setup(Config::default().with_min_level(LogLevel::Warning));
        let evaluated = Cell::new(0);
        let expensive = || {
            evaluated.set(evaluated.get() + 1);
            "value"
        };
        crate::log_debug!(&log, "t", sink, "{}", expensive()).unwrap();
        crate::log_info!(&log, "t", sink, "{}", expensive()).unwrap();
        assert_eq!(evaluated.get(), 0);
        crate::log_warning!(&log, "t", sink, "{}", expensive()).unwrap();
        assert_eq!(evaluated.get(), 1);
        assert_eq!(out.text(), "WARNING [t]: value\n");
    }

    #[test]
    fn generic_macro_takes_runtime_level() {
        let (log, sink, out) = setup(Config::default());
        for level in [LogLevel::Off, LogLevel::Info] {
            crate::log!(&log, level, "t", sink, "at {level}").unwrap();
        }
        assert_eq!(out.text(), "INFO [t]: at INFO\n");
    }

    #[test]
    fn macro_reports_invalid_sink() {
        let (log, _sink, _out) = setup(Config::default());
        assert!(matches!(
            crate::log_error!(&log, "t", SinkHandle::default(), "x"),
            Err(crate::LogError::InvalidSink(_))
        ));
    }
}
