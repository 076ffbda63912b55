#![forbid(unsafe_code)]

use std::sync::LazyLock;

use sblog_core::Config;
use sblog_runtime::StatusbarLog;

static GLOBAL: LazyLock<StatusbarLog> = LazyLock::new(|| {
    let config = Config::from_env();
    tracing::debug!(?config, "initialized process-wide statusbar log");
    StatusbarLog::new(config)
});

/// The process-wide instance, configured from the environment on first use.
///
/// ```
/// let log = sblog::global();
/// assert!(std::ptr::eq(log, sblog::global()));
/// ```
pub fn global() -> &'static StatusbarLog {
    &GLOBAL
}
