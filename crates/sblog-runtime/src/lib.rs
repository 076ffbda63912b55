#![forbid(unsafe_code)]

//! sblog runtime
//!
//! Sinks, statusbars, and the coordinator that interleaves log lines with
//! bars redrawn in place.
//!
//! # Key Components
//!
//! - [`StatusbarLog`] - owns both registries; logs, creates, updates and destroys
//! - [`SinkRegistry`] - stdout, owned-file and wrapped-stream sinks behind handles
//! - [`StatusbarRegistry`] - statusbar records and their bar state
//! - [`ColumnProbe`] - terminal width source for interactive sinks

pub mod error;
pub mod sink;
pub mod statusbar;
pub mod statusbar_log;
pub mod width;

pub use error::{
    LogError, LogResult, SinkError, SinkResult, StatusbarError, StatusbarResult, WidthError,
};
pub use sink::{Sink, SinkGuard, SinkRegistry, SinkType, WrappedStream};
pub use statusbar::{BarLayout, BarSpec, BarState, StatusbarRegistry};
pub use statusbar_log::{INTERNAL_TAG, StatusbarLog, StatusbarLogBuilder};
pub use width::{ColumnProbe, FixedColumns, NoColumns, TtyProbe};
