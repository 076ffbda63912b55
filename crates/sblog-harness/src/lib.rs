#![forbid(unsafe_code)]

//! Test support for sblog.
//!
//! - [`TerminalModel`] interprets emitted bytes as a terminal would.
//! - [`SharedBuffer`] is a cloneable in-memory writer for wrapped-stream sinks.
//! - [`FailingWriter`] accepts a fixed number of bytes and then errors.

pub mod capture;
pub mod terminal_model;

pub use capture::{FailingWriter, SharedBuffer, strip_ansi};
pub use terminal_model::TerminalModel;
