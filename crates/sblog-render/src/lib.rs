#![forbid(unsafe_code)]

//! Text that goes to the terminal: sanitized input, cursor control
//! sequences, and formatted bar lines.
//!
//! - [`sanitize`] - strip escapes, replace control characters, cap lengths
//! - [`ansi`] - [`CursorOp`] and its byte encoding
//! - [`bar`] - bar-line formatting and fitting to the terminal width

pub mod ansi;
pub mod bar;
pub mod sanitize;

pub use ansi::CursorOp;
pub use bar::{BarLine, FALLBACK_COLUMNS, RenderStatus, SPINNER, Viewport, fill_cells, fit};
pub use sanitize::{cap_len, clean_line, clean_multiline, sanitize_line, sanitize_multiline};
