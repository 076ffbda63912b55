#![forbid(unsafe_code)]

//! Terminal width queries.

use crate::error::WidthError;
use crate::sink::SinkGuard;

/// Source of the terminal width for interactive sinks.
pub trait ColumnProbe: Send + Sync {
    fn columns(&self, sink: &SinkGuard<'_>) -> Result<u16, WidthError>;
}

/// Asks the sink's terminal descriptor (`TIOCGWINSZ`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TtyProbe;

impl ColumnProbe for TtyProbe {
    fn columns(&self, sink: &SinkGuard<'_>) -> Result<u16, WidthError> {
        sink.descriptor_columns()
    }
}

/// Always reports the same width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedColumns(pub u16);

impl ColumnProbe for FixedColumns {
    fn columns(&self, _sink: &SinkGuard<'_>) -> Result<u16, WidthError> {
        Ok(self.0)
    }
}

/// Always fails, as a sink without a descriptor would.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoColumns;

impl ColumnProbe for NoColumns {
    fn columns(&self, _sink: &SinkGuard<'_>) -> Result<u16, WidthError> {
        Err(WidthError::NoDescriptor)
    }
}
