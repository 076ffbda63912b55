#![forbid(unsafe_code)]

//! Handle-addressed table of live sinks.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sblog_core::{GenerationCounter, HandleError, SinkHandle, SlotTable};
use sblog_render::CursorOp;

use super::{Sink, SinkType, WrappedStream};
use crate::error::{SinkError, SinkResult};

/// Registry of sinks.
///
/// Sinks are stored behind `Arc` so an operation can release the registry
/// lock and keep using the sink under the sink's own lock. A sink destroyed
/// meanwhile reports [`SinkType::Invalid`] and refuses writes.
#[derive(Debug)]
pub struct SinkRegistry {
    slots: Mutex<SlotTable<Arc<Sink>>>,
    ids: GenerationCounter,
}

impl SinkRegistry {
    pub fn new(max_sinks: usize) -> Self {
        Self {
            slots: Mutex::new(SlotTable::new(max_sinks)),
            ids: GenerationCounter::new(),
        }
    }

    fn table(&self) -> MutexGuard<'_, SlotTable<Arc<Sink>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `handle` to the process's standard output.
    pub fn create_stdout(&self, handle: &mut SinkHandle) -> SinkResult<()> {
        self.bind(handle, || Ok(Sink::stdout()))
    }

    /// Bind `handle` to `path`, opened for appending and created if missing.
    pub fn create_file(&self, handle: &mut SinkHandle, path: impl AsRef<Path>) -> SinkResult<()> {
        let path = path.as_ref();
        self.bind(handle, || Sink::open_file(path))
    }

    /// Bind `handle` to a caller-provided writer.
    pub fn create_stream(&self, handle: &mut SinkHandle, stream: WrappedStream) -> SinkResult<()> {
        self.bind(handle, || Ok(Sink::stream(stream)))
    }

    fn bind(
        &self,
        handle: &mut SinkHandle,
        open: impl FnOnce() -> SinkResult<Sink>,
    ) -> SinkResult<()> {
        self.check_bindable(&self.table(), handle)?;
        // Opening a file can block; do it without holding the table.
        let sink = Arc::new(open()?);

        let mut table = self.table();
        self.check_bindable(&table, handle)?;
        let issued = table
            .insert(&self.ids, sink)
            .map_err(|full| SinkError::CapacityExceeded { max: full.capacity })?;
        *handle = issued;
        Ok(())
    }

    fn check_bindable(
        &self,
        table: &SlotTable<Arc<Sink>>,
        handle: &SinkHandle,
    ) -> SinkResult<()> {
        if table.validate(handle).is_ok() {
            return Err(SinkError::AlreadyBound);
        }
        if table.is_full() {
            return Err(SinkError::CapacityExceeded {
                max: table.capacity(),
            });
        }
        Ok(())
    }

    pub fn validate(&self, handle: &SinkHandle) -> Result<(), HandleError> {
        self.table().validate(handle)
    }

    /// [`validate`](Self::validate), warning about the failure.
    pub fn validate_verbose(&self, handle: &SinkHandle) -> Result<(), HandleError> {
        self.table().validate_verbose(handle)
    }

    /// The sink behind `handle`.
    pub fn resolve(&self, handle: &SinkHandle) -> SinkResult<Arc<Sink>> {
        Ok(Arc::clone(self.table().get(handle)?))
    }

    /// [`resolve`](Self::resolve), warning about an invalid handle.
    pub fn resolve_verbose(&self, handle: &SinkHandle) -> SinkResult<Arc<Sink>> {
        let table = self.table();
        table.validate_verbose(handle)?;
        Ok(Arc::clone(table.get(handle)?))
    }

    /// Write all of `bytes` to the sink, returning the count written.
    pub fn write(&self, handle: &SinkHandle, bytes: &[u8]) -> SinkResult<usize> {
        self.resolve(handle)?.write(bytes)
    }

    pub fn flush(&self, handle: &SinkHandle) -> SinkResult<()> {
        self.resolve(handle)?.flush()
    }

    /// Move the cursor `n` rows: positive is up, negative is down.
    pub fn move_cursor(&self, handle: &SinkHandle, n: i64) -> SinkResult<()> {
        self.resolve(handle)?.lock().move_cursor(n)
    }

    pub fn cursor(&self, handle: &SinkHandle, op: CursorOp) -> SinkResult<()> {
        self.resolve(handle)?.lock().cursor(op)
    }

    pub fn save_cursor(&self, handle: &SinkHandle) -> SinkResult<()> {
        self.cursor(handle, CursorOp::SaveCursor)
    }

    pub fn restore_cursor(&self, handle: &SinkHandle) -> SinkResult<()> {
        self.cursor(handle, CursorOp::RestoreCursor)
    }

    pub fn clear_to_end_of_line(&self, handle: &SinkHandle) -> SinkResult<()> {
        self.cursor(handle, CursorOp::ClearToEnd)
    }

    pub fn clear_from_start_of_line(&self, handle: &SinkHandle) -> SinkResult<()> {
        self.cursor(handle, CursorOp::ClearFromStart)
    }

    pub fn clear_line(&self, handle: &SinkHandle) -> SinkResult<()> {
        self.cursor(handle, CursorOp::ClearLine)
    }

    pub fn clear_current_line(&self, handle: &SinkHandle) -> SinkResult<()> {
        self.cursor(handle, CursorOp::ClearCurrentLine)
    }

    pub fn is_tty(&self, handle: &SinkHandle) -> SinkResult<bool> {
        Ok(self.resolve(handle)?.lock().is_tty())
    }

    /// Destination type, or [`SinkType::Invalid`] for a handle that does not
    /// validate.
    pub fn sink_type(&self, handle: &SinkHandle) -> SinkType {
        self.resolve(handle)
            .map_or(SinkType::Invalid, |sink| sink.sink_type())
    }

    /// Flush and release the sink, recycle its slot and invalidate `handle`.
    pub fn destroy(&self, handle: &mut SinkHandle) -> SinkResult<()> {
        let sink = self.resolve_verbose(handle)?;
        let mut guard = sink.lock();
        self.table().remove(handle)?;
        let closed = guard.close();
        tracing::debug!(sink = %handle, "sink destroyed");
        closed
    }

    /// Number of live sinks.
    pub fn live(&self) -> usize {
        self.table().live()
    }
}
