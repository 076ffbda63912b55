#![forbid(unsafe_code)]

//! The log/update coordinator.
//!
//! [`StatusbarLog`] owns a sink registry and a statusbar registry and is the
//! only place that draws. Every screen change takes the target sink's lock
//! first and the statusbar registry lock second, so a log line and a bar
//! redraw on the same sink never interleave.
//!
//! # Example
//!
//! ```
//! use sblog_core::{Config, LogLevel, SinkHandle, StatusbarHandle};
//! use sblog_harness::SharedBuffer;
//! use sblog_runtime::{BarSpec, StatusbarLog, WrappedStream};
//!
//! let log = StatusbarLog::new(Config::default());
//! let out = SharedBuffer::new();
//! let mut sink = SinkHandle::default();
//! log.create_stream_sink(&mut sink, WrappedStream::new(out.clone())).unwrap();
//!
//! let mut bar = StatusbarHandle::default();
//! log.create_statusbar(&mut bar, sink, &[BarSpec::new(1, 10).prefix("copy ")]).unwrap();
//! log.update_statusbar(&bar, 0, 50.0).unwrap();
//! log.log(LogLevel::Info, "main", sink, format_args!("halfway")).unwrap();
//!
//! let screen = out.render(60, 10);
//! assert!(screen.full_text().contains("INFO [main]: halfway"));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use sblog_core::{Config, LogLevel, SinkHandle, StatusbarHandle};
use sblog_render::{CursorOp, RenderStatus, Viewport, clean_line, clean_multiline, fit};

use crate::error::{
    LogError, LogResult, SinkError, SinkResult, StatusbarError, StatusbarResult,
};
use crate::sink::{Sink, SinkGuard, SinkRegistry, SinkType, WrappedStream};
use crate::statusbar::{BarLayout, BarSpec, BarState, Statusbar, StatusbarRegistry, bars_on};
use crate::width::{ColumnProbe, TtyProbe};

/// Tag used for the coordinator's own log lines.
pub const INTERNAL_TAG: &str = "sblog";

/// Builder for [`StatusbarLog`].
pub struct StatusbarLogBuilder {
    config: Config,
    probe: Box<dyn ColumnProbe>,
}

impl StatusbarLogBuilder {
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replace the terminal width source.
    #[must_use]
    pub fn probe(mut self, probe: impl ColumnProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn build(self) -> StatusbarLog {
        StatusbarLog {
            sinks: SinkRegistry::new(self.config.max_sinks),
            statusbars: StatusbarRegistry::new(self.config.max_statusbars),
            config: self.config,
            probe: self.probe,
        }
    }
}

/// Sinks, statusbars, and the drawing that ties them together.
pub struct StatusbarLog {
    config: Config,
    sinks: SinkRegistry,
    statusbars: StatusbarRegistry,
    probe: Box<dyn ColumnProbe>,
}

impl fmt::Debug for StatusbarLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusbarLog")
            .field("config", &self.config)
            .field("sinks", &self.sinks.live())
            .field("statusbars", &self.statusbars.live())
            .finish_non_exhaustive()
    }
}

impl Default for StatusbarLog {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl StatusbarLog {
    pub fn new(config: Config) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> StatusbarLogBuilder {
        StatusbarLogBuilder {
            config: Config::default(),
            probe: Box::new(TtyProbe),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn sinks(&self) -> &SinkRegistry {
        &self.sinks
    }

    #[inline]
    pub fn statusbars(&self) -> &StatusbarRegistry {
        &self.statusbars
    }

    /// Whether a message at `level` would be written.
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.config.enabled(level)
    }

    // ---------------------------------------------------------------------
    // Sinks
    // ---------------------------------------------------------------------

    pub fn create_stdout_sink(&self, handle: &mut SinkHandle) -> SinkResult<()> {
        self.sinks.create_stdout(handle)
    }

    pub fn create_file_sink(&self, handle: &mut SinkHandle, path: impl AsRef<Path>) -> SinkResult<()> {
        self.sinks.create_file(handle, path)
    }

    pub fn create_stream_sink(&self, handle: &mut SinkHandle, stream: WrappedStream) -> SinkResult<()> {
        self.sinks.create_stream(handle, stream)
    }

    pub fn destroy_sink(&self, handle: &mut SinkHandle) -> SinkResult<()> {
        self.sinks.destroy(handle)
    }

    // ---------------------------------------------------------------------
    // Statusbars
    // ---------------------------------------------------------------------

    /// Create a statusbar on `sink` and draw every bar at 0%.
    ///
    /// Fails with `AlreadyBound` if `handle` is live, `InvalidPosition` for a
    /// bar row outside `1..=max_bar_row`, `CapacityExceeded` at the statusbar
    /// limit and `InvalidSink` if `sink` does not validate, in that order. On
    /// failure `handle` is left untouched.
    pub fn create_statusbar(
        &self,
        handle: &mut StatusbarHandle,
        sink: SinkHandle,
        bars: &[BarSpec],
    ) -> StatusbarResult<()> {
        self.check_unbound(handle)?;
        self.bind_statusbar(handle, sink, bars)
    }

    /// [`create_statusbar`](Self::create_statusbar) from four parallel lists.
    ///
    /// A length mismatch is reported after the `AlreadyBound` check and
    /// before every other.
    pub fn create_statusbar_parallel<P, Q>(
        &self,
        handle: &mut StatusbarHandle,
        sink: SinkHandle,
        positions: &[u32],
        widths: &[usize],
        prefixes: &[P],
        postfixes: &[Q],
    ) -> StatusbarResult<()>
    where
        P: AsRef<str>,
        Q: AsRef<str>,
    {
        self.check_unbound(handle)?;
        let layout = BarLayout::from_parallel(positions, widths, prefixes, postfixes)?;
        self.bind_statusbar(handle, sink, layout.bars())
    }

    fn check_unbound(&self, handle: &StatusbarHandle) -> StatusbarResult<()> {
        if self.statusbars.validate(handle).is_ok() {
            return Err(StatusbarError::AlreadyBound);
        }
        Ok(())
    }

    fn bind_statusbar(
        &self,
        handle: &mut StatusbarHandle,
        sink_handle: SinkHandle,
        specs: &[BarSpec],
    ) -> StatusbarResult<()> {
        let max = self.config.max_bar_row;
        if let Some((index, spec)) = specs
            .iter()
            .enumerate()
            .find(|(_, spec)| spec.position == 0 || spec.position > max)
        {
            return Err(StatusbarError::InvalidPosition {
                index,
                position: spec.position,
                max,
            });
        }
        if self.statusbars.lock().is_full() {
            return Err(StatusbarError::CapacityExceeded {
                max: self.config.max_statusbars,
            });
        }
        let sink = self.resolve_for_statusbar(&sink_handle)?;
        let bars: Vec<BarState> = specs
            .iter()
            .map(|spec| BarState::from_spec(spec, &self.config))
            .collect();

        let degraded = {
            let mut guard = sink.lock();
            let mut table = self.statusbars.lock();
            if table.validate(handle).is_ok() {
                return Err(StatusbarError::AlreadyBound);
            }
            if guard.sink_type() == SinkType::Invalid {
                return Err(SinkError::Closed.into());
            }
            let issued: StatusbarHandle = table
                .insert(
                    self.statusbars.ids(),
                    Statusbar {
                        sink: sink_handle,
                        bars: bars.clone(),
                        error_reported: false,
                    },
                )
                .map_err(|full| StatusbarError::CapacityExceeded { max: full.capacity })?;

            let (viewport, _) = guard.viewport(self.probe.as_ref());
            let mut status = Degradation::default();
            for (index, bar) in bars.iter().enumerate() {
                match self.draw(&mut guard, bar, viewport) {
                    Ok(drawn) => status.note(index, drawn),
                    Err(err) => {
                        let mut issued = issued;
                        let _ = table.remove(&mut issued);
                        return Err(err.into());
                    }
                }
            }
            *handle = issued;
            let record = table.get_mut(handle).map_err(StatusbarError::InvalidHandle)?;
            status.latch(record)
        };

        if let Some((index, status)) = degraded {
            self.report_degradation(sink_handle, handle, index, status);
        }
        Ok(())
    }

    /// Set bar `bar_index` to `percent`, advance its spinner and redraw it.
    ///
    /// Truncation or a failed width query is reported once per statusbar as
    /// an `ERROR` line on the statusbar's sink and does not fail the call.
    pub fn update_statusbar(
        &self,
        handle: &StatusbarHandle,
        bar_index: usize,
        percent: f64,
    ) -> StatusbarResult<()> {
        let sink_handle = self
            .statusbars
            .sink_of(handle)
            .map_err(StatusbarError::InvalidHandle)?;

        match self.redraw_updated(handle, sink_handle, bar_index, percent) {
            Ok(Some((index, status))) => {
                self.report_degradation(sink_handle, handle, index, status);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                self.report_failure("update", sink_handle, handle, &err);
                Err(err)
            }
        }
    }

    fn redraw_updated(
        &self,
        handle: &StatusbarHandle,
        sink_handle: SinkHandle,
        bar_index: usize,
        percent: f64,
    ) -> StatusbarResult<Option<(usize, RenderStatus)>> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(StatusbarError::InvalidPercentage(percent));
        }
        let sink = self.resolve_for_statusbar(&sink_handle)?;

        let mut guard = sink.lock();
        let mut table = self.statusbars.lock();
        let record = table.get_mut(handle).map_err(StatusbarError::InvalidHandle)?;
        let len = record.bars.len();
        let bar = record
            .bars
            .get_mut(bar_index)
            .ok_or(StatusbarError::BarIndexOutOfBounds {
                index: bar_index,
                len,
            })?;
        bar.advance(percent);
        let bar = bar.clone();

        let (viewport, _) = guard.viewport(self.probe.as_ref());
        let drawn = self.draw(&mut guard, &bar, viewport)?;
        let mut status = Degradation::default();
        status.note(bar_index, drawn);
        Ok(status.latch(record))
    }

    /// Clear every bar's row, then recycle the statusbar and invalidate
    /// `handle`.
    ///
    /// If the sink is already gone the rows are left as drawn and the
    /// statusbar is still recycled.
    pub fn destroy_statusbar(&self, handle: &mut StatusbarHandle) -> StatusbarResult<()> {
        let sink_handle = self
            .statusbars
            .sink_of(handle)
            .map_err(StatusbarError::InvalidHandle)?;
        let sink = match self.sinks.resolve(&sink_handle) {
            Ok(sink) => Some(sink),
            Err(err) => {
                tracing::warn!(statusbar = %handle, %err, "statusbar sink is gone, rows not cleared");
                None
            }
        };
        let target = *handle;

        let result = {
            let mut guard = sink.as_deref().map(Sink::lock);
            let mut table = self.statusbars.lock();
            let record = table.remove(handle).map_err(StatusbarError::InvalidHandle)?;
            match guard.as_mut() {
                Some(guard) => self.clear_rows(guard, &record.bars),
                None => Ok(()),
            }
        };

        result.map_err(|err| {
            let err = StatusbarError::from(err);
            self.report_failure("destroy", sink_handle, &target, &err);
            err
        })
    }

    fn clear_rows(&self, guard: &mut SinkGuard<'_>, bars: &[BarState]) -> SinkResult<()> {
        for bar in bars {
            let rows = i64::from(bar.position);
            guard.move_cursor(rows)?;
            guard.cursor(CursorOp::ClearCurrentLine)?;
            guard.move_cursor(-rows)?;
        }
        guard.flush()
    }

    fn resolve_for_statusbar(&self, sink: &SinkHandle) -> StatusbarResult<Arc<Sink>> {
        self.sinks.resolve_verbose(sink).map_err(|err| match err {
            SinkError::InvalidHandle(err) => StatusbarError::InvalidSink(err),
            other => StatusbarError::Sink(other),
        })
    }

    // ---------------------------------------------------------------------
    // Logging
    // ---------------------------------------------------------------------

    /// Write `"<LEVEL> [<tag>]: <message>"` above every bar on `sink`, then
    /// redraw those bars.
    ///
    /// Returns [`LogError::TerminalWidth`] after the redraw if the width
    /// query failed and 80 columns were assumed.
    pub fn log(
        &self,
        level: LogLevel,
        tag: &str,
        sink_handle: SinkHandle,
        args: fmt::Arguments<'_>,
    ) -> LogResult<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        let sink = self.sinks.resolve_verbose(&sink_handle).map_err(|err| match err {
            SinkError::InvalidHandle(err) => LogError::InvalidSink(err),
            other => LogError::Sink(other),
        })?;
        let line = self.format_line(level, tag, args);

        let width_error = {
            let mut guard = sink.lock();
            let table = self.statusbars.lock();
            let (bars, top) = bars_on(&table, &sink_handle);
            let rows = i64::from(top);

            guard.move_cursor(rows)?;
            // Every row a message line lands on may hold an old bar.
            for row in line.split_inclusive('\n') {
                if !bars.is_empty() {
                    guard.cursor(CursorOp::ClearCurrentLine)?;
                }
                guard.write(row.as_bytes())?;
            }
            if self.config.auto_flush {
                guard.flush()?;
            }
            guard.move_cursor(-rows)?;

            if bars.is_empty() {
                None
            } else {
                let (viewport, width_error) = guard.viewport(self.probe.as_ref());
                for bar in &bars {
                    self.draw(&mut guard, bar, viewport)?;
                }
                width_error
            }
        };

        match width_error {
            Some(err) => Err(LogError::TerminalWidth(err)),
            None => Ok(()),
        }
    }

    fn format_line(&self, level: LogLevel, tag: &str, args: fmt::Arguments<'_>) -> String {
        let message = match args.as_str() {
            Some(text) => Cow::Borrowed(text),
            None => Cow::Owned(args.to_string()),
        };
        let message = clean_multiline(&message, self.config.max_message_len);
        let tag = clean_line(tag, self.config.max_tag_len);
        format!("{} [{}]: {}\n", level.prefix(), tag, message)
    }

    // ---------------------------------------------------------------------
    // Drawing
    // ---------------------------------------------------------------------

    /// Redraw one bar in place: up to its row, clear, text, back down.
    fn draw(
        &self,
        guard: &mut SinkGuard<'_>,
        bar: &BarState,
        viewport: Viewport,
    ) -> SinkResult<RenderStatus> {
        let (line, status) = fit(bar.line().format(), viewport);
        let rows = i64::from(bar.position);
        guard.move_cursor(rows)?;
        guard.cursor(CursorOp::ClearCurrentLine)?;
        guard.write(line.as_bytes())?;
        if self.config.auto_flush {
            guard.flush()?;
        }
        guard.move_cursor(-rows)?;
        tracing::trace!(position = bar.position, percent = bar.percent, ?status, "bar drawn");
        Ok(status)
    }

    fn report_degradation(
        &self,
        sink: SinkHandle,
        handle: &StatusbarHandle,
        bar_index: usize,
        status: RenderStatus,
    ) {
        let Some(description) = status.describe() else {
            return;
        };
        let logged = self.log(
            LogLevel::Error,
            INTERNAL_TAG,
            sink,
            format_args!("{description} on statusbar {handle} at bar index {bar_index}"),
        );
        if let Err(err) = logged {
            tracing::debug!(%err, "statusbar degradation report incomplete");
        }
    }

    /// Request errors go to the statusbar's own sink; handle and I/O
    /// failures only to `tracing`.
    fn report_failure(
        &self,
        operation: &str,
        sink: SinkHandle,
        handle: &StatusbarHandle,
        err: &StatusbarError,
    ) {
        match err {
            StatusbarError::InvalidPercentage(_) | StatusbarError::BarIndexOutOfBounds { .. } => {
                let logged = self.log(
                    LogLevel::Error,
                    INTERNAL_TAG,
                    sink,
                    format_args!("failed to {operation} statusbar {handle}: {err}"),
                );
                if let Err(log_err) = logged {
                    tracing::debug!(%log_err, "statusbar failure report incomplete");
                }
            }
            _ => tracing::warn!(statusbar = %handle, %err, "failed to {operation} statusbar"),
        }
    }
}

/// First degraded bar and the union of all outcomes in one draw pass.
#[derive(Debug, Default)]
struct Degradation {
    first: Option<usize>,
    status: RenderStatus,
}

impl Degradation {
    fn note(&mut self, index: usize, status: RenderStatus) {
        if !status.is_clean() && self.first.is_none() {
            self.first = Some(index);
        }
        self.status = self.status.merge(status);
    }

    /// Set the statusbar's latch, returning what to report if it was clear.
    fn latch(self, record: &mut Statusbar) -> Option<(usize, RenderStatus)> {
        let index = self.first?;
        if record.error_reported {
            return None;
        }
        record.error_reported = true;
        Some((index, self.status))
    }
}
