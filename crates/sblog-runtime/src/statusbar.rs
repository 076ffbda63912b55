#![forbid(unsafe_code)]

//! Statusbar records and their registry.
//!
//! A statusbar is a fixed set of bars bound to one sink. Each bar lives at a
//! screen row counted upwards from the cursor (1 is the row just above it).

use std::sync::{Mutex, MutexGuard, PoisonError};

use sblog_core::{Config, GenerationCounter, HandleError, SinkHandle, SlotTable, StatusbarHandle};
use sblog_render::{BarLine, SPINNER, clean_line};

use crate::error::{StatusbarError, StatusbarResult};

/// Description of one bar at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarSpec {
    /// Screen row above the cursor; 1 is the nearest.
    pub position: u32,
    /// Bar width in cells, between the brackets.
    pub width: usize,
    pub prefix: String,
    pub postfix: String,
}

impl BarSpec {
    pub fn new(position: u32, width: usize) -> Self {
        Self {
            position,
            width,
            prefix: String::new(),
            postfix: String::new(),
        }
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = postfix.into();
        self
    }
}

/// An ordered list of bar descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarLayout {
    bars: Vec<BarSpec>,
}

impl BarLayout {
    pub fn new(bars: Vec<BarSpec>) -> Self {
        Self { bars }
    }

    /// Build from four parallel lists, one entry per bar.
    ///
    /// ```
    /// use sblog_runtime::BarLayout;
    ///
    /// let layout = BarLayout::from_parallel(
    ///     &[2, 1],
    ///     &[20, 10],
    ///     &["first:  ", "second: "],
    ///     &[" -- 15 total steps", " -- 100 total steps"],
    /// )
    /// .unwrap();
    /// assert_eq!(layout.bars()[1].width, 10);
    ///
    /// assert!(BarLayout::from_parallel(&[1], &[10, 10], &["a"], &["b"]).is_err());
    /// ```
    pub fn from_parallel<P, Q>(
        positions: &[u32],
        widths: &[usize],
        prefixes: &[P],
        postfixes: &[Q],
    ) -> StatusbarResult<Self>
    where
        P: AsRef<str>,
        Q: AsRef<str>,
    {
        let n = positions.len();
        if widths.len() != n || prefixes.len() != n || postfixes.len() != n {
            return Err(StatusbarError::SizeMismatch {
                positions: n,
                widths: widths.len(),
                prefixes: prefixes.len(),
                postfixes: postfixes.len(),
            });
        }
        let bars = positions
            .iter()
            .zip(widths)
            .zip(prefixes.iter().zip(postfixes))
            .map(|((&position, &width), (prefix, postfix))| {
                BarSpec::new(position, width)
                    .prefix(prefix.as_ref())
                    .postfix(postfix.as_ref())
            })
            .collect();
        Ok(Self { bars })
    }

    #[must_use]
    pub fn bar(mut self, spec: BarSpec) -> Self {
        self.bars.push(spec);
        self
    }

    pub fn bars(&self) -> &[BarSpec] {
        &self.bars
    }
}

/// Live state of one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarState {
    pub percent: f64,
    pub position: u32,
    pub width: usize,
    pub prefix: String,
    pub postfix: String,
    pub phase: usize,
}

impl BarState {
    /// Sanitized and capped copy of `spec`, at 0%.
    pub(crate) fn from_spec(spec: &BarSpec, config: &Config) -> Self {
        Self {
            percent: 0.0,
            position: spec.position,
            width: spec.width.min(config.max_bar_width),
            prefix: clean_line(&spec.prefix, config.max_prefix_len).into_owned(),
            postfix: clean_line(&spec.postfix, config.max_postfix_len).into_owned(),
            phase: 0,
        }
    }

    pub(crate) fn line(&self) -> BarLine<'_> {
        BarLine::new(&self.prefix, self.width)
            .postfix(&self.postfix)
            .percent(self.percent)
            .phase(self.phase)
    }

    /// Number of filled cells.
    pub fn fill(&self) -> usize {
        self.line().fill()
    }

    /// Store a new percentage and advance the spinner.
    pub(crate) fn advance(&mut self, percent: f64) {
        self.percent = percent;
        self.phase = (self.phase + 1) % SPINNER.len();
    }
}

#[derive(Debug)]
pub(crate) struct Statusbar {
    pub(crate) sink: SinkHandle,
    pub(crate) bars: Vec<BarState>,
    /// Set once a rendering problem has been reported.
    pub(crate) error_reported: bool,
}

/// Registry of statusbars.
#[derive(Debug)]
pub struct StatusbarRegistry {
    slots: Mutex<SlotTable<Statusbar>>,
    ids: GenerationCounter,
}

pub(crate) type StatusbarTable = SlotTable<Statusbar>;

impl StatusbarRegistry {
    pub fn new(max_statusbars: usize) -> Self {
        Self {
            slots: Mutex::new(SlotTable::new(max_statusbars)),
            ids: GenerationCounter::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StatusbarTable> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn ids(&self) -> &GenerationCounter {
        &self.ids
    }

    pub fn validate(&self, handle: &StatusbarHandle) -> Result<(), HandleError> {
        self.lock().validate(handle)
    }

    /// Sink the statusbar draws on, warning about an invalid handle.
    pub fn sink_of(&self, handle: &StatusbarHandle) -> Result<SinkHandle, HandleError> {
        let table = self.lock();
        table.validate_verbose(handle)?;
        Ok(table.get(handle)?.sink)
    }

    /// Copy of one bar's state.
    pub fn bar(&self, handle: &StatusbarHandle, index: usize) -> StatusbarResult<BarState> {
        let table = self.lock();
        let record = table.get(handle).map_err(StatusbarError::InvalidHandle)?;
        record
            .bars
            .get(index)
            .cloned()
            .ok_or(StatusbarError::BarIndexOutOfBounds {
                index,
                len: record.bars.len(),
            })
    }

    /// Number of bars in the statusbar.
    pub fn bar_count(&self, handle: &StatusbarHandle) -> StatusbarResult<usize> {
        let table = self.lock();
        let record = table.get(handle).map_err(StatusbarError::InvalidHandle)?;
        Ok(record.bars.len())
    }

    /// Number of live statusbars.
    pub fn live(&self) -> usize {
        self.lock().live()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }
}

/// Bars bound to `sink`, in registry order, and the highest row among them.
pub(crate) fn bars_on(table: &StatusbarTable, sink: &SinkHandle) -> (Vec<BarState>, u32) {
    let bars: Vec<BarState> = table
        .iter()
        .filter(|(_, _, record)| record.sink.same_slot(sink))
        .flat_map(|(_, _, record)| record.bars.iter().cloned())
        .collect();
    let top = bars.iter().map(|bar| bar.position).max().unwrap_or(0);
    (bars, top)
}
