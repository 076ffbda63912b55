#![forbid(unsafe_code)]

//! Progress-bar line formatting and fitting to the terminal width.
//!
//! A bar line looks like:
//!
//! ```text
//! first:  [#######/            ]  37.50 -- 15 total steps
//! ```
//!
//! The fill count depends only on the percentage and width. The spinner glyph
//! sits in the first empty cell and rotates through `| / - \` on every update.
//!
//! ```
//! use sblog_render::bar::{BarLine, Viewport, fit};
//!
//! let line = BarLine::new("dl ", 10).postfix(" ok").percent(25.0).phase(1).format();
//! assert_eq!(line, "dl [##/       ]  25.00 ok");
//!
//! let (shown, status) = fit(line, Viewport::Columns(10));
//! assert_eq!(shown, "dl [##/  ");
//! assert!(status.truncated());
//! ```

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Spinner glyphs, indexed by phase.
pub const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Columns assumed when the terminal width cannot be queried.
pub const FALLBACK_COLUMNS: u16 = 80;

/// Number of `#` cells for `percent` on a bar `width` cells wide.
#[inline]
#[must_use]
pub fn fill_cells(percent: f64, width: usize) -> usize {
    if !percent.is_finite() || percent <= 0.0 {
        return 0;
    }
    let cells = (percent * width as f64 / 100.0).floor();
    (cells as usize).min(width)
}

/// Inputs for one bar line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarLine<'a> {
    prefix: &'a str,
    postfix: &'a str,
    width: usize,
    percent: f64,
    phase: usize,
}

impl<'a> BarLine<'a> {
    #[must_use]
    pub fn new(prefix: &'a str, width: usize) -> Self {
        Self {
            prefix,
            postfix: "",
            width,
            percent: 0.0,
            phase: 0,
        }
    }

    #[must_use]
    pub fn postfix(mut self, postfix: &'a str) -> Self {
        self.postfix = postfix;
        self
    }

    #[must_use]
    pub fn percent(mut self, percent: f64) -> Self {
        self.percent = percent;
        self
    }

    /// Spinner phase; taken modulo the glyph count.
    #[must_use]
    pub fn phase(mut self, phase: usize) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub fn fill(&self) -> usize {
        fill_cells(self.percent, self.width)
    }

    /// Format the full, unfitted line.
    #[must_use]
    pub fn format(&self) -> String {
        let fill = self.fill();
        let mut line =
            String::with_capacity(self.prefix.len() + self.postfix.len() + self.width + 12);
        line.push_str(self.prefix);
        line.push('[');
        line.extend(std::iter::repeat_n('#', fill));
        if fill < self.width {
            line.push(SPINNER[self.phase % SPINNER.len()]);
            line.extend(std::iter::repeat_n(' ', self.width - fill - 1));
        }
        line.push_str("] ");
        line.push_str(&format!("{:6.2}", self.percent));
        line.push_str(self.postfix);
        line
    }
}

/// What the renderer knows about the destination width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewport {
    /// Not a terminal; lines are written whole.
    Unbounded,
    /// Terminal reported this many columns.
    Columns(u16),
    /// Terminal whose width query failed.
    Unknown,
}

/// Non-fatal outcome of fitting a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStatus {
    #[default]
    Clean,
    Truncated,
    WidthUnavailable,
    WidthUnavailableTruncated,
}

impl RenderStatus {
    #[must_use]
    pub const fn from_flags(width_unavailable: bool, truncated: bool) -> Self {
        match (width_unavailable, truncated) {
            (false, false) => Self::Clean,
            (false, true) => Self::Truncated,
            (true, false) => Self::WidthUnavailable,
            (true, true) => Self::WidthUnavailableTruncated,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_clean(self) -> bool {
        matches!(self, Self::Clean)
    }

    #[inline]
    #[must_use]
    pub const fn truncated(self) -> bool {
        matches!(self, Self::Truncated | Self::WidthUnavailableTruncated)
    }

    #[inline]
    #[must_use]
    pub const fn width_unavailable(self) -> bool {
        matches!(self, Self::WidthUnavailable | Self::WidthUnavailableTruncated)
    }

    /// Union of two outcomes.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self::from_flags(
            self.width_unavailable() || other.width_unavailable(),
            self.truncated() || other.truncated(),
        )
    }

    /// Human-readable description, `None` when clean.
    #[must_use]
    pub const fn describe(self) -> Option<&'static str> {
        match self {
            Self::Clean => None,
            Self::Truncated => Some("statusbar line truncated to terminal width"),
            Self::WidthUnavailable => Some("terminal width unavailable, assuming 80 columns"),
            Self::WidthUnavailableTruncated => Some(
                "terminal width unavailable, assuming 80 columns; statusbar line truncated",
            ),
        }
    }
}

/// Fit `line` to the viewport.
///
/// Lines wider than the terminal are cut to `columns - 1` display columns so
/// the cursor never wraps onto the next row. Wide characters are never split.
#[must_use]
pub fn fit(line: String, viewport: Viewport) -> (String, RenderStatus) {
    let (columns, width_unavailable) = match viewport {
        Viewport::Unbounded => return (line, RenderStatus::Clean),
        Viewport::Columns(c) => (c, false),
        Viewport::Unknown => (FALLBACK_COLUMNS, true),
    };
    let columns = usize::from(columns);
    if UnicodeWidthStr::width(line.as_str()) <= columns {
        return (line, RenderStatus::from_flags(width_unavailable, false));
    }
    let cut = truncate_to_width(&line, columns.saturating_sub(1));
    let mut line = line;
    line.truncate(cut);
    (line, RenderStatus::from_flags(width_unavailable, true))
}

/// Byte length of the longest prefix of `s` at most `max_cols` wide.
fn truncate_to_width(s: &str, max_cols: usize) -> usize {
    let mut cols = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if cols + w > max_cols {
            return idx;
        }
        cols += w;
    }
    s.len()
}
