#![forbid(unsafe_code)]

//! Simplified terminal model for testing statusbar output.
//!
//! Parses the escape sequences a sink emits and updates a character grid, so
//! tests can assert on what a terminal would show instead of on raw bytes.
//!
//! # Supported Sequences
//! - Cursor movement: `CSI n A/B/C/D`, CUP `CSI row ; col H`
//! - EL (Erase Line): `CSI n K`
//! - ED (Erase Display): `CSI n J`
//! - Save/restore cursor: `CSI s` / `CSI u` and `ESC 7` / `ESC 8`
//! - LF with scrolling at the bottom row; rows scrolled off the top are kept
//!   in [`TerminalModel::scrollback`]
//! - SGR and OSC sequences are parsed and ignored
//!
//! LF also returns the cursor to column 0, as a tty with output
//! post-processing (`ONLCR`) does.
//!
//! # Example
//! ```
//! use sblog_harness::terminal_model::TerminalModel;
//!
//! let mut model = TerminalModel::new(40, 4);
//! model.feed(b"log line\nbar\x1b[1A\r\x1b[2Kreplaced");
//! assert_eq!(model.row_text(0), "replaced");
//! assert_eq!(model.row_text(1), "bar");
//! ```

/// Erase mode for EL/ED sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EraseMode {
    ToEnd,
    ToStart,
    All,
}

/// Internal parser state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParserState {
    Ground,
    Escape,
    Csi,
    Osc,
}

/// Simplified terminal model for testing.
pub struct TerminalModel {
    grid: Vec<Vec<char>>,
    scrollback: Vec<String>,
    cursor_x: u16,
    cursor_y: u16,
    saved: Option<(u16, u16)>,
    width: u16,
    height: u16,
    // Parser state
    state: ParserState,
    csi_params: Vec<u16>,
    csi_current: u16,
    utf8: Vec<u8>,
}

impl TerminalModel {
    /// Create a new terminal model with the given dimensions.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            grid: (0..height).map(|_| Self::blank_row(width)).collect(),
            scrollback: Vec::new(),
            cursor_x: 0,
            cursor_y: 0,
            saved: None,
            width,
            height,
            state: ParserState::Ground,
            csi_params: Vec::new(),
            csi_current: 0,
            utf8: Vec::new(),
        }
    }

    fn blank_row(width: u16) -> Vec<char> {
        vec![' '; usize::from(width)]
    }

    /// Terminal width.
    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Terminal height.
    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Current cursor position as `(column, row)`.
    #[inline]
    pub fn cursor(&self) -> (u16, u16) {
        (self.cursor_x, self.cursor_y)
    }

    /// Get the character at (x, y).
    pub fn char_at(&self, x: u16, y: u16) -> char {
        self.grid
            .get(usize::from(y))
            .and_then(|row| row.get(usize::from(x)))
            .copied()
            .unwrap_or(' ')
    }

    /// Read a row as a string (trailing spaces trimmed).
    pub fn row_text(&self, y: u16) -> String {
        self.grid
            .get(usize::from(y))
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .unwrap_or_default()
    }

    /// Rows that scrolled off the top, oldest first.
    pub fn scrollback(&self) -> &[String] {
        &self.scrollback
    }

    /// Read the entire screen as text.
    pub fn screen_text(&self) -> String {
        let mut lines: Vec<String> = (0..self.height).map(|y| self.row_text(y)).collect();
        // Trim trailing empty lines
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    /// Scrollback followed by the screen, with trailing empty rows trimmed.
    pub fn full_text(&self) -> String {
        let mut lines = self.scrollback.clone();
        lines.extend((0..self.height).map(|y| self.row_text(y)));
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    /// Dump model state for debugging.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (y, row) in self.grid.iter().enumerate() {
            out.push_str(&format!("{y:3}| "));
            out.extend(row.iter());
            out.push('\n');
        }
        out.push_str(&format!("Cursor: ({}, {})\n", self.cursor_x, self.cursor_y));
        out
    }

    /// Feed bytes to the terminal model.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.advance(byte);
        }
    }

    /// Feed a string to the terminal model.
    pub fn feed_str(&mut self, s: &str) {
        self.feed(s.as_bytes());
    }

    fn advance(&mut self, byte: u8) {
        match self.state {
            ParserState::Ground => self.ground(byte),
            ParserState::Escape => self.escape(byte),
            ParserState::Csi => self.csi(byte),
            ParserState::Osc => self.osc(byte),
        }
    }

    fn ground(&mut self, byte: u8) {
        if !self.utf8.is_empty() || byte >= 0x80 {
            self.utf8_byte(byte);
            return;
        }
        match byte {
            0x1b => {
                self.state = ParserState::Escape;
            }
            0x0a => self.line_feed(),
            0x0d => {
                self.cursor_x = 0;
            }
            0x08 => {
                self.cursor_x = self.cursor_x.saturating_sub(1);
            }
            0x09 => {
                // TAB: advance to next 8-column tab stop
                self.cursor_x = ((self.cursor_x / 8) + 1) * 8;
                if self.cursor_x >= self.width {
                    self.cursor_x = self.width.saturating_sub(1);
                }
            }
            0x20..=0x7e => self.put_char(byte as char),
            _ => {}
        }
    }

    fn utf8_byte(&mut self, byte: u8) {
        self.utf8.push(byte);
        match std::str::from_utf8(&self.utf8) {
            Ok(s) => {
                let chars: Vec<char> = s.chars().collect();
                self.utf8.clear();
                for ch in chars {
                    self.put_char(ch);
                }
            }
            Err(err) if err.error_len().is_some() || self.utf8.len() >= 4 => {
                self.utf8.clear();
                self.put_char('\u{FFFD}');
            }
            Err(_) => {}
        }
    }

    fn escape(&mut self, byte: u8) {
        self.state = ParserState::Ground;
        match byte {
            b'[' => {
                self.state = ParserState::Csi;
                self.csi_params.clear();
                self.csi_current = 0;
            }
            b']' => {
                self.state = ParserState::Osc;
            }
            b'7' => self.save_cursor(),
            b'8' => self.restore_cursor(),
            _ => {}
        }
    }

    fn csi(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' => {
                self.csi_current = self
                    .csi_current
                    .saturating_mul(10)
                    .saturating_add(u16::from(byte - b'0'));
                return;
            }
            b';' => {
                self.csi_params.push(self.csi_current);
                self.csi_current = 0;
                return;
            }
            b'?' => return,
            _ => {}
        }

        self.csi_params.push(self.csi_current);
        self.state = ParserState::Ground;
        match byte {
            b'A' => {
                let n = self.count_param();
                self.cursor_y = self.cursor_y.saturating_sub(n);
            }
            b'B' => {
                let n = self.count_param();
                self.cursor_y = self
                    .cursor_y
                    .saturating_add(n)
                    .min(self.height.saturating_sub(1));
            }
            b'C' => {
                let n = self.count_param();
                self.cursor_x = self
                    .cursor_x
                    .saturating_add(n)
                    .min(self.width.saturating_sub(1));
            }
            b'D' => {
                let n = self.count_param();
                self.cursor_x = self.cursor_x.saturating_sub(n);
            }
            b'H' | b'f' => {
                let row = self.param(0, 1);
                let col = self.param(1, 1);
                self.cursor_y = row.saturating_sub(1).min(self.height.saturating_sub(1));
                self.cursor_x = col.saturating_sub(1).min(self.width.saturating_sub(1));
            }
            b'J' => self.erase_display(self.erase_mode()),
            b'K' => self.erase_line(self.erase_mode()),
            b's' => self.save_cursor(),
            b'u' => self.restore_cursor(),
            // SGR, mode set/reset, unknown finals
            _ => {}
        }
    }

    fn osc(&mut self, byte: u8) {
        match byte {
            0x07 => self.state = ParserState::Ground,
            // ESC \ (ST); the backslash is swallowed by `escape`.
            0x1b => self.state = ParserState::Escape,
            _ => {}
        }
    }

    fn param(&self, index: usize, default: u16) -> u16 {
        match self.csi_params.get(index).copied() {
            Some(0) | None => default,
            Some(v) => v,
        }
    }

    fn count_param(&self) -> u16 {
        self.param(0, 1)
    }

    fn erase_mode(&self) -> EraseMode {
        match self.csi_params.first().copied().unwrap_or(0) {
            0 => EraseMode::ToEnd,
            1 => EraseMode::ToStart,
            _ => EraseMode::All,
        }
    }

    fn save_cursor(&mut self) {
        self.saved = Some((self.cursor_x, self.cursor_y));
    }

    fn restore_cursor(&mut self) {
        if let Some((x, y)) = self.saved {
            self.cursor_x = x;
            self.cursor_y = y;
        }
    }

    fn line_feed(&mut self) {
        self.cursor_x = 0;
        if self.cursor_y + 1 < self.height {
            self.cursor_y += 1;
        } else {
            self.scroll_up();
        }
    }

    fn scroll_up(&mut self) {
        if self.grid.is_empty() {
            return;
        }
        let top = self.grid.remove(0);
        self.scrollback
            .push(top.iter().collect::<String>().trim_end().to_string());
        self.grid.push(Self::blank_row(self.width));
        if let Some((_, y)) = self.saved.as_mut() {
            *y = y.saturating_sub(1);
        }
    }

    fn put_char(&mut self, ch: char) {
        let x = usize::from(self.cursor_x);
        let y = usize::from(self.cursor_y);
        if let Some(cell) = self.grid.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = ch;
        }
        self.cursor_x += 1;
        if self.cursor_x >= self.width {
            self.line_feed();
        }
    }

    fn erase_line(&mut self, mode: EraseMode) {
        let width = usize::from(self.width);
        let x = usize::from(self.cursor_x);
        let Some(row) = self.grid.get_mut(usize::from(self.cursor_y)) else {
            return;
        };
        let (start, end) = match mode {
            EraseMode::ToEnd => (x, width),
            EraseMode::ToStart => (0, x + 1),
            EraseMode::All => (0, width),
        };
        for cell in &mut row[start.min(width)..end.min(width)] {
            *cell = ' ';
        }
    }

    fn erase_display(&mut self, mode: EraseMode) {
        let y = usize::from(self.cursor_y);
        match mode {
            EraseMode::ToEnd => {
                self.erase_line(EraseMode::ToEnd);
                for row in self.grid.iter_mut().skip(y + 1) {
                    row.fill(' ');
                }
            }
            EraseMode::ToStart => {
                for row in self.grid.iter_mut().take(y) {
                    row.fill(' ');
                }
                self.erase_line(EraseMode::ToStart);
            }
            EraseMode::All => {
                for row in &mut self.grid {
                    row.fill(' ');
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_model_empty() {
        let m = TerminalModel::new(10, 5);
        assert_eq!(m.width(), 10);
        assert_eq!(m.height(), 5);
        assert_eq!(m.cursor(), (0, 0));
        assert_eq!(m.char_at(0, 0), ' ');
    }

    #[test]
    fn print_text() {
        let mut m = TerminalModel::new(20, 5);
        m.feed(b"Hello");
        assert_eq!(m.row_text(0), "Hello");
        assert_eq!(m.cursor(), (5, 0));
    }

    #[test]
    fn cursor_wraps_at_edge() {
        let mut m = TerminalModel::new(5, 3);
        m.feed(b"ABCDE");
        assert_eq!(m.cursor(), (0, 1));
        assert_eq!(m.char_at(4, 0), 'E');
    }

    #[test]
    fn newline_returns_to_column_zero() {
        let mut m = TerminalModel::new(20, 5);
        m.feed(b"AB\nCD");
        assert_eq!(m.row_text(0), "AB");
        assert_eq!(m.row_text(1), "CD");
    }

    #[test]
    fn carriage_return() {
        let mut m = TerminalModel::new(20, 5);
        m.feed(b"Hello\r");
        assert_eq!(m.cursor(), (0, 0));
        m.feed(b"World");
        assert_eq!(m.row_text(0), "World");
    }

    #[test]
    fn utf8_chars_occupy_one_cell() {
        let mut m = TerminalModel::new(20, 2);
        m.feed_str("a\u{FFFD}\u{e9}b");
        assert_eq!(m.row_text(0), "a\u{FFFD}\u{e9}b");
        assert_eq!(m.cursor(), (4, 0));
    }

    #[test]
    fn invalid_utf8_becomes_replacement() {
        let mut m = TerminalModel::new(20, 2);
        m.feed(b"a\xffb");
        assert_eq!(m.row_text(0), "a\u{FFFD}b");
    }

    #[test]
    fn line_feed_scrolls_at_bottom() {
        let mut m = TerminalModel::new(10, 2);
        m.feed(b"one\ntwo\nthree");
        assert_eq!(m.scrollback(), ["one".to_string()]);
        assert_eq!(m.row_text(0), "two");
        assert_eq!(m.row_text(1), "three");
        assert_eq!(m.full_text(), "one\ntwo\nthree");
    }

    #[test]
    fn cursor_up_and_down() {
        let mut m = TerminalModel::new(20, 10);
        m.feed(b"\x1b[5;10H");
        assert_eq!(m.cursor(), (9, 4));
        m.feed(b"\x1b[2A");
        assert_eq!(m.cursor(), (9, 2));
        m.feed(b"\x1b[3B");
        assert_eq!(m.cursor(), (9, 5));
        m.feed(b"\x1b[4C\x1b[2D");
        assert_eq!(m.cursor(), (11, 5));
    }

    #[test]
    fn cursor_movement_clamps() {
        let mut m = TerminalModel::new(10, 5);
        m.feed(b"\x1b[100A");
        assert_eq!(m.cursor(), (0, 0));
        m.feed(b"\x1b[100B");
        assert_eq!(m.cursor(), (0, 4));
    }

    #[test]
    fn csi_up_without_param_moves_one() {
        let mut m = TerminalModel::new(10, 5);
        m.feed(b"\n\n\x1b[A");
        assert_eq!(m.cursor(), (0, 1));
    }

    #[test]
    fn save_restore_cursor() {
        let mut m = TerminalModel::new(40, 3);
        m.feed(b"keep <- \x1b[stemporary\x1b[u\x1b[0Kclean");
        assert_eq!(m.row_text(0), "keep <- clean");
    }

    #[test]
    fn dec_save_restore() {
        let mut m = TerminalModel::new(20, 3);
        m.feed(b"ab\x1b7cd\x1b8X");
        assert_eq!(m.row_text(0), "abXd");
    }

    #[test]
    fn erase_line_modes() {
        let mut m = TerminalModel::new(10, 3);
        m.feed(b"ABCDEFGHIJ\x1b[1;4H\x1b[0K");
        assert_eq!(m.row_text(0), "ABC");

        let mut m = TerminalModel::new(10, 3);
        m.feed(b"ABCDEFGHIJ\x1b[1;4H\x1b[1K");
        assert_eq!(m.row_text(0), "    EFGHIJ");

        let mut m = TerminalModel::new(10, 3);
        m.feed(b"ABCDEFGHIJ\x1b[1;4H\x1b[2K");
        assert_eq!(m.row_text(0), "");
    }

    #[test]
    fn clear_current_line_sequence() {
        let mut m = TerminalModel::new(20, 3);
        m.feed(b"stale bar text\r\x1b[2Kfresh");
        assert_eq!(m.row_text(0), "fresh");
    }

    #[test]
    fn erase_display_all() {
        let mut m = TerminalModel::new(10, 3);
        m.feed(b"XXXXXXXXXXYYYYYYYYYY\x1b[2J");
        assert_eq!(m.screen_text(), "");
    }

    #[test]
    fn sgr_and_osc_are_ignored() {
        let mut m = TerminalModel::new(30, 3);
        m.feed(b"\x1b[1;31mERROR\x1b[0m \x1b]0;title\x07ok \x1b]8;;x\x1b\\link");
        assert_eq!(m.row_text(0), "ERROR ok link");
    }

    #[test]
    fn dump_format() {
        let mut m = TerminalModel::new(5, 2);
        m.feed(b"Hi");
        let dump = m.dump();
        assert!(dump.contains("Hi"));
        assert!(dump.contains("Cursor:"));
    }
}
