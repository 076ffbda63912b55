#![forbid(unsafe_code)]

//! Cursor emulation for sinks backed by regular files.
//!
//! A file cannot move a cursor, so escape sequences written into it would
//! only leave garbage behind. Instead the trailing rows of the file are held
//! in memory as a small screen: cursor-up rewinds into them (reading earlier
//! rows back from disk when needed), writes overwrite the row under the
//! cursor, and the file is truncated and rewritten from the first held row
//! after every operation. The file therefore always reads like the final
//! state of a terminal: log lines followed by the current bar lines.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use sblog_render::CursorOp;

/// Rows above the cursor kept in memory before they are committed.
const KEEP_ROWS: usize = 64;

/// Read-back chunk when scanning the file for line starts.
const CHUNK: usize = 4096;

#[derive(Debug)]
pub(crate) struct FileScreen {
    file: File,
    /// Offset of `rows[0]`; everything before is final.
    base: u64,
    /// Rows from `base`, joined by `\n` on disk. Never empty.
    rows: Vec<Vec<u8>>,
    /// Row number of `rows[0]`, relative to where the file was opened.
    origin: i64,
    row: usize,
    col: usize,
    saved: Option<(i64, usize)>,
}

impl FileScreen {
    /// Take over `file`, placing the cursor at the end of its last line.
    pub(crate) fn open(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        let mut screen = Self {
            file,
            base: len,
            rows: vec![Vec::new()],
            origin: 0,
            row: 0,
            col: 0,
            saved: None,
        };
        if len > 0 {
            let start = screen.line_start_before(len, 1)?;
            let partial = screen.read_range(start, len)?;
            screen.col = partial.len();
            screen.rows[0] = partial;
            screen.base = start;
        }
        Ok(screen)
    }

    pub(crate) fn file(&self) -> &File {
        &self.file
    }

    pub(crate) fn into_file(self) -> File {
        self.file
    }

    /// Apply text, treating LF as a move to column 0 of the next row and CR
    /// as a return to column 0.
    pub(crate) fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let stop = memchr::memchr2(b'\n', b'\r', rest).unwrap_or(rest.len());
            self.overwrite(&rest[..stop]);
            match rest.get(stop) {
                Some(b'\n') => self.next_row(),
                Some(_) => self.col = 0,
                None => {}
            }
            rest = rest.get(stop + 1..).unwrap_or_default();
        }
        self.sync()?;
        Ok(bytes.len())
    }

    pub(crate) fn apply(&mut self, op: CursorOp) -> io::Result<()> {
        match op {
            CursorOp::Up(n) => self.up(n as usize)?,
            CursorOp::Down(n) => {
                for _ in 0..n {
                    self.next_row();
                }
            }
            CursorOp::SaveCursor => {
                self.saved = Some((self.origin + self.row as i64, self.col));
            }
            CursorOp::RestoreCursor => {
                if let Some((abs, col)) = self.saved {
                    self.move_to(abs)?;
                    self.col = col;
                }
            }
            CursorOp::ClearToEnd => {
                let col = self.col;
                self.current().truncate(col);
            }
            CursorOp::ClearFromStart => {
                let col = self.col;
                let row = self.current();
                let end = (col + 1).min(row.len());
                row[..end].fill(b' ');
            }
            CursorOp::ClearLine => self.current().clear(),
            CursorOp::ClearCurrentLine => {
                self.current().clear();
                self.col = 0;
            }
        }
        self.sync()
    }

    fn current(&mut self) -> &mut Vec<u8> {
        &mut self.rows[self.row]
    }

    fn overwrite(&mut self, text: &[u8]) {
        if text.is_empty() {
            return;
        }
        let col = self.col;
        let row = self.current();
        if row.len() < col {
            row.resize(col, b' ');
        }
        let end = (col + text.len()).min(row.len());
        row.splice(col..end, text.iter().copied());
        self.col = col + text.len();
    }

    fn next_row(&mut self) {
        self.row += 1;
        self.col = 0;
        if self.row == self.rows.len() {
            self.rows.push(Vec::new());
        }
    }

    fn up(&mut self, n: usize) -> io::Result<()> {
        if n > self.row {
            self.load_above(n - self.row)?;
        }
        self.row = self.row.saturating_sub(n);
        Ok(())
    }

    fn move_to(&mut self, abs: i64) -> io::Result<()> {
        let current = self.origin + self.row as i64;
        if abs <= current {
            let delta = usize::try_from(current - abs).unwrap_or(usize::MAX);
            self.up(delta)
        } else {
            for _ in current..abs {
                self.next_row();
            }
            Ok(())
        }
    }

    /// Pull up to `n` committed rows from disk back into memory.
    fn load_above(&mut self, n: usize) -> io::Result<()> {
        if self.base == 0 || n == 0 {
            return Ok(());
        }
        // `base - 1` is the newline ending the last committed row.
        let end = self.base - 1;
        let start = self.line_start_before(end, n)?;
        let bytes = self.read_range(start, end)?;
        let loaded: Vec<Vec<u8>> = bytes.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect();
        let count = loaded.len();
        self.rows.splice(0..0, loaded);
        self.row += count;
        self.origin -= count as i64;
        self.base = start;
        Ok(())
    }

    /// Offset just after the `count`-th newline found scanning back from
    /// `end`, or 0 if the file has fewer.
    fn line_start_before(&mut self, end: u64, count: usize) -> io::Result<u64> {
        let mut pos = end;
        let mut seen = 0;
        let mut buf = [0u8; CHUNK];
        while pos > 0 {
            let len = usize::try_from(pos).map_or(CHUNK, |p| p.min(CHUNK));
            let start = pos - len as u64;
            self.file.seek(SeekFrom::Start(start))?;
            self.file.read_exact(&mut buf[..len])?;
            let mut window = &buf[..len];
            while let Some(i) = memchr::memrchr(b'\n', window) {
                seen += 1;
                if seen == count {
                    return Ok(start + i as u64 + 1);
                }
                window = &window[..i];
            }
            pos = start;
        }
        Ok(0)
    }

    fn read_range(&mut self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        let len = usize::try_from(end.saturating_sub(start))
            .map_err(|_| io::Error::other("row too large to hold in memory"))?;
        let mut bytes = vec![0u8; len];
        self.file.seek(SeekFrom::Start(start))?;
        self.file.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Rewrite the held rows, then commit rows far above the cursor.
    fn sync(&mut self) -> io::Result<()> {
        self.file.set_len(self.base)?;
        self.file.seek(SeekFrom::Start(self.base))?;
        let mut tail = Vec::with_capacity(self.rows.iter().map(|r| r.len() + 1).sum());
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                tail.push(b'\n');
            }
            tail.extend_from_slice(row);
        }
        self.file.write_all(&tail)?;

        while self.row > KEEP_ROWS {
            let first = self.rows.remove(0);
            self.base += first.len() as u64 + 1;
            self.origin += 1;
            self.row -= 1;
        }
        Ok(())
    }
}
