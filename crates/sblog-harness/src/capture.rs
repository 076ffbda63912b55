#![forbid(unsafe_code)]

//! In-memory writers for capturing sink output.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::terminal_model::TerminalModel;

/// Cloneable byte buffer implementing [`Write`].
///
/// Hand one clone to a sink and keep the other to inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Written bytes decoded lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    /// Drain the buffer.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Replay the captured bytes through a fresh terminal model.
    pub fn render(&self, width: u16, height: u16) -> TerminalModel {
        let mut model = TerminalModel::new(width, height);
        model.feed(&self.lock());
        model
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that accepts `budget` bytes, then fails every call.
#[derive(Debug, Clone)]
pub struct FailingWriter {
    budget: usize,
    inner: SharedBuffer,
}

impl FailingWriter {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            inner: SharedBuffer::new(),
        }
    }

    /// Bytes accepted before the failure.
    pub fn accepted(&self) -> SharedBuffer {
        self.inner.clone()
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "writer closed"));
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        self.inner.write(&buf[..n])
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.budget == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "writer closed"));
        }
        Ok(())
    }
}

/// Remove CSI and OSC sequences from captured bytes.
pub fn strip_ansi(input: &[u8]) -> String {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == 0x1b {
            if i + 1 >= input.len() {
                break;
            }
            let next = input[i + 1];
            if next == b'[' {
                i += 2;
                while i < input.len() {
                    let byte = input[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&byte) {
                        break;
                    }
                }
                continue;
            }
            if next == b']' {
                i += 2;
                while i < input.len() {
                    if input[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if input[i] == 0x1b && i + 1 < input.len() && input[i + 1] == b'\\' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                continue;
            }
            i += 2;
            continue;
        }
        out.push(input[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
