#![forbid(unsafe_code)]

//! Output destinations.
//!
//! A [`Sink`] wraps one of three destinations behind its own lock:
//!
//! | type            | owns destination | cursor ops                          |
//! |-----------------|------------------|-------------------------------------|
//! | `Stdout`        | no               | ANSI, raw descriptor writes         |
//! | `OwnedFile`     | yes              | ANSI on a tty, emulated otherwise   |
//! | `WrappedStream` | no               | ANSI                                |
//!
//! Everything that must appear atomically on screen (cursor up, clear, text,
//! cursor down) is done through one [`SinkGuard`].

mod file_screen;
mod registry;

pub use registry::SinkRegistry;

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use sblog_render::{CursorOp, Viewport};

use crate::error::{SinkError, SinkResult, WidthError};
use crate::width::ColumnProbe;
use file_screen::FileScreen;

/// Destination type reported by [`Sink::sink_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkType {
    /// Destroyed, or never bound.
    Invalid,
    Stdout,
    OwnedFile,
    WrappedStream,
}

/// A caller-provided writer to be wrapped by a sink.
pub struct WrappedStream {
    writer: Box<dyn Write + Send>,
    interactive: bool,
}

impl WrappedStream {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            interactive: false,
        }
    }

    /// Treat the stream as a terminal: bar lines are fitted to the width the
    /// column probe reports.
    #[must_use]
    pub fn assume_terminal(mut self) -> Self {
        self.interactive = true;
        self
    }
}

impl fmt::Debug for WrappedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedStream")
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

enum Target {
    Stdout(io::Stdout),
    /// Owned file that is itself a terminal device.
    TerminalFile(File),
    /// Owned regular file with emulated cursor movement.
    File(FileScreen),
    Stream {
        writer: Box<dyn Write + Send>,
        interactive: bool,
        failed: bool,
    },
    Closed,
}

impl Target {
    fn sink_type(&self) -> SinkType {
        match self {
            Self::Stdout(_) => SinkType::Stdout,
            Self::TerminalFile(_) | Self::File(_) => SinkType::OwnedFile,
            Self::Stream { .. } => SinkType::WrappedStream,
            Self::Closed => SinkType::Invalid,
        }
    }
}

/// One output destination and its lock.
pub struct Sink {
    target: Mutex<Target>,
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("type", &self.sink_type())
            .finish()
    }
}

impl Sink {
    fn from_target(target: Target) -> Self {
        Self {
            target: Mutex::new(target),
        }
    }

    pub(crate) fn stdout() -> Self {
        Self::from_target(Target::Stdout(io::stdout()))
    }

    pub(crate) fn open_file(path: &Path) -> SinkResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)
            .map_err(|err| SinkError::open(path, err))?;
        let target = if platform::is_terminal(&file) {
            Target::TerminalFile(file)
        } else {
            Target::File(FileScreen::open(file).map_err(|err| SinkError::open(path, err))?)
        };
        Ok(Self::from_target(target))
    }

    pub(crate) fn stream(stream: WrappedStream) -> Self {
        Self::from_target(Target::Stream {
            writer: stream.writer,
            interactive: stream.interactive,
            failed: false,
        })
    }

    /// Take the sink's lock.
    pub fn lock(&self) -> SinkGuard<'_> {
        SinkGuard {
            target: self.target.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn sink_type(&self) -> SinkType {
        self.lock().sink_type()
    }

    /// Write all of `bytes`, taking the lock for the duration.
    pub fn write(&self, bytes: &[u8]) -> SinkResult<usize> {
        self.lock().write(bytes)
    }

    pub fn flush(&self) -> SinkResult<()> {
        self.lock().flush()
    }
}

/// Exclusive access to a sink.
pub struct SinkGuard<'a> {
    target: MutexGuard<'a, Target>,
}

impl SinkGuard<'_> {
    pub fn sink_type(&self) -> SinkType {
        self.target.sink_type()
    }

    /// Whether cursor operations reach a terminal.
    pub fn is_tty(&self) -> bool {
        match &*self.target {
            Target::Stdout(stdout) => platform::is_terminal(stdout),
            Target::TerminalFile(_) => true,
            Target::File(_) | Target::Closed => false,
            Target::Stream { interactive, .. } => *interactive,
        }
    }

    /// Write all of `bytes`. Zero-length writes do nothing.
    pub fn write(&mut self, bytes: &[u8]) -> SinkResult<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }
        match &mut *self.target {
            Target::Stdout(stdout) => Ok(platform::write_stdout(stdout, bytes)?),
            Target::TerminalFile(file) => {
                file.write_all(bytes)?;
                Ok(bytes.len())
            }
            Target::File(screen) => Ok(screen.write(bytes)?),
            Target::Stream {
                writer,
                failed,
                ..
            } => {
                if *failed {
                    return Err(SinkError::StreamFailed);
                }
                writer.write_all(bytes).map_err(|err| {
                    *failed = true;
                    SinkError::Io(err)
                })?;
                Ok(bytes.len())
            }
            Target::Closed => Err(SinkError::Closed),
        }
    }

    /// Flush buffered output. Descriptor-backed sinks write unbuffered, so
    /// this does nothing for them.
    pub fn flush(&mut self) -> SinkResult<()> {
        match &mut *self.target {
            Target::Stdout(_) | Target::TerminalFile(_) | Target::File(_) => Ok(()),
            Target::Stream {
                writer, failed, ..
            } => {
                if *failed {
                    return Err(SinkError::StreamFailed);
                }
                writer.flush().map_err(|err| {
                    *failed = true;
                    SinkError::Io(err)
                })
            }
            Target::Closed => Err(SinkError::Closed),
        }
    }

    /// Perform one cursor operation.
    pub fn cursor(&mut self, op: CursorOp) -> SinkResult<()> {
        if let Target::File(screen) = &mut *self.target {
            return Ok(screen.apply(op)?);
        }
        let bytes = op.encode();
        self.write(&bytes).map(drop)
    }

    /// Move the cursor `n` rows: up for positive, down (by newlines) for
    /// negative, nothing for zero.
    pub fn move_cursor(&mut self, n: i64) -> SinkResult<()> {
        match CursorOp::rows(n) {
            Some(op) => self.cursor(op),
            None => Ok(()),
        }
    }

    /// Terminal width from the sink's descriptor.
    pub fn descriptor_columns(&self) -> Result<u16, WidthError> {
        match &*self.target {
            Target::Stdout(stdout) => platform::columns(stdout),
            Target::TerminalFile(file) => platform::columns(file),
            _ => Err(WidthError::NoDescriptor),
        }
    }

    /// Width available for bar lines, and the query failure if there was one.
    pub fn viewport(&self, probe: &dyn ColumnProbe) -> (Viewport, Option<WidthError>) {
        if !self.is_tty() {
            return (Viewport::Unbounded, None);
        }
        match probe.columns(self) {
            Ok(columns) => (Viewport::Columns(columns), None),
            Err(err) => (Viewport::Unknown, Some(err)),
        }
    }

    /// Flush, then release the destination. Owned files are closed; borrowed
    /// destinations are left open.
    pub(crate) fn close(&mut self) -> SinkResult<()> {
        let already_failed = matches!(&*self.target, Target::Stream { failed: true, .. });
        let flushed = if already_failed { Ok(()) } else { self.flush() };
        match std::mem::replace(&mut *self.target, Target::Closed) {
            Target::File(screen) => drop(screen.into_file()),
            Target::TerminalFile(file) => drop(file),
            _ => {}
        }
        flushed
    }

    #[cfg(test)]
    pub(crate) fn file(&self) -> Option<&File> {
        match &*self.target {
            Target::File(screen) => Some(screen.file()),
            Target::TerminalFile(file) => Some(file),
            _ => None,
        }
    }
}

#[cfg(unix)]
mod platform {
    use std::io;
    use std::os::fd::AsFd;

    use rustix::io::Errno;

    use crate::error::WidthError;

    pub(super) fn is_terminal(fd: &impl AsFd) -> bool {
        rustix::termios::isatty(fd)
    }

    /// Unbuffered write to the stdout descriptor, retrying on EINTR and
    /// looping over short writes.
    pub(super) fn write_stdout(stdout: &io::Stdout, bytes: &[u8]) -> io::Result<usize> {
        let fd = stdout.as_fd();
        let mut rest = bytes;
        while !rest.is_empty() {
            match rustix::io::write(fd, rest) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => rest = &rest[n..],
                Err(Errno::INTR) => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
        Ok(bytes.len())
    }

    pub(super) fn columns(fd: &impl AsFd) -> Result<u16, WidthError> {
        let size = rustix::termios::tcgetwinsize(fd).map_err(|e| WidthError::Query(e.into()))?;
        if size.ws_col == 0 {
            return Err(WidthError::Query(io::Error::other(
                "terminal reported zero columns",
            )));
        }
        Ok(size.ws_col)
    }
}

#[cfg(not(unix))]
mod platform {
    use std::io::{self, IsTerminal, Write};

    use crate::error::WidthError;

    pub(super) fn is_terminal(handle: &impl IsTerminal) -> bool {
        handle.is_terminal()
    }

    pub(super) fn write_stdout(stdout: &io::Stdout, bytes: &[u8]) -> io::Result<usize> {
        let mut lock = stdout.lock();
        lock.write_all(bytes)?;
        lock.flush()?;
        Ok(bytes.len())
    }

    pub(super) fn columns<T>(_handle: &T) -> Result<u16, WidthError> {
        Err(WidthError::NoDescriptor)
    }
}
