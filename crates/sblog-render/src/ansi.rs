#![forbid(unsafe_code)]

//! Cursor and line-erase control sequences.
//!
//! Every cursor operation a sink can perform is a [`CursorOp`]. Sinks that
//! drive a real terminal send [`CursorOp::encode`] output verbatim; sinks
//! backed by plain files interpret the op themselves.
//!
//! | op                  | bytes        |
//! |---------------------|--------------|
//! | `SaveCursor`        | `ESC[s`      |
//! | `RestoreCursor`     | `ESC[u`      |
//! | `Up(n)`             | `ESC[<n>A`   |
//! | `Down(n)`           | `n` × `\n`   |
//! | `ClearToEnd`        | `ESC[0K`     |
//! | `ClearFromStart`    | `ESC[1K`     |
//! | `ClearLine`         | `ESC[2K`     |
//! | `ClearCurrentLine`  | `\rESC[2K`   |

pub const SAVE_CURSOR: &[u8] = b"\x1b[s";
pub const RESTORE_CURSOR: &[u8] = b"\x1b[u";
pub const CLEAR_TO_END: &[u8] = b"\x1b[0K";
pub const CLEAR_FROM_START: &[u8] = b"\x1b[1K";
pub const CLEAR_LINE: &[u8] = b"\x1b[2K";
pub const CLEAR_CURRENT_LINE: &[u8] = b"\r\x1b[2K";

/// A single cursor or erase operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOp {
    SaveCursor,
    RestoreCursor,
    /// Move up `n` rows, column unchanged.
    Up(u32),
    /// Move down `n` rows by emitting newlines, scrolling at the bottom.
    Down(u32),
    ClearToEnd,
    ClearFromStart,
    ClearLine,
    /// Return to column 0 and erase the whole row.
    ClearCurrentLine,
}

impl CursorOp {
    /// Relative row movement: positive is up, negative is down.
    ///
    /// Returns `None` for `0`, which moves nothing.
    #[must_use]
    pub fn rows(n: i64) -> Option<Self> {
        let magnitude = u32::try_from(n.unsigned_abs()).unwrap_or(u32::MAX);
        match n {
            0 => None,
            n if n > 0 => Some(Self::Up(magnitude)),
            _ => Some(Self::Down(magnitude)),
        }
    }

    /// Whether this op erases part of a row.
    #[must_use]
    pub const fn is_erase(self) -> bool {
        matches!(
            self,
            Self::ClearToEnd | Self::ClearFromStart | Self::ClearLine | Self::ClearCurrentLine
        )
    }

    /// Append the terminal encoding to `out`.
    pub fn encode_into(self, out: &mut Vec<u8>) {
        match self {
            Self::SaveCursor => out.extend_from_slice(SAVE_CURSOR),
            Self::RestoreCursor => out.extend_from_slice(RESTORE_CURSOR),
            Self::Up(0) | Self::Down(0) => {}
            Self::Up(n) => out.extend_from_slice(format!("\x1b[{n}A").as_bytes()),
            Self::Down(n) => out.resize(out.len() + n as usize, b'\n'),
            Self::ClearToEnd => out.extend_from_slice(CLEAR_TO_END),
            Self::ClearFromStart => out.extend_from_slice(CLEAR_FROM_START),
            Self::ClearLine => out.extend_from_slice(CLEAR_LINE),
            Self::ClearCurrentLine => out.extend_from_slice(CLEAR_CURRENT_LINE),
        }
    }

    /// Terminal encoding as a fresh buffer.
    #[must_use]
    pub fn encode(self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }
}
