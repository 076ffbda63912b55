#![forbid(unsafe_code)]

//! Sanitization for user-supplied text written next to live statusbars.
//!
//! Tags, messages, prefixes and postfixes end up on the same terminal rows
//! the bars are redrawn on. A stray cursor movement or carriage return in
//! any of them shifts every later redraw, so they are treated as **data**:
//!
//! - ESC and the whole CSI/OSC/DCS/PM/APC sequence it introduces are
//!   stripped.
//! - Every other control character (C0, DEL, C1) is replaced with U+FFFD.
//! - [`sanitize_multiline`] keeps LF and TAB, for log message bodies.
//!   [`sanitize_line`] keeps neither, for text that must stay on one row.
//!
//! Both variants are idempotent: their output contains nothing they would
//! change.
//!
//! # Performance
//!
//! Clean input (the overwhelmingly common case) is returned borrowed with
//! no allocation.
//!
//! # Usage
//!
//! ```
//! use sblog_render::sanitize::{sanitize_line, sanitize_multiline, cap_len};
//! use std::borrow::Cow;
//!
//! assert!(matches!(sanitize_line("plain"), Cow::Borrowed(_)));
//! assert_eq!(sanitize_line("a\x1b[2Ab"), "ab");
//! assert_eq!(sanitize_line("nul\x00here"), "nul\u{FFFD}here");
//! assert_eq!(sanitize_multiline("one\ntwo"), "one\ntwo");
//! assert_eq!(cap_len(Cow::Borrowed("abcdefgh"), 6), "abc...");
//! ```

use std::borrow::Cow;

/// Character substituted for disallowed control characters.
pub const REPLACEMENT: char = '\u{FFFD}';

/// Marker appended to text cut by [`cap_len`].
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Line,
    Multiline,
}

impl Mode {
    #[inline]
    fn allows(self, c: char) -> bool {
        match c {
            '\n' | '\t' => self == Mode::Multiline,
            c => !c.is_control(),
        }
    }
}

/// Sanitize text that must stay on a single terminal row.
#[inline]
pub fn sanitize_line(input: &str) -> Cow<'_, str> {
    sanitize_with(input, Mode::Line)
}

/// Sanitize a log message body, keeping LF and TAB.
#[inline]
pub fn sanitize_multiline(input: &str) -> Cow<'_, str> {
    sanitize_with(input, Mode::Multiline)
}

fn sanitize_with(input: &str, mode: Mode) -> Cow<'_, str> {
    if input.chars().all(|c| mode.allows(c)) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(sanitize_slow(input, mode))
}

/// Slow path: strip escape sequences, replace other controls.
fn sanitize_slow(input: &str, mode: Mode) -> String {
    let bytes = input.as_bytes();
    let mut output = String::with_capacity(input.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == 0x1B {
            i = skip_escape_sequence(bytes, i);
            continue;
        }
        // `i` is always on a char boundary: escape skipping only stops
        // after ASCII bytes or at the end of input.
        let Some(c) = input[i..].chars().next() else {
            break;
        };
        output.push(if mode.allows(c) { c } else { REPLACEMENT });
        i += c.len_utf8();
    }

    output
}

/// Skip over an escape sequence, returning the byte index after it.
///
/// Handles:
/// - CSI: ESC [ ... final_byte (0x40-0x7E)
/// - OSC: ESC ] ... (BEL or ST)
/// - DCS/PM/APC: ESC P/^/_ ... ST
/// - Single-char escapes: ESC char
fn skip_escape_sequence(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    if i >= bytes.len() {
        return i;
    }

    match bytes[i] {
        b'[' => {
            i += 1;
            while i < bytes.len() {
                if (0x40..=0x7E).contains(&bytes[i]) {
                    return i + 1;
                }
                i += 1;
            }
        }
        b']' => {
            i += 1;
            while i < bytes.len() {
                if bytes[i] == 0x07 {
                    return i + 1;
                }
                if bytes[i] == 0x1B && i + 1 < bytes.len() && bytes[i + 1] == b'\\' {
                    return i + 2;
                }
                i += 1;
            }
        }
        b'P' | b'^' | b'_' => {
            i += 1;
            while i < bytes.len() {
                if bytes[i] == 0x1B && i + 1 < bytes.len() && bytes[i + 1] == b'\\' {
                    return i + 2;
                }
                i += 1;
            }
        }
        0x20..=0x7E => {
            return i + 1;
        }
        // Unknown introducer: drop the ESC alone.
        _ => {}
    }

    i
}

/// Cap `text` at `max` bytes.
///
/// Longer text is cut on a char boundary and ends in [`ELLIPSIS`], with the
/// whole result still within `max` bytes. When `max` is too small to hold the
/// marker the text is simply cut.
pub fn cap_len(text: Cow<'_, str>, max: usize) -> Cow<'_, str> {
    if text.len() <= max {
        return text;
    }
    let (keep, marker) = if max >= ELLIPSIS.len() {
        (max - ELLIPSIS.len(), ELLIPSIS)
    } else {
        (max, "")
    };
    let cut = floor_char_boundary(&text, keep);
    let mut out = String::with_capacity(cut + marker.len());
    out.push_str(&text[..cut]);
    out.push_str(marker);
    Cow::Owned(out)
}

/// Sanitize for a single row, then cap at `max` bytes.
pub fn clean_line(input: &str, max: usize) -> Cow<'_, str> {
    cap_len(sanitize_line(input), max)
}

/// Sanitize keeping LF and TAB, then cap at `max` bytes.
pub fn clean_multiline(input: &str, max: usize) -> Cow<'_, str> {
    cap_len(sanitize_multiline(input), max)
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============== Fast Path Tests ==============

    #[test]
    fn fast_path_plain_text() {
        let input = "Normal log message without escapes";
        let result = sanitize_line(input);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), input);
    }

    #[test]
    fn fast_path_multiline_keeps_lf_and_tab() {
        let input = "Line1\nLine2\tTabbed";
        let result = sanitize_multiline(input);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), input);
    }

    #[test]
    fn fast_path_unicode() {
        let input = "Hello \u{4e16}\u{754c} \u{1f468}\u{200d}\u{1f469}";
        let result = sanitize_line(input);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), input);
    }

    #[test]
    fn fast_path_empty() {
        assert!(matches!(sanitize_line(""), Cow::Borrowed("")));
    }

    // ============== Escape Sequences ==============

    #[test]
    fn strips_sgr_color() {
        assert_eq!(sanitize_line("Hello \x1b[31mred\x1b[0m world"), "Hello red world");
    }

    #[test]
    fn strips_cursor_movement() {
        assert_eq!(sanitize_line("Before\x1b[2AAfter"), "BeforeAfter");
        assert_eq!(sanitize_multiline("Before\x1b[2;5HAfter"), "BeforeAfter");
    }

    #[test]
    fn strips_osc_title() {
        assert_eq!(sanitize_line("Text\x1b]0;Evil\x07More"), "TextMore");
        assert_eq!(sanitize_line("Text\x1b]0;Evil\x1b\\More"), "TextMore");
    }

    #[test]
    fn strips_dcs_pm_apc() {
        assert_eq!(sanitize_line("A\x1bPdcs\x1b\\B"), "AB");
        assert_eq!(sanitize_line("A\x1b^pm\x1b\\B"), "AB");
        assert_eq!(sanitize_line("A\x1b_apc\x1b\\B"), "AB");
    }

    #[test]
    fn strips_single_char_escape() {
        assert_eq!(sanitize_line("Before\x1b7Middle\x1b8After"), "BeforeMiddleAfter");
    }

    #[test]
    fn truncated_sequences() {
        assert_eq!(sanitize_line("Hello\x1b["), "Hello");
        assert_eq!(sanitize_line("Hello\x1b]0;Title"), "Hello");
        assert_eq!(sanitize_line("Hello\x1b"), "Hello");
    }

    #[test]
    fn esc_before_multibyte_char() {
        assert_eq!(sanitize_line("a\x1b\u{e9}b"), "a\u{e9}b");
    }

    #[test]
    fn csi_spanning_multibyte_bytes_stays_on_boundary() {
        assert_eq!(sanitize_line("a\x1b[\u{4e16}mb"), "ab");
    }

    // ============== Control Characters ==============

    #[test]
    fn replaces_nul_and_soh() {
        assert_eq!(sanitize_line("a\x00b\x01c"), "a\u{FFFD}b\u{FFFD}c");
    }

    #[test]
    fn replaces_del_and_c1() {
        assert_eq!(sanitize_line("a\x7Fb\u{9b}c"), "a\u{FFFD}b\u{FFFD}c");
    }

    #[test]
    fn line_variant_replaces_lf_cr_tab() {
        assert_eq!(sanitize_line("a\nb\rc\td"), "a\u{FFFD}b\u{FFFD}c\u{FFFD}d");
    }

    #[test]
    fn multiline_variant_keeps_lf_tab_but_not_cr() {
        assert_eq!(sanitize_multiline("a\nb\rc\td"), "a\nb\u{FFFD}c\td");
    }

    #[test]
    fn idempotent_on_dirty_input() {
        let inputs = ["\x1b[31mx\x00\n\t\r", "\u{9b}\x7f", "\x1b]0;t", "ok"];
        for input in inputs {
            let once = sanitize_line(input).into_owned();
            assert_eq!(sanitize_line(&once), once.as_str());
            let once = sanitize_multiline(input).into_owned();
            assert_eq!(sanitize_multiline(&once), once.as_str());
        }
    }

    // ============== Length Caps ==============

    #[test]
    fn cap_leaves_short_text() {
        assert!(matches!(cap_len(Cow::Borrowed("abc"), 3), Cow::Borrowed("abc")));
    }

    #[test]
    fn cap_appends_ellipsis_within_limit() {
        let capped = cap_len(Cow::Borrowed("abcdefghij"), 8);
        assert_eq!(capped, "abcde...");
        assert_eq!(capped.len(), 8);
    }

    #[test]
    fn cap_respects_char_boundaries() {
        // Each CJK char is 3 bytes; keep budget 7 - 3 = 4 bytes -> one char.
        let capped = cap_len(Cow::Borrowed("\u{4e16}\u{754c}\u{4e16}"), 7);
        assert_eq!(capped, "\u{4e16}...");
    }

    #[test]
    fn cap_smaller_than_marker() {
        assert_eq!(cap_len(Cow::Borrowed("abcdef"), 2), "ab");
        assert_eq!(cap_len(Cow::Borrowed("abcdef"), 0), "");
    }

    #[test]
    fn clean_line_sanitizes_before_capping() {
        // Replacement chars are 3 bytes; the cap applies to the result.
        let cleaned = clean_line("\x00\x00\x00\x00", 8);
        assert!(cleaned.len() <= 8);
        assert!(cleaned.ends_with(ELLIPSIS));
    }

    #[test]
    fn clean_multiline_keeps_newline() {
        assert_eq!(clean_multiline("a\nb", 16), "a\nb");
    }
}
