//! Line protocol response builder

use bytes::BytesMut;
use itoa::Buffer;
use std::fmt::Write;

/// Response writer for the line protocol
pub struct ResponseWriter {
    buf: BytesMut,
}

impl ResponseWriter {
    /// Create a new response writer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the internal buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Take the buffer, leaving an empty buffer in its place
    pub fn take(&mut self) -> BytesMut {
        std::mem::take(&mut self.buf)
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Returns true if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write a found value
    /// Format: $<len>\n<value>\n
    pub fn bulk(&mut self, value: &str) {
        let mut itoa_buf = Buffer::new();
        self.buf.extend_from_slice(b"$");
        self.buf
            .extend_from_slice(itoa_buf.format(value.len()).as_bytes());
        self.buf.extend_from_slice(b"\n");
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.extend_from_slice(b"\n");
    }

    /// Write the not-found sentinel
    pub fn nil(&mut self) {
        self.buf.extend_from_slice(b"$-1\n");
    }

    /// Write +OK
    pub fn ok(&mut self) {
        self.buf.extend_from_slice(b"+OK\n");
    }

    /// Write a double-quoted string, escaped
    pub fn quoted(&mut self, text: &str) {
        self.buf.extend_from_slice(quote(text).as_bytes());
        self.buf.extend_from_slice(b"\n");
    }

    /// Write an error line
    /// Format: -ERR <message>\n
    pub fn error(&mut self, message: &str) {
        self.buf.extend_from_slice(b"-ERR ");
        self.buf.extend_from_slice(message.as_bytes());
        self.buf.extend_from_slice(b"\n");
    }

    /// Write the unknown command error, echoing what was sent
    pub fn unknown_command(&mut self, name: &str, args: &[String]) {
        self.error(&format!(
            "unknown command `{name}`, with args beginning with [{}]",
            args.join(" ")
        ));
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new(4096)
    }
}

/// Quote text the way Go's `%q` verb does
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if is_printable(c) => out.push(c),
            c if (c as u32) < 0x10000 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('"');
    out
}

/// Printable in the sense of Go's `strconv.IsPrint`: graphic characters and
/// the ASCII space, but not other spacing, format, private-use or
/// noncharacter code points.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c as u32,
        0x00AD
            | 0x061C
            | 0x180E
            | 0x200B..=0x200F
            | 0x202A..=0x202E
            | 0x2060..=0x206F
            | 0xE000..=0xF8FF
            | 0xFDD0..=0xFDEF
            | 0xFEFF
            | 0xFFF9..=0xFFFB
            | 0xFFFE..=0xFFFF
            | 0xE0000..=0xE007F
            | 0xF0000..
    )
}
