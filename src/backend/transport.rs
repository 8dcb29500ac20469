//! Transport traits for the device link
//!
//! A [`Transport`] is the write side of a line-oriented connection and
//! hands out a [`LineReader`] for the read side when opened, so reading
//! can run on its own thread while commands are written from the worker.
//! Both real serial ports and the simulated device implement these.

use crate::error::Result;
use std::time::Duration;

/// Upper bound on a single line; longer garbage is discarded
pub const MAX_LINE_LENGTH: usize = 4096;

/// Write side of the device link
///
/// Implementations must be `Send` so the worker can own them.
///
/// # Example
///
/// ```ignore
/// fn greet(transport: &mut dyn Transport) -> Result<()> {
///     let _reader = transport.open("/dev/ttyUSB0", 115200)?;
///     transport.write_line("status")
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Open the port and return the read half
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<Box<dyn LineReader>>;

    /// Close the port. Safe to call when already closed.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Write `line` followed by a newline
    fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Read side of the device link
pub trait LineReader: Send {
    /// Wait up to `timeout` for one complete line.
    ///
    /// Returns `Ok(None)` on timeout. Line terminators are stripped.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;
}

/// Splits a byte stream into text lines.
///
/// Bytes are buffered until `\n`; a trailing `\r` is dropped and invalid
/// UTF-8 is replaced rather than rejected. Blank lines are skipped.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
    overflowed: bool,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Take the next complete, non-blank line if one is buffered
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
                if self.buffer.len() > MAX_LINE_LENGTH {
                    tracing::debug!("Discarding {} bytes without newline", self.buffer.len());
                    self.buffer.clear();
                    self.overflowed = true;
                }
                return None;
            };

            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if std::mem::take(&mut self.overflowed) {
                // Tail of a line whose head was already discarded
                continue;
            }
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }

    /// Number of bytes waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembler_splits_lines() {
        let mut asm = LineAssembler::new();
        asm.push(b"Gas Level: 1 ppm|Alert:0|R0:9\r\nCalibration pro");
        assert_eq!(
            asm.next_line().as_deref(),
            Some("Gas Level: 1 ppm|Alert:0|R0:9")
        );
        assert_eq!(asm.next_line(), None);
        asm.push(b"gress: 10%\n");
        assert_eq!(asm.next_line().as_deref(), Some("Calibration progress: 10%"));
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn test_assembler_skips_blank_lines() {
        let mut asm = LineAssembler::new();
        asm.push(b"\r\n\n   \nstatus ok\n");
        assert_eq!(asm.next_line().as_deref(), Some("status ok"));
        assert_eq!(asm.next_line(), None);
    }

    #[test]
    fn test_assembler_lossy_utf8() {
        let mut asm = LineAssembler::new();
        asm.push(&[b'R', b'0', 0xFF, b'\n']);
        assert_eq!(asm.next_line().as_deref(), Some("R0\u{FFFD}"));
    }

    #[test]
    fn test_assembler_discards_overlong_line() {
        let mut asm = LineAssembler::new();
        asm.push(&vec![b'x'; MAX_LINE_LENGTH + 1]);
        assert_eq!(asm.next_line(), None);
        assert_eq!(asm.pending(), 0);
        asm.push(b"tail of garbage\nnext\n");
        assert_eq!(asm.next_line().as_deref(), Some("next"));
    }
}
