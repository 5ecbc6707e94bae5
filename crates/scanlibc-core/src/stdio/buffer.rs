//! Read-side stream buffering.
//!
//! Clean-room implementation of POSIX stdio input buffering.
//!
//! Reference: POSIX.1-2024 setvbuf, ISO C11 7.21.3
//!
//! Design: a fixed-capacity byte window with a read cursor. Bytes are
//! pulled from any `std::io::Read` when the window runs dry. Pushback
//! reuses already-consumed space in front of the cursor.

use std::io::{self, Read};

/// Default buffer size (POSIX BUFSIZ).
pub const BUFSIZ: usize = 8192;

/// Input buffer for a single stream.
///
/// Invariants:
/// - `pos <= filled <= data.len()`
/// - `data.len()` is fixed at creation and at least 1
#[derive(Debug)]
pub struct StreamBuffer {
    data: Vec<u8>,
    /// Next byte to hand out.
    pos: usize,
    /// Number of valid bytes in `data`.
    filled: usize,
}

impl StreamBuffer {
    /// Create a buffer holding up to `capacity` bytes (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity.max(1)],
            pos: 0,
            filled: 0,
        }
    }

    /// Create a buffer with default BUFSIZ.
    pub fn default_full() -> Self {
        Self::new(BUFSIZ)
    }

    /// Create a one-byte buffer. Every refill reads at most one byte, so
    /// the underlying reader is never read ahead of the consumer.
    pub fn unbuffered() -> Self {
        Self::new(1)
    }

    /// Buffer capacity.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of buffered bytes available for reading.
    pub fn readable(&self) -> usize {
        self.filled - self.pos
    }

    /// Take the next buffered byte, if any.
    pub fn read_byte(&mut self) -> Option<u8> {
        if self.pos < self.filled {
            let b = self.data[self.pos];
            self.pos += 1;
            Some(b)
        } else {
            None
        }
    }

    /// Refill an empty buffer from `source`.
    ///
    /// Returns the number of bytes now buffered; `0` means end of input.
    /// Interrupted reads are retried.
    pub fn refill<R: Read>(&mut self, source: &mut R) -> io::Result<usize> {
        debug_assert_eq!(self.readable(), 0);
        self.pos = 0;
        self.filled = 0;
        loop {
            match source.read(&mut self.data) {
                Ok(n) => {
                    self.filled = n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Push a single byte back in front of the cursor (for ungetc).
    ///
    /// Returns `false` if the buffer has no room left.
    pub fn unget(&mut self, byte: u8) -> bool {
        if self.pos > 0 {
            self.pos -= 1;
            self.data[self.pos] = byte;
            true
        } else if self.filled < self.data.len() {
            self.data.copy_within(0..self.filled, 1);
            self.data[0] = byte;
            self.filled += 1;
            true
        } else {
            false
        }
    }

    /// Discard all buffered data.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.filled = 0;
    }
}
