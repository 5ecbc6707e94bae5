//! FILE stream state management (input side).
//!
//! Clean-room implementation of the POSIX FILE abstraction for reading.
//! Manages the byte source, buffering, pushback, orientation and the
//! end-of-file/error indicators.
//!
//! Reference: POSIX.1-2024 getc, ungetc, getwc, ungetwc, fwide, flockfile
//!
//! Design: `StdioStream` is the safe Rust model of a C `FILE` open for
//! reading, generic over any `std::io::Read`. `LockedStream` adds the
//! per-stream lock that `flockfile` provides.

use std::io::Read;

use parking_lot::{Mutex, MutexGuard};

use super::buffer::StreamBuffer;
use crate::errno::{EILSEQ, EIO, set_errno};
use crate::wchar::{MbState, MbStep, mbrtowc, wcrtomb};

// ---------------------------------------------------------------------------
// Stream flags
// ---------------------------------------------------------------------------

/// Runtime stream state flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamFlags {
    pub eof: bool,
    pub error: bool,
}

/// Character width a stream is bound to after its first I/O (ISO C 7.21.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Unset,
    Byte,
    Wide,
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

/// POSIX FILE stream open for reading.
#[derive(Debug)]
pub struct StdioStream<R> {
    inner: R,
    buffer: StreamBuffer,
    flags: StreamFlags,
    orientation: Orientation,
    /// Pushed-back bytes that did not fit in the buffer window (LIFO).
    pushback: Vec<u8>,
    /// Pushed-back wide characters (LIFO).
    wide_pushback: Vec<u32>,
    /// Net bytes consumed from the start of the stream.
    position: u64,
}

impl<R: Read> StdioStream<R> {
    /// Create a fully-buffered stream over `inner`.
    pub fn new(inner: R) -> Self {
        Self::with_buffer(inner, StreamBuffer::default_full())
    }

    /// Create a stream that never reads ahead of its consumer.
    pub fn unbuffered(inner: R) -> Self {
        Self::with_buffer(inner, StreamBuffer::unbuffered())
    }

    fn with_buffer(inner: R, buffer: StreamBuffer) -> Self {
        Self {
            inner,
            buffer,
            flags: StreamFlags::default(),
            orientation: Orientation::Unset,
            pushback: Vec::new(),
            wide_pushback: Vec::new(),
            position: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Check if EOF has been reached.
    pub fn is_eof(&self) -> bool {
        self.flags.eof
    }

    /// Check if an error has occurred.
    pub fn is_error(&self) -> bool {
        self.flags.error
    }

    /// Clear EOF and error indicators.
    pub fn clear_err(&mut self) {
        self.flags = StreamFlags::default();
    }

    /// Net bytes consumed so far (pushback moves this backwards).
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Current orientation.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Unwrap the underlying reader. Buffered and pushed-back data is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Query or set the orientation (`fwide`).
    ///
    /// `mode > 0` requests wide, `mode < 0` byte, `0` only queries. An
    /// orientation, once set, never changes. Returns `>0` for wide, `<0`
    /// for byte and `0` for unset.
    pub fn fwide(&mut self, mode: i32) -> i32 {
        if self.orientation == Orientation::Unset {
            if mode > 0 {
                self.orientation = Orientation::Wide;
            } else if mode < 0 {
                self.orientation = Orientation::Byte;
            }
        }
        match self.orientation {
            Orientation::Wide => 1,
            Orientation::Byte => -1,
            Orientation::Unset => 0,
        }
    }

    // -----------------------------------------------------------------------
    // Byte input
    // -----------------------------------------------------------------------

    fn next_raw_byte(&mut self) -> Option<u8> {
        if let Some(b) = self.pushback.pop() {
            return Some(b);
        }
        if let Some(b) = self.buffer.read_byte() {
            return Some(b);
        }
        if self.flags.eof || self.flags.error {
            return None;
        }
        match self.buffer.refill(&mut self.inner) {
            Ok(0) => {
                self.flags.eof = true;
                None
            }
            Ok(_) => self.buffer.read_byte(),
            Err(e) => {
                self.flags.error = true;
                set_errno(e.raw_os_error().unwrap_or(EIO));
                None
            }
        }
    }

    /// Read one byte (`getc`). `None` at end of file or on error.
    pub fn getc(&mut self) -> Option<u8> {
        if self.orientation == Orientation::Unset {
            self.orientation = Orientation::Byte;
        }
        let b = self.next_raw_byte()?;
        self.position += 1;
        Some(b)
    }

    /// Push a byte back (`ungetc`). Clears the EOF indicator.
    ///
    /// Pushback depth is unbounded; bytes come back in LIFO order.
    pub fn ungetc(&mut self, byte: u8) -> bool {
        if !self.pushback.is_empty() || !self.buffer.unget(byte) {
            self.pushback.push(byte);
        }
        self.flags.eof = false;
        self.position = self.position.saturating_sub(1);
        true
    }

    // -----------------------------------------------------------------------
    // Wide input
    // -----------------------------------------------------------------------

    /// Read one UTF-8 encoded wide character (`getwc`).
    ///
    /// `Ok(None)` at end of file or on I/O error. A malformed or truncated
    /// sequence sets the error indicator, sets errno to `EILSEQ` and
    /// returns `Err(EILSEQ)`.
    pub fn getwc(&mut self) -> Result<Option<u32>, i32> {
        if self.orientation == Orientation::Unset {
            self.orientation = Orientation::Wide;
        }
        if let Some(wc) = self.wide_pushback.pop() {
            self.position += utf8_len(wc);
            return Ok(Some(wc));
        }

        let mut state = MbState::new();
        let mut used = 0u64;
        loop {
            let Some(b) = self.next_raw_byte() else {
                if used == 0 {
                    return Ok(None);
                }
                return Err(self.decode_failure(used));
            };
            used += 1;
            match mbrtowc(&mut state, &[b]) {
                Ok(MbStep::Char(wc, _)) => {
                    self.position += used;
                    return Ok(Some(wc));
                }
                Ok(MbStep::Incomplete(_)) => {}
                Err(_) => return Err(self.decode_failure(used)),
            }
        }
    }

    fn decode_failure(&mut self, used: u64) -> i32 {
        self.position += used;
        self.flags.error = true;
        set_errno(EILSEQ);
        EILSEQ
    }

    /// Push a wide character back (`ungetwc`). Clears the EOF indicator.
    pub fn ungetwc(&mut self, wc: u32) -> bool {
        self.wide_pushback.push(wc);
        self.flags.eof = false;
        self.position = self.position.saturating_sub(utf8_len(wc));
        true
    }
}

fn utf8_len(wc: u32) -> u64 {
    let mut buf = [0u8; 4];
    wcrtomb(wc, &mut buf).map_or(1, |n| n as u64)
}

// ---------------------------------------------------------------------------
// Locking
// ---------------------------------------------------------------------------

/// A stream shared between threads, locked for the duration of each use
/// (`flockfile`/`funlockfile`).
#[derive(Debug)]
pub struct LockedStream<R> {
    inner: Mutex<StdioStream<R>>,
}

impl<R: Read> LockedStream<R> {
    pub fn new(stream: StdioStream<R>) -> Self {
        Self {
            inner: Mutex::new(stream),
        }
    }

    /// Acquire the stream lock. Released when the guard drops.
    pub fn lock(&self) -> MutexGuard<'_, StdioStream<R>> {
        self.inner.lock()
    }

    pub fn into_inner(self) -> StdioStream<R> {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getc_until_eof() {
        let mut s = StdioStream::new(&b"ab"[..]);
        assert_eq!(s.getc(), Some(b'a'));
        assert_eq!(s.getc(), Some(b'b'));
        assert!(!s.is_eof());
        assert_eq!(s.getc(), None);
        assert!(s.is_eof());
        assert_eq!(s.position(), 2);
    }

    #[test]
    fn test_ungetc_clears_eof_and_is_lifo() {
        let mut s = StdioStream::new(&b"x"[..]);
        assert_eq!(s.getc(), Some(b'x'));
        assert_eq!(s.getc(), None);
        assert!(s.ungetc(b'2'));
        assert!(s.ungetc(b'1'));
        assert!(!s.is_eof());
        assert_eq!(s.getc(), Some(b'1'));
        assert_eq!(s.getc(), Some(b'2'));
        assert_eq!(s.getc(), None);
    }

    #[test]
    fn test_deep_pushback_beyond_buffer() {
        let mut s = StdioStream::unbuffered(&b""[..]);
        for b in b"abcdef".iter().rev() {
            s.ungetc(*b);
        }
        let got: Vec<u8> = std::iter::from_fn(|| s.getc()).collect();
        assert_eq!(got, b"abcdef");
    }

    #[test]
    fn test_getwc_decodes_utf8() {
        let mut s = StdioStream::new("é€".as_bytes());
        assert_eq!(s.getwc(), Ok(Some(0xE9)));
        assert_eq!(s.getwc(), Ok(Some(0x20AC)));
        assert_eq!(s.getwc(), Ok(None));
        assert_eq!(s.position(), 5);
        assert!(s.ungetwc(0x20AC));
        assert_eq!(s.position(), 2);
        assert_eq!(s.getwc(), Ok(Some(0x20AC)));
    }

    #[test]
    fn test_getwc_reports_malformed_input() {
        let mut s = StdioStream::new(&[0xE2u8, 0x82][..]);
        assert_eq!(s.getwc(), Err(EILSEQ));
        assert!(s.is_error());
        s.clear_err();
        assert!(!s.is_error());
    }

    #[test]
    fn test_orientation_is_sticky() {
        let mut s = StdioStream::new(&b"a"[..]);
        assert_eq!(s.fwide(0), 0);
        assert_eq!(s.fwide(1), 1);
        assert_eq!(s.fwide(-1), 1);
        let mut t = StdioStream::new(&b"a"[..]);
        t.getc();
        assert_eq!(t.orientation(), Orientation::Byte);
        assert_eq!(t.fwide(1), -1);
    }

    #[test]
    fn test_io_error_sets_indicator() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("boom"))
            }
        }
        let mut s = StdioStream::new(Broken);
        assert_eq!(s.getc(), None);
        assert!(s.is_error());
        assert!(!s.is_eof());
    }

    #[test]
    fn test_locked_stream_serializes_access() {
        let shared = std::sync::Arc::new(LockedStream::new(StdioStream::new(&b"abcd"[..])));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let shared = std::sync::Arc::clone(&shared);
                std::thread::spawn(move || {
                    let mut s = shared.lock();
                    [s.getc(), s.getc()]
                })
            })
            .collect();
        let mut pairs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![[Some(b'a'), Some(b'b')], [Some(b'c'), Some(b'd')]]
        );
    }
}
