//! Integration test: fscanf over buffered streams.
//!
//! Verifies that a scan hands unconsumed lookahead back to the stream so
//! that the next read (scan or `getc`) resumes at the right character, and
//! that `LockedStream` serializes scans across threads.
//!
//! Run: cargo test -p scanlibc-core --test stream_test

use std::cell::Cell;
use std::io::{self, Read};

use scanlibc_core::stdio::scanf::{EOF, ScanArg, ScanOptions, fscanf_report, fscanf_with};
use scanlibc_core::stdio::{LockedStream, Orientation, StdioStream, fscanf_locked};

/// A reader that returns at most one byte per `read` call.
struct Trickle<'a>(&'a [u8]);

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match (self.0.split_first(), buf.first_mut()) {
            (Some((&b, rest)), Some(slot)) => {
                *slot = b;
                self.0 = rest;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

/// Yields `"1"`, then a zero-length read, then `"2"`, counting calls.
struct Flaky<'c> {
    calls: &'c Cell<usize>,
}

impl Read for Flaky<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        let chunk: &[u8] = match call {
            0 => b"1",
            1 => b"",
            _ => b"2",
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }
}

fn strict() -> ScanOptions {
    ScanOptions::strict()
}

// ---------------------------------------------------------------------------
// Resumption
// ---------------------------------------------------------------------------

#[test]
fn literal_mismatch_leaves_offending_character() {
    let mut stream = StdioStream::new(&b"abXdef"[..]);
    assert_eq!(fscanf_with(&mut stream, b"abc", &mut [], &strict()), 0);
    let mut word = [0u8; 8];
    assert_eq!(fscanf_with(&mut stream, b"%s", &mut [ScanArg::Bytes(&mut word)], &strict()), 1);
    assert_eq!(&word[..5], b"Xdef\0");
}

#[test]
fn end_of_input_is_not_read_past() {
    let calls = Cell::new(0);
    let mut stream = StdioStream::new(Flaky { calls: &calls });
    let (mut a, mut b) = (0i32, 0i32);
    let report = fscanf_report(
        &mut stream,
        b"%d %d",
        &mut [ScanArg::I32(&mut a), ScanArg::I32(&mut b)],
        &strict(),
    );
    assert_eq!(report.result, 1);
    assert_eq!(a, 1);
    assert_eq!(b, 0);
    assert_eq!(calls.get(), 2);
}

#[test]
fn integer_lookahead_is_returned_to_stream() {
    let mut stream = StdioStream::new(&b"123abc"[..]);
    let mut v = 0i32;
    assert_eq!(fscanf_with(&mut stream, b"%d", &mut [ScanArg::I32(&mut v)], &strict()), 1);
    assert_eq!(v, 123);
    assert_eq!(stream.getc(), Some(b'a'));
    assert_eq!(stream.position(), 4);
    assert_eq!(stream.orientation(), Orientation::Byte);
}

#[test]
fn consecutive_scans_walk_lines() {
    let mut stream = StdioStream::new(&b"1 2\n3 4\n5 6\n"[..]);
    let mut sums = Vec::new();
    loop {
        let (mut a, mut b) = (0i32, 0i32);
        let r = fscanf_with(
            &mut stream,
            b"%d %d",
            &mut [ScanArg::I32(&mut a), ScanArg::I32(&mut b)],
            &strict(),
        );
        if r != 2 {
            assert_eq!(r, EOF);
            break;
        }
        sums.push(a + b);
    }
    assert_eq!(sums, vec![3, 7, 11]);
    assert!(stream.is_eof());
}

#[test]
fn trailing_format_space_consumes_newline() {
    let mut stream = StdioStream::new(&b"7\n\nx"[..]);
    let mut v = 0i32;
    assert_eq!(fscanf_with(&mut stream, b"%d ", &mut [ScanArg::I32(&mut v)], &strict()), 1);
    assert_eq!(stream.getc(), Some(b'x'));
}

// ---------------------------------------------------------------------------
// End of input
// ---------------------------------------------------------------------------

#[test]
fn empty_stream_is_eof() {
    let mut stream = StdioStream::new(&b""[..]);
    let mut v = 0i32;
    let report = fscanf_report(&mut stream, b"%d", &mut [ScanArg::I32(&mut v)], &strict());
    assert!(report.is_eof());
    assert!(stream.is_eof());
}

#[test]
fn whitespace_only_stream_is_eof() {
    let mut stream = StdioStream::new(&b" \t\n "[..]);
    let mut word = [0u8; 4];
    assert_eq!(fscanf_with(&mut stream, b"%s", &mut [ScanArg::Bytes(&mut word)], &strict()), EOF);
}

// ---------------------------------------------------------------------------
// Buffering variants
// ---------------------------------------------------------------------------

#[test]
fn unbuffered_stream_scans_and_resumes() {
    let mut stream = StdioStream::unbuffered(&b"-42;rest"[..]);
    let mut v = 0i64;
    assert_eq!(fscanf_with(&mut stream, b"%ld", &mut [ScanArg::I64(&mut v)], &strict()), 1);
    assert_eq!(v, -42);
    assert_eq!(stream.getc(), Some(b';'));
}

#[test]
fn one_byte_reads_assemble_fields() {
    let mut stream = StdioStream::new(Trickle(b"3.5e2 word"));
    let mut f = 0f64;
    let mut word = [0u8; 8];
    let r = fscanf_with(
        &mut stream,
        b"%lf %7s",
        &mut [ScanArg::F64(&mut f), ScanArg::Bytes(&mut word)],
        &strict(),
    );
    assert_eq!(r, 2);
    assert_eq!(f, 350.0);
    assert_eq!(&word[..5], b"word\0");
}

#[test]
fn report_consumed_matches_stream_position() {
    let mut stream = StdioStream::new(&b"  0x1fZ"[..]);
    let mut v = 0u32;
    let report = fscanf_report(&mut stream, b"%x", &mut [ScanArg::U32(&mut v)], &strict());
    assert_eq!(report.result, 1);
    assert_eq!(v, 0x1f);
    assert_eq!(report.consumed, 6);
    assert_eq!(stream.position(), 6);
}

// ---------------------------------------------------------------------------
// Locking
// ---------------------------------------------------------------------------

#[test]
fn locked_stream_shared_between_threads() {
    let locked = LockedStream::new(StdioStream::new(&b"1 2 3 4 5 6 7 8"[..]));
    let total: i32 = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let mut sum = 0;
                    for _ in 0..2 {
                        let mut v = 0i32;
                        assert_eq!(fscanf_locked(&locked, b"%d", &mut [ScanArg::I32(&mut v)]), 1);
                        sum += v;
                    }
                    sum
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });
    assert_eq!(total, 36);
    let mut rest = 0i32;
    let mut guard = locked.lock();
    assert_eq!(fscanf_with(&mut *guard, b"%d", &mut [ScanArg::I32(&mut rest)], &strict()), EOF);
}
