//! Formatted input: `sscanf`, `fscanf`, `swscanf`, `fwscanf`.
//!
//! Clean-room implementation of the `scanf` family over a safe target
//! list. Where C passes a variadic list of pointers, callers here pass a
//! slice of [`ScanArg`] values; `%N$` directives index it directly.
//!
//! Reference: POSIX.1-2024 fscanf, fwscanf; ISO C11 7.21.6.2, 7.29.2.2
//!
//! Each entry point comes in three shapes:
//! - `sscanf(..)` reads policy from the environment and returns the C result.
//! - `sscanf_with(.., &ScanOptions)` takes explicit policy.
//! - `sscanf_report(.., &ScanOptions)` returns a [`ScanReport`] with the
//!   failure kind and consumed count.

pub mod args;
pub mod class;
pub mod directive;
mod engine;
pub mod error;
pub mod ledger;
pub mod numeric;
pub mod source;
pub mod unit;

use std::io::Read;

use scanlibc_membrane::config::{self, SafetyLevel};

pub use args::{ArgCursor, FloatWidth, IntWidth, ScanArg, TargetKind};
pub use error::{AllocPhase, ScanError};
pub use ledger::INITIAL_ALLOC_UNITS;
pub use source::{CharSource, UnitStream};
pub use unit::ScanUnit;

use self::engine::Engine;
use super::file::{LockedStream, StdioStream};
use crate::errno::{EINVAL, set_errno};

/// Result of a scan that hit end of input before any conversion.
pub const EOF: i32 = -1;

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

/// Per-call scanning policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Membrane mode: target validation and healing.
    pub level: SafetyLevel,
    /// Bytes the call may allocate for `%m`/`%a` buffers.
    pub alloc_budget: Option<usize>,
    /// Initial capacity, in characters, of an allocated buffer.
    pub initial_alloc: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::strict()
    }
}

impl ScanOptions {
    /// Policy from `SCANLIBC_MODE` and `SCANLIBC_ALLOC_BUDGET`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            level: config::safety_level(),
            alloc_budget: config::alloc_budget(),
            initial_alloc: INITIAL_ALLOC_UNITS,
        }
    }

    #[must_use]
    pub const fn strict() -> Self {
        Self {
            level: SafetyLevel::Strict,
            alloc_budget: None,
            initial_alloc: INITIAL_ALLOC_UNITS,
        }
    }

    #[must_use]
    pub const fn hardened() -> Self {
        Self {
            level: SafetyLevel::Hardened,
            ..Self::strict()
        }
    }

    /// Same policy with an allocation ceiling.
    #[must_use]
    pub const fn with_alloc_budget(mut self, bytes: usize) -> Self {
        self.alloc_budget = Some(bytes);
        self
    }
}

/// Structured outcome of one scan call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// What the C function returns: the count, or [`EOF`].
    pub result: i32,
    /// Directives that stored a value (`%n` included).
    pub assigned: usize,
    /// Input characters consumed.
    pub consumed: usize,
    /// Why the scan stopped early, if it did.
    pub failure: Option<ScanError>,
}

impl ScanReport {
    fn orientation_mismatch() -> Self {
        set_errno(EINVAL);
        Self {
            result: EOF,
            assigned: 0,
            consumed: 0,
            failure: Some(ScanError::WrongOrientation),
        }
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.result == EOF
    }
}

// ---------------------------------------------------------------------------
// Narrow entry points
// ---------------------------------------------------------------------------

/// Scan `input` (ending at its first NUL) according to `fmt`.
pub fn sscanf(input: &[u8], fmt: &[u8], args: &mut [ScanArg<'_>]) -> i32 {
    sscanf_with(input, fmt, args, &ScanOptions::from_env())
}

pub fn sscanf_with(input: &[u8], fmt: &[u8], args: &mut [ScanArg<'_>], opts: &ScanOptions) -> i32 {
    sscanf_report(input, fmt, args, opts).result
}

pub fn sscanf_report(
    input: &[u8],
    fmt: &[u8],
    args: &mut [ScanArg<'_>],
    opts: &ScanOptions,
) -> ScanReport {
    Engine::new(CharSource::from_text(input), args, opts).run(fmt)
}

/// Scan from a byte stream. Characters read past the last successful
/// match are returned to the stream.
pub fn fscanf<R: Read>(stream: &mut StdioStream<R>, fmt: &[u8], args: &mut [ScanArg<'_>]) -> i32 {
    fscanf_with(stream, fmt, args, &ScanOptions::from_env())
}

pub fn fscanf_with<R: Read>(
    stream: &mut StdioStream<R>,
    fmt: &[u8],
    args: &mut [ScanArg<'_>],
    opts: &ScanOptions,
) -> i32 {
    fscanf_report(stream, fmt, args, opts).result
}

pub fn fscanf_report<R: Read>(
    stream: &mut StdioStream<R>,
    fmt: &[u8],
    args: &mut [ScanArg<'_>],
    opts: &ScanOptions,
) -> ScanReport {
    if stream.fwide(-1) > 0 {
        return ScanReport::orientation_mismatch();
    }
    let source: &mut dyn UnitStream<u8> = stream;
    Engine::new(CharSource::from_stream(source), args, opts).run(fmt)
}

/// [`fscanf`] holding the stream lock for the whole call (`flockfile`).
pub fn fscanf_locked<R: Read>(
    stream: &LockedStream<R>,
    fmt: &[u8],
    args: &mut [ScanArg<'_>],
) -> i32 {
    let mut guard = stream.lock();
    fscanf(&mut *guard, fmt, args)
}

// ---------------------------------------------------------------------------
// Wide entry points
// ---------------------------------------------------------------------------

/// Wide-character [`sscanf`]: `input` and `fmt` hold `wchar_t` values.
pub fn swscanf(input: &[u32], fmt: &[u32], args: &mut [ScanArg<'_>]) -> i32 {
    swscanf_with(input, fmt, args, &ScanOptions::from_env())
}

pub fn swscanf_with(input: &[u32], fmt: &[u32], args: &mut [ScanArg<'_>], opts: &ScanOptions) -> i32 {
    swscanf_report(input, fmt, args, opts).result
}

pub fn swscanf_report(
    input: &[u32],
    fmt: &[u32],
    args: &mut [ScanArg<'_>],
    opts: &ScanOptions,
) -> ScanReport {
    Engine::new(CharSource::from_text(input), args, opts).run(fmt)
}

/// Wide-character [`fscanf`] over a UTF-8 stream.
pub fn fwscanf<R: Read>(stream: &mut StdioStream<R>, fmt: &[u32], args: &mut [ScanArg<'_>]) -> i32 {
    fwscanf_with(stream, fmt, args, &ScanOptions::from_env())
}

pub fn fwscanf_with<R: Read>(
    stream: &mut StdioStream<R>,
    fmt: &[u32],
    args: &mut [ScanArg<'_>],
    opts: &ScanOptions,
) -> i32 {
    fwscanf_report(stream, fmt, args, opts).result
}

pub fn fwscanf_report<R: Read>(
    stream: &mut StdioStream<R>,
    fmt: &[u32],
    args: &mut [ScanArg<'_>],
    opts: &ScanOptions,
) -> ScanReport {
    if stream.fwide(1) < 0 {
        return ScanReport::orientation_mismatch();
    }
    let source: &mut dyn UnitStream<u32> = stream;
    Engine::new(CharSource::from_stream(source), args, opts).run(fmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno::get_errno;

    #[test]
    fn options_builders() {
        assert_eq!(ScanOptions::default(), ScanOptions::strict());
        let opts = ScanOptions::hardened().with_alloc_budget(64);
        assert_eq!(opts.level, SafetyLevel::Hardened);
        assert_eq!(opts.alloc_budget, Some(64));
        assert_eq!(opts.initial_alloc, INITIAL_ALLOC_UNITS);
    }

    #[test]
    fn narrow_scan_on_wide_stream_is_eof() {
        let mut stream = StdioStream::new(&b"12"[..]);
        assert!(stream.fwide(1) > 0);
        let mut v = 0i32;
        let report = fscanf_report(&mut stream, b"%d", &mut [ScanArg::I32(&mut v)], &ScanOptions::strict());
        assert!(report.is_eof());
        assert_eq!(report.failure, Some(ScanError::WrongOrientation));
        assert_eq!(get_errno(), EINVAL);
        assert_eq!(v, 0);
    }

    #[test]
    fn wide_scan_on_byte_stream_is_eof() {
        let mut stream = StdioStream::new(&b"12"[..]);
        assert_eq!(stream.getc(), Some(b'1'));
        let fmt: Vec<u32> = "%d".chars().map(u32::from).collect();
        let mut v = 0i32;
        let r = fwscanf_with(&mut stream, &fmt, &mut [ScanArg::I32(&mut v)], &ScanOptions::strict());
        assert_eq!(r, EOF);
    }

    #[test]
    fn report_counts_consumed_input() {
        let mut v = 0i32;
        let report = sscanf_report(b"  42 rest", b"%d", &mut [ScanArg::I32(&mut v)], &ScanOptions::strict());
        assert_eq!(report.result, 1);
        assert_eq!(report.assigned, 1);
        assert_eq!(report.consumed, 4);
        assert_eq!(report.failure, None);
        assert_eq!(v, 42);
    }

    #[test]
    fn locked_stream_scans_under_lock() {
        let locked = LockedStream::new(StdioStream::new(&b"7 8"[..]));
        let mut a = 0i32;
        let mut b = 0i32;
        assert_eq!(fscanf_locked(&locked, b"%d", &mut [ScanArg::I32(&mut a)]), 1);
        assert_eq!(fscanf_locked(&locked, b"%d", &mut [ScanArg::I32(&mut b)]), 1);
        assert_eq!((a, b), (7, 8));
    }
}
