//! Multibyte and wide character conversion.
//!
//! Implements the restartable `<wchar.h>` conversions for a UTF-8 multibyte
//! encoding and 32-bit `wchar_t`. A wide character is carried as `u32`.

use crate::errno::EILSEQ;

/// Shift state of an in-progress multibyte decode (`mbstate_t`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MbState {
    /// Code point bits accumulated so far.
    partial: u32,
    /// Continuation bytes still expected.
    pending: u8,
    /// Smallest code point the sequence may encode (overlong check).
    min: u32,
}

impl MbState {
    /// Initial shift state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            partial: 0,
            pending: 0,
            min: 0,
        }
    }

    /// True when no partial character is buffered (`mbsinit`).
    #[must_use]
    pub const fn is_initial(&self) -> bool {
        self.pending == 0
    }
}

/// Outcome of a successful [`mbrtowc`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbStep {
    /// A complete character was produced after consuming `usize` bytes.
    Char(u32, usize),
    /// All given bytes were consumed and the character is still incomplete.
    Incomplete(usize),
}

/// Decode a wide character from `input`, continuing from `state`.
///
/// Returns `Err(EILSEQ)` for an invalid sequence; the state is reset.
pub fn mbrtowc(state: &mut MbState, input: &[u8]) -> Result<MbStep, i32> {
    for (i, &b) in input.iter().enumerate() {
        if state.pending == 0 {
            let (bits, pending, min) = match b {
                0x00..=0x7F => return Ok(MbStep::Char(u32::from(b), i + 1)),
                0xC2..=0xDF => (u32::from(b & 0x1F), 1, 0x80),
                0xE0..=0xEF => (u32::from(b & 0x0F), 2, 0x800),
                0xF0..=0xF4 => (u32::from(b & 0x07), 3, 0x1_0000),
                _ => {
                    *state = MbState::new();
                    return Err(EILSEQ);
                }
            };
            *state = MbState {
                partial: bits,
                pending,
                min,
            };
            continue;
        }

        if b & 0xC0 != 0x80 {
            *state = MbState::new();
            return Err(EILSEQ);
        }
        state.partial = (state.partial << 6) | u32::from(b & 0x3F);
        state.pending -= 1;
        if state.pending == 0 {
            let wc = state.partial;
            let min = state.min;
            *state = MbState::new();
            if wc < min || char::from_u32(wc).is_none() {
                return Err(EILSEQ);
            }
            return Ok(MbStep::Char(wc, i + 1));
        }
    }
    Ok(MbStep::Incomplete(input.len()))
}

/// Encode `wc` as UTF-8 into `out`, returning the number of bytes written.
///
/// Returns `Err(EILSEQ)` for surrogates and values above U+10FFFF.
pub fn wcrtomb(wc: u32, out: &mut [u8; 4]) -> Result<usize, i32> {
    let ch = char::from_u32(wc).ok_or(EILSEQ)?;
    Ok(ch.encode_utf8(out).len())
}

/// Returns `true` if `wc` is a wide whitespace character (`iswspace`).
///
/// Unicode whitespace minus the non-breaking spaces U+00A0, U+2007 and
/// U+202F, which glue digits together rather than separating tokens, and
/// minus NEL (U+0085), a C1 control rather than a space in glibc locales.
pub fn is_wspace(wc: u32) -> bool {
    match char::from_u32(wc) {
        Some('\u{85}' | '\u{a0}' | '\u{2007}' | '\u{202f}') | None => false,
        Some(ch) => ch.is_whitespace(),
    }
}
