//! Character units the scanner can run over.
//!
//! The narrow scanner walks bytes (`u8`), the wide scanner walks 32-bit
//! `wchar_t` values (`u32`). Everything else in the engine is generic over
//! [`ScanUnit`].

use std::fmt::Debug;

use crate::ctype;
use crate::wchar;

/// One element of a format string or of scanned input.
pub trait ScanUnit: Copy + Default + Eq + Debug + 'static {
    /// True for the `wchar_t` variant.
    const WIDE: bool;

    /// Numeric value of the unit (byte value or code point).
    fn to_u32(self) -> u32;

    /// The unit for an ASCII character.
    fn from_ascii(b: u8) -> Self;

    /// Whitespace test used by `%s`, literal whitespace and skipping.
    fn is_space(self) -> bool;

    /// True for the terminating NUL.
    #[inline]
    fn is_nul(self) -> bool {
        self.to_u32() == 0
    }

    /// ASCII value, if the unit is ASCII.
    #[inline]
    fn ascii(self) -> Option<u8> {
        u8::try_from(self.to_u32()).ok().filter(u8::is_ascii)
    }
}

impl ScanUnit for u8 {
    const WIDE: bool = false;

    #[inline]
    fn to_u32(self) -> u32 {
        u32::from(self)
    }

    #[inline]
    fn from_ascii(b: u8) -> Self {
        b
    }

    #[inline]
    fn is_space(self) -> bool {
        ctype::is_space(self)
    }
}

impl ScanUnit for u32 {
    const WIDE: bool = true;

    #[inline]
    fn to_u32(self) -> u32 {
        self
    }

    #[inline]
    fn from_ascii(b: u8) -> Self {
        u32::from(b)
    }

    #[inline]
    fn is_space(self) -> bool {
        wchar::is_wspace(self)
    }
}

/// Length of `text` up to (not including) the first NUL.
pub fn terminated_len<U: ScanUnit>(text: &[U]) -> usize {
    text.iter().position(|u| u.is_nul()).unwrap_or(text.len())
}
