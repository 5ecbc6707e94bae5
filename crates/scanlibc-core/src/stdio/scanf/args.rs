//! Output targets and positional argument lookup.
//!
//! A C caller passes a variadic list of pointers; here the caller passes a
//! slice of [`ScanArg`]s. Directives take targets in order, or by explicit
//! 1-based position with `%N$`, which leaves the sequential cursor alone.

use crate::stdlib::conversion::{ConversionStatus, strtod_impl, strtof_impl};

/// Integer target width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    /// `size_t` / `ptrdiff_t` / pointer width.
    Size,
}

impl IntWidth {
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
            Self::Size => usize::BITS,
        }
    }
}

/// Floating target width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

/// Shape of an output target, independent of where it points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Int(IntWidth),
    Float(FloatWidth),
    Pointer,
    Bytes,
    Wide,
    AllocBytes,
    AllocWide,
}

impl TargetKind {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_) | Self::Pointer)
    }

    #[must_use]
    pub const fn is_string(self) -> bool {
        !self.is_numeric()
    }

    /// True for targets that receive wide characters.
    #[must_use]
    pub const fn is_wide(self) -> bool {
        matches!(self, Self::Wide | Self::AllocWide)
    }

    /// True for slots that receive an engine-allocated buffer.
    #[must_use]
    pub const fn is_alloc(self) -> bool {
        matches!(self, Self::AllocBytes | Self::AllocWide)
    }
}

/// One caller-supplied output location.
#[derive(Debug)]
pub enum ScanArg<'a> {
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    Isize(&'a mut isize),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    U64(&'a mut u64),
    Usize(&'a mut usize),
    F32(&'a mut f32),
    F64(&'a mut f64),
    /// `%p` target.
    Pointer(&'a mut usize),
    /// Fixed character buffer for `%c`, `%s`, `%[`.
    Bytes(&'a mut [u8]),
    /// Fixed wide character buffer for `%lc`, `%ls`, `%l[`.
    Wide(&'a mut [u32]),
    /// Slot receiving a buffer allocated by `%m`/`%a` conversions.
    AllocBytes(&'a mut Option<Vec<u8>>),
    /// Wide counterpart of [`ScanArg::AllocBytes`].
    AllocWide(&'a mut Option<Vec<u32>>),
}

/// Clamp `v` into a signed integer of `bits` width.
fn fit_signed(v: i64, bits: u32) -> (i64, bool) {
    if bits >= 64 {
        return (v, false);
    }
    let max = (1i64 << (bits - 1)) - 1;
    let min = -max - 1;
    let clamped = v.clamp(min, max);
    (clamped, clamped != v)
}

/// Reduce a `strtoul`-style result into an unsigned integer of `bits` width.
///
/// A magnitude that does not fit saturates to the maximum; a negative
/// token that fits is negated modulo 2^bits.
fn fit_unsigned(negative: bool, magnitude: u64, overflow: bool, bits: u32) -> (u64, bool) {
    let max = if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    if overflow || magnitude > max {
        (max, true)
    } else if negative {
        (magnitude.wrapping_neg() & max, false)
    } else {
        (magnitude, false)
    }
}

impl ScanArg<'_> {
    /// Shape of this target.
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::I8(_) | Self::U8(_) => TargetKind::Int(IntWidth::W8),
            Self::I16(_) | Self::U16(_) => TargetKind::Int(IntWidth::W16),
            Self::I32(_) | Self::U32(_) => TargetKind::Int(IntWidth::W32),
            Self::I64(_) | Self::U64(_) => TargetKind::Int(IntWidth::W64),
            Self::Isize(_) | Self::Usize(_) => TargetKind::Int(IntWidth::Size),
            Self::F32(_) => TargetKind::Float(FloatWidth::F32),
            Self::F64(_) => TargetKind::Float(FloatWidth::F64),
            Self::Pointer(_) => TargetKind::Pointer,
            Self::Bytes(_) => TargetKind::Bytes,
            Self::Wide(_) => TargetKind::Wide,
            Self::AllocBytes(_) => TargetKind::AllocBytes,
            Self::AllocWide(_) => TargetKind::AllocWide,
        }
    }

    /// Length of a fixed character buffer.
    pub(crate) fn fixed_capacity(&self) -> Option<usize> {
        match self {
            Self::Bytes(b) => Some(b.len()),
            Self::Wide(w) => Some(w.len()),
            _ => None,
        }
    }

    /// Store a signed result. Returns `true` if the value was clamped.
    pub(crate) fn store_signed(&mut self, v: i64) -> bool {
        let bits = match self.kind() {
            TargetKind::Int(w) => w.bits(),
            _ => 64,
        };
        let (fit, clamped) = fit_signed(v, bits);
        match self {
            Self::I8(p) => **p = fit as i8,
            Self::I16(p) => **p = fit as i16,
            Self::I32(p) => **p = fit as i32,
            Self::I64(p) => **p = fit,
            Self::Isize(p) => **p = fit as isize,
            Self::U8(p) => **p = fit as i8 as u8,
            Self::U16(p) => **p = fit as i16 as u16,
            Self::U32(p) => **p = fit as i32 as u32,
            Self::U64(p) => **p = fit as u64,
            Self::Usize(p) => **p = fit as isize as usize,
            Self::F32(p) => **p = v as f32,
            Self::F64(p) => **p = v as f64,
            Self::Pointer(p) => **p = usize::try_from(v.max(0)).unwrap_or(usize::MAX),
            _ => {}
        }
        clamped
    }

    /// Store an unsigned result. Returns `true` if the value was clamped.
    pub(crate) fn store_unsigned(&mut self, negative: bool, magnitude: u64, overflow: bool) -> bool {
        let bits = match self.kind() {
            TargetKind::Int(w) => w.bits(),
            TargetKind::Pointer => usize::BITS,
            _ => 64,
        };
        let (fit, clamped) = fit_unsigned(negative, magnitude, overflow, bits);
        let signed_view = if negative { -(magnitude as f64) } else { magnitude as f64 };
        match self {
            Self::I8(p) => **p = fit as u8 as i8,
            Self::I16(p) => **p = fit as u16 as i16,
            Self::I32(p) => **p = fit as u32 as i32,
            Self::I64(p) => **p = fit as i64,
            Self::Isize(p) => **p = fit as usize as isize,
            Self::U8(p) => **p = fit as u8,
            Self::U16(p) => **p = fit as u16,
            Self::U32(p) => **p = fit as u32,
            Self::U64(p) => **p = fit,
            Self::Usize(p) | Self::Pointer(p) => **p = fit as usize,
            Self::F32(p) => **p = signed_view as f32,
            Self::F64(p) => **p = signed_view,
            _ => {}
        }
        clamped
    }

    /// Convert canonical float text with the routine matching the target
    /// and store it.
    ///
    /// Returns `None` if the text is not one complete number, otherwise
    /// whether a range error occurred.
    pub(crate) fn store_float(&mut self, text: &[u8]) -> Option<bool> {
        if let Self::F32(p) = self {
            let (v, used, status) = strtof_impl(text);
            if used != text.len() || used == 0 {
                return None;
            }
            **p = v;
            return Some(status != ConversionStatus::Success);
        }
        let (v, used, status) = strtod_impl(text);
        if used != text.len() || used == 0 {
            return None;
        }
        match self {
            Self::F64(p) => **p = v,
            // Integer targets only reach here through hardened coercion;
            // `as` saturates and maps NaN to zero.
            Self::I8(p) => **p = v as i8,
            Self::I16(p) => **p = v as i16,
            Self::I32(p) => **p = v as i32,
            Self::I64(p) => **p = v as i64,
            Self::Isize(p) => **p = v as isize,
            Self::U8(p) => **p = v as u8,
            Self::U16(p) => **p = v as u16,
            Self::U32(p) => **p = v as u32,
            Self::U64(p) => **p = v as u64,
            Self::Usize(p) | Self::Pointer(p) => **p = v as usize,
            _ => {}
        }
        Some(status != ConversionStatus::Success)
    }

    /// Store collected narrow characters, NUL-terminating fixed buffers
    /// when `terminate` is set and there is room.
    pub(crate) fn store_bytes(&mut self, data: Vec<u8>, terminate: bool) {
        match self {
            Self::Bytes(buf) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if terminate && n < buf.len() {
                    buf[n] = 0;
                }
            }
            Self::AllocBytes(slot) => **slot = Some(data),
            _ => {}
        }
    }

    /// Wide counterpart of [`ScanArg::store_bytes`].
    pub(crate) fn store_wide(&mut self, data: Vec<u32>, terminate: bool) {
        match self {
            Self::Wide(buf) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if terminate && n < buf.len() {
                    buf[n] = 0;
                }
            }
            Self::AllocWide(slot) => **slot = Some(data),
            _ => {}
        }
    }

    /// Reset an allocation slot to `None`. Returns `true` if it held a buffer.
    pub(crate) fn release_alloc(&mut self) -> bool {
        match self {
            Self::AllocBytes(slot) => slot.take().is_some(),
            Self::AllocWide(slot) => slot.take().is_some(),
            _ => false,
        }
    }
}

/// Sequential and positional access to the caller's targets.
pub struct ArgCursor {
    next: usize,
    len: usize,
}

impl ArgCursor {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self { next: 0, len }
    }

    /// Index for the next directive: the 1-based `position` if given
    /// (without moving the cursor), otherwise the next sequential index.
    ///
    /// The index may be out of range; the caller decides what a missing
    /// target means.
    pub fn take(&mut self, position: Option<usize>) -> usize {
        match position {
            Some(n) => n.saturating_sub(1),
            None => {
                let idx = self.next;
                self.next += 1;
                idx
            }
        }
    }

    /// True if `index` names a supplied target.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.len
    }
}
