//! Conversion specification parsing.
//!
//! Clean-room parser for the `scanf` directive grammar:
//! `%[N$][*]['][I|I32|I64][width][length][m|a]conversion`.
//!
//! Reference: POSIX.1-2024 fscanf, ISO C11 7.21.6.2

use super::args::{FloatWidth, IntWidth, TargetKind};
use super::class::CharClass;
use super::unit::ScanUnit;

// ---------------------------------------------------------------------------
// Directive types
// ---------------------------------------------------------------------------

/// Length modifier class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    Char,       // 'hh'
    Short,      // 'h'
    Default,
    Long,       // 'l'
    LongLong,   // 'll', 'q'
    LongDouble, // 'L'
    IntMax,     // 'j'
    Size,       // 'z'
    PtrDiff,    // 't'
    PtrWidth,   // 'I'
    Explicit32, // 'I32'
    Explicit64, // 'I64'
}

impl LengthClass {
    fn int_width(self) -> IntWidth {
        match self {
            Self::Char => IntWidth::W8,
            Self::Short => IntWidth::W16,
            Self::Default | Self::Explicit32 => IntWidth::W32,
            Self::Long | Self::LongLong | Self::LongDouble | Self::IntMax | Self::Explicit64 => {
                IntWidth::W64
            }
            Self::Size | Self::PtrDiff | Self::PtrWidth => IntWidth::Size,
        }
    }

    fn float_width(self) -> FloatWidth {
        match self {
            Self::Long | Self::LongLong | Self::LongDouble => FloatWidth::F64,
            _ => FloatWidth::F32,
        }
    }
}

/// Buffer allocation requested by the directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocMode {
    None,
    /// GNU `a`: a failed growth keeps the partial buffer.
    Gnu,
    /// POSIX `m`: a failed growth frees every buffer of the call.
    Posix,
}

/// What the directive converts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Percent,
    Count,
    Char,
    Str,
    Class(CharClass),
    /// `base` 0 means detect from the prefix (`%i`).
    Int { base: u32, signed: bool },
    Pointer,
    Float,
}

/// One parsed `%` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// 1-based `N$` argument position.
    pub position: Option<usize>,
    pub suppress: bool,
    pub group: bool,
    /// Maximum field width; `None` is unlimited.
    pub width: Option<usize>,
    pub length: LengthClass,
    pub alloc: AllocMode,
    pub conv: Conversion,
    /// Character conversions producing `wchar_t` (`%C`, `%S`, `%lc`,
    /// `%ls`, `%l[`).
    pub wide: bool,
}

impl Directive {
    /// True when the directive skips leading input whitespace.
    #[must_use]
    pub fn skips_space(&self) -> bool {
        !matches!(
            self.conv,
            Conversion::Char | Conversion::Class(_) | Conversion::Count
        )
    }

    /// True when the directive stores through an argument.
    #[must_use]
    pub fn assigns(&self) -> bool {
        !self.suppress && self.conv != Conversion::Percent
    }

    /// Target shape the directive writes, or `None` for `%%`.
    #[must_use]
    pub fn expected_target(&self) -> Option<TargetKind> {
        Some(match self.conv {
            Conversion::Percent => return None,
            Conversion::Count | Conversion::Int { .. } => TargetKind::Int(self.length.int_width()),
            Conversion::Pointer => TargetKind::Pointer,
            Conversion::Float => TargetKind::Float(self.length.float_width()),
            Conversion::Char | Conversion::Str | Conversion::Class(_) => {
                match (self.wide, self.alloc != AllocMode::None) {
                    (false, false) => TargetKind::Bytes,
                    (true, false) => TargetKind::Wide,
                    (false, true) => TargetKind::AllocBytes,
                    (true, true) => TargetKind::AllocWide,
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Cursor<'f, U> {
    fmt: &'f [U],
    pos: usize,
}

impl<U: ScanUnit> Cursor<'_, U> {
    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.fmt
            .get(self.pos + ahead)
            .filter(|u| !u.is_nul())
            .and_then(|u| u.ascii())
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn number(&mut self) -> Option<usize> {
        let start = self.pos;
        let mut value = 0usize;
        while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
            value = value
                .saturating_mul(10)
                .saturating_add(usize::from(d - b'0'));
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    /// `I`, `I32` or `I64`.
    fn windows_width(&mut self) -> Option<LengthClass> {
        if self.peek() != Some(b'I') {
            return None;
        }
        let class = match (self.peek_at(1), self.peek_at(2)) {
            (Some(b'3'), Some(b'2')) => LengthClass::Explicit32,
            (Some(b'6'), Some(b'4')) => LengthClass::Explicit64,
            _ => {
                self.pos += 1;
                return Some(LengthClass::PtrWidth);
            }
        };
        self.pos += 3;
        Some(class)
    }
}

/// Parse one directive.
///
/// `fmt` starts at the unit after `%`. Returns the directive and the number
/// of format units it spans, or `None` for a malformed or truncated
/// directive.
pub fn parse_directive<U: ScanUnit>(fmt: &[U]) -> Option<(Directive, usize)> {
    let mut cur = Cursor { fmt, pos: 0 };
    let mut position = None;
    let mut width = None;
    let mut length = LengthClass::Default;

    // --- position or width ---
    if let Some(n) = cur.number() {
        if cur.eat(b'$') {
            if n == 0 {
                return None;
            }
            position = Some(n);
        } else {
            width = Some(n);
        }
    }

    // --- flags ---
    let mut suppress = false;
    let mut group = false;
    if width.is_none() {
        loop {
            if cur.eat(b'*') {
                suppress = true;
            } else if cur.eat(b'\'') {
                group = true;
            } else if let Some(class) = cur.windows_width() {
                length = class;
            } else {
                break;
            }
        }
        width = cur.number();
    }

    // --- length and allocation modifiers ---
    let mut alloc = AllocMode::None;
    loop {
        match cur.peek() {
            Some(b'h') => {
                cur.pos += 1;
                length = if cur.eat(b'h') {
                    LengthClass::Char
                } else {
                    LengthClass::Short
                };
            }
            Some(b'l') => {
                cur.pos += 1;
                length = if cur.eat(b'l') {
                    LengthClass::LongLong
                } else {
                    LengthClass::Long
                };
            }
            Some(b'q') => {
                cur.pos += 1;
                length = LengthClass::LongLong;
            }
            Some(b'L') => {
                cur.pos += 1;
                length = LengthClass::LongDouble;
            }
            Some(b'j') => {
                cur.pos += 1;
                length = LengthClass::IntMax;
            }
            Some(b'z') => {
                cur.pos += 1;
                length = LengthClass::Size;
            }
            Some(b't') => {
                cur.pos += 1;
                length = LengthClass::PtrDiff;
            }
            Some(b'I') => {
                if let Some(class) = cur.windows_width() {
                    length = class;
                }
            }
            Some(b'm') => {
                cur.pos += 1;
                alloc = AllocMode::Posix;
            }
            // `a` is the GNU allocation flag only in front of a string
            // conversion; otherwise it is the `%a` float conversion.
            Some(b'a') if matches!(cur.peek_at(1), Some(b's' | b'S' | b'[')) => {
                cur.pos += 1;
                alloc = AllocMode::Gnu;
            }
            _ => break,
        }
    }

    // --- conversion ---
    let letter = cur.peek()?;
    cur.pos += 1;
    let conv = match letter {
        b'%' => Conversion::Percent,
        b'n' => Conversion::Count,
        b'c' | b'C' => Conversion::Char,
        b's' | b'S' => Conversion::Str,
        b'[' => {
            let (class, used) = CharClass::parse(&fmt[cur.pos..])?;
            cur.pos += used;
            Conversion::Class(class)
        }
        b'd' => Conversion::Int { base: 10, signed: true },
        b'i' => Conversion::Int { base: 0, signed: true },
        b'o' => Conversion::Int { base: 8, signed: false },
        b'u' => Conversion::Int { base: 10, signed: false },
        b'x' | b'X' => Conversion::Int { base: 16, signed: false },
        b'p' => Conversion::Pointer,
        b'e' | b'E' | b'f' | b'F' | b'g' | b'G' | b'a' | b'A' => Conversion::Float,
        _ => return None,
    };

    let is_text = matches!(
        conv,
        Conversion::Char | Conversion::Str | Conversion::Class(_)
    );
    let wide = matches!(letter, b'C' | b'S') || (is_text && length == LengthClass::Long);
    if !is_text {
        alloc = AllocMode::None;
    }

    Some((
        Directive {
            position,
            suppress,
            group,
            width: width.filter(|&w| w > 0),
            length,
            alloc,
            conv,
            wide,
        },
        cur.pos,
    ))
}
