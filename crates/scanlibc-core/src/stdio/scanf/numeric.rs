//! Numeric field canonicalization.
//!
//! Input characters of an integer or floating field are fed one at a time
//! to a [`Canonicalizer`], which strips locale decoration (thousands
//! separators, a non-`.` decimal point, the `0x` of integer prefixes) and
//! builds a plain ASCII token for the `strto*` routines. Digit grouping is
//! checked once the field ends.

use crate::locale::{CHAR_MAX, LocaleConv, localeconv};
use crate::wchar::{MbState, MbStep, mbrtowc};

/// Numeric conventions captured at the start of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSnapshot {
    pub decimal_point: u32,
    /// `None` when the locale does not group digits.
    pub thousands_sep: Option<u32>,
    pub grouping: Vec<u8>,
}

impl LocaleSnapshot {
    /// Snapshot of the calling thread's numeric locale.
    #[must_use]
    pub fn capture(wide: bool) -> Self {
        Self::from_conv(&localeconv(), wide)
    }

    /// Narrow scans only recognise single-byte decimal points and
    /// separators; wide scans recognise any single character.
    #[must_use]
    pub fn from_conv(conv: &LocaleConv, wide: bool) -> Self {
        let single = |text: &[u8]| -> Option<u32> {
            if !wide {
                return match text {
                    [b] => Some(u32::from(*b)),
                    _ => None,
                };
            }
            let mut state = MbState::new();
            match mbrtowc(&mut state, text) {
                Ok(MbStep::Char(wc, used)) if used == text.len() && wc != 0 => Some(wc),
                _ => None,
            }
        };
        let groups = conv
            .grouping
            .first()
            .is_some_and(|&g| g > 0 && g < CHAR_MAX);
        Self {
            decimal_point: single(&conv.decimal_point).unwrap_or(u32::from(b'.')),
            thousands_sep: single(&conv.thousands_sep).filter(|_| groups),
            grouping: conv.grouping.clone(),
        }
    }
}

impl Default for LocaleSnapshot {
    fn default() -> Self {
        Self {
            decimal_point: u32::from(b'.'),
            thousands_sep: None,
            grouping: Vec::new(),
        }
    }
}

/// What a fed character did to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Consumed; this byte was appended to the canonical token.
    Append(u8),
    /// Consumed but not stored (the `x` of an integer `0x` prefix, or a
    /// character of `(nil)`).
    Discard,
    /// Consumed as a thousands separator.
    Separator,
    /// Not part of the field; the caller must push it back.
    Reject,
}

/// Which field is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer in `base` (0 = detect from prefix). `pointer` accepts
    /// `(nil)`.
    Integer { base: u32, pointer: bool },
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    AfterSign,
    /// A leading `0` that may begin a `0x` prefix.
    LeadingZero,
    /// Just consumed an integer `0x`; a hex digit must follow to extend it.
    AfterPrefix,
    Digits,
    ExpStart,
    ExpSign,
    ExpDigits,
    /// Spelling `word`; `matched` characters so far.
    Word { word: &'static [u8], matched: usize },
    /// `inf` complete; `inity` may follow.
    InfDone,
    Done,
}

/// Field is invalid and must fail the directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Malformed;

/// Incremental builder of a canonical numeric token.
#[derive(Debug)]
pub struct Canonicalizer<'l> {
    locale: &'l LocaleSnapshot,
    kind: FieldKind,
    group: bool,
    state: State,
    buf: Vec<u8>,
    base: u32,
    hex: bool,
    point_seen: bool,
    digits: usize,
    /// Integer-part digits since the last separator.
    run: usize,
    /// Closed integer-part groups, most significant first.
    groups: Vec<usize>,
    last_was_separator: bool,
}

impl<'l> Canonicalizer<'l> {
    /// `group` enables thousands separators (the `'` flag); they are only
    /// honoured for decimal fields.
    #[must_use]
    pub fn new(kind: FieldKind, group: bool, locale: &'l LocaleSnapshot) -> Self {
        let base = match kind {
            FieldKind::Integer { base, .. } => base,
            FieldKind::Float => 10,
        };
        Self {
            locale,
            kind,
            group: group && locale.thousands_sep.is_some(),
            state: State::Start,
            buf: Vec::with_capacity(32),
            base,
            hex: false,
            point_seen: false,
            digits: 0,
            run: 0,
            groups: Vec::new(),
            last_was_separator: false,
        }
    }

    /// Effective integer base once the prefix has been seen.
    #[must_use]
    pub fn base(&self) -> u32 {
        if self.base == 0 { 10 } else { self.base }
    }

    /// Canonical text so far.
    #[must_use]
    pub fn text(&self) -> &[u8] {
        &self.buf
    }

    fn append(&mut self, b: u8) -> Disposition {
        self.buf.push(b);
        self.last_was_separator = false;
        Disposition::Append(b)
    }

    fn digit(&mut self, b: u8) -> Disposition {
        self.digits += 1;
        if !self.point_seen {
            self.run += 1;
        }
        self.state = State::Digits;
        self.append(b)
    }

    fn separator_allowed(&self, c: u32) -> bool {
        self.group
            && self.locale.thousands_sep == Some(c)
            && !self.hex
            && !self.point_seen
            && self.base() == 10
            && self.run > 0
    }

    fn separator(&mut self) -> Disposition {
        self.groups.push(self.run);
        self.run = 0;
        self.last_was_separator = true;
        Disposition::Separator
    }

    /// Feed the next input character (byte value or code point).
    pub fn feed(&mut self, c: u32) -> Disposition {
        let ascii = u8::try_from(c).ok().filter(u8::is_ascii);
        match self.kind {
            FieldKind::Integer { pointer, .. } => self.feed_integer(c, ascii, pointer),
            FieldKind::Float => self.feed_float(c, ascii),
        }
    }

    fn in_base(&self, b: u8) -> bool {
        let base = if self.base == 0 { 10 } else { self.base };
        char::from(b).to_digit(base).is_some()
    }

    fn feed_integer(&mut self, c: u32, ascii: Option<u8>, pointer: bool) -> Disposition {
        let Some(b) = ascii else {
            return if self.state == State::Digits && self.separator_allowed(c) {
                self.separator()
            } else {
                Disposition::Reject
            };
        };
        match self.state {
            State::Start if b == b'+' || b == b'-' => {
                self.state = State::AfterSign;
                self.append(b)
            }
            State::Start if pointer && b == b'(' => {
                self.state = State::Word {
                    word: b"(nil)",
                    matched: 1,
                };
                Disposition::Discard
            }
            State::Start | State::AfterSign => {
                if b == b'0' && (self.base == 0 || self.base == 16) {
                    self.digits += 1;
                    self.run += 1;
                    self.state = State::LeadingZero;
                    return self.append(b);
                }
                if self.base == 0 && b.is_ascii_digit() {
                    self.base = 10;
                }
                if self.in_base(b) {
                    self.digit(b)
                } else {
                    Disposition::Reject
                }
            }
            State::LeadingZero => {
                if b == b'x' || b == b'X' {
                    self.base = 16;
                    self.state = State::AfterPrefix;
                    return Disposition::Discard;
                }
                if self.base == 0 {
                    self.base = 8;
                }
                self.state = State::Digits;
                self.feed_integer(c, ascii, pointer)
            }
            State::AfterPrefix => {
                if b.is_ascii_hexdigit() {
                    self.digit(b)
                } else {
                    Disposition::Reject
                }
            }
            State::Digits => {
                if self.in_base(b) {
                    self.digit(b)
                } else if self.separator_allowed(c) {
                    self.separator()
                } else {
                    Disposition::Reject
                }
            }
            State::Word { word, matched } => {
                if b.to_ascii_lowercase() != word[matched] {
                    return Disposition::Reject;
                }
                if matched + 1 == word.len() {
                    self.buf.clear();
                    self.buf.push(b'0');
                    self.digits = 1;
                    self.state = State::Done;
                } else {
                    self.state = State::Word {
                        word,
                        matched: matched + 1,
                    };
                }
                Disposition::Discard
            }
            _ => Disposition::Reject,
        }
    }

    fn feed_float(&mut self, c: u32, ascii: Option<u8>) -> Disposition {
        let lower = ascii.map(|b| b.to_ascii_lowercase());
        let is_point = c == self.locale.decimal_point;
        match self.state {
            State::Start if matches!(ascii, Some(b'+' | b'-')) => {
                self.state = State::AfterSign;
                self.append(ascii.unwrap_or(b'+'))
            }
            State::Start | State::AfterSign => match lower {
                Some(b'n') => self.start_word(b"nan"),
                Some(b'i') => self.start_word(b"inf"),
                Some(b'0') => {
                    self.digit(b'0');
                    self.state = State::LeadingZero;
                    Disposition::Append(b'0')
                }
                Some(d) if d.is_ascii_digit() => self.digit(d),
                _ if is_point => {
                    self.point_seen = true;
                    self.state = State::Digits;
                    self.append(b'.')
                }
                _ => Disposition::Reject,
            },
            State::LeadingZero if lower == Some(b'x') => {
                self.hex = true;
                self.digits = 0;
                self.run = 0;
                self.state = State::Digits;
                self.append(b'x')
            }
            State::LeadingZero | State::Digits => {
                let is_digit = lower.is_some_and(|d| {
                    if self.hex {
                        d.is_ascii_hexdigit()
                    } else {
                        d.is_ascii_digit()
                    }
                });
                if is_digit {
                    return self.digit(lower.unwrap_or(b'0'));
                }
                if is_point && !self.point_seen {
                    if self.last_was_separator {
                        return Disposition::Reject;
                    }
                    self.point_seen = true;
                    self.state = State::Digits;
                    return self.append(b'.');
                }
                if self.separator_allowed(c) {
                    return self.separator();
                }
                let marker = if self.hex { b'p' } else { b'e' };
                if lower == Some(marker) && self.digits > 0 && !self.last_was_separator {
                    self.state = State::ExpStart;
                    return self.append(marker);
                }
                Disposition::Reject
            }
            State::ExpStart if matches!(ascii, Some(b'+' | b'-')) => {
                self.state = State::ExpSign;
                self.append(ascii.unwrap_or(b'+'))
            }
            State::ExpStart | State::ExpSign | State::ExpDigits => match ascii {
                Some(d) if d.is_ascii_digit() => {
                    self.state = State::ExpDigits;
                    self.append(d)
                }
                _ => Disposition::Reject,
            },
            State::Word { word, matched } => {
                if lower != Some(word[matched]) {
                    return Disposition::Reject;
                }
                self.state = if matched + 1 < word.len() {
                    State::Word {
                        word,
                        matched: matched + 1,
                    }
                } else if word == b"inf" {
                    State::InfDone
                } else {
                    State::Done
                };
                self.append(word[matched])
            }
            State::InfDone if lower == Some(b'i') => {
                self.state = State::Word {
                    word: b"infinity",
                    matched: 4,
                };
                self.append(b'i')
            }
            _ => Disposition::Reject,
        }
    }

    fn start_word(&mut self, word: &'static [u8]) -> Disposition {
        self.state = State::Word { word, matched: 1 };
        self.append(word[0])
    }

    /// If the field ended right after a thousands separator, un-record it.
    ///
    /// Returns `true` when the caller must push the separator back.
    pub fn take_trailing_separator(&mut self) -> bool {
        if !self.last_was_separator {
            return false;
        }
        self.last_was_separator = false;
        self.run = self.groups.pop().unwrap_or(0);
        true
    }

    /// Finish the field: check completeness and digit grouping and return
    /// the canonical token.
    pub fn finish(mut self) -> Result<Vec<u8>, Malformed> {
        match self.state {
            State::Word { .. } | State::ExpStart | State::ExpSign => return Err(Malformed),
            State::Start | State::AfterSign => return Err(Malformed),
            _ => {}
        }
        let is_word = matches!(self.state, State::Done | State::InfDone);
        if !is_word && self.digits == 0 && !(self.kind == FieldKind::Float && self.hex) {
            return Err(Malformed);
        }
        if !self.groups.is_empty() {
            self.groups.push(self.run);
            if !grouping_valid(&self.groups, &self.locale.grouping) {
                return Err(Malformed);
            }
        }
        Ok(self.buf)
    }
}

/// Width of the group `k` places above the least significant one, or
/// `None` once the grouping rule stops grouping.
fn group_width(spec: &[u8], k: usize) -> Option<usize> {
    let upto = k.min(spec.len().checked_sub(1)?);
    if spec[..=upto].iter().any(|&g| g == 0 || g >= CHAR_MAX) {
        return None;
    }
    Some(usize::from(spec[upto]))
}

/// Check integer-part digit groups (most significant first) against a
/// locale grouping rule.
fn grouping_valid(groups: &[usize], spec: &[u8]) -> bool {
    let last = groups.len() - 1;
    for (k, &len) in groups.iter().rev().enumerate() {
        let width = group_width(spec, k);
        if k == last {
            return len >= 1 && width.is_none_or(|w| len <= w);
        }
        if width != Some(len) {
            return false;
        }
    }
    true
}
