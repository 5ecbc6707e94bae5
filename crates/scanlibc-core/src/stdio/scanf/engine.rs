//! Conversion dispatcher.
//!
//! Walks a format string against a [`CharSource`], executing literal
//! matches, whitespace skips and `%` directives, and writes converted
//! values through the caller's [`ScanArg`] targets. One engine serves both
//! character widths: `U = u8` for the narrow family and `U = u32` for the
//! wide family.
//!
//! Reference: POSIX.1-2024 fscanf, ISO C11 7.21.6.2, 7.29.2.2

use scanlibc_membrane::config::SafetyLevel;
use scanlibc_membrane::heal::{HealingAction, global_healing_policy};
use scanlibc_membrane::metrics::{ScanMetrics, global_metrics};

use super::args::{ArgCursor, ScanArg, TargetKind};
use super::directive::{AllocMode, Conversion, Directive, parse_directive};
use super::error::{AllocPhase, ScanError};
use super::ledger::{AllocAccount, AllocRefused, Ledger};
use super::numeric::{Canonicalizer, Disposition, FieldKind, LocaleSnapshot};
use super::source::CharSource;
use super::unit::{ScanUnit, terminated_len};
use super::{EOF, ScanOptions, ScanReport};
use crate::errno::{ERANGE, set_errno};
use crate::stdlib::conversion::{ConversionStatus, strtod_impl, strtol_impl, strtoul_impl};
use crate::wchar::{MbState, MbStep, mbrtowc, wcrtomb};

// ---------------------------------------------------------------------------
// Per-directive helpers
// ---------------------------------------------------------------------------

/// A resolved output target.
#[derive(Debug, Clone, Copy)]
struct Target {
    index: usize,
    kind: TargetKind,
}

/// One input character: a single unit, or the bytes of one multibyte
/// character when a narrow scan feeds a wide target.
#[derive(Debug, Clone, Copy)]
struct Item<U> {
    value: u32,
    raw: [U; 4],
    len: usize,
}

impl<U: ScanUnit> Item<U> {
    fn single(unit: U) -> Self {
        let mut raw = [U::default(); 4];
        raw[0] = unit;
        Self {
            value: unit.to_u32(),
            raw,
            len: 1,
        }
    }

    fn units(&self) -> &[U] {
        &self.raw[..self.len]
    }

    fn is_space(&self) -> bool {
        self.len == 1 && self.raw[0].is_space()
    }
}

/// Characters collected for a `%c`, `%s` or `%[` directive.
enum Collected {
    Discard,
    Narrow(Vec<u8>),
    Wide(Vec<u32>),
}

/// How a character directive stores what it reads.
struct TextPlan {
    wide_out: bool,
    alloc: AllocMode,
    terminate: bool,
    limit: Option<usize>,
    /// Fixed buffer length, if the target is a fixed buffer.
    capacity: Option<usize>,
}

struct Captured {
    data: Collected,
    /// Output units the input run would have needed.
    wanted: usize,
    /// A GNU buffer could not grow; `data` holds the partial run.
    gnu_exhausted: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// State of one scan call.
pub(crate) struct Engine<'s, 'r, 'a, U: ScanUnit> {
    src: CharSource<'s, U>,
    args: &'r mut [ScanArg<'a>],
    cursor: ArgCursor,
    level: SafetyLevel,
    locale: LocaleSnapshot,
    ledger: Option<Ledger>,
    account: AllocAccount,
    done: usize,
    skip_pending: bool,
}

impl<'s, 'r, 'a, U: ScanUnit> Engine<'s, 'r, 'a, U> {
    pub(crate) fn new(
        src: CharSource<'s, U>,
        args: &'r mut [ScanArg<'a>],
        opts: &ScanOptions,
    ) -> Self {
        let cursor = ArgCursor::new(args.len());
        Self {
            src,
            args,
            cursor,
            level: opts.level,
            locale: LocaleSnapshot::capture(U::WIDE),
            ledger: None,
            account: AllocAccount::new(opts.alloc_budget, opts.initial_alloc),
            done: 0,
            skip_pending: false,
        }
    }

    /// Execute `fmt` and produce the call's result.
    pub(crate) fn run(mut self, fmt: &[U]) -> ScanReport {
        let metrics = global_metrics();
        ScanMetrics::inc(&metrics.scans);

        let fmt = &fmt[..terminated_len(fmt)];
        let failure = self.walk(fmt).err();

        let eof = match &failure {
            Some(ScanError::Decode) => self.done == 0 && self.src.decode_error(),
            Some(err) => err.forces_eof() || (err.is_input_failure() && self.done == 0),
            None => false,
        };
        if eof {
            if let Some(ledger) = self.ledger.take() {
                ledger.teardown(self.args);
            }
        }

        if let Some(err) = &failure {
            if let Some(code) = err.errno() {
                set_errno(code);
            }
            match err {
                ScanError::InputExhausted { .. } => ScanMetrics::inc(&metrics.input_failures),
                ScanError::MatchFailure { .. } | ScanError::Rejected { .. } => {
                    ScanMetrics::inc(&metrics.match_failures);
                }
                ScanError::Decode => ScanMetrics::inc(&metrics.decode_errors),
                _ => {}
            }
        }
        ScanMetrics::add(&metrics.assignments, self.done as u64);

        ScanReport {
            result: if eof {
                EOF
            } else {
                i32::try_from(self.done).unwrap_or(i32::MAX)
            },
            assigned: self.done,
            consumed: self.src.consumed(),
            failure,
        }
    }

    fn walk(&mut self, fmt: &[U]) -> Result<(), ScanError> {
        let mut i = 0;
        while i < fmt.len() {
            let unit = fmt[i];
            if unit.is_space() {
                self.skip_pending = true;
                i += 1;
                continue;
            }
            if unit.to_u32() != u32::from(b'%') {
                self.literal(unit, i)?;
                i += 1;
                continue;
            }
            let (directive, used) =
                parse_directive(&fmt[i + 1..]).ok_or(ScanError::InvalidFormat { offset: i })?;
            self.execute(&directive, i)?;
            i += 1 + used;
        }
        if self.skip_pending {
            self.skip_space();
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Input primitives
    // -----------------------------------------------------------------------

    /// Consume a run of input whitespace. Never fails; end of input is
    /// reported by whatever reads next.
    fn skip_space(&mut self) {
        self.skip_pending = false;
        loop {
            match self.src.next() {
                Some(u) if u.is_space() => {}
                other => {
                    self.src.push_back(other);
                    return;
                }
            }
        }
    }

    fn end_error(&self, offset: usize) -> ScanError {
        if self.src.decode_error() {
            ScanError::Decode
        } else {
            ScanError::InputExhausted { offset }
        }
    }

    fn literal(&mut self, expect: U, offset: usize) -> Result<(), ScanError> {
        if self.skip_pending {
            self.skip_space();
        }
        match self.src.next() {
            None => Err(self.end_error(offset)),
            Some(c) if c == expect => Ok(()),
            Some(c) => {
                self.src.push_back(Some(c));
                Err(ScanError::MatchFailure { offset })
            }
        }
    }

    /// Next input character; narrow input is decoded when `decode` is set.
    fn next_item(&mut self, decode: bool, state: &mut MbState) -> Result<Option<Item<U>>, ScanError> {
        if !decode {
            return Ok(self.src.next().map(Item::single));
        }
        let mut item = Item::single(U::default());
        item.len = 0;
        loop {
            let Some(unit) = self.src.next() else {
                return if item.len == 0 {
                    Ok(None)
                } else {
                    Err(ScanError::Decode)
                };
            };
            if item.len == item.raw.len() {
                return Err(ScanError::Decode);
            }
            item.raw[item.len] = unit;
            item.len += 1;
            let byte = [unit.to_u32() as u8];
            match mbrtowc(state, &byte) {
                Ok(MbStep::Char(wc, _)) => {
                    item.value = wc;
                    return Ok(Some(item));
                }
                Ok(MbStep::Incomplete(_)) => {}
                Err(_) => return Err(ScanError::Decode),
            }
        }
    }

    fn unread(&mut self, item: &Item<U>) {
        for &unit in item.units().iter().rev() {
            self.src.push_back(Some(unit));
        }
    }

    // -----------------------------------------------------------------------
    // Targets and healing
    // -----------------------------------------------------------------------

    fn strict(&self) -> bool {
        self.level.validation_enabled() && !self.level.heals_enabled()
    }

    fn heal(&self, action: HealingAction) {
        if self.level.heals_enabled() && action.is_heal() {
            global_healing_policy().record(&action);
            ScanMetrics::inc(&global_metrics().heals);
        }
    }

    /// Pick the argument a directive writes to.
    ///
    /// `Ok(None)` means the directive runs without storing anything.
    fn resolve(&mut self, d: &Directive, offset: usize) -> Result<Option<Target>, ScanError> {
        let Some(expected) = d.expected_target().filter(|_| !d.suppress) else {
            return Ok(None);
        };
        let index = self.cursor.take(d.position);
        if !self.cursor.contains(index) {
            if self.strict() {
                return Err(ScanError::MissingTarget { offset, index });
            }
            self.heal(HealingAction::SuppressAssignment);
            return Ok(None);
        }
        let found = self.args[index].kind();
        if found == expected {
            return Ok(Some(Target { index, kind: found }));
        }
        if self.strict() {
            return Err(ScanError::TargetMismatch {
                offset,
                index,
                expected,
                found,
            });
        }
        if found.is_numeric() == expected.is_numeric() {
            self.heal(HealingAction::CoerceTarget);
            Ok(Some(Target { index, kind: found }))
        } else {
            self.heal(HealingAction::SuppressAssignment);
            Ok(None)
        }
    }

    // -----------------------------------------------------------------------
    // Directive execution
    // -----------------------------------------------------------------------

    fn execute(&mut self, d: &Directive, offset: usize) -> Result<(), ScanError> {
        let target = self.resolve(d, offset)?;
        if self.skip_pending || d.skips_space() {
            self.skip_space();
        }
        match &d.conv {
            Conversion::Percent => self.literal(U::from_ascii(b'%'), offset),
            Conversion::Count => {
                if let Some(t) = target {
                    let count = i64::try_from(self.src.consumed()).unwrap_or(i64::MAX);
                    self.args[t.index].store_signed(count);
                    self.done += 1;
                }
                Ok(())
            }
            Conversion::Char | Conversion::Str | Conversion::Class(_) => {
                self.text(d, target, offset)
            }
            &Conversion::Int { base, signed } => {
                let kind = FieldKind::Integer {
                    base,
                    pointer: false,
                };
                self.integer(d, kind, signed, target, offset)
            }
            Conversion::Pointer => {
                let kind = FieldKind::Integer {
                    base: 16,
                    pointer: true,
                };
                self.integer(d, kind, false, target, offset)
            }
            Conversion::Float => self.float(d, target, offset),
        }
    }

    // --- numbers ---

    /// Read a numeric field through the canonicalizer.
    ///
    /// Returns the canonical token and the effective integer base.
    fn read_field(&mut self, kind: FieldKind, d: &Directive, offset: usize) -> Result<(Vec<u8>, u32), ScanError> {
        let mut canon = Canonicalizer::new(kind, d.group, &self.locale);
        let mut taken = 0usize;
        let mut last = None;
        let mut ended = false;
        while d.width.is_none_or(|w| taken < w) {
            let Some(unit) = self.src.next() else {
                ended = true;
                break;
            };
            if canon.feed(unit.to_u32()) == Disposition::Reject {
                self.src.push_back(Some(unit));
                break;
            }
            taken += 1;
            last = Some(unit);
        }
        if taken == 0 {
            return Err(if ended {
                self.end_error(offset)
            } else {
                ScanError::MatchFailure { offset }
            });
        }
        if canon.take_trailing_separator() {
            self.src.push_back(last);
        }
        let base = canon.base();
        let token = canon.finish().map_err(|_| ScanError::Rejected { offset })?;
        Ok((token, base))
    }

    fn integer(
        &mut self,
        d: &Directive,
        kind: FieldKind,
        signed: bool,
        target: Option<Target>,
        offset: usize,
    ) -> Result<(), ScanError> {
        let (token, base) = self.read_field(kind, d, offset)?;
        let base = i32::try_from(base).unwrap_or(10);
        let range_error = if signed {
            let (value, used, status) = strtol_impl(&token, base);
            if used != token.len() {
                return Err(ScanError::Rejected { offset });
            }
            let Some(t) = target else {
                return Ok(());
            };
            self.args[t.index].store_signed(value) || status == ConversionStatus::Overflow
        } else {
            let (negative, digits) = match token.split_first() {
                Some((b'-', rest)) => (true, rest),
                Some((b'+', rest)) => (false, rest),
                _ => (false, &token[..]),
            };
            let (magnitude, used, status) = strtoul_impl(digits, base);
            if used != digits.len() {
                return Err(ScanError::Rejected { offset });
            }
            let Some(t) = target else {
                return Ok(());
            };
            self.args[t.index].store_unsigned(negative, magnitude, status == ConversionStatus::Overflow)
        };
        if range_error {
            set_errno(ERANGE);
        }
        self.done += 1;
        Ok(())
    }

    fn float(&mut self, d: &Directive, target: Option<Target>, offset: usize) -> Result<(), ScanError> {
        let (token, _) = self.read_field(FieldKind::Float, d, offset)?;
        let Some(t) = target else {
            let (_, used, _) = strtod_impl(&token);
            return if used == token.len() {
                Ok(())
            } else {
                Err(ScanError::Rejected { offset })
            };
        };
        let range_error = self.args[t.index]
            .store_float(&token)
            .ok_or(ScanError::Rejected { offset })?;
        if range_error {
            set_errno(ERANGE);
        }
        self.done += 1;
        Ok(())
    }

    // --- characters ---

    fn text(&mut self, d: &Directive, target: Option<Target>, offset: usize) -> Result<(), ScanError> {
        let alloc = match target {
            Some(t) if t.kind.is_alloc() && d.alloc == AllocMode::None => AllocMode::Posix,
            Some(t) if t.kind.is_alloc() => d.alloc,
            _ => AllocMode::None,
        };
        let plan = TextPlan {
            wide_out: target.map_or(d.wide, |t| t.kind.is_wide()),
            alloc,
            terminate: d.conv != Conversion::Char,
            limit: if d.conv == Conversion::Char {
                Some(d.width.unwrap_or(1))
            } else {
                d.width
            },
            capacity: target.and_then(|t| self.args[t.index].fixed_capacity()),
        };

        let captured = match self.collect(d, target, &plan, offset) {
            Ok(captured) => captured,
            Err(err) => {
                // The directive's own buffer never reaches the caller.
                if let Some(t) = target.filter(|_| plan.alloc != AllocMode::None) {
                    self.args[t.index].release_alloc();
                }
                return Err(err);
            }
        };
        let Some(t) = target else {
            return Ok(());
        };

        if let Some(capacity) = plan.capacity {
            let action = if plan.terminate {
                global_healing_policy().heal_string_bounds(captured.wanted, capacity)
            } else {
                global_healing_policy().heal_char_bounds(captured.wanted, capacity)
            };
            self.heal(action);
        }
        match captured.data {
            Collected::Narrow(data) => self.args[t.index].store_bytes(data, plan.terminate),
            Collected::Wide(data) => self.args[t.index].store_wide(data, plan.terminate),
            Collected::Discard => {}
        }
        if plan.alloc == AllocMode::Posix {
            self.ledger.get_or_insert_with(Ledger::new).record(t.index);
        }
        self.done += 1;

        if captured.gnu_exhausted {
            return Err(ScanError::AllocFailed {
                offset,
                phase: AllocPhase::GnuGrowth,
            });
        }
        Ok(())
    }

    fn collect(
        &mut self,
        d: &Directive,
        target: Option<Target>,
        plan: &TextPlan,
        offset: usize,
    ) -> Result<Captured, ScanError> {
        let alloc = plan.alloc != AllocMode::None;
        let mut data = match (target, alloc, plan.wide_out) {
            (None, _, _) => Collected::Discard,
            (Some(_), false, false) => Collected::Narrow(Vec::new()),
            (Some(_), false, true) => Collected::Wide(Vec::new()),
            (Some(_), true, false) => self.account.start().map(Collected::Narrow).map_err(|_| initial_failure(offset))?,
            (Some(_), true, true) => self.account.start().map(Collected::Wide).map_err(|_| initial_failure(offset))?,
        };
        let room = plan
            .capacity
            .map(|cap| if plan.terminate { cap.saturating_sub(1) } else { cap });

        let decode = !U::WIDE && plan.wide_out;
        let mut state = MbState::new();
        let mut items = 0usize;
        let mut wanted = 0usize;
        let mut truncated = false;
        let mut ended = false;
        let mut gnu_exhausted = false;

        while plan.limit.is_none_or(|limit| items < limit) {
            let Some(item) = self.next_item(decode, &mut state)? else {
                ended = true;
                break;
            };
            if !accepts(&d.conv, &item) {
                self.unread(&item);
                break;
            }
            let (units, n) = encode(&item, plan.wide_out)?;
            if room.is_some_and(|room| wanted + n > room) && !truncated {
                if self.strict() {
                    self.unread(&item);
                    return Err(ScanError::BufferOverflow {
                        offset,
                        index: target.map_or(0, |t| t.index),
                        capacity: plan.capacity.unwrap_or(0),
                    });
                }
                truncated = true;
            }
            items += 1;
            wanted += n;
            if truncated {
                continue;
            }
            if self.store_units(&mut data, &units[..n], alloc).is_err() {
                if plan.alloc == AllocMode::Gnu {
                    gnu_exhausted = true;
                    break;
                }
                return Err(ScanError::AllocFailed {
                    offset,
                    phase: AllocPhase::PosixGrowth,
                });
            }
        }

        if items == 0 {
            return Err(if ended {
                self.end_error(offset)
            } else {
                ScanError::MatchFailure { offset }
            });
        }
        Ok(Captured {
            data,
            wanted,
            gnu_exhausted,
        })
    }

    fn store_units(&mut self, data: &mut Collected, units: &[u32], alloc: bool) -> Result<(), AllocRefused> {
        match data {
            Collected::Discard => {}
            Collected::Narrow(buf) => {
                for &u in units {
                    let byte = u as u8;
                    if alloc {
                        self.account.push(buf, byte)?;
                    } else {
                        buf.push(byte);
                    }
                }
            }
            Collected::Wide(buf) => {
                for &u in units {
                    if alloc {
                        self.account.push(buf, u)?;
                    } else {
                        buf.push(u);
                    }
                }
            }
        }
        Ok(())
    }
}

fn initial_failure(offset: usize) -> ScanError {
    ScanError::AllocFailed {
        offset,
        phase: AllocPhase::Initial,
    }
}

/// Whether `item` belongs to the run of a character directive.
fn accepts<U: ScanUnit>(conv: &Conversion, item: &Item<U>) -> bool {
    match conv {
        Conversion::Char => true,
        Conversion::Str => !item.is_space(),
        Conversion::Class(class) => {
            if U::WIDE {
                class.contains(item.value)
            } else {
                item.units().iter().all(|u| class.contains(u.to_u32()))
            }
        }
        _ => false,
    }
}

/// Output units for one input character: the code point for a wide
/// target, the multibyte bytes for a narrow target.
fn encode<U: ScanUnit>(item: &Item<U>, wide_out: bool) -> Result<([u32; 4], usize), ScanError> {
    let mut units = [0u32; 4];
    if wide_out || !U::WIDE {
        units[0] = item.value;
        return Ok((units, 1));
    }
    let mut bytes = [0u8; 4];
    let n = wcrtomb(item.value, &mut bytes).map_err(|_| ScanError::Decode)?;
    for (dst, &b) in units.iter_mut().zip(&bytes[..n]) {
        *dst = u32::from(b);
    }
    Ok((units, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_space_requires_single_unit() {
        assert!(Item::single(b' ').is_space());
        assert!(!Item::single(b'x').is_space());
        let mut item = Item::single(0xC2u8);
        item.raw[1] = 0xA0;
        item.len = 2;
        item.value = 0xA0;
        assert!(!item.is_space());
    }

    #[test]
    fn encode_wide_to_narrow() {
        let item = Item::single(0x20ACu32);
        let (units, n) = encode(&item, false).unwrap();
        assert_eq!(&units[..n], &[0xE2, 0x82, 0xAC]);
        let (units, n) = encode(&item, true).unwrap();
        assert_eq!(&units[..n], &[0x20AC]);
        assert_eq!(encode(&Item::single(0xD800u32), false), Err(ScanError::Decode));
    }

    #[test]
    fn class_membership_checks_every_byte() {
        let (class, _) = super::super::class::CharClass::parse(b"a-z]").unwrap();
        let conv = Conversion::Class(class);
        assert!(accepts(&conv, &Item::single(b'q')));
        let mut item = Item::single(b'a');
        item.raw[1] = 0xFF;
        item.len = 2;
        assert!(!accepts(&conv, &item));
    }

    #[test]
    fn narrow_decode_assembles_multibyte_item() {
        let input = "é!".as_bytes();
        let mut args: [ScanArg<'_>; 0] = [];
        let opts = ScanOptions::default();
        let mut engine = Engine::new(CharSource::from_text(input), &mut args, &opts);
        let mut state = MbState::new();
        let item = engine.next_item(true, &mut state).unwrap().unwrap();
        assert_eq!(item.value, u32::from('é'));
        assert_eq!(item.len, 2);
        let bang = engine.next_item(true, &mut state).unwrap().unwrap();
        assert_eq!(bang.value, u32::from(b'!'));
        assert!(engine.next_item(true, &mut state).unwrap().is_none());
    }

    #[test]
    fn narrow_decode_rejects_truncated_sequence() {
        let input = [0xE2u8, 0x82];
        let mut args: [ScanArg<'_>; 0] = [];
        let opts = ScanOptions::default();
        let mut engine = Engine::new(CharSource::from_text(&input[..]), &mut args, &opts);
        let mut state = MbState::new();
        assert_eq!(engine.next_item(true, &mut state).unwrap_err(), ScanError::Decode);
    }
}
