//! Numeric conversion functions (strtol, strtoul, strtod, strtof).
//!
//! Every `*_impl` returns `(value, consumed_bytes, status)`. A return with
//! `consumed_bytes == 0` means no conversion could be performed.

use crate::ctype::{digit_value, is_space, is_xdigit, to_lower};

/// Result of a string-to-number conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStatus {
    Success,
    Overflow,
    Underflow,
    InvalidBase,
}

// ----------------------------------------------------------------------------
// Integers
// ----------------------------------------------------------------------------

struct Magnitude {
    negative: bool,
    value: u64,
    overflow: bool,
    end: usize,
}

/// Shared front half of strtol/strtoul: whitespace, sign, prefix, digits.
///
/// `limit` gives the largest magnitude representable for a given sign.
fn scan_magnitude(
    s: &[u8],
    base: i32,
    limit: impl Fn(bool) -> u64,
) -> Result<Option<Magnitude>, ConversionStatus> {
    let len = s.len();
    let mut i = 0;
    while i < len && is_space(s[i]) {
        i += 1;
    }

    let mut negative = false;
    if i < len && (s[i] == b'-' || s[i] == b'+') {
        negative = s[i] == b'-';
        i += 1;
    }

    // "0x" only counts as a prefix when a hex digit follows it.
    let hex_prefix = i + 2 < len
        && s[i] == b'0'
        && to_lower(s[i + 1]) == b'x'
        && is_xdigit(s[i + 2]);

    let effective_base = match base {
        0 if hex_prefix => {
            i += 2;
            16
        }
        0 if i < len && s[i] == b'0' => 8,
        0 => 10,
        16 if hex_prefix => {
            i += 2;
            16
        }
        2..=36 => base as u32,
        _ => return Err(ConversionStatus::InvalidBase),
    };

    let abs_max = limit(negative);
    let wide_base = u64::from(effective_base);
    let cutoff = abs_max / wide_base;
    let cutlim = abs_max % wide_base;

    let mut acc: u64 = 0;
    let mut any_digits = false;
    let mut overflow = false;
    while i < len {
        let Some(digit) = digit_value(s[i]).filter(|&d| d < effective_base) else {
            break;
        };
        any_digits = true;
        let digit = u64::from(digit);
        if !overflow {
            if acc > cutoff || (acc == cutoff && digit > cutlim) {
                overflow = true;
            } else {
                acc = acc * wide_base + digit;
            }
        }
        i += 1;
    }

    Ok(any_digits.then_some(Magnitude {
        negative,
        value: acc,
        overflow,
        end: i,
    }))
}

/// `strtol` core: clamps to `i64::MIN`/`i64::MAX` on overflow.
pub fn strtol_impl(s: &[u8], base: i32) -> (i64, usize, ConversionStatus) {
    let limit = |negative: bool| {
        if negative {
            i64::MIN.unsigned_abs()
        } else {
            i64::MAX as u64
        }
    };
    match scan_magnitude(s, base, limit) {
        Err(status) => (0, 0, status),
        Ok(None) => (0, 0, ConversionStatus::Success),
        Ok(Some(m)) if m.overflow && m.negative => (i64::MIN, m.end, ConversionStatus::Underflow),
        Ok(Some(m)) if m.overflow => (i64::MAX, m.end, ConversionStatus::Overflow),
        Ok(Some(m)) => {
            let val = if m.negative {
                (m.value as i64).wrapping_neg()
            } else {
                m.value as i64
            };
            (val, m.end, ConversionStatus::Success)
        }
    }
}

pub fn strtol(s: &[u8], base: i32) -> (i64, usize) {
    let (val, len, _) = strtol_impl(s, base);
    (val, len)
}

/// `strtoul` core: a leading `-` negates the magnitude modulo 2^64.
pub fn strtoul_impl(s: &[u8], base: i32) -> (u64, usize, ConversionStatus) {
    match scan_magnitude(s, base, |_| u64::MAX) {
        Err(status) => (0, 0, status),
        Ok(None) => (0, 0, ConversionStatus::Success),
        Ok(Some(m)) if m.overflow => (u64::MAX, m.end, ConversionStatus::Overflow),
        Ok(Some(m)) => {
            let val = if m.negative {
                m.value.wrapping_neg()
            } else {
                m.value
            };
            (val, m.end, ConversionStatus::Success)
        }
    }
}

pub fn strtoul(s: &[u8], base: i32) -> (u64, usize) {
    let (val, len, _) = strtoul_impl(s, base);
    (val, len)
}

// ----------------------------------------------------------------------------
// Floating point
// ----------------------------------------------------------------------------

enum FloatBody {
    Infinity,
    Nan,
    /// ASCII decimal text accepted by `str::parse`; `nonzero` if any
    /// mantissa digit is not `0`.
    Decimal { start: usize, nonzero: bool },
    /// `mantissa * 2^exponent`; the low bit of `mantissa` is sticky.
    Hex { mantissa: u64, exponent: i64 },
}

struct FloatToken {
    negative: bool,
    body: FloatBody,
    end: usize,
}

fn starts_with_ignore_case(s: &[u8], word: &[u8]) -> bool {
    s.len() >= word.len() && s.iter().zip(word).all(|(&a, &b)| to_lower(a) == b)
}

fn scan_float_token(s: &[u8]) -> Option<FloatToken> {
    let len = s.len();
    let mut i = 0;
    while i < len && is_space(s[i]) {
        i += 1;
    }
    let mut negative = false;
    if i < len && (s[i] == b'-' || s[i] == b'+') {
        negative = s[i] == b'-';
        i += 1;
    }
    let rest = &s[i..];

    if starts_with_ignore_case(rest, b"infinity") {
        return Some(FloatToken { negative, body: FloatBody::Infinity, end: i + 8 });
    }
    if starts_with_ignore_case(rest, b"inf") {
        return Some(FloatToken { negative, body: FloatBody::Infinity, end: i + 3 });
    }
    if starts_with_ignore_case(rest, b"nan") {
        let mut end = i + 3;
        // Optional "(n-char-sequence)"; ignored unless closed.
        if end < len && s[end] == b'(' {
            let mut j = end + 1;
            while j < len && (s[j].is_ascii_alphanumeric() || s[j] == b'_') {
                j += 1;
            }
            if j < len && s[j] == b')' {
                end = j + 1;
            }
        }
        return Some(FloatToken { negative, body: FloatBody::Nan, end });
    }

    if rest.len() >= 2 && rest[0] == b'0' && to_lower(rest[1]) == b'x' {
        if let Some((mantissa, exponent, used)) = scan_hex_float(&rest[2..]) {
            return Some(FloatToken {
                negative,
                body: FloatBody::Hex { mantissa, exponent },
                end: i + 2 + used,
            });
        }
        // "0x" without hex digits converts as "0".
        return Some(FloatToken {
            negative,
            body: FloatBody::Decimal { start: i, nonzero: false },
            end: i + 1,
        });
    }

    let start = i;
    let mut digits = 0usize;
    let mut nonzero = false;
    while i < len && s[i].is_ascii_digit() {
        nonzero |= s[i] != b'0';
        digits += 1;
        i += 1;
    }
    if i < len && s[i] == b'.' {
        i += 1;
        while i < len && s[i].is_ascii_digit() {
            nonzero |= s[i] != b'0';
            digits += 1;
            i += 1;
        }
    }
    if digits == 0 {
        return None;
    }
    if i < len && to_lower(s[i]) == b'e' {
        let mut j = i + 1;
        if j < len && (s[j] == b'+' || s[j] == b'-') {
            j += 1;
        }
        if j < len && s[j].is_ascii_digit() {
            while j < len && s[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    Some(FloatToken {
        negative,
        body: FloatBody::Decimal { start, nonzero },
        end: i,
    })
}

/// Parse the part after `0x`. Returns `(mantissa, binary_exponent, used)`.
fn scan_hex_float(s: &[u8]) -> Option<(u64, i64, usize)> {
    const MAX_DIGITS: u32 = 15;
    let len = s.len();
    let mut i = 0;
    let mut mantissa: u64 = 0;
    let mut kept = 0u32;
    let mut exponent: i64 = 0;
    let mut sticky = false;
    let mut any = false;
    let mut seen_point = false;

    while i < len {
        let c = s[i];
        if c == b'.' && !seen_point {
            seen_point = true;
            i += 1;
            continue;
        }
        let Some(d) = digit_value(c).filter(|&d| d < 16) else {
            break;
        };
        any = true;
        if mantissa == 0 && d == 0 {
            // Leading zeros carry no precision.
            if seen_point {
                exponent -= 4;
            }
        } else if kept < MAX_DIGITS {
            mantissa = (mantissa << 4) | u64::from(d);
            kept += 1;
            if seen_point {
                exponent -= 4;
            }
        } else {
            sticky |= d != 0;
            if !seen_point {
                exponent += 4;
            }
        }
        i += 1;
    }
    if !any {
        return None;
    }

    if i < len && to_lower(s[i]) == b'p' {
        let mut j = i + 1;
        let mut exp_negative = false;
        if j < len && (s[j] == b'+' || s[j] == b'-') {
            exp_negative = s[j] == b'-';
            j += 1;
        }
        if j < len && s[j].is_ascii_digit() {
            let mut value: i64 = 0;
            while j < len && s[j].is_ascii_digit() {
                value = (value * 10 + i64::from(s[j] - b'0')).min(1_000_000);
                j += 1;
            }
            exponent += if exp_negative { -value } else { value };
            i = j;
        }
    }

    if sticky {
        mantissa |= 1;
    }
    Some((mantissa, exponent, i))
}

/// Round `mantissa * 2^exponent` once to a binary format with `precision`
/// significand bits and normal exponents `min_exp..=max_exp`.
///
/// Subnormal results keep fewer bits. The returned `f64` is the rounded
/// value exactly, so narrowing it to an `f32` target is lossless.
fn round_hex(mantissa: u64, exponent: i64, precision: i64, min_exp: i64, max_exp: i64) -> f64 {
    if mantissa == 0 {
        return 0.0;
    }
    let bits = i64::from(u64::BITS - mantissa.leading_zeros());
    let top = exponent + bits - 1;
    let keep = precision - (min_exp - top).max(0);
    let shift = bits - keep;
    let m = u128::from(mantissa);
    let q = if shift <= 0 {
        m << shift.unsigned_abs()
    } else if shift >= 128 {
        0
    } else {
        let q = m >> shift;
        let rem = m & ((1u128 << shift) - 1);
        let half = 1u128 << (shift - 1);
        // Ties go to even; the parser folded dropped digits into bit 0.
        if rem > half || (rem == half && q & 1 == 1) {
            q + 1
        } else {
            q
        }
    };
    if q == 0 {
        return 0.0;
    }
    let lsb = exponent + shift;
    let q_bits = i64::from(u128::BITS - q.leading_zeros());
    if lsb + q_bits - 1 > max_exp {
        return f64::INFINITY;
    }
    ldexp_exact(q as f64, lsb)
}

/// `x * 2^e` for a product known to be representable.
fn ldexp_exact(mut x: f64, mut e: i64) -> f64 {
    while e > 1023 {
        x *= pow2(1023);
        e -= 1023;
    }
    while e < -1022 {
        x *= pow2(-1022);
        e += 1022;
    }
    x * pow2(e)
}

/// `2^e` for a normal exponent.
fn pow2(e: i64) -> f64 {
    f64::from_bits(((e + 1023) as u64) << 52)
}

fn float_status(value: f64, nonzero_input: bool) -> ConversionStatus {
    if value.is_infinite() {
        ConversionStatus::Overflow
    } else if value == 0.0 && nonzero_input {
        ConversionStatus::Underflow
    } else {
        ConversionStatus::Success
    }
}

fn ascii_str(s: &[u8]) -> Option<&str> {
    std::str::from_utf8(s).ok()
}

/// `strtod` core, including hexadecimal floats and `inf`/`nan` spellings.
pub fn strtod_impl(s: &[u8]) -> (f64, usize, ConversionStatus) {
    let Some(token) = scan_float_token(s) else {
        return (0.0, 0, ConversionStatus::Success);
    };
    let (magnitude, status) = match token.body {
        FloatBody::Infinity => (f64::INFINITY, ConversionStatus::Success),
        FloatBody::Nan => (f64::NAN, ConversionStatus::Success),
        FloatBody::Decimal { start, nonzero } => {
            let parsed = ascii_str(&s[start..token.end]).and_then(|t| t.parse::<f64>().ok());
            let Some(v) = parsed else {
                return (0.0, 0, ConversionStatus::Success);
            };
            (v, float_status(v, nonzero))
        }
        FloatBody::Hex { mantissa, exponent } => {
            let v = round_hex(mantissa, exponent, 53, -1022, 1023);
            (v, float_status(v, mantissa != 0))
        }
    };
    let value = if token.negative { -magnitude } else { magnitude };
    (value, token.end, status)
}

pub fn strtod(s: &[u8]) -> (f64, usize) {
    let (val, len, _) = strtod_impl(s);
    (val, len)
}

/// `strtof` core. Decimal input is rounded once, directly to `f32`.
pub fn strtof_impl(s: &[u8]) -> (f32, usize, ConversionStatus) {
    let Some(token) = scan_float_token(s) else {
        return (0.0, 0, ConversionStatus::Success);
    };
    let (magnitude, status) = match token.body {
        FloatBody::Infinity => (f32::INFINITY, ConversionStatus::Success),
        FloatBody::Nan => (f32::NAN, ConversionStatus::Success),
        FloatBody::Decimal { start, nonzero } => {
            let parsed = ascii_str(&s[start..token.end]).and_then(|t| t.parse::<f32>().ok());
            let Some(v) = parsed else {
                return (0.0, 0, ConversionStatus::Success);
            };
            (v, float_status(f64::from(v), nonzero))
        }
        FloatBody::Hex { mantissa, exponent } => {
            let v = round_hex(mantissa, exponent, 24, -126, 127) as f32;
            (v, float_status(f64::from(v), mantissa != 0))
        }
    };
    let value = if token.negative { -magnitude } else { magnitude };
    (value, token.end, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strtol_base10() {
        let (val, len) = strtol(b"123456", 10);
        assert_eq!(val, 123456);
        assert_eq!(len, 6);
        assert_eq!(strtol(b"   -42xyz", 10), (-42, 6));
    }

    #[test]
    fn test_strtol_base16() {
        assert_eq!(strtol(b"0xFF", 16), (255, 4));
        assert_eq!(strtol(b"FF", 16), (255, 2));
    }

    #[test]
    fn test_strtol_auto_base() {
        assert_eq!(strtol(b"0x10", 0).0, 16);
        assert_eq!(strtol(b"010", 0).0, 8);
        assert_eq!(strtol(b"10", 0).0, 10);
        assert_eq!(strtol(b"09", 0), (0, 1));
    }

    #[test]
    fn test_strtol_invalid_base() {
        assert_eq!(strtol_impl(b"12", 1), (0, 0, ConversionStatus::InvalidBase));
        assert_eq!(strtol_impl(b"12", 37), (0, 0, ConversionStatus::InvalidBase));
    }

    #[test]
    fn test_strtol_no_digits() {
        assert_eq!(strtol(b"", 10), (0, 0));
        assert_eq!(strtol(b"-", 10), (0, 0));
        assert_eq!(strtol(b"  x", 10), (0, 0));
    }

    #[test]
    fn test_strtol_overflow() {
        let s = format!("{}", i64::MAX);
        assert_eq!(
            strtol_impl(s.as_bytes(), 10),
            (i64::MAX, s.len(), ConversionStatus::Success)
        );
        let (val, _, status) = strtol_impl(b"9223372036854775808", 10);
        assert_eq!(val, i64::MAX);
        assert_eq!(status, ConversionStatus::Overflow);

        let s = format!("{}", i64::MIN);
        assert_eq!(strtol_impl(s.as_bytes(), 10).0, i64::MIN);
        let (val, len, status) = strtol_impl(b"-9223372036854775809", 10);
        assert_eq!(val, i64::MIN);
        assert_eq!(len, 20);
        assert_eq!(status, ConversionStatus::Underflow);
    }

    #[test]
    fn test_strtoul_overflow_and_negation() {
        let s = format!("{}", u64::MAX);
        assert_eq!(strtoul_impl(s.as_bytes(), 10).0, u64::MAX);
        let (val, _, status) = strtoul_impl(b"18446744073709551616", 10);
        assert_eq!(val, u64::MAX);
        assert_eq!(status, ConversionStatus::Overflow);
        assert_eq!(strtoul(b"-1", 10), (u64::MAX, 2));
    }

    #[test]
    fn test_strtol_0x_edge_cases() {
        assert_eq!(strtol(b"0xz", 0), (0, 1));
        assert_eq!(strtol(b"0xz", 16), (0, 1));
        assert_eq!(strtol(b"0x", 0), (0, 1));
        assert_eq!(strtol(b"0x1", 0), (1, 3));
    }

    // ── strtod ──────────────────────────────────────────────────────

    #[test]
    fn test_strtod_decimal() {
        assert_eq!(strtod(b"3.25"), (3.25, 4));
        assert_eq!(strtod(b"  -3.5e2xyz"), (-350.0, 8));
        assert_eq!(strtod(b"1."), (1.0, 2));
        assert_eq!(strtod(b".5"), (0.5, 2));
        assert_eq!(strtod(b"1e"), (1.0, 1));
        assert_eq!(strtod(b"1e+"), (1.0, 1));
        assert_eq!(strtod(b"."), (0.0, 0));
        assert_eq!(strtod(b"abc"), (0.0, 0));
    }

    #[test]
    fn test_strtod_special_values() {
        assert_eq!(strtod(b"inf"), (f64::INFINITY, 3));
        assert_eq!(strtod(b"-Infinity!"), (f64::NEG_INFINITY, 9));
        assert_eq!(strtod(b"INFINI"), (f64::INFINITY, 3));
        let (v, n) = strtod(b"nan(0x1f)rest");
        assert!(v.is_nan());
        assert_eq!(n, 9);
        let (v, n) = strtod(b"NaN(");
        assert!(v.is_nan());
        assert_eq!(n, 3);
    }

    #[test]
    fn test_strtod_hex() {
        assert_eq!(strtod(b"0x1p4"), (16.0, 5));
        assert_eq!(strtod(b"0x1.8p1"), (3.0, 7));
        assert_eq!(strtod(b"-0X.8"), (-0.5, 5));
        assert_eq!(strtod(b"0xAp-1"), (5.0, 6));
        assert_eq!(strtod(b"0x1p"), (1.0, 3));
        assert_eq!(strtod(b"0xg"), (0.0, 1));
        assert_eq!(strtod(b"0x1.fffffffffffffp1023").0, f64::MAX);
    }

    #[test]
    fn test_strtod_range_errors() {
        let (v, _, status) = strtod_impl(b"1e400");
        assert!(v.is_infinite());
        assert_eq!(status, ConversionStatus::Overflow);
        let (v, _, status) = strtod_impl(b"1e-400");
        assert_eq!(v, 0.0);
        assert_eq!(status, ConversionStatus::Underflow);
        assert_eq!(strtod_impl(b"0e-400").2, ConversionStatus::Success);
        assert_eq!(strtod_impl(b"0x1p99999").2, ConversionStatus::Overflow);
    }

    #[test]
    fn test_strtof_rounds_once() {
        let (v, n, status) = strtof_impl(b"0.1");
        assert_eq!(v, 0.1f32);
        assert_eq!(n, 3);
        assert_eq!(status, ConversionStatus::Success);
        assert_eq!(strtof_impl(b"1e39").2, ConversionStatus::Overflow);
        assert_eq!(strtof_impl(b"0x1.8p1").0, 3.0f32);
    }

    #[test]
    fn test_strtof_hex_rounds_at_f32_precision() {
        // Just above the halfway point between 1 and 1 + 2^-23.
        let (v, n, status) = strtof_impl(b"0x1.00000100000002p0");
        assert_eq!(v, 1.0f32 + f32::EPSILON);
        assert_eq!(n, 20);
        assert_eq!(status, ConversionStatus::Success);
        // Exact tie rounds to even.
        assert_eq!(strtof_impl(b"0x1.000001p0").0, 1.0f32);
        assert_eq!(strtof_impl(b"0x1.000003p0").0, 1.0f32 + 2.0 * f32::EPSILON);
        // Dropped digits beyond the kept fifteen still break the tie.
        assert_eq!(strtof_impl(b"0x1.000001000000000001p0").0, 1.0f32 + f32::EPSILON);
        assert_eq!(strtof_impl(b"0x1p-149").0.to_bits(), 1);
        assert_eq!(strtof_impl(b"0x1p-151").0, 0.0);
        assert_eq!(strtof_impl(b"0x1.fffffffp127").2, ConversionStatus::Overflow);
    }

    #[test]
    fn test_strtod_hex_subnormal_rounds_once() {
        let (v, _, status) = strtod_impl(b"0x1.7fffffffffffffp-1074");
        assert_eq!(v.to_bits(), 1);
        assert_eq!(status, ConversionStatus::Success);
        assert_eq!(strtod(b"0x1.8p-1074").0.to_bits(), 2);
        assert_eq!(strtod(b"0x1p-1075").0, 0.0);
        assert_eq!(strtod(b"0x1.0000000000001p-1075").0.to_bits(), 1);
        assert_eq!(strtod(b"0x1p-1022").0, f64::MIN_POSITIVE);
        assert_eq!(strtod(b"0x1.fffffffffffff8p1023").0, f64::INFINITY);
    }
}
