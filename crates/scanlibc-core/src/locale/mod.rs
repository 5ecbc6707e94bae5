//! Locale support.
//!
//! Only the `LC_NUMERIC` category is modelled: decimal point, thousands
//! separator and digit grouping. Each thread has its own current numeric
//! locale, starting out as "C".

use std::cell::RefCell;

/// Value that ends a grouping specification (POSIX `CHAR_MAX`).
pub const CHAR_MAX: u8 = 127;

/// Numeric formatting conventions (the numeric half of POSIX `struct lconv`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConv {
    /// Decimal-point character, UTF-8 encoded.
    pub decimal_point: Vec<u8>,
    /// Thousands separator, UTF-8 encoded. Empty when the locale has none.
    pub thousands_sep: Vec<u8>,
    /// Grouping specification. Each byte is a group width, least significant
    /// group first; the last width repeats and `CHAR_MAX` stops grouping.
    pub grouping: Vec<u8>,
}

impl Default for LocaleConv {
    fn default() -> Self {
        c_locale_conv()
    }
}

/// Returns the `LocaleConv` for the POSIX "C" locale.
pub fn c_locale_conv() -> LocaleConv {
    LocaleConv {
        decimal_point: b".".to_vec(),
        thousands_sep: Vec::new(),
        grouping: Vec::new(),
    }
}

/// Returns `true` if `name` refers to the minimal POSIX "C" locale.
#[inline]
pub fn is_c_locale(name: &[u8]) -> bool {
    matches!(name, b"C" | b"POSIX" | b"" | b"C.UTF-8" | b"C.utf8")
}

/// Numeric conventions of a named locale, or `None` if it is not known.
///
/// The codeset suffix (`.UTF-8`, `.utf8`) is ignored.
pub fn numeric_conv_for(name: &[u8]) -> Option<LocaleConv> {
    if is_c_locale(name) {
        return Some(c_locale_conv());
    }
    let base = name.split(|&b| b == b'.').next().unwrap_or(name);
    let (decimal, sep, grouping): (&[u8], &[u8], &[u8]) = match base {
        b"en_US" | b"en_GB" | b"en_AU" | b"en_CA" => (b".", b",", &[3, 3]),
        b"en_IN" | b"hi_IN" => (b".", b",", &[3, 2]),
        b"de_DE" | b"es_ES" | b"it_IT" | b"nl_NL" => (b",", b".", &[3, 3]),
        b"fr_FR" => (b",", "\u{202f}".as_bytes(), &[3, 3]),
        b"de_CH" => (b".", "\u{2019}".as_bytes(), &[3, 3]),
        _ => return None,
    };
    Some(LocaleConv {
        decimal_point: decimal.to_vec(),
        thousands_sep: sep.to_vec(),
        grouping: grouping.to_vec(),
    })
}

thread_local! {
    static CURRENT_NUMERIC: RefCell<Option<LocaleConv>> = const { RefCell::new(None) };
}

/// Select the calling thread's numeric locale by name.
///
/// Returns `false` (and leaves the current locale alone) for unknown names.
pub fn set_numeric_locale(name: &[u8]) -> bool {
    match numeric_conv_for(name) {
        Some(conv) => {
            set_numeric_conv(conv);
            true
        }
        None => false,
    }
}

/// Install explicit numeric conventions for the calling thread.
pub fn set_numeric_conv(conv: LocaleConv) {
    CURRENT_NUMERIC.with(|cur| *cur.borrow_mut() = Some(conv));
}

/// Numeric conventions currently in effect for the calling thread.
pub fn localeconv() -> LocaleConv {
    CURRENT_NUMERIC.with(|cur| cur.borrow().clone().unwrap_or_else(c_locale_conv))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── C locale ────────────────────────────────────────────────────

    #[test]
    fn c_locale_has_dot_and_no_grouping() {
        let conv = c_locale_conv();
        assert_eq!(conv.decimal_point, b".");
        assert!(conv.thousands_sep.is_empty());
        assert!(conv.grouping.is_empty());
    }

    #[test]
    fn c_locale_aliases() {
        for name in [&b"C"[..], b"POSIX", b"", b"C.UTF-8"] {
            assert!(is_c_locale(name));
            assert_eq!(numeric_conv_for(name), Some(c_locale_conv()));
        }
        assert!(!is_c_locale(b"en_US"));
    }

    // ── named locales ───────────────────────────────────────────────

    #[test]
    fn codeset_suffix_is_ignored() {
        assert_eq!(numeric_conv_for(b"en_US.UTF-8"), numeric_conv_for(b"en_US"));
        assert_eq!(numeric_conv_for(b"de_DE.utf8"), numeric_conv_for(b"de_DE"));
    }

    #[test]
    fn indian_grouping_is_three_then_two() {
        let conv = numeric_conv_for(b"en_IN.UTF-8").unwrap();
        assert_eq!(conv.grouping, vec![3, 2]);
        assert_eq!(conv.thousands_sep, b",");
    }

    #[test]
    fn french_separator_is_multibyte() {
        let conv = numeric_conv_for(b"fr_FR.UTF-8").unwrap();
        assert_eq!(conv.decimal_point, b",");
        assert_eq!(conv.thousands_sep, "\u{202f}".as_bytes());
    }

    #[test]
    fn unknown_locale_is_rejected() {
        assert_eq!(numeric_conv_for(b"xx_YY"), None);
    }

    // ── per-thread selection ────────────────────────────────────────

    #[test]
    fn selection_is_per_thread() {
        assert!(set_numeric_locale(b"de_DE"));
        assert_eq!(localeconv().decimal_point, b",");
        let other = std::thread::spawn(localeconv).join().unwrap();
        assert_eq!(other, c_locale_conv());
        assert!(!set_numeric_locale(b"nowhere"));
        assert_eq!(localeconv().decimal_point, b",");
        set_numeric_conv(c_locale_conv());
    }
}
