//! Scan sets for `%[...]`.

use super::unit::ScanUnit;

/// Parsed membership set of a `%[...]` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    /// Membership bitmap for values below 256.
    table: [u64; 4],
    /// Inclusive ranges for values 256 and above (wide formats only).
    ranges: Vec<(u32, u32)>,
    negated: bool,
}

impl CharClass {
    fn empty(negated: bool) -> Self {
        Self {
            table: [0; 4],
            ranges: Vec::new(),
            negated,
        }
    }

    fn insert_range(&mut self, lo: u32, hi: u32) {
        for v in lo..=hi.min(255) {
            self.table[(v / 64) as usize] |= 1 << (v % 64);
        }
        if hi >= 256 {
            self.ranges.push((lo.max(256), hi));
        }
    }

    /// Parse the set text that follows `[`.
    ///
    /// Returns the class and the number of units consumed including the
    /// closing `]`, or `None` if the set is not closed.
    pub fn parse<U: ScanUnit>(fmt: &[U]) -> Option<(Self, usize)> {
        let is = |i: usize, b: u8| fmt.get(i).is_some_and(|u| u.to_u32() == u32::from(b));
        let mut i = 0;
        let negated = is(0, b'^');
        if negated {
            i += 1;
        }
        let mut class = Self::empty(negated);

        // A `]` right after `[` or `[^` is a member, not the terminator.
        if is(i, b']') {
            class.insert_range(u32::from(b']'), u32::from(b']'));
            i += 1;
        }

        loop {
            let c = fmt.get(i).copied().filter(|u| !u.is_nul())?.to_u32();
            if c == u32::from(b']') {
                return Some((class, i + 1));
            }
            // `a-b` is a range when `-` is neither first nor last and the
            // range does not run backwards.
            if is(i + 1, b'-') {
                if let Some(hi) = fmt.get(i + 2).map(|u| u.to_u32()) {
                    if hi != u32::from(b']') && hi != 0 && hi >= c {
                        class.insert_range(c, hi);
                        i += 3;
                        continue;
                    }
                }
            }
            class.insert_range(c, c);
            i += 1;
        }
    }

    /// Membership of a single value, negation applied.
    #[must_use]
    pub fn contains(&self, v: u32) -> bool {
        let raw = if v < 256 {
            self.table[(v / 64) as usize] & (1 << (v % 64)) != 0
        } else {
            self.ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&v))
        };
        raw != self.negated
    }

    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negated
    }
}
