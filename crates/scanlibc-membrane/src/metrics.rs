//! Atomic counters for scan observability.
//!
//! All counters use relaxed ordering. They are diagnostic only.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global scan counters.
pub struct ScanMetrics {
    /// Entry-point invocations.
    pub scans: AtomicU64,
    /// Directives that stored a value (or were counted, like `%n`).
    pub assignments: AtomicU64,
    /// Scans that ended on input exhaustion.
    pub input_failures: AtomicU64,
    /// Scans that ended on a literal or token mismatch.
    pub match_failures: AtomicU64,
    /// Malformed multibyte or wide sequences.
    pub decode_errors: AtomicU64,
    /// Successful buffer growth steps in alloc conversions.
    pub alloc_growths: AtomicU64,
    /// Failed allocations (initial or growth).
    pub alloc_failures: AtomicU64,
    /// Buffers released by ledger teardown.
    pub ledger_releases: AtomicU64,
    /// Total healing actions applied.
    pub heals: AtomicU64,
}

impl ScanMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            scans: AtomicU64::new(0),
            assignments: AtomicU64::new(0),
            input_failures: AtomicU64::new(0),
            match_failures: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            alloc_growths: AtomicU64::new(0),
            alloc_failures: AtomicU64::new(0),
            ledger_releases: AtomicU64::new(0),
            heals: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by `n`.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scans: Self::get(&self.scans),
            assignments: Self::get(&self.assignments),
            input_failures: Self::get(&self.input_failures),
            match_failures: Self::get(&self.match_failures),
            decode_errors: Self::get(&self.decode_errors),
            alloc_growths: Self::get(&self.alloc_growths),
            alloc_failures: Self::get(&self.alloc_failures),
            ledger_releases: Self::get(&self.ledger_releases),
            heals: Self::get(&self.heals),
        }
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time snapshot of all scan counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub scans: u64,
    pub assignments: u64,
    pub input_failures: u64,
    pub match_failures: u64,
    pub decode_errors: u64,
    pub alloc_growths: u64,
    pub alloc_failures: u64,
    pub ledger_releases: u64,
    pub heals: u64,
}

impl MetricsSnapshot {
    /// Per-counter difference `self - earlier`, saturating at zero.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            scans: self.scans.saturating_sub(earlier.scans),
            assignments: self.assignments.saturating_sub(earlier.assignments),
            input_failures: self.input_failures.saturating_sub(earlier.input_failures),
            match_failures: self.match_failures.saturating_sub(earlier.match_failures),
            decode_errors: self.decode_errors.saturating_sub(earlier.decode_errors),
            alloc_growths: self.alloc_growths.saturating_sub(earlier.alloc_growths),
            alloc_failures: self.alloc_failures.saturating_sub(earlier.alloc_failures),
            ledger_releases: self.ledger_releases.saturating_sub(earlier.ledger_releases),
            heals: self.heals.saturating_sub(earlier.heals),
        }
    }
}

static GLOBAL_METRICS: ScanMetrics = ScanMetrics::new();

/// Access the global metrics singleton.
#[must_use]
pub fn global_metrics() -> &'static ScanMetrics {
    &GLOBAL_METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = ScanMetrics::new();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn increment_works() {
        let m = ScanMetrics::new();
        ScanMetrics::inc(&m.scans);
        ScanMetrics::inc(&m.scans);
        ScanMetrics::add(&m.assignments, 5);
        let snap = m.snapshot();
        assert_eq!(snap.scans, 2);
        assert_eq!(snap.assignments, 5);
        assert_eq!(snap.heals, 0);
    }

    #[test]
    fn since_subtracts_per_counter() {
        let m = ScanMetrics::new();
        ScanMetrics::inc(&m.scans);
        let before = m.snapshot();
        ScanMetrics::inc(&m.scans);
        ScanMetrics::inc(&m.decode_errors);
        let delta = m.snapshot().since(&before);
        assert_eq!(delta.scans, 1);
        assert_eq!(delta.decode_errors, 1);
        assert_eq!(delta.assignments, 0);
    }
}
