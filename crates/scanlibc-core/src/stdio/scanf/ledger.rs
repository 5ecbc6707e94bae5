//! Allocation bookkeeping for `%m` and `%a` conversions.
//!
//! [`AllocAccount`] hands out and grows conversion buffers under an
//! optional byte budget. [`Ledger`] remembers which targets received a
//! POSIX `%m` buffer during the call so that an `EOF` result can take all
//! of them back.

use scanlibc_membrane::metrics::{ScanMetrics, global_metrics};

use super::args::ScanArg;

/// Initial capacity, in units, of an allocated conversion buffer.
pub const INITIAL_ALLOC_UNITS: usize = 100;

/// Records per ledger chunk.
const CHUNK: usize = 32;

/// Arguments holding POSIX-allocated buffers, in allocation order.
///
/// Stored as fixed-size chunks so recording never moves earlier entries.
#[derive(Debug, Default)]
pub struct Ledger {
    chunks: Vec<Vec<usize>>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the buffer now stored in argument `index`.
    pub fn record(&mut self, index: usize) {
        match self.chunks.last_mut() {
            Some(chunk) if chunk.len() < CHUNK => chunk.push(index),
            _ => {
                let mut chunk = Vec::with_capacity(CHUNK);
                chunk.push(index);
                self.chunks.push(chunk);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorded argument indices in allocation order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks.iter().flatten().copied()
    }

    /// Free every recorded buffer and reset its slot to `None`.
    ///
    /// Returns the number of buffers released.
    pub fn teardown(self, args: &mut [ScanArg<'_>]) -> usize {
        let mut released = 0;
        for index in self.indices() {
            if args.get_mut(index).is_some_and(ScanArg::release_alloc) {
                released += 1;
            }
        }
        ScanMetrics::add(&global_metrics().ledger_releases, released as u64);
        released
    }
}

/// An allocation the account refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocRefused;

/// Byte budget and growth policy for conversion buffers.
#[derive(Debug, Clone)]
pub struct AllocAccount {
    remaining: Option<usize>,
    initial_units: usize,
}

impl AllocAccount {
    /// `budget` is the number of bytes the call may allocate (`None` for
    /// no limit beyond the allocator's).
    #[must_use]
    pub fn new(budget: Option<usize>, initial_units: usize) -> Self {
        Self {
            remaining: budget,
            initial_units: initial_units.max(1),
        }
    }

    fn charge<T>(&mut self, units: usize) -> bool {
        let Some(remaining) = self.remaining.as_mut() else {
            return true;
        };
        match units.checked_mul(size_of::<T>()) {
            Some(bytes) if bytes <= *remaining => {
                *remaining -= bytes;
                true
            }
            _ => false,
        }
    }

    fn refund<T>(&mut self, units: usize) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_add(units.saturating_mul(size_of::<T>()));
        }
    }

    fn reserve<T>(&mut self, buf: &mut Vec<T>, units: usize) -> bool {
        if !self.charge::<T>(units) {
            return false;
        }
        if buf.try_reserve_exact(units).is_err() {
            self.refund::<T>(units);
            return false;
        }
        true
    }

    /// First buffer for a conversion.
    pub fn start<T>(&mut self) -> Result<Vec<T>, AllocRefused> {
        let mut buf = Vec::new();
        if self.reserve(&mut buf, self.initial_units) {
            Ok(buf)
        } else {
            ScanMetrics::inc(&global_metrics().alloc_failures);
            Err(AllocRefused)
        }
    }

    /// Append `unit`, doubling a full buffer. If doubling is refused one
    /// extra unit is tried before giving up.
    pub fn push<T>(&mut self, buf: &mut Vec<T>, unit: T) -> Result<(), AllocRefused> {
        if buf.len() == buf.capacity() {
            let doubled = buf.capacity().max(1);
            if !self.reserve(buf, doubled) && !self.reserve(buf, 1) {
                ScanMetrics::inc(&global_metrics().alloc_failures);
                return Err(AllocRefused);
            }
            ScanMetrics::inc(&global_metrics().alloc_growths);
        }
        buf.push(unit);
        Ok(())
    }
}
