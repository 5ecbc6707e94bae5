//! Self-healing policy engine.
//!
//! In hardened mode a conversion whose output target cannot take the parsed
//! value is not treated as a fatal error. The membrane picks a deterministic
//! healing action instead and records it here.

use std::sync::atomic::{AtomicU64, Ordering};

/// Actions the membrane can take to heal an unusable output target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealingAction {
    /// Truncate string output and keep it NUL-terminated.
    TruncateWithNull { requested: usize, truncated: usize },
    /// Store the value into a target of a different width, saturating.
    CoerceTarget,
    /// Parse the input but discard the value, as if `*` had been given.
    SuppressAssignment,
    /// Store a bounded value into a fixed slot that is shorter than asked.
    ClampSize { requested: usize, clamped: usize },
    /// No healing needed.
    None,
}

impl HealingAction {
    /// Returns true if this action represents an actual healing (not None).
    #[must_use]
    pub const fn is_heal(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Policy engine that decides which healing action to apply.
pub struct HealingPolicy {
    /// Total heals applied.
    pub total_heals: AtomicU64,
    /// Null truncations applied.
    pub null_truncations: AtomicU64,
    /// Targets coerced to another width.
    pub coercions: AtomicU64,
    /// Assignments suppressed for lack of a target.
    pub suppressions: AtomicU64,
    /// Size clamps applied.
    pub size_clamps: AtomicU64,
}

impl HealingPolicy {
    /// Create a new policy with zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total_heals: AtomicU64::new(0),
            null_truncations: AtomicU64::new(0),
            coercions: AtomicU64::new(0),
            suppressions: AtomicU64::new(0),
            size_clamps: AtomicU64::new(0),
        }
    }

    /// Record a healing action.
    pub fn record(&self, action: &HealingAction) {
        if action.is_heal() {
            self.total_heals.fetch_add(1, Ordering::Relaxed);
        }
        let counter = match action {
            HealingAction::TruncateWithNull { .. } => &self.null_truncations,
            HealingAction::CoerceTarget => &self.coercions,
            HealingAction::SuppressAssignment => &self.suppressions,
            HealingAction::ClampSize { .. } => &self.size_clamps,
            HealingAction::None => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Decide healing for a NUL-terminated string store.
    ///
    /// `src_len` excludes the terminator; `dst_capacity` is the slot length.
    #[must_use]
    pub fn heal_string_bounds(&self, src_len: usize, dst_capacity: usize) -> HealingAction {
        if src_len >= dst_capacity {
            HealingAction::TruncateWithNull {
                requested: src_len,
                truncated: dst_capacity.saturating_sub(1),
            }
        } else {
            HealingAction::None
        }
    }

    /// Decide healing for an unterminated character store (`%c`).
    #[must_use]
    pub fn heal_char_bounds(&self, src_len: usize, dst_capacity: usize) -> HealingAction {
        if src_len > dst_capacity {
            HealingAction::ClampSize {
                requested: src_len,
                clamped: dst_capacity,
            }
        } else {
            HealingAction::None
        }
    }
}

impl Default for HealingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_POLICY: HealingPolicy = HealingPolicy::new();

/// Access the global healing policy.
#[must_use]
pub fn global_healing_policy() -> &'static HealingPolicy {
    &GLOBAL_POLICY
}
