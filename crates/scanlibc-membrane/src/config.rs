//! Runtime mode configuration.
//!
//! The runtime mode is set via the `SCANLIBC_MODE` environment variable:
//! - `strict` (default): POSIX-correct return/errno semantics. A conversion
//!   whose output target is missing, of the wrong kind, or too small stops
//!   the scan with `EINVAL`; nothing is silently rewritten.
//! - `hardened`: the membrane heals target problems deterministically
//!   (coerce with saturation, suppress the assignment, truncate with NUL).
//! - `off`: no validation. Only reachable through the API, for benchmarks.
//!
//! `SCANLIBC_ALLOC_BUDGET` optionally caps the number of bytes a single scan
//! call may allocate for `%m`/`%a` conversions. Going past the cap behaves
//! exactly like an allocator failure.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Runtime operating mode for the membrane.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyLevel {
    /// POSIX-correct behavior. Invalid targets produce error returns.
    #[default]
    Strict,
    /// Deterministic healing of invalid targets.
    Hardened,
    /// No validation. Pure passthrough for benchmarking baseline.
    Off,
}

impl SafetyLevel {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "strict" | "default" | "posix" => Self::Strict,
            "hardened" | "repair" | "heal" => Self::Hardened,
            "off" | "none" | "disabled" => Self::Off,
            _ => Self::Strict,
        }
    }

    /// Canonical lowercase name, as used in logs and fixtures.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Hardened => "hardened",
            Self::Off => "off",
        }
    }

    /// Returns true if the membrane should apply healing actions.
    #[must_use]
    pub const fn heals_enabled(self) -> bool {
        matches!(self, Self::Hardened)
    }

    /// Returns true if validation is active.
    #[must_use]
    pub const fn validation_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }
}

// ---------------------------------------------------------------------------
// Mode cache
// ---------------------------------------------------------------------------

// Codes stored in `CACHED_LEVEL`. Level codes are `SafetyLevel as u8 + 1`.
const LEVEL_UNRESOLVED: u8 = 0;
const LEVEL_RESOLVING: u8 = u8::MAX;

static CACHED_LEVEL: AtomicU8 = AtomicU8::new(LEVEL_UNRESOLVED);

impl SafetyLevel {
    const fn code(self) -> u8 {
        self as u8 + 1
    }

    /// Level for a cache code; `None` while unresolved or resolving.
    const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Strict),
            2 => Some(Self::Hardened),
            3 => Some(Self::Off),
            _ => None,
        }
    }
}

/// `SCANLIBC_MODE` accepts strict and hardened only; `Off` stays API-only.
fn parse_mode_env(raw: &str) -> SafetyLevel {
    match SafetyLevel::from_str_loose(raw.trim()) {
        SafetyLevel::Hardened => SafetyLevel::Hardened,
        _ => SafetyLevel::Strict,
    }
}

/// Configured safety level. The environment is read once.
///
/// A call that races with the first resolution gets `Strict` rather than
/// waiting for it.
#[must_use]
pub fn safety_level() -> SafetyLevel {
    if let Some(level) = SafetyLevel::from_code(CACHED_LEVEL.load(Ordering::Relaxed)) {
        return level;
    }
    if let Err(seen) = CACHED_LEVEL.compare_exchange(
        LEVEL_UNRESOLVED,
        LEVEL_RESOLVING,
        Ordering::SeqCst,
        Ordering::Relaxed,
    ) {
        return SafetyLevel::from_code(seen).unwrap_or(SafetyLevel::Strict);
    }

    let level = std::env::var("SCANLIBC_MODE")
        .map(|v| parse_mode_env(&v))
        .unwrap_or_default();
    CACHED_LEVEL.store(level.code(), Ordering::Release);
    level
}

// ---------------------------------------------------------------------------
// Allocation budget
// ---------------------------------------------------------------------------

// usize::MAX = unresolved, usize::MAX - 1 = no budget configured.
static CACHED_BUDGET: AtomicUsize = AtomicUsize::new(BUDGET_UNRESOLVED);

const BUDGET_UNRESOLVED: usize = usize::MAX;
const BUDGET_UNLIMITED: usize = usize::MAX - 1;

fn parse_alloc_budget_env(raw: &str) -> Option<usize> {
    let parsed = raw.trim().parse::<usize>().ok()?;
    // The two sentinel values collapse to "unlimited".
    (parsed < BUDGET_UNLIMITED).then_some(parsed)
}

/// Per-call allocation ceiling in bytes, from `SCANLIBC_ALLOC_BUDGET`.
///
/// `None` means allocation is bounded only by the allocator. Unparseable
/// values are ignored.
#[must_use]
pub fn alloc_budget() -> Option<usize> {
    let cached = CACHED_BUDGET.load(Ordering::Relaxed);
    if cached != BUDGET_UNRESOLVED {
        return (cached != BUDGET_UNLIMITED).then_some(cached);
    }
    let budget = std::env::var("SCANLIBC_ALLOC_BUDGET")
        .ok()
        .and_then(|v| parse_alloc_budget_env(&v));
    // Resolution is idempotent, so a racing store writes the same value.
    CACHED_BUDGET.store(budget.unwrap_or(BUDGET_UNLIMITED), Ordering::Release);
    budget
}
