//! Scan failure taxonomy.

use thiserror::Error;

use super::args::TargetKind;
use crate::errno::{EILSEQ, EINVAL, ENOMEM};

/// Why a scan stopped before the end of its format.
///
/// Offsets are positions in the format string (in units) of the directive
/// that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("input exhausted at format offset {offset}")]
    InputExhausted { offset: usize },
    #[error("input does not match format at offset {offset}")]
    MatchFailure { offset: usize },
    #[error("invalid multibyte sequence in input")]
    Decode,
    #[error("malformed numeric field for directive at offset {offset}")]
    Rejected { offset: usize },
    #[error("allocation failed ({phase}) for directive at offset {offset}")]
    AllocFailed { offset: usize, phase: AllocPhase },
    #[error("invalid conversion specification at offset {offset}")]
    InvalidFormat { offset: usize },
    #[error("argument {index} is {found:?}, directive at offset {offset} needs {expected:?}")]
    TargetMismatch {
        offset: usize,
        index: usize,
        expected: TargetKind,
        found: TargetKind,
    },
    #[error("no argument {index} for directive at offset {offset}")]
    MissingTarget { offset: usize, index: usize },
    #[error("argument {index} holds {capacity} units, too few for directive at offset {offset}")]
    BufferOverflow {
        offset: usize,
        index: usize,
        capacity: usize,
    },
    #[error("stream orientation does not match the scan width")]
    WrongOrientation,
}

/// Which allocation step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocPhase {
    /// The first buffer of a `%m`/`%a` conversion.
    Initial,
    /// Growth of a POSIX `%m` buffer.
    PosixGrowth,
    /// Growth of a GNU `%a` buffer; the partial result was kept.
    GnuGrowth,
}

impl std::fmt::Display for AllocPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Initial => "initial",
            Self::PosixGrowth => "posix growth",
            Self::GnuGrowth => "gnu growth",
        })
    }
}

impl ScanError {
    /// The errno value a C caller observes for this failure, if any.
    #[must_use]
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::InputExhausted { .. } | Self::MatchFailure { .. } | Self::Rejected { .. } => None,
            Self::Decode => Some(EILSEQ),
            Self::AllocFailed { .. } => Some(ENOMEM),
            Self::InvalidFormat { .. }
            | Self::TargetMismatch { .. }
            | Self::MissingTarget { .. }
            | Self::BufferOverflow { .. }
            | Self::WrongOrientation => Some(EINVAL),
        }
    }

    /// True when the call must report `EOF` (if nothing was assigned) or
    /// tear down every POSIX allocation.
    #[must_use]
    pub fn is_input_failure(&self) -> bool {
        matches!(self, Self::InputExhausted { .. })
    }

    /// True for allocation failures that force the `EOF` result.
    #[must_use]
    pub fn forces_eof(&self) -> bool {
        matches!(
            self,
            Self::AllocFailed {
                phase: AllocPhase::Initial | AllocPhase::PosixGrowth,
                ..
            }
        )
    }

    /// Short stable name, used by the fixture harness.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::InputExhausted { .. } => "input_exhausted",
            Self::MatchFailure { .. } => "match_failure",
            Self::Decode => "decode",
            Self::Rejected { .. } => "rejected",
            Self::AllocFailed { .. } => "alloc_failed",
            Self::InvalidFormat { .. } => "invalid_format",
            Self::TargetMismatch { .. } => "target_mismatch",
            Self::MissingTarget { .. } => "missing_target",
            Self::BufferOverflow { .. } => "buffer_overflow",
            Self::WrongOrientation => "wrong_orientation",
        }
    }
}
