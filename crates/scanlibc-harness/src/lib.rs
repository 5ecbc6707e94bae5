//! Conformance harness for scanlibc.
//!
//! This crate provides:
//! - Fixtures: JSON scan cases with their expected rendered outcome
//! - Execution: run a case through `sscanf`/`swscanf`/`fscanf`/`fwscanf`
//! - Verification: compare outcome and errno, per membrane mode
//! - Structured logs: JSONL records and SHA-256 artifact indexes
//! - Reports: markdown and JSON summaries

#![forbid(unsafe_code)]

pub mod error;
pub mod execute;
pub mod fixtures;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureSet};
pub use report::ConformanceReport;
pub use runner::TestRunner;
pub use verify::{VerificationResult, VerificationSummary};
