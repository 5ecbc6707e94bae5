//! Runtime policy membrane for scanlibc.
//!
//! Sits between callers and the safe scanning core:
//! - **Configuration** (`config`): runtime safety level and allocation budget
//! - **Self-healing engine** (`heal`): deterministic repair of unusable targets
//! - **Metrics** (`metrics`): atomic counters for observability

#![deny(unsafe_code)]

pub mod config;
pub mod heal;
pub mod metrics;

pub use config::SafetyLevel;
pub use heal::{HealingAction, HealingPolicy};
pub use metrics::ScanMetrics;
