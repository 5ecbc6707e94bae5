//! Report generation for conformance results.

use serde::{Deserialize, Serialize};

use crate::verify::VerificationSummary;

/// A conformance report for one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub title: String,
    /// Modes the fixtures ran under, comma-separated.
    pub mode: String,
    pub timestamp: String,
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "# {}\n\n- Mode: {}\n- Timestamp: {}\n- Total: {}\n- Passed: {}\n- Failed: {}\n\n",
            self.title,
            self.mode,
            self.timestamp,
            self.summary.total,
            self.summary.passed,
            self.summary.failed
        );
        out.push_str("| Case | Section | Status |\n|------|---------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!("| {} | {} | {} |\n", r.case_name, r.spec_section, status));
        }
        let failures: Vec<_> = self.summary.failures().collect();
        if !failures.is_empty() {
            out.push_str("\n## Failures\n");
            for r in failures {
                out.push_str(&format!(
                    "\n### {}\n\nerrno: expected {}, got {}\n\n```\n{}```\n",
                    r.case_name,
                    r.expected_errno,
                    r.actual_errno,
                    r.diff.as_deref().unwrap_or("")
                ));
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
