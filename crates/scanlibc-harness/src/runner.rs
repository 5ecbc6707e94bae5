//! Test execution engine.

use std::io::Write;

use crate::execute::{CaseRun, execute_case};
use crate::fixtures::{FixtureCase, FixtureSet};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, StreamKind};
use crate::verify::{VerificationResult, render_diff};

/// Runs a fixture set under one membrane mode and collects results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
    /// `strict`, `hardened` or `off`.
    pub mode: String,
}

impl TestRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            mode: mode.into(),
        }
    }

    /// Run every case of `set` that applies to this runner's mode.
    pub fn run(&self, set: &FixtureSet) -> Vec<VerificationResult> {
        self.cases(set).map(|case| self.verify(case).0).collect()
    }

    /// [`TestRunner::run`], emitting one log record per case.
    pub fn run_logged<W: Write>(
        &self,
        set: &FixtureSet,
        log: &mut LogEmitter<W>,
    ) -> std::io::Result<Vec<VerificationResult>> {
        let mut results = Vec::new();
        for case in self.cases(set) {
            let (result, run) = self.verify(case);
            let outcome = match (&run, result.passed) {
                (None, _) => Outcome::Error,
                (Some(_), true) => Outcome::Pass,
                (Some(_), false) => Outcome::Fail,
            };
            let mut entry = LogEntry::new(
                log.next_trace_id(),
                if result.passed { LogLevel::Info } else { LogLevel::Error },
                "fixture_case",
            )
            .with_stream(StreamKind::Conformance)
            .with_mode(self.mode.to_ascii_lowercase())
            .with_api(set.family.clone(), case.function.clone())
            .with_outcome(outcome)
            .with_details(serde_json::json!({
                "campaign": self.campaign,
                "case": result.case_name,
                "expected": result.expected,
                "actual": result.actual,
            }));
            if let Some(run) = &run {
                entry = entry
                    .with_errno(run.errno)
                    .with_failure(run.failure)
                    .with_consumed(run.consumed)
                    .with_latency_ns(run.latency_ns);
            }
            log.emit_entry(entry)?;
            results.push(result);
        }
        Ok(results)
    }

    fn cases<'s>(&'s self, set: &'s FixtureSet) -> impl Iterator<Item = &'s FixtureCase> + 's {
        set.cases
            .iter()
            .filter(|case| mode_matches(&self.mode, &case.mode))
    }

    fn verify(&self, case: &FixtureCase) -> (VerificationResult, Option<CaseRun>) {
        let case_name = if case.mode.eq_ignore_ascii_case("both") {
            format!("{} [{}]", case.name, self.mode)
        } else {
            case.name.clone()
        };
        let run = case
            .parsed_inputs()
            .and_then(|inputs| execute_case(&case.function, &inputs, &self.mode));
        let (actual, actual_errno, run) = match run {
            Ok(run) => (run.output.clone(), run.errno, Some(run)),
            Err(err) => (format!("unsupported:{err}"), -1, None),
        };
        let passed = actual == case.expected_output && actual_errno == case.expected_errno;
        let diff = (!passed).then(|| render_diff(&case.expected_output, &actual));
        let result = VerificationResult {
            case_name,
            spec_section: case.spec_section.clone(),
            passed,
            expected: case.expected_output.clone(),
            actual,
            expected_errno: case.expected_errno,
            actual_errno,
            diff,
        };
        (result, run)
    }
}

fn mode_matches(active_mode: &str, case_mode: &str) -> bool {
    let active = active_mode.to_ascii_lowercase();
    let case = case_mode.to_ascii_lowercase();
    case == active || (case == "both" && (active == "strict" || active == "hardened"))
}
