//! CLI entrypoint for the scanlibc conformance harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scanlibc_harness::execute::execute_case;
use scanlibc_harness::fixtures::{CaseInputs, load_fixture_sets};
use scanlibc_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, StreamKind, now_utc, validate_log_file,
};
use scanlibc_harness::{ConformanceReport, TestRunner, VerificationSummary};
use scanlibc_membrane::metrics::global_metrics;

/// Conformance tooling for scanlibc.
#[derive(Debug, Parser)]
#[command(name = "scanlibc-harness")]
#[command(about = "Fixture-driven conformance harness for scanlibc")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run fixture files and compare against their expected outcomes.
    Verify {
        /// Fixture JSON file, or a directory of them.
        #[arg(long)]
        fixture: PathBuf,
        /// `strict`, `hardened`, `off`, or `both` (strict then hardened).
        #[arg(long, default_value = "both")]
        mode: String,
        /// Markdown report output path.
        #[arg(long)]
        report: Option<PathBuf>,
        /// JSON report output path.
        #[arg(long)]
        json: Option<PathBuf>,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Artifact index output path (hashes of the report and log files).
        #[arg(long)]
        artifact_index: Option<PathBuf>,
        /// Fixed timestamp for deterministic reports.
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Run one ad hoc scan and print the rendered outcome.
    Scan {
        /// `sscanf`, `swscanf`, `fscanf` or `fwscanf`.
        #[arg(long, default_value = "sscanf")]
        function: String,
        #[arg(long)]
        input: String,
        #[arg(long)]
        format: String,
        /// Target specs, e.g. `i32 bytes:16 alloc`.
        #[arg(long, num_args = 0..)]
        targets: Vec<String>,
        #[arg(long, default_value = "strict")]
        mode: String,
        /// Numeric locale, e.g. `de_DE`.
        #[arg(long)]
        locale: Option<String>,
        /// Allocation budget in bytes.
        #[arg(long)]
        alloc_budget: Option<usize>,
    },
    /// Validate a structured JSONL log file.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify {
            fixture,
            mode,
            report,
            json,
            log,
            artifact_index,
            timestamp,
        } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let sets = load_fixture_sets(&fixture)?;
            let modes: Vec<&str> = if mode.eq_ignore_ascii_case("both") {
                vec!["strict", "hardened"]
            } else {
                vec![mode.as_str()]
            };
            let run_id = timestamp.clone().unwrap_or_else(now_utc);
            let mut emitter = match &log {
                Some(path) => Some(LogEmitter::to_file(path, &run_id)?),
                None => None,
            };

            let mut results = Vec::new();
            for active in &modes {
                let runner = TestRunner::new("fixture-verify", *active);
                for set in &sets {
                    match emitter.as_mut() {
                        Some(emitter) => results.extend(runner.run_logged(set, emitter)?),
                        None => results.extend(runner.run(set)),
                    }
                }
            }

            if let Some(emitter) = emitter.as_mut() {
                let m = global_metrics().snapshot();
                emitter.emit_entry(
                    LogEntry::new(String::new(), LogLevel::Info, "scan_metrics")
                        .with_stream(StreamKind::Conformance)
                        .with_details(serde_json::json!({
                            "scans": m.scans,
                            "assignments": m.assignments,
                            "input_failures": m.input_failures,
                            "match_failures": m.match_failures,
                            "decode_errors": m.decode_errors,
                            "alloc_growths": m.alloc_growths,
                            "alloc_failures": m.alloc_failures,
                            "ledger_releases": m.ledger_releases,
                            "heals": m.heals,
                        })),
                )?;
                emitter.flush()?;
            }

            let summary = VerificationSummary::from_results(results);
            let conformance = ConformanceReport {
                title: "scanlibc fixture verification".to_string(),
                mode: modes.join(","),
                timestamp: timestamp.unwrap_or_else(now_utc),
                summary,
            };

            let mut index = ArtifactIndex::new(&run_id);
            if let Some(path) = &report {
                std::fs::write(path, conformance.to_markdown())?;
                index.add_file(path, "report_markdown")?;
            }
            if let Some(path) = &json {
                std::fs::write(path, conformance.to_json()?)?;
                index.add_file(path, "report_json")?;
            }
            if let Some(path) = &log {
                index.add_file(path, "log_jsonl")?;
            }
            if let Some(path) = &artifact_index {
                std::fs::write(path, index.to_json()?)?;
            }
            if report.is_none() && json.is_none() {
                print!("{}", conformance.to_markdown());
            }

            let s = &conformance.summary;
            eprintln!("{} cases: {} passed, {} failed", s.total, s.passed, s.failed);
            for failure in s.failures() {
                eprintln!("FAIL {}: expected {}, got {}", failure.case_name, failure.expected, failure.actual);
            }
            if !s.all_passed() {
                std::process::exit(1);
            }
        }
        Command::Scan {
            function,
            input,
            format,
            targets,
            mode,
            locale,
            alloc_budget,
        } => {
            let inputs = CaseInputs {
                input,
                input_bytes: None,
                format,
                targets,
                locale,
                alloc_budget,
            };
            let run = execute_case(&function, &inputs, &mode)?;
            println!("{}", run.output);
            eprintln!(
                "errno={} consumed={} failure={}",
                run.errno,
                run.consumed,
                run.failure.unwrap_or("none")
            );
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            eprintln!("{lines} lines, {} errors", errors.len());
            if !errors.is_empty() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
