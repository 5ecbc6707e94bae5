// cli_test.rs
// End-to-end checks for the `harness` binary: verify, scan and validate-log.

use std::path::{Path, PathBuf};
use std::process::Command;

use scanlibc_harness::structured_log::{ArtifactIndex, sha256_hex};

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scanlibc-harness-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap_or_else(|e| panic!("mkdir {}: {}", dir.display(), e));
    dir
}

fn load_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Invalid JSON in {}: {}", path.display(), e))
}

#[test]
fn verify_writes_reports_log_and_index() {
    let dir = scratch_dir("verify");
    let report = dir.join("report.md");
    let json = dir.join("report.json");
    let log = dir.join("run.jsonl");
    let index = dir.join("index.json");

    let output = Command::new(env!("CARGO_BIN_EXE_harness"))
        .arg("verify")
        .arg("--fixture")
        .arg(fixture_dir())
        .arg("--report")
        .arg(&report)
        .arg("--json")
        .arg(&json)
        .arg("--log")
        .arg(&log)
        .arg("--artifact-index")
        .arg(&index)
        .arg("--timestamp")
        .arg("2026-10-16T00:00:00Z")
        .output()
        .expect("harness verify should execute");
    assert!(
        output.status.success(),
        "verify failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let md = std::fs::read_to_string(&report).expect("markdown report");
    assert!(md.contains("- Mode: strict,hardened"));
    assert!(!md.contains("## Failures"));

    let summary = load_json(&json);
    assert_eq!(summary["summary"]["failed"], 0);
    assert_eq!(summary["timestamp"], "2026-10-16T00:00:00Z");

    let validate = Command::new(env!("CARGO_BIN_EXE_harness"))
        .arg("validate-log")
        .arg("--log")
        .arg(&log)
        .output()
        .expect("harness validate-log should execute");
    assert!(
        validate.status.success(),
        "log failed validation:\n{}",
        String::from_utf8_lossy(&validate.stderr)
    );
    let log_text = std::fs::read_to_string(&log).expect("log file");
    let last = log_text.lines().last().expect("non-empty log");
    assert!(last.contains("\"event\":\"scan_metrics\""), "{last}");

    let idx: ArtifactIndex = serde_json::from_value(load_json(&index)).expect("artifact index shape");
    assert_eq!(idx.artifacts.len(), 3);
    for entry in &idx.artifacts {
        let bytes = std::fs::read(&entry.path).expect("indexed artifact exists");
        assert_eq!(entry.sha256, sha256_hex(&bytes), "{}", entry.path);
        assert_eq!(entry.size_bytes, bytes.len() as u64);
    }
    assert!(idx.stale_entries(Path::new("")).is_empty());

    std::fs::write(&report, "tampered").expect("rewrite report");
    assert_eq!(idx.stale_entries(Path::new("")), vec![report.display().to_string()]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn scan_prints_rendered_outcome() {
    let output = Command::new(env!("CARGO_BIN_EXE_harness"))
        .args(["scan", "--input", "12 abc", "--format", "%d %3s", "--targets", "i32", "bytes:8"])
        .output()
        .expect("harness scan should execute");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "2|12|\"abc\"");
    assert!(String::from_utf8_lossy(&output.stderr).contains("errno=0"));
}

#[test]
fn validate_log_rejects_malformed_lines() {
    let dir = scratch_dir("badlog");
    let log = dir.join("bad.jsonl");
    std::fs::write(&log, "{\"timestamp\":\"x\",\"level\":\"loud\",\"event\":\"e\"}\nnot json\n")
        .expect("write log");
    let output = Command::new(env!("CARGO_BIN_EXE_harness"))
        .arg("validate-log")
        .arg("--log")
        .arg(&log)
        .output()
        .expect("harness validate-log should execute");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("2 lines"));
    let _ = std::fs::remove_dir_all(&dir);
}
