//! Fixture loading and management.
//!
//! A fixture file holds one [`FixtureSet`]: a family of scan cases, each
//! naming the entry point, its input, format and target list, and the
//! rendered outcome the engine must produce.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// Entry point: `sscanf`, `swscanf`, `fscanf` or `fwscanf`.
    pub function: String,
    /// POSIX/C section the case exercises.
    pub spec_section: String,
    /// Input, format and targets; see [`CaseInputs`].
    pub inputs: serde_json::Value,
    /// Rendered result: the return value then each target, `|`-separated.
    pub expected_output: String,
    /// errno after the call (0 when the call must leave it alone).
    pub expected_errno: i32,
    /// `strict`, `hardened`, `off` or `both` (strict and hardened).
    pub mode: String,
}

/// Typed view of [`FixtureCase::inputs`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseInputs {
    /// Input text. Ignored when `input_bytes` is present.
    #[serde(default)]
    pub input: String,
    /// Raw input bytes, for cases that need invalid UTF-8.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_bytes: Option<Vec<u8>>,
    pub format: String,
    /// Target specs such as `i32`, `f64`, `bytes:16`, `alloc`.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Numeric locale to select for the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Allocation budget in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alloc_budget: Option<usize>,
}

impl FixtureCase {
    /// Decode the case inputs.
    pub fn parsed_inputs(&self) -> Result<CaseInputs, HarnessError> {
        Ok(serde_json::from_value(self.inputs.clone())?)
    }
}

/// A collection of fixture cases for a function family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Function family name.
    pub family: String,
    /// UTC timestamp of capture.
    pub captured_at: String,
    /// Individual test cases.
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    pub fn from_json(json: &str) -> Result<Self, HarnessError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Load `path` if it is a file, or every `*.json` inside it (sorted by
/// name) if it is a directory.
pub fn load_fixture_sets(path: &Path) -> Result<Vec<FixtureSet>, HarnessError> {
    if path.is_file() {
        return Ok(vec![FixtureSet::from_file(path)?]);
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(HarnessError::NoFixtures(path.to_path_buf()));
    }
    paths.iter().map(|p| FixtureSet::from_file(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_default_optional_fields() {
        let case = FixtureCase {
            name: "n".into(),
            function: "sscanf".into(),
            spec_section: "POSIX fscanf".into(),
            inputs: serde_json::json!({"input": "1", "format": "%d", "targets": ["i32"]}),
            expected_output: "1|1".into(),
            expected_errno: 0,
            mode: "both".into(),
        };
        let inputs = case.parsed_inputs().unwrap();
        assert_eq!(inputs.format, "%d");
        assert_eq!(inputs.targets, vec!["i32".to_string()]);
        assert!(inputs.input_bytes.is_none());
        assert!(inputs.locale.is_none());
        assert!(inputs.alloc_budget.is_none());
    }

    #[test]
    fn missing_format_is_an_error() {
        let case = FixtureCase {
            name: "n".into(),
            function: "sscanf".into(),
            spec_section: String::new(),
            inputs: serde_json::json!({"input": "1"}),
            expected_output: String::new(),
            expected_errno: 0,
            mode: "strict".into(),
        };
        assert!(matches!(case.parsed_inputs(), Err(HarnessError::Json(_))));
    }

    #[test]
    fn set_round_trips_through_json() {
        let set = FixtureSet {
            version: "v1".into(),
            family: "stdio/scanf".into(),
            captured_at: "2026-01-01T00:00:00Z".into(),
            cases: Vec::new(),
        };
        let back = FixtureSet::from_json(&set.to_json().unwrap()).unwrap();
        assert_eq!(back.family, "stdio/scanf");
    }
}
