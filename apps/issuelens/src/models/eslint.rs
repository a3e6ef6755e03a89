//! JSON report schema emitted by the lint engine (`--format json`).

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Findings for one linted file.
pub struct LintFileReport {
    pub file_path: PathBuf,
    #[serde(default)]
    pub messages: Vec<LintMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintMessage {
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: Option<NativeLevel>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub fatal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
/// Engine-native severity: numeric code (`1`, `2`) or name (`"warn"`, `"error"`).
pub enum NativeLevel {
    Code(i64),
    Name(String),
}
