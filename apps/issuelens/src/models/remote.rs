//! Search response schema of the quality server (`/api/issues/search`).
//!
//! Only the fields the reconciler consumes are declared; unknown fields are
//! ignored and a field of the wrong shape fails the decode. An unrecognized
//! severity label only affects its own record: it reads as `INFO`.

use super::Severity;
use serde::{Deserialize, Deserializer};

fn lenient_severity<'de, D>(deserializer: D) -> Result<Option<Severity>, D::Error>
where
    D: Deserializer<'de>,
{
    let label: Option<String> = Option::deserialize(deserializer)?;
    Ok(label.map(|l| {
        l.parse::<Severity>().unwrap_or_else(|e| {
            tracing::warn!("{e}; treating as INFO");
            Severity::Info
        })
    }))
}

#[derive(Debug, Clone, Default, Deserialize)]
/// One page of search results.
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<RemoteIssue>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Paging {
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A raw remote record before reconciliation.
pub struct RemoteIssue {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub severity: Option<Severity>,
    /// `projectKey:relative/path` component identifier.
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub text_range: Option<TextRange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    #[serde(default)]
    pub start_line: Option<u32>,
}

impl RemoteIssue {
    pub fn start_line(&self) -> Option<u32> {
        self.text_range.and_then(|r| r.start_line)
    }
}
