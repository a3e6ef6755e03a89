//! Shared data models for issues, scope modes, and severity selection.

pub mod eslint;
pub mod remote;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
/// Shared severity scale used by both issue sources.
pub enum Severity {
    Blocker,
    Critical,
    Major,
    Minor,
    Info,
}

impl Severity {
    /// Every label, highest first.
    pub const ALL: [Severity; 5] = [
        Severity::Blocker,
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Info,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Blocker => "BLOCKER",
            Severity::Critical => "CRITICAL",
            Severity::Major => "MAJOR",
            Severity::Minor => "MINOR",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown severity '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Which analysis produced an issue. Doubles as the diagnostics source tag.
pub enum IssueSource {
    SonarQube,
    #[serde(rename = "ESLint")]
    Eslint,
}

impl IssueSource {
    pub fn tag(self) -> &'static str {
        match self {
            IssueSource::SonarQube => "SonarQube",
            IssueSource::Eslint => "ESLint",
        }
    }
}

impl fmt::Display for IssueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A normalized finding. Immutable once built; `line` is 1-based and never 0.
pub struct Issue {
    message: String,
    rule: String,
    severity: Severity,
    #[serde(rename = "filePath")]
    file_path: PathBuf,
    line: u32,
    source: IssueSource,
}

impl Issue {
    /// Build an issue, clamping `line` to at least 1.
    pub fn new(
        message: impl Into<String>,
        rule: impl Into<String>,
        severity: Severity,
        file_path: impl Into<PathBuf>,
        line: u32,
        source: IssueSource,
    ) -> Self {
        Self {
            message: message.into(),
            rule: rule.into(),
            severity,
            file_path: file_path.into(),
            line: line.max(1),
            source,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn source(&self) -> IssueSource {
        self.source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Breadth {
    AllFiles,
    CurrentFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Horizon {
    /// Everything the quality server reports.
    Overall,
    /// Only what a fresh local lint run finds.
    NewCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Scope of a refresh: breadth x horizon.
pub struct ScopeMode {
    pub breadth: Breadth,
    pub horizon: Horizon,
}

/// Label shown to the user for each scope, paired with the CLI token.
const SCOPE_TABLE: [(&str, &str, ScopeMode); 4] = [
    ("All Files (Overall)", "all", ScopeMode::ALL_OVERALL),
    ("Current File (Overall)", "file", ScopeMode::FILE_OVERALL),
    ("All Files (New Code)", "new", ScopeMode::ALL_NEW_CODE),
    ("Current File (New Code)", "new-file", ScopeMode::FILE_NEW_CODE),
];

impl ScopeMode {
    pub const ALL_OVERALL: ScopeMode = ScopeMode {
        breadth: Breadth::AllFiles,
        horizon: Horizon::Overall,
    };
    pub const FILE_OVERALL: ScopeMode = ScopeMode {
        breadth: Breadth::CurrentFile,
        horizon: Horizon::Overall,
    };
    pub const ALL_NEW_CODE: ScopeMode = ScopeMode {
        breadth: Breadth::AllFiles,
        horizon: Horizon::NewCode,
    };
    pub const FILE_NEW_CODE: ScopeMode = ScopeMode {
        breadth: Breadth::CurrentFile,
        horizon: Horizon::NewCode,
    };

    pub fn is_file_mode(self) -> bool {
        self.breadth == Breadth::CurrentFile
    }

    /// Resolve one of the fixed filter labels.
    pub fn from_label(label: &str) -> Option<ScopeMode> {
        SCOPE_TABLE
            .iter()
            .find(|(l, _, _)| *l == label.trim())
            .map(|(_, _, mode)| *mode)
    }

    pub fn label(self) -> &'static str {
        SCOPE_TABLE
            .iter()
            .find(|(_, _, mode)| *mode == self)
            .map(|(l, _, _)| *l)
            .unwrap_or("All Files (Overall)")
    }

    pub fn labels() -> impl Iterator<Item = &'static str> {
        SCOPE_TABLE.iter().map(|(l, _, _)| *l)
    }
}

impl Default for ScopeMode {
    fn default() -> Self {
        ScopeMode::ALL_OVERALL
    }
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScopeMode {
    type Err = String;

    /// Accepts a CLI token (`all|file|new|new-file`) or a display label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SCOPE_TABLE
            .iter()
            .find(|(_, token, _)| token.eq_ignore_ascii_case(s))
            .map(|(_, _, mode)| *mode)
            .or_else(|| ScopeMode::from_label(s))
            .ok_or_else(|| format!("unknown scope '{}' (expected all|file|new|new-file)", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
/// Ordered set of severities the user wants to see. Defaults to `{BLOCKER}`.
pub struct SelectedSeverities(Vec<Severity>);

impl SelectedSeverities {
    /// Keeps first-seen order and drops duplicates.
    pub fn new(severities: impl IntoIterator<Item = Severity>) -> Self {
        let mut out: Vec<Severity> = Vec::new();
        for sev in severities {
            if !out.contains(&sev) {
                out.push(sev);
            }
        }
        Self(out)
    }

    pub fn contains(&self, severity: Severity) -> bool {
        self.0.contains(&severity)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Severity> + '_ {
        self.0.iter().copied()
    }

    /// Comma-separated labels, as the search API expects them.
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Keep only issues whose severity is selected.
    pub fn filter(&self, issues: Vec<Issue>) -> Vec<Issue> {
        issues
            .into_iter()
            .filter(|is| self.contains(is.severity()))
            .collect()
    }
}

impl Default for SelectedSeverities {
    fn default() -> Self {
        Self(vec![Severity::Blocker])
    }
}
