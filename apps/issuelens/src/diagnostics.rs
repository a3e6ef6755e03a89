//! Per-line markers for the editor's native diagnostics surface.
//!
//! `DiagnosticsPublisher::publish` always clears before writing, so a cycle
//! fully replaces the previous one. Markers carry the source tag
//! (`SonarQube` or `ESLint`) and a `<PREFIX>: <message> (<rule>)` message.

use crate::models::{Issue, IssueSource};
use crate::severity::{presentation, DisplayPriority};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    /// 0-based line; the marker spans the start of that line.
    pub line: u32,
    pub priority: DisplayPriority,
    pub source: IssueSource,
    pub message: String,
}

impl Marker {
    pub fn from_issue(issue: &Issue) -> Self {
        let p = presentation(issue.severity());
        Self {
            line: issue.line() - 1,
            priority: p.priority,
            source: issue.source(),
            message: format!("{}: {} ({})", p.prefix, issue.message(), issue.rule()),
        }
    }
}

/// Host diagnostics surface.
pub trait DiagnosticsSink: Send + Sync {
    fn clear(&self);
    /// Replace the markers of one file.
    fn set(&self, file: PathBuf, markers: Vec<Marker>);
}

#[derive(Default)]
/// In-process diagnostics collection; the CLI renders from it.
pub struct DiagnosticCollection {
    entries: Mutex<BTreeMap<PathBuf, Vec<Marker>>>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<Marker>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticsSink for DiagnosticCollection {
    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn set(&self, file: PathBuf, markers: Vec<Marker>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file, markers);
    }
}

#[derive(Clone)]
pub struct DiagnosticsPublisher {
    sink: Arc<dyn DiagnosticsSink>,
}

impl DiagnosticsPublisher {
    pub fn new(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self { sink }
    }

    /// Clear everything, then write remote and local batches. Markers for
    /// the same file accumulate across both batches.
    pub fn publish(&self, remote: &[Issue], local: &[Issue]) {
        let mut by_file: BTreeMap<PathBuf, Vec<Marker>> = BTreeMap::new();
        for issue in remote.iter().chain(local) {
            by_file
                .entry(issue.file_path().to_path_buf())
                .or_default()
                .push(Marker::from_issue(issue));
        }
        self.sink.clear();
        for (file, markers) in by_file {
            self.sink.set(file, markers);
        }
    }

    pub fn clear(&self) {
        self.sink.clear();
    }
}
