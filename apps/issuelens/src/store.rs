//! Grouped issue store backing the hierarchical view.
//!
//! The store keeps `file -> issues` and is replaced wholesale by every
//! `set_issues` call. Readers see either the old grouping or the new one,
//! never a mix. Each replacement bumps a counter on a `watch` channel, which
//! is the view's change notification.
//!
//! Tree shape:
//! - root: one `TreeNode::File` per file, paths in lexicographic order;
//! - file: that file's issues in insertion order;
//! - issue: leaf.

use crate::error::NavigationError;
use crate::models::Issue;
use crate::severity::{presentation, DisplayPriority};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tokio::sync::watch;

/// Shown in place of the tree when the current set is empty.
pub const NO_ISSUES_MESSAGE: &str = "No issues found for the selected scope and severities.";

pub type IssuesByFile = BTreeMap<PathBuf, Vec<Issue>>;

#[derive(Default)]
struct StoreState {
    by_file: IssuesByFile,
    placeholder: Option<&'static str>,
}

pub struct IssueStore {
    state: RwLock<StoreState>,
    changes: watch::Sender<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    File(PathBuf),
    Issue(Issue),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Where the editor should put the cursor: 0-based line, column 0.
pub struct NavigationTarget {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl NavigationTarget {
    pub fn for_issue(issue: &Issue) -> Self {
        Self {
            path: issue.file_path().to_path_buf(),
            line: issue.line() - 1,
            column: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Render-ready description of one tree node.
pub struct TreeItem {
    pub label: String,
    pub description: Option<String>,
    pub icon: Option<&'static str>,
    pub priority: Option<DisplayPriority>,
    pub expandable: bool,
    pub navigation: Option<NavigationTarget>,
}

impl TreeNode {
    pub fn item(&self) -> TreeItem {
        match self {
            TreeNode::File(path) => TreeItem {
                label: path.display().to_string(),
                description: None,
                icon: None,
                priority: None,
                expandable: true,
                navigation: None,
            },
            TreeNode::Issue(issue) => {
                let p = presentation(issue.severity());
                TreeItem {
                    label: issue.message().to_string(),
                    description: Some(format!(
                        "{} [{}] line {}",
                        issue.rule(),
                        issue.source(),
                        issue.line()
                    )),
                    icon: Some(p.icon),
                    priority: Some(p.priority),
                    expandable: false,
                    navigation: Some(NavigationTarget::for_issue(issue)),
                }
            }
        }
    }
}

impl Default for IssueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            state: RwLock::new(StoreState::default()),
            changes,
        }
    }

    /// Replace the whole grouping and notify watchers.
    pub fn set_issues(&self, issues: Vec<Issue>) {
        let mut by_file: IssuesByFile = BTreeMap::new();
        for issue in issues {
            by_file
                .entry(issue.file_path().to_path_buf())
                .or_default()
                .push(issue);
        }
        let placeholder = by_file.is_empty().then_some(NO_ISSUES_MESSAGE);
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = StoreState {
                by_file,
                placeholder,
            };
        }
        self.changes.send_modify(|version| *version += 1);
    }

    pub fn placeholder(&self) -> Option<&'static str> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .placeholder
    }

    pub fn children(&self, parent: Option<&TreeNode>) -> Vec<TreeNode> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match parent {
            None => state.by_file.keys().cloned().map(TreeNode::File).collect(),
            Some(TreeNode::File(path)) => state
                .by_file
                .get(path)
                .map(|issues| issues.iter().cloned().map(TreeNode::Issue).collect())
                .unwrap_or_default(),
            Some(TreeNode::Issue(_)) => Vec::new(),
        }
    }

    pub fn snapshot(&self) -> IssuesByFile {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_file
            .clone()
    }

    pub fn issue_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_file
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Change notifications: the value is the number of replacements so far.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

/// Resolve where to navigate for `issue`, failing if the file has vanished
/// or shrunk since the issue was listed.
pub fn open_issue(issue: &Issue) -> Result<NavigationTarget, NavigationError> {
    open_location(issue.file_path(), issue.line())
}

/// Same check for a bare `path` and 1-based `line`.
pub fn open_location(path: &Path, line: u32) -> Result<NavigationTarget, NavigationError> {
    let text = std::fs::read_to_string(path).map_err(|_| NavigationError::FileMissing {
        path: path.to_path_buf(),
    })?;
    let lines = text.lines().count();
    let line = line.max(1);
    if line as usize > lines.max(1) {
        return Err(NavigationError::LineOutOfRange {
            path: path.to_path_buf(),
            line,
            lines,
        });
    }
    Ok(NavigationTarget {
        path: path.to_path_buf(),
        line: line - 1,
        column: 0,
    })
}
