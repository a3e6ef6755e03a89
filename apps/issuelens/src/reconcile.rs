//! Maps remote component identifiers onto the local checkout.
//!
//! A remote record survives only if its component resolves to a regular file
//! under the workspace root (directory-level components are dropped) (and, when given, is the current file).
//! Anything else is dropped quietly: a finding for a file that is not checked
//! out cannot be shown.

use crate::models::remote::RemoteIssue;
use crate::models::{Issue, IssueSource, Severity};
use std::path::{Path, PathBuf};
use tracing::debug;

const UNKNOWN: &str = "Unknown";

/// Workspace-relative path encoded in a component identifier.
pub fn relative_component_path<'a>(component: &'a str, project_key: &str) -> &'a str {
    let prefix_len = project_key.len() + 1;
    let rest = match component.strip_prefix(project_key) {
        Some(r) if r.starts_with(':') => &component[prefix_len..],
        _ => component,
    };
    rest.trim_start_matches(['/', '\\'])
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}

pub fn reconcile(
    raw: Vec<RemoteIssue>,
    project_key: &str,
    workspace_root: &Path,
    current_file: Option<&Path>,
) -> Vec<Issue> {
    let total = raw.len();
    let issues: Vec<Issue> = raw
        .into_iter()
        .filter_map(|r| {
            let component = r.component.as_deref()?;
            let rel = relative_component_path(component, project_key);
            if rel.is_empty() {
                return None;
            }
            let abs: PathBuf = workspace_root.join(rel);
            if !abs.is_file() {
                debug!("dropping remote issue for {}: not a local file", abs.display());
                return None;
            }
            if let Some(cur) = current_file {
                if !same_file(&abs, cur) {
                    return None;
                }
            }
            let line = r.start_line().unwrap_or(1);
            Some(Issue::new(
                r.message.unwrap_or_else(|| UNKNOWN.to_string()),
                r.rule.unwrap_or_else(|| UNKNOWN.to_string()),
                r.severity.unwrap_or(Severity::Info),
                abs,
                line,
                IssueSource::SonarQube,
            ))
        })
        .collect();
    debug!(kept = issues.len(), dropped = total - issues.len(), "reconciled remote issues");
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::remote::TextRange;
    use std::fs;
    use tempfile::tempdir;

    fn raw(component: &str, line: Option<u32>) -> RemoteIssue {
        RemoteIssue {
            message: Some("Refactor this function".into()),
            rule: Some("typescript:S3776".into()),
            severity: Some(Severity::Critical),
            component: Some(component.into()),
            text_range: line.map(|l| TextRange {
                start_line: Some(l),
            }),
        }
    }

    #[test]
    fn test_missing_local_file_is_dropped() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "export {}\n").unwrap();

        let out = reconcile(
            vec![raw("acme:src/a.ts", Some(7)), raw("acme:src/b.ts", Some(2))],
            "acme",
            dir.path(),
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].file_path(), dir.path().join("src/a.ts").as_path());
        assert_eq!(out[0].line(), 7);
        assert_eq!(out[0].source(), IssueSource::SonarQube);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "").unwrap();
        let bare = RemoteIssue {
            component: Some("acme:a.ts".into()),
            ..RemoteIssue::default()
        };
        let out = reconcile(vec![bare], "acme", dir.path(), None);
        assert_eq!(out[0].message(), "Unknown");
        assert_eq!(out[0].rule(), "Unknown");
        assert_eq!(out[0].severity(), Severity::Info);
        assert_eq!(out[0].line(), 1);
    }

    #[test]
    fn test_current_file_restriction() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "").unwrap();
        fs::write(dir.path().join("b.ts"), "").unwrap();
        let cur = dir.path().join("b.ts");
        let out = reconcile(
            vec![raw("acme:a.ts", None), raw("acme:b.ts", Some(3))],
            "acme",
            dir.path(),
            Some(&cur),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].file_path(), cur.as_path());
    }

    #[test]
    fn test_component_prefix_and_separators_are_stripped() {
        assert_eq!(relative_component_path("acme:src/a.ts", "acme"), "src/a.ts");
        assert_eq!(relative_component_path("acme:/src/a.ts", "acme"), "src/a.ts");
        assert_eq!(relative_component_path("acme:\\src\\a.ts", "acme"), "src\\a.ts");
        assert_eq!(relative_component_path("/src/a.ts", "acme"), "src/a.ts");
        // a key that merely shares a prefix is not stripped
        assert_eq!(relative_component_path("acme2:a.ts", "acme"), "acme2:a.ts");
    }

    #[test]
    fn test_directory_component_is_dropped() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "").unwrap();
        let out = reconcile(
            vec![raw("acme:src", Some(1)), raw("acme:src/a.ts", Some(2))],
            "acme",
            dir.path(),
            None,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].file_path(), dir.path().join("src/a.ts").as_path());
    }

    #[test]
    fn test_project_level_component_is_dropped() {
        let dir = tempdir().unwrap();
        let out = reconcile(vec![raw("acme", None)], "acme", dir.path(), None);
        assert!(out.is_empty());
    }
}
