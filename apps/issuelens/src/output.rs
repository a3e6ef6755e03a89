//! Output rendering for refresh results, severity selection and navigation.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes the
//! grouped tree, the diagnostics markers, notices and a summary.

use crate::diagnostics::Marker;
use crate::models::SelectedSeverities;
use crate::session::{Notice, NoticeLevel, RefreshOutcome};
use crate::severity::{presentation, DisplayPriority};
use crate::store::{IssueStore, NavigationTarget, TreeNode};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if use_colors("human") {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn warn_prefix() -> String {
    if use_colors("human") {
        "warning:".yellow().bold().to_string()
    } else {
        "warning:".to_string()
    }
}

pub fn note_prefix() -> String {
    if use_colors("human") {
        "note:".blue().bold().to_string()
    } else {
        "note:".to_string()
    }
}

fn notice_prefix(level: NoticeLevel) -> String {
    match level {
        NoticeLevel::Error => error_prefix(),
        NoticeLevel::Warning => warn_prefix(),
        NoticeLevel::Info => note_prefix(),
    }
}

/// Notices go to stderr so JSON on stdout stays parseable.
pub fn print_notices(notices: &[Notice]) {
    for n in notices {
        eprintln!("{} {}", notice_prefix(n.level), n.message);
    }
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

#[derive(Debug, Default, PartialEq, Eq)]
/// Counts per display priority.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub files: usize,
}

pub fn summarize(store: &IssueStore) -> Summary {
    let snap = store.snapshot();
    let mut s = Summary {
        files: snap.len(),
        ..Summary::default()
    };
    for issue in snap.values().flatten() {
        match presentation(issue.severity()).priority {
            DisplayPriority::Error => s.errors += 1,
            DisplayPriority::Warning => s.warnings += 1,
            DisplayPriority::Information => s.infos += 1,
        }
    }
    s
}

/// Print a refresh: the grouped tree from the store, then a summary.
pub fn print_refresh(
    outcome: &RefreshOutcome,
    store: &IssueStore,
    diagnostics: &BTreeMap<PathBuf, Vec<Marker>>,
    root: &Path,
    output: &str,
) {
    print_notices(&outcome.notices);
    match output {
        "json" => match serde_json::to_string_pretty(&compose_refresh_json(
            outcome,
            store,
            diagnostics,
            root,
        )) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("{} {}", error_prefix(), e),
        },
        _ => {
            let color = use_colors(output);
            if let Some(msg) = store.placeholder() {
                println!("{}", msg);
            }
            for file_node in store.children(None) {
                let TreeNode::File(path) = &file_node else {
                    continue;
                };
                let shown = display_path(root, path);
                if color {
                    println!("{}", shown.bold());
                } else {
                    println!("{}", shown);
                }
                for child in store.children(Some(&file_node)) {
                    let TreeNode::Issue(is) = child else {
                        continue;
                    };
                    let p = presentation(is.severity());
                    let icon = match (p.priority, color) {
                        (DisplayPriority::Error, true) => "✖".red().to_string(),
                        (DisplayPriority::Warning, true) => "▲".yellow().to_string(),
                        (DisplayPriority::Information, true) => "◆".blue().to_string(),
                        (DisplayPriority::Error, false) => "✖".to_string(),
                        (DisplayPriority::Warning, false) => "▲".to_string(),
                        (DisplayPriority::Information, false) => "◆".to_string(),
                    };
                    println!(
                        "  {} ⟦{}⟧ {}:{} ❲{}❳ — {} [{}]",
                        icon,
                        p.prefix,
                        shown,
                        is.line(),
                        is.rule(),
                        is.message(),
                        is.source()
                    );
                }
            }
            if !diagnostics.is_empty() {
                println!("Diagnostics:");
            }
            for (path, markers) in diagnostics {
                let shown = display_path(root, path);
                for m in markers {
                    println!("  {}:{} [{}] {}", shown, m.line + 1, m.source, m.message);
                }
            }
            let s = summarize(store);
            let summary = format!(
                "— Summary — errors={} warnings={} infos={} files={} scope=\"{}\"",
                s.errors, s.warnings, s.infos, s.files, outcome.mode
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

/// Print the current severity selection.
pub fn print_severities(selected: &SelectedSeverities, output: &str) {
    match output {
        "json" => println!(
            "{}",
            json!({ "selectedSeverities": selected.iter().map(|s| s.as_str()).collect::<Vec<_>>() })
        ),
        _ => {
            let labels: Vec<&str> = selected.iter().map(|s| s.as_str()).collect();
            if labels.is_empty() {
                println!("selected severities: (none)");
            } else {
                println!("selected severities: {}", labels.join(", "));
            }
        }
    }
}

/// Print where the editor should jump, 1-based for humans.
pub fn print_navigation(target: &NavigationTarget, output: &str) {
    match output {
        "json" => match serde_json::to_string(target) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("{} {}", error_prefix(), e),
        },
        _ => println!(
            "{}:{}:{}",
            target.path.display(),
            target.line + 1,
            target.column + 1
        ),
    }
}

/// Compose refresh JSON object (pure) for testing purposes.
pub fn compose_refresh_json(
    outcome: &RefreshOutcome,
    store: &IssueStore,
    diagnostics: &BTreeMap<PathBuf, Vec<Marker>>,
    root: &Path,
) -> JsonVal {
    let tree: serde_json::Map<String, JsonVal> = store
        .snapshot()
        .into_iter()
        .map(|(path, issues)| {
            let items: Vec<JsonVal> = issues
                .iter()
                .map(|is| {
                    json!({
                        "line": is.line(),
                        "severity": is.severity(),
                        "rule": is.rule(),
                        "message": is.message(),
                        "source": is.source(),
                    })
                })
                .collect();
            (display_path(root, &path), JsonVal::Array(items))
        })
        .collect();
    let diags: serde_json::Map<String, JsonVal> = diagnostics
        .iter()
        .map(|(path, markers)| {
            (
                display_path(root, path),
                serde_json::to_value(markers).unwrap_or(JsonVal::Null),
            )
        })
        .collect();
    let s = summarize(store);
    json!({
        "scope": outcome.mode.label(),
        "generation": outcome.generation,
        "applied": outcome.applied,
        "remote": outcome.remote,
        "local": outcome.local,
        "placeholder": store.placeholder(),
        "notices": outcome.notices,
        "issues": tree,
        "diagnostics": diags,
        "summary": {
            "errors": s.errors,
            "warnings": s.warnings,
            "infos": s.infos,
            "files": s.files,
        },
    })
}
