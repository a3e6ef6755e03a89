//! Workspace source enumeration for whole-workspace lint runs and the
//! watch loop.

use crate::config::Effective;
use glob::Pattern;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct SourceFilter {
    extensions: Vec<String>,
    exclude_dirs: Vec<String>,
    exclude: Vec<Pattern>,
}

impl SourceFilter {
    pub fn new(extensions: &[String], exclude_dirs: &[String], exclude: &[String]) -> Self {
        let exclude = exclude
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pat) => Some(pat),
                Err(e) => {
                    tracing::warn!("ignoring exclude pattern '{p}': {e}");
                    None
                }
            })
            .collect();
        Self {
            extensions: extensions.to_vec(),
            exclude_dirs: exclude_dirs.to_vec(),
            exclude,
        }
    }

    pub fn from_effective(eff: &Effective) -> Self {
        Self::new(&eff.extensions, &eff.exclude_dirs, &eff.exclude)
    }

    fn is_pruned_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
    }

    fn is_excluded(&self, rel: &Path) -> bool {
        self.exclude.iter().any(|p| p.matches_path(rel))
    }
}

/// Every source file under `root`, sorted. Walk errors are counted and
/// logged, never fatal.
pub fn discover_sources(root: &Path, filter: &SourceFilter) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !filter.is_pruned_dir(&e.file_name().to_string_lossy())
        });

    let mut paths = Vec::new();
    let mut errors = 0usize;
    for item in walker {
        match item {
            Ok(entry) => {
                if !entry.file_type().is_file() || !filter.has_source_extension(entry.path()) {
                    continue;
                }
                let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
                if filter.is_excluded(rel) {
                    continue;
                }
                paths.push(entry.into_path());
            }
            Err(_) => errors += 1,
        }
    }
    if errors > 0 {
        tracing::warn!("encountered {errors} errors during file walk");
    }
    paths.sort();
    paths
}

/// Modification times, used by the watch loop to spot saved files.
pub fn snapshot_mtimes(files: &[PathBuf]) -> HashMap<PathBuf, SystemTime> {
    files
        .iter()
        .filter_map(|f| {
            let modified = std::fs::metadata(f).and_then(|m| m.modified()).ok()?;
            Some((f.clone(), modified))
        })
        .collect()
}

/// Files that are new or whose mtime moved between two snapshots, sorted.
pub fn changed_since(
    before: &HashMap<PathBuf, SystemTime>,
    after: &HashMap<PathBuf, SystemTime>,
) -> Vec<PathBuf> {
    let mut changed: Vec<PathBuf> = after
        .iter()
        .filter(|(path, mtime)| before.get(*path) != Some(*mtime))
        .map(|(path, _)| path.clone())
        .collect();
    changed.sort();
    changed
}
