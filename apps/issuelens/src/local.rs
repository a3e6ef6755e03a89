//! Local lint run over a set of files.
//!
//! The engine is reached through `LintEngine`; `EslintCli` shells out to
//! ESLint with a fixed rule set and parses its JSON report. Files that cannot
//! be read are skipped before the engine starts, so one bad path never sinks
//! the rest of the run. Large runs are split into batches that each fit in
//! one command line; a failed batch is logged and the others still count.

use crate::error::LocalAnalysisError;
use crate::models::eslint::LintFileReport;
use crate::models::{Issue, IssueSource};
use crate::severity::map_eslint_severity;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Rule label used when the engine reports a finding without a rule id
/// (parse errors, mostly).
pub const GENERIC_RULE: &str = "eslint";

/// Upper bounds for one engine invocation. The byte budget stays well under
/// the usual `ARG_MAX` so the spawn never fails with E2BIG.
pub const BATCH_MAX_FILES: usize = 200;
pub const BATCH_MAX_ARG_BYTES: usize = 96 * 1024;

/// Fixed engine configuration: latest syntax, unused variables warn,
/// console allowed.
const ESLINT_ARGS: [&str; 12] = [
    "--format",
    "json",
    "--no-eslintrc",
    "--parser-options",
    "ecmaVersion:latest",
    "--parser-options",
    "sourceType:module",
    "--rule",
    "no-unused-vars: warn",
    "--rule",
    "no-console: off",
    "--no-error-on-unmatched-pattern",
];

#[async_trait]
pub trait LintEngine: Send + Sync {
    /// Lint `files` (absolute paths) from `cwd` and return per-file reports.
    async fn lint(
        &self,
        cwd: &Path,
        files: &[PathBuf],
    ) -> Result<Vec<LintFileReport>, LocalAnalysisError>;
}

#[derive(Debug, Clone)]
pub struct EslintCli {
    program: String,
    leading_args: Vec<String>,
}

impl EslintCli {
    /// `command` is the program followed by any leading arguments,
    /// e.g. `["npx", "eslint"]`.
    pub fn new(command: &[String]) -> Self {
        let mut parts = command.iter().cloned();
        let program = parts.next().unwrap_or_else(|| "eslint".to_string());
        Self {
            program,
            leading_args: parts.collect(),
        }
    }
}

#[async_trait]
impl LintEngine for EslintCli {
    async fn lint(
        &self,
        cwd: &Path,
        files: &[PathBuf],
    ) -> Result<Vec<LintFileReport>, LocalAnalysisError> {
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(ESLINT_ARGS)
            .args(files)
            .current_dir(cwd)
            .env("ESLINT_USE_FLAT_CONFIG", "false")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| LocalAnalysisError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // 0 = clean, 1 = findings; anything else means the engine itself failed.
        let status = output.status.code().unwrap_or(-1);
        if status != 0 && status != 1 {
            return Err(LocalAnalysisError::Engine {
                status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| LocalAnalysisError::Decode(e.to_string()))
    }
}

/// Lint `files` and normalize every finding into an `Issue`.
pub async fn run_local_analysis(
    engine: &dyn LintEngine,
    cwd: &Path,
    files: &[PathBuf],
) -> Result<Vec<Issue>, LocalAnalysisError> {
    let mut readable: Vec<PathBuf> = Vec::with_capacity(files.len());
    for file in files {
        match tokio::fs::metadata(file).await {
            Ok(meta) if meta.is_file() => readable.push(file.clone()),
            Ok(_) => warn!("skipping {}: not a regular file", file.display()),
            Err(e) => warn!("skipping {}: {e}", file.display()),
        }
    }
    if readable.is_empty() {
        debug!("no readable files to lint");
        return Ok(Vec::new());
    }

    let batches = lint_batches(&readable);
    let total = batches.len();
    let mut issues: Vec<Issue> = Vec::new();
    let mut last_error: Option<LocalAnalysisError> = None;
    let mut failed = 0usize;
    for (i, batch) in batches.into_iter().enumerate() {
        match engine.lint(cwd, batch).await {
            Ok(reports) => issues.extend(reports.into_iter().flat_map(normalize_report)),
            Err(e) => {
                warn!(batch = i + 1, total, files = batch.len(), "lint batch failed: {e}");
                failed += 1;
                last_error = Some(e);
            }
        }
    }
    if failed == total {
        if let Some(e) = last_error {
            return Err(e);
        }
    }
    debug!(
        files = readable.len(),
        batches = total,
        failed,
        issues = issues.len(),
        "local analysis finished"
    );
    Ok(issues)
}

/// Split `files` into runs bounded by `BATCH_MAX_FILES` and
/// `BATCH_MAX_ARG_BYTES`. Every batch holds at least one file.
fn lint_batches(files: &[PathBuf]) -> Vec<&[PathBuf]> {
    let mut batches = Vec::new();
    let mut start = 0usize;
    let mut bytes = 0usize;
    for (i, file) in files.iter().enumerate() {
        let len = file.as_os_str().len() + 1;
        let full = i - start >= BATCH_MAX_FILES || bytes + len > BATCH_MAX_ARG_BYTES;
        if i > start && full {
            batches.push(&files[start..i]);
            start = i;
            bytes = 0;
        }
        bytes += len;
    }
    if start < files.len() {
        batches.push(&files[start..]);
    }
    batches
}

fn normalize_report(report: LintFileReport) -> Vec<Issue> {
    let file = report.file_path;
    report
        .messages
        .into_iter()
        .map(|m| {
            Issue::new(
                m.message,
                m.rule_id.unwrap_or_else(|| GENERIC_RULE.to_string()),
                map_eslint_severity(m.severity.as_ref()),
                file.clone(),
                m.line.unwrap_or(1),
                IssueSource::Eslint,
            )
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Severity;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Engine fake: answers from a canned JSON report, or fails.
    pub(crate) struct CannedEngine {
        pub(crate) report: Result<String, String>,
        pub(crate) calls: Mutex<Vec<Vec<PathBuf>>>,
    }

    impl CannedEngine {
        pub(crate) fn ok(report: impl Into<String>) -> Self {
            Self {
                report: Ok(report.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(stderr: &str) -> Self {
            Self {
                report: Err(stderr.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LintEngine for CannedEngine {
        async fn lint(
            &self,
            _cwd: &Path,
            files: &[PathBuf],
        ) -> Result<Vec<LintFileReport>, LocalAnalysisError> {
            self.calls.lock().unwrap().push(files.to_vec());
            match &self.report {
                Ok(json) => serde_json::from_str(json)
                    .map_err(|e| LocalAnalysisError::Decode(e.to_string())),
                Err(stderr) => Err(LocalAnalysisError::Engine {
                    status: 2,
                    stderr: stderr.clone(),
                }),
            }
        }
    }

    pub(crate) fn two_file_report(a: &Path, b: &Path) -> String {
        serde_json::json!([
            {"filePath": a, "messages": [
                {"ruleId": "no-unused-vars", "severity": 1, "message": "'x' is assigned a value but never used.", "line": 4}
            ]},
            {"filePath": b, "messages": [
                {"ruleId": null, "severity": 2, "message": "Parsing error: Unexpected token", "line": 9, "fatal": true}
            ]}
        ])
        .to_string()
    }

    #[tokio::test]
    async fn test_warning_and_error_map_to_major_and_critical() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        fs::write(&a, "let x = 1;\n").unwrap();
        fs::write(&b, "let = ;\n").unwrap();
        let engine = CannedEngine::ok(two_file_report(&a, &b));

        let issues = run_local_analysis(&engine, dir.path(), &[a.clone(), b.clone()])
            .await
            .unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].severity(), Severity::Major);
        assert_eq!(issues[0].rule(), "no-unused-vars");
        assert_eq!(issues[0].line(), 4);
        assert_eq!(issues[0].file_path(), a.as_path());
        assert_eq!(issues[1].severity(), Severity::Critical);
        assert_eq!(issues[1].rule(), GENERIC_RULE);
        assert!(issues.iter().all(|i| i.source() == IssueSource::Eslint));
    }

    #[tokio::test]
    async fn test_unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, "let x = 1;\n").unwrap();
        let gone = dir.path().join("gone.js");
        let engine = CannedEngine::ok("[]");

        run_local_analysis(&engine, dir.path(), &[gone, a.clone()])
            .await
            .unwrap();
        assert_eq!(engine.calls.lock().unwrap().clone(), vec![vec![a]]);
    }

    #[tokio::test]
    async fn test_no_files_means_no_engine_call() {
        let dir = tempdir().unwrap();
        let engine = CannedEngine::ok("[]");
        let issues = run_local_analysis(&engine, dir.path(), &[]).await.unwrap();
        assert!(issues.is_empty());
        assert!(engine.calls.lock().unwrap().is_empty());
    }

    /// Fails only the first call, answers `[]` afterwards.
    struct FirstCallFails {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl LintEngine for FirstCallFails {
        async fn lint(
            &self,
            _cwd: &Path,
            _files: &[PathBuf],
        ) -> Result<Vec<LintFileReport>, LocalAnalysisError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                Err(LocalAnalysisError::Engine {
                    status: 2,
                    stderr: "crashed".into(),
                })
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn write_files(dir: &Path, count: usize, stem_len: usize) -> Vec<PathBuf> {
        let pad = "x".repeat(stem_len);
        (0..count)
            .map(|i| {
                let p = dir.join(format!("f{i:05}_{pad}.js"));
                fs::write(&p, "").unwrap();
                p
            })
            .collect()
    }

    #[test]
    fn test_batches_respect_file_and_byte_limits() {
        let many: Vec<PathBuf> = (0..450).map(|i| PathBuf::from(format!("/w/{i}.js"))).collect();
        let sizes: Vec<usize> = lint_batches(&many).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![200, 200, 50]);

        let long: Vec<PathBuf> = (0..10)
            .map(|i| PathBuf::from(format!("/w/{i}{}", "y".repeat(40 * 1024))))
            .collect();
        let batches = lint_batches(&long);
        assert_eq!(batches.len(), 5);
        assert!(batches.iter().all(|b| b.len() == 2));
        assert!(lint_batches(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_large_run_is_split_across_engine_calls() {
        let dir = tempdir().unwrap();
        let files = write_files(dir.path(), 450, 8);
        let engine = CannedEngine::ok("[]");
        run_local_analysis(&engine, dir.path(), &files).await.unwrap();
        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls.iter().map(Vec::len).sum::<usize>(), 450);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_sink_the_run() {
        let dir = tempdir().unwrap();
        let files = write_files(dir.path(), 300, 8);
        let engine = FirstCallFails {
            calls: Mutex::new(0),
        };
        let issues = run_local_analysis(&engine, dir.path(), &files).await.unwrap();
        assert!(issues.is_empty());
        assert_eq!(*engine.calls.lock().unwrap(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_command_survives_workspace_beyond_arg_max() {
        // ~12k paths of ~200 bytes exceed a 2 MiB argument list in one spawn.
        let dir = tempdir().unwrap();
        let files = write_files(dir.path(), 12_000, 180);
        let command: Vec<String> = ["sh", "-c", "echo '[]'", "sh"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let engine = EslintCli::new(&command);
        let issues = run_local_analysis(&engine, dir.path(), &files).await.unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_is_reported() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, "").unwrap();
        let engine = CannedEngine::failing("Oops! Something went wrong!");
        let res = run_local_analysis(&engine, dir.path(), &[a]).await;
        assert!(matches!(res, Err(LocalAnalysisError::Engine { status: 2, .. })));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, "").unwrap();
        let engine = EslintCli::new(&["issuelens-no-such-linter".to_string()]);
        let res = run_local_analysis(&engine, dir.path(), &[a]).await;
        assert!(matches!(res, Err(LocalAnalysisError::Spawn { .. })));
    }
}
