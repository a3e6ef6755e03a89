//! Session context and refresh orchestration.
//!
//! A `Session` is built once at startup and owns everything a refresh needs:
//! scope mode, severity selection, auto-refresh flag, the long-lived issue
//! store and the diagnostics publisher. Refresh per scope mode:
//!
//! 1. Load the server configuration; failure ends the cycle with an empty
//!    result (no local run either).
//! 2. Horizon `Overall`: fetch remote issues (narrowed to the active file in
//!    current-file scopes) and reconcile them against the checkout.
//! 3. Horizon `NewCode`: lint the active file, or every workspace source.
//! 4. Filter both lists by the selected severities, publish them to
//!    diagnostics as two batches, and hand `remote ++ local` to the store.
//!
//! A failed remote fetch in an `Overall` scope voids the cycle: nothing is
//! shown rather than a partial view that looks complete.
//!
//! Refreshes are not mutually exclusive. Each takes a generation number and
//! only the latest generation dispatched may write to the store and the
//! diagnostics surface; an older cycle that finishes late is dropped.

use crate::config::{load_server_config, Effective};
use crate::diagnostics::{DiagnosticsPublisher, DiagnosticsSink};
use crate::discovery::{discover_sources, SourceFilter};
use crate::error::ConfigError;
use crate::local::{run_local_analysis, LintEngine};
use crate::models::{Horizon, Issue, ScopeMode, SelectedSeverities};
use crate::reconcile::reconcile;
use crate::remote::{fetch_remote_issues, SearchTransport};
use crate::settings::{parse_severity_labels, SettingsStore};
use crate::store::{open_issue, IssueStore, NavigationTarget};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A user-visible message produced by a refresh or command.
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchStatus {
    Skipped,
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub generation: u64,
    pub mode: ScopeMode,
    /// Remote issues first, then local ones, both severity-filtered.
    pub issues: Vec<Issue>,
    pub remote: BranchStatus,
    pub local: BranchStatus,
    pub notices: Vec<Notice>,
    /// False when a newer refresh was dispatched before this one finished.
    pub applied: bool,
}

/// Commands the host can invoke.
#[derive(Debug, Clone)]
pub enum HostCommand {
    Refresh,
    Clear,
    SetFilter(String),
    SelectSeverities(Vec<String>),
    OpenIssue(Issue),
}

#[derive(Debug, Clone)]
pub enum CommandResult {
    Refreshed(RefreshOutcome),
    Cleared,
    Navigate(NavigationTarget),
    Rejected(Notice),
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Branches {
    remote: Vec<Issue>,
    local: Vec<Issue>,
    remote_status: BranchStatus,
    local_status: BranchStatus,
}

impl Branches {
    fn skipped() -> Self {
        Self {
            remote: Vec::new(),
            local: Vec::new(),
            remote_status: BranchStatus::Skipped,
            local_status: BranchStatus::Skipped,
        }
    }
}

pub struct Session {
    effective: Effective,
    transport: Arc<dyn SearchTransport>,
    engine: Arc<dyn LintEngine>,
    store: Arc<IssueStore>,
    diagnostics: DiagnosticsPublisher,
    settings: SettingsStore,
    severities: RwLock<SelectedSeverities>,
    mode: RwLock<ScopeMode>,
    active_file: RwLock<Option<PathBuf>>,
    auto_refresh: AtomicBool,
    generation: AtomicU64,
    in_flight: AtomicUsize,
}

impl Session {
    pub fn new(
        effective: Effective,
        transport: Arc<dyn SearchTransport>,
        engine: Arc<dyn LintEngine>,
        store: Arc<IssueStore>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let settings = SettingsStore::for_workspace(&effective.repo_root);
        let severities = settings.load_severities();
        let mode = effective.mode;
        Self {
            effective,
            transport,
            engine,
            store,
            diagnostics: DiagnosticsPublisher::new(sink),
            settings,
            severities: RwLock::new(severities),
            mode: RwLock::new(mode),
            active_file: RwLock::new(None),
            auto_refresh: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.effective.repo_root
    }

    pub fn store(&self) -> &Arc<IssueStore> {
        &self.store
    }

    pub fn mode(&self) -> ScopeMode {
        *self.mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn selected_severities(&self) -> SelectedSeverities {
        self.severities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn active_file(&self) -> Option<PathBuf> {
        self.active_file
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_active_file(&self, file: Option<PathBuf>) {
        *self.active_file.write().unwrap_or_else(PoisonError::into_inner) = file;
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RefreshState {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Refresh with the current scope mode.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresh_with(self.mode()).await
    }

    pub async fn refresh_with(&self, mode: ScopeMode) -> RefreshOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight::enter(&self.in_flight);
        info!(generation, mode = %mode, "refresh started");
        let mut notices: Vec<Notice> = Vec::new();

        let config = match load_server_config(&self.effective.server_config) {
            Ok(config) => config,
            Err(e) => {
                let level = match e {
                    ConfigError::Missing { .. } | ConfigError::MissingField { .. } => {
                        NoticeLevel::Warning
                    }
                    _ => NoticeLevel::Error,
                };
                warn!("refresh aborted: {e}");
                notices.push(Notice::new(level, format!("SonarQube configuration: {e}")));
                return self.finish(generation, mode, Branches::skipped(), notices);
            }
        };

        let current_file = if mode.is_file_mode() {
            self.active_file()
        } else {
            None
        };
        let missing_file = mode.is_file_mode() && current_file.is_none();
        if missing_file {
            notices.push(Notice::new(
                NoticeLevel::Info,
                "No active file; nothing to analyze for the current-file scope.",
            ));
        }
        let severities = self.selected_severities();
        let mut branches = Branches::skipped();

        if mode.horizon == Horizon::Overall && !missing_file {
            match fetch_remote_issues(
                self.transport.as_ref(),
                &config,
                self.workspace_root(),
                &severities,
                current_file.as_deref(),
            )
            .await
            {
                Ok(raw) => {
                    branches.remote = reconcile(
                        raw,
                        &config.project_key,
                        self.workspace_root(),
                        current_file.as_deref(),
                    );
                    branches.remote_status = BranchStatus::Ok;
                }
                Err(e) => {
                    error!("remote fetch failed: {e}");
                    notices.push(Notice::new(
                        NoticeLevel::Error,
                        format!("SonarQube issues unavailable: {e}"),
                    ));
                    branches.remote_status = BranchStatus::Failed;
                }
            }
        }

        if mode.horizon == Horizon::NewCode && !missing_file {
            let files = match &current_file {
                Some(file) => vec![file.clone()],
                None => self.workspace_sources().await,
            };
            match run_local_analysis(self.engine.as_ref(), self.workspace_root(), &files).await {
                Ok(issues) => {
                    branches.local = issues;
                    branches.local_status = BranchStatus::Ok;
                }
                Err(e) => {
                    error!("local analysis failed: {e}");
                    notices.push(Notice::new(
                        NoticeLevel::Error,
                        format!("ESLint analysis failed: {e}"),
                    ));
                    branches.local_status = BranchStatus::Failed;
                }
            }
        }

        branches.remote = severities.filter(branches.remote);
        branches.local = severities.filter(branches.local);
        if branches.remote_status == BranchStatus::Failed {
            // Overall scope with no remote data: show nothing.
            branches.remote.clear();
            branches.local.clear();
        }
        self.finish(generation, mode, branches, notices)
    }

    async fn workspace_sources(&self) -> Vec<PathBuf> {
        let root = self.effective.repo_root.clone();
        let filter = SourceFilter::from_effective(&self.effective);
        match tokio::task::spawn_blocking(move || discover_sources(&root, &filter)).await {
            Ok(files) => files,
            Err(e) => {
                warn!("source discovery failed: {e}");
                Vec::new()
            }
        }
    }

    fn finish(
        &self,
        generation: u64,
        mode: ScopeMode,
        branches: Branches,
        notices: Vec<Notice>,
    ) -> RefreshOutcome {
        let applied = self.generation.load(Ordering::SeqCst) == generation;
        let mut issues = branches.remote.clone();
        issues.extend(branches.local.iter().cloned());
        if applied {
            self.diagnostics.publish(&branches.remote, &branches.local);
            self.store.set_issues(issues.clone());
            info!(generation, issues = issues.len(), "refresh applied");
        } else {
            debug!(generation, "discarding results of superseded refresh");
        }
        RefreshOutcome {
            generation,
            mode,
            issues,
            remote: branches.remote_status,
            local: branches.local_status,
            notices,
            applied,
        }
    }

    /// Wipe the view and diagnostics and stop auto-refresh. In-flight
    /// refreshes are not cancelled.
    pub fn clear(&self) {
        self.auto_refresh.store(false, Ordering::SeqCst);
        self.store.set_issues(Vec::new());
        self.diagnostics.clear();
    }

    pub fn set_mode(&self, mode: ScopeMode) {
        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub async fn execute(&self, command: HostCommand) -> CommandResult {
        match command {
            HostCommand::Refresh => {
                self.auto_refresh.store(true, Ordering::SeqCst);
                CommandResult::Refreshed(self.refresh().await)
            }
            HostCommand::Clear => {
                self.clear();
                CommandResult::Cleared
            }
            HostCommand::SetFilter(label) => match ScopeMode::from_label(&label) {
                Some(mode) => {
                    self.set_mode(mode);
                    self.auto_refresh.store(true, Ordering::SeqCst);
                    CommandResult::Refreshed(self.refresh().await)
                }
                None => CommandResult::Rejected(Notice::new(
                    NoticeLevel::Warning,
                    format!("Unknown filter '{label}'"),
                )),
            },
            HostCommand::SelectSeverities(labels) => {
                let selected = match parse_severity_labels(&labels) {
                    Ok(sel) => sel,
                    Err(e) => {
                        return CommandResult::Rejected(Notice::new(
                            NoticeLevel::Warning,
                            e.to_string(),
                        ))
                    }
                };
                let persisted = self.settings.save_severities(&selected);
                *self.severities.write().unwrap_or_else(PoisonError::into_inner) = selected;
                self.auto_refresh.store(true, Ordering::SeqCst);
                let mut outcome = self.refresh().await;
                if let Err(e) = persisted {
                    warn!("severity selection not persisted: {e}");
                    outcome.notices.push(Notice::new(
                        NoticeLevel::Warning,
                        format!("Severity selection not saved: {e}"),
                    ));
                }
                CommandResult::Refreshed(outcome)
            }
            HostCommand::OpenIssue(issue) => match open_issue(&issue) {
                Ok(target) => CommandResult::Navigate(target),
                Err(e) => {
                    warn!("navigation failed: {e}");
                    CommandResult::Rejected(Notice::new(NoticeLevel::Error, e.to_string()))
                }
            },
        }
    }

    /// Document-save hook: refresh the current scope if auto-refresh is on.
    pub async fn on_document_saved(&self, path: &Path) -> Option<RefreshOutcome> {
        if !self.auto_refresh() {
            return None;
        }
        debug!("document saved: {}", path.display());
        Some(self.refresh().await)
    }

    /// Active-editor hook: only current-file scopes react.
    pub async fn on_active_editor_changed(&self, file: Option<PathBuf>) -> Option<RefreshOutcome> {
        self.set_active_file(file);
        if !self.auto_refresh() || !self.mode().is_file_mode() {
            return None;
        }
        Some(self.refresh().await)
    }
}
