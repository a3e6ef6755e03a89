//! Issuelens CLI binary entry point.
//! Builds a session from the effective settings, runs the requested command
//! and prints results.

use clap::Parser;
use issuelens::cli::{Cli, Commands};
use issuelens::config::{self, Effective};
use issuelens::diagnostics::DiagnosticCollection;
use issuelens::discovery::{changed_since, discover_sources, snapshot_mtimes, SourceFilter};
use issuelens::local::EslintCli;
use issuelens::output;
use issuelens::remote::HttpTransport;
use issuelens::session::{CommandResult, HostCommand, NoticeLevel, RefreshOutcome, Session};
use issuelens::settings::SettingsStore;
use issuelens::store::{open_location, IssueStore};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("ISSUELENS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", output::error_prefix(), message);
    std::process::exit(2);
}

/// `file` is taken relative to the repository root unless absolute.
fn resolve_file(root: &Path, file: &str) -> PathBuf {
    let p = PathBuf::from(file);
    let p = if p.is_absolute() { p } else { root.join(p) };
    p.canonicalize().unwrap_or(p)
}

fn build_session(eff: Effective) -> (Session, Arc<IssueStore>, Arc<DiagnosticCollection>) {
    let transport = match HttpTransport::new() {
        Ok(t) => t,
        Err(e) => fail(e),
    };
    let engine = EslintCli::new(&eff.eslint_command);
    let store = Arc::new(IssueStore::new());
    let diagnostics = Arc::new(DiagnosticCollection::new());
    let session = Session::new(
        eff,
        Arc::new(transport),
        Arc::new(engine),
        store.clone(),
        diagnostics.clone(),
    );
    (session, store, diagnostics)
}

fn print_outcome(
    outcome: &RefreshOutcome,
    session: &Session,
    diagnostics: &DiagnosticCollection,
    output_mode: &str,
) {
    output::print_refresh(
        outcome,
        session.store(),
        &diagnostics.snapshot(),
        session.workspace_root(),
        output_mode,
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Refresh {
            repo_root,
            mode,
            file,
            output,
        } => {
            let eff = config::resolve_effective(repo_root.as_deref(), output.as_deref(), mode);
            if eff.settings_file.is_none() {
                tracing::debug!("no issuelens settings applied; using defaults");
            }
            let output_mode = eff.output.clone();
            let root = eff.repo_root.clone();
            let (session, store, diagnostics) = build_session(eff);
            session.set_active_file(file.as_deref().map(|f| resolve_file(&root, f)));
            let outcome = match session.execute(HostCommand::Refresh).await {
                CommandResult::Refreshed(outcome) => outcome,
                CommandResult::Rejected(notice) => fail(notice.message),
                _ => return,
            };
            print_outcome(&outcome, &session, &diagnostics, &output_mode);
            if outcome.notices.iter().any(|n| n.level == NoticeLevel::Error) {
                std::process::exit(2);
            }
            if store.issue_count() > 0 {
                std::process::exit(1);
            }
        }
        Commands::Severities {
            repo_root,
            none,
            labels,
            output,
        } => {
            let eff = config::resolve_effective(repo_root.as_deref(), output.as_deref(), None);
            let settings = SettingsStore::for_workspace(&eff.repo_root);
            if labels.is_empty() && !none {
                output::print_severities(&settings.load_severities(), &eff.output);
                return;
            }
            let selected = match issuelens::settings::parse_severity_labels(&labels) {
                Ok(sel) => sel,
                Err(e) => fail(e),
            };
            if let Err(e) = settings.save_severities(&selected) {
                fail(e);
            }
            output::print_severities(&selected, &eff.output);
        }
        Commands::Open {
            repo_root,
            file,
            line,
            output,
        } => {
            let eff = config::resolve_effective(repo_root.as_deref(), output.as_deref(), None);
            let path = resolve_file(&eff.repo_root, &file);
            match open_location(&path, line) {
                Ok(target) => output::print_navigation(&target, &eff.output),
                Err(e) => fail(e),
            }
        }
        Commands::Watch {
            repo_root,
            mode,
            file,
            output,
            interval_ms,
        } => {
            let eff = config::resolve_effective(repo_root.as_deref(), output.as_deref(), mode);
            let output_mode = eff.output.clone();
            let root = eff.repo_root.clone();
            let filter = SourceFilter::from_effective(&eff);
            let interval =
                Duration::from_millis(interval_ms.unwrap_or(eff.watch_interval_ms).max(100));
            let (session, _store, diagnostics) = build_session(eff);
            session.set_active_file(file.as_deref().map(|f| resolve_file(&root, f)));
            watch(&session, &diagnostics, &root, &filter, interval, &output_mode).await;
        }
    }
}

async fn snapshot(root: &Path, filter: &SourceFilter) -> HashMap<PathBuf, SystemTime> {
    let root = root.to_path_buf();
    let filter = filter.clone();
    tokio::task::spawn_blocking(move || snapshot_mtimes(&discover_sources(&root, &filter)))
        .await
        .unwrap_or_default()
}

/// Poll source mtimes and treat each change as a document save.
async fn watch(
    session: &Session,
    diagnostics: &DiagnosticCollection,
    root: &Path,
    filter: &SourceFilter,
    interval: Duration,
    output_mode: &str,
) {
    let outcome = session.refresh().await;
    print_outcome(&outcome, session, diagnostics, output_mode);
    eprintln!(
        "{} watching {} ({}); press Ctrl-C to stop",
        output::note_prefix(),
        root.display(),
        session.mode()
    );

    let mut before = snapshot(root, filter).await;
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("watch stopped");
                break;
            }
            _ = ticker.tick() => {
                let after = snapshot(root, filter).await;
                let changed = changed_since(&before, &after);
                before = after;
                let Some(first) = changed.first() else {
                    continue;
                };
                tracing::debug!(count = changed.len(), "sources changed");
                if let Some(outcome) = session.on_document_saved(first).await {
                    if outcome.applied {
                        print_outcome(&outcome, session, diagnostics, output_mode);
                    }
                }
            }
        }
    }
}
