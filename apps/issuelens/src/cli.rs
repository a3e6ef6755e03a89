//! CLI argument parsing via `clap`.

use crate::models::ScopeMode;
use clap::{Parser, Subcommand};

fn parse_mode(s: &str) -> Result<ScopeMode, String> {
    s.parse::<ScopeMode>()
}

#[derive(Parser)]
#[command(
    name = "issuelens",
    version,
    about = "Issuelens: remote and local code issues in one view",
    long_about = "Issuelens merges open issues from a SonarQube server with ESLint findings on the local checkout, grouped by file.\n\nConfiguration precedence: CLI > issuelens.toml > defaults. Server settings come from sonar-config.json.",
    after_help = "Examples:\n  issuelens refresh\n  issuelens refresh --mode new-file --file src/app.ts\n  issuelens severities BLOCKER CRITICAL\n  issuelens watch --mode file --file src/app.ts",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current issuelens version.")]
    Version,
    /// Run one refresh cycle and print the grouped issues
    #[command(
        about = "Refresh and print issues",
        long_about = "Run one refresh in the chosen scope: remote issues for Overall scopes, ESLint for New Code scopes. Exits 1 when any issue is listed.",
        after_help = "Scopes: all | file | new | new-file (or the full labels, e.g. \"Current File (Overall)\").\n\nExamples:\n  issuelens refresh --mode all\n  issuelens refresh --mode new --output json"
    )]
    Refresh {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, value_parser = parse_mode, help = "Scope: all|file|new|new-file (default: all)")]
        mode: Option<ScopeMode>,
        #[arg(long, help = "Active file for current-file scopes")]
        file: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Show or change the persisted severity selection
    #[command(
        about = "Show or select severities",
        long_about = "Without labels, print the selected severities. With labels, persist them to .issuelens/settings.json. An empty selection is allowed with --none.",
        after_help = "Examples:\n  issuelens severities\n  issuelens severities BLOCKER CRITICAL MAJOR\n  issuelens severities --none"
    )]
    Severities {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "labels", help = "Select no severity")]
        none: bool,
        #[arg(help = "Severity labels: BLOCKER CRITICAL MAJOR MINOR INFO")]
        labels: Vec<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Resolve an editor jump target for a file and line
    #[command(
        about = "Resolve a navigation target",
        long_about = "Check that FILE exists and has LINE, then print path:line:column. Exits 2 when the file is gone or shorter."
    )]
    Open {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(help = "File path, relative to the repository root or absolute")]
        file: String,
        #[arg(help = "1-based line number")]
        line: u32,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Refresh on every file save until interrupted
    #[command(
        about = "Watch and refresh on save",
        long_about = "Run an initial refresh, then poll source modification times and refresh after each save. Stop with Ctrl-C.",
        after_help = "Examples:\n  issuelens watch\n  issuelens watch --mode new-file --file src/app.ts --interval-ms 500"
    )]
    Watch {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, value_parser = parse_mode, help = "Scope: all|file|new|new-file (default: all)")]
        mode: Option<ScopeMode>,
        #[arg(long, help = "Active file for current-file scopes")]
        file: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, help = "Polling interval in milliseconds (default: 1000)")]
        interval_ms: Option<u64>,
    },
}
