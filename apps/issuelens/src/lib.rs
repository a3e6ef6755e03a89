//! Issuelens core library.
//!
//! Aggregates code-quality issues from two sources into one grouped view:
//! open issues fetched from a SonarQube server for the whole project, and
//! ESLint findings on the local checkout for new code.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Repository root discovery, server configuration and effective settings.
//! - `models`: Issues, severities, scope modes and wire models.
//! - `severity`: ESLint level mapping and display priorities.
//! - `remote`: Paginated issue search over HTTP.
//! - `local`: ESLint runner and report decoding.
//! - `reconcile`: Remote component paths to local files.
//! - `discovery`: Workspace source enumeration and mtime snapshots.
//! - `store`: Grouped issue store and tree nodes.
//! - `diagnostics`: Per-line markers for the editor surface.
//! - `settings`: Persisted severity selection.
//! - `session`: Refresh orchestration and host commands.
//! - `output`: Human/JSON printers.
//! - `error`: Error types.
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod local;
pub mod models;
pub mod output;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod settings;
pub mod severity;
pub mod store;
