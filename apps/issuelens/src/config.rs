//! Configuration discovery and effective settings resolution.
//!
//! Two files are involved:
//! - The server configuration (`sonar-config.json` by default) holding
//!   `server`, `token` and `projectKey`. It is re-read on every refresh and
//!   all three fields are required.
//! - The application settings `issuelens.toml|yaml|yml`, found in the repo
//!   root (or closest ancestor). Every key is optional.
//!
//! Defaults:
//! - `server_config`: `sonar-config.json`
//! - `output`: `human`
//! - `mode`: `all`
//! - `eslint.command`: `["npx", "eslint"]`
//! - `sources.extensions`: `js, jsx, ts, tsx, mjs, cjs`
//! - `sources.exclude_dirs`: `node_modules, .git`
//! - `watch.interval_ms`: 1000
//!
//! Overrides precedence: CLI > settings file > defaults.

use crate::error::ConfigError;
use crate::models::ScopeMode;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER_CONFIG: &str = "sonar-config.json";
pub const DEFAULT_EXTENSIONS: [&str; 6] = ["js", "jsx", "ts", "tsx", "mjs", "cjs"];
pub const DEFAULT_EXCLUDE_DIRS: [&str; 2] = ["node_modules", ".git"];
const DEFAULT_WATCH_INTERVAL_MS: u64 = 1000;

#[derive(Deserialize, Default)]
/// Raw shape of the server configuration file; every field may be absent.
struct RawServerConfig {
    server: Option<String>,
    token: Option<String>,
    #[serde(rename = "projectKey")]
    project_key: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
/// Validated connection settings for the quality server.
pub struct ServerConfig {
    pub server: String,
    pub token: String,
    pub project_key: String,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("server", &self.server)
            .field("token", &"<redacted>")
            .field("project_key", &self.project_key)
            .finish()
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingField { field }),
    }
}

/// Load and validate the server configuration at `path`.
pub fn load_server_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::Missing {
            path: path.to_path_buf(),
        });
    }
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawServerConfig =
        serde_json::from_str(&s).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(ServerConfig {
        server: required(raw.server, "server")?,
        token: required(raw.token, "token")?,
        project_key: required(raw.project_key, "projectKey")?,
    })
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[eslint]` section.
pub struct EslintCfg {
    /// Program followed by leading arguments, e.g. `["npx", "eslint"]`.
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[sources]` section: which files count as workspace sources.
pub struct SourcesCfg {
    pub extensions: Option<Vec<String>>,
    pub exclude_dirs: Option<Vec<String>>,
    /// Glob patterns relative to the repo root.
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct WatchCfg {
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root settings loaded from `issuelens.toml|yaml`.
pub struct IssuelensConfig {
    pub server_config: Option<String>,
    pub output: Option<String>,
    pub mode: Option<String>,
    #[serde(default)]
    pub eslint: Option<EslintCfg>,
    #[serde(default)]
    pub sources: Option<SourcesCfg>,
    #[serde(default)]
    pub watch: Option<WatchCfg>,
}

#[derive(Debug, Clone)]
/// Fully-resolved settings used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub server_config: PathBuf,
    pub output: String,
    pub mode: ScopeMode,
    pub eslint_command: Vec<String>,
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub exclude: Vec<String>,
    pub watch_interval_ms: u64,
    /// Settings file that was applied, if any.
    pub settings_file: Option<PathBuf>,
}

impl Effective {
    /// Defaults for `repo_root` without reading any settings file.
    pub fn defaults(repo_root: &Path) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            server_config: repo_root.join(DEFAULT_SERVER_CONFIG),
            output: "human".to_string(),
            mode: ScopeMode::default(),
            eslint_command: vec!["npx".to_string(), "eslint".to_string()],
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            watch_interval_ms: DEFAULT_WATCH_INTERVAL_MS,
            settings_file: None,
        }
    }
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when an `issuelens.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if cur.join("issuelens.toml").exists()
            || cur.join("issuelens.yaml").exists()
            || cur.join("issuelens.yml").exists()
        {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `IssuelensConfig` from `issuelens.toml` or `issuelens.yaml|yml` if
/// present, along with the path it came from. A file that fails to parse is
/// logged and treated as absent.
pub fn load_config(root: &Path) -> Option<(PathBuf, IssuelensConfig)> {
    let toml_path = root.join("issuelens.toml");
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).ok()?;
        return match toml::from_str::<IssuelensConfig>(&s) {
            Ok(cfg) => Some((toml_path, cfg)),
            Err(e) => {
                tracing::warn!("ignoring {}: {e}", toml_path.display());
                None
            }
        };
    }
    for yml in ["issuelens.yaml", "issuelens.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).ok()?;
            return match serde_yaml::from_str::<IssuelensConfig>(&s) {
                Ok(cfg) => Some((p, cfg)),
                Err(e) => {
                    tracing::warn!("ignoring {}: {e}", p.display());
                    None
                }
            };
        }
    }
    None
}

/// Resolve `Effective` by merging CLI flags, discovered settings, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_output: Option<&str>,
    cli_mode: Option<ScopeMode>,
) -> Effective {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let start = start.canonicalize().unwrap_or(start);
    let repo_root = detect_repo_root(&start);
    let (settings_file, cfg) = match load_config(&repo_root) {
        Some((path, cfg)) => (Some(path), cfg),
        None => (None, IssuelensConfig::default()),
    };
    let mut eff = Effective::defaults(&repo_root);
    eff.settings_file = settings_file;

    if let Some(p) = cfg.server_config {
        eff.server_config = repo_root.join(p);
    }
    if let Some(o) = cli_output.map(|s| s.to_string()).or(cfg.output) {
        eff.output = o;
    }
    let cfg_mode = cfg.mode.as_deref().and_then(|m| match m.parse::<ScopeMode>() {
        Ok(mode) => Some(mode),
        Err(e) => {
            tracing::warn!("ignoring settings mode: {e}");
            None
        }
    });
    if let Some(mode) = cli_mode.or(cfg_mode) {
        eff.mode = mode;
    }
    if let Some(cmd) = cfg
        .eslint
        .and_then(|e| e.command)
        .filter(|c| !c.is_empty())
    {
        eff.eslint_command = cmd;
    }
    if let Some(src) = cfg.sources {
        if let Some(ext) = src.extensions {
            eff.extensions = ext
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect();
        }
        if let Some(dirs) = src.exclude_dirs {
            eff.exclude_dirs = dirs;
        }
        eff.exclude = src.exclude.unwrap_or_default();
    }
    if let Some(ms) = cfg.watch.and_then(|w| w.interval_ms) {
        eff.watch_interval_ms = ms.max(100);
    }
    eff
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_server_config_complete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SERVER_CONFIG);
        fs::write(
            &path,
            r#"{"server": "https://sonar.example.com", "token": "squ_abc", "projectKey": "acme"}"#,
        )
        .unwrap();
        let cfg = load_server_config(&path).unwrap();
        assert_eq!(cfg.server, "https://sonar.example.com");
        assert_eq!(cfg.project_key, "acme");
        assert!(!format!("{:?}", cfg).contains("squ_abc"));
    }

    #[test]
    fn test_server_config_missing_file_and_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SERVER_CONFIG);
        assert!(matches!(
            load_server_config(&path),
            Err(ConfigError::Missing { .. })
        ));

        fs::write(&path, r#"{"server": "https://s", "token": "  "}"#).unwrap();
        assert!(matches!(
            load_server_config(&path),
            Err(ConfigError::MissingField { field: "token" })
        ));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_server_config(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("issuelens.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
server_config = "config/sonar.json"
output = "json"
mode = "new-file"
[eslint]
command = ["node_modules/.bin/eslint"]
[sources]
extensions = [".ts", "vue"]
exclude = ["generated/**"]
    "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, None);
        let root = root.canonicalize().unwrap();
        assert_eq!(eff.settings_file, Some(root.join("issuelens.toml")));
        assert_eq!(eff.server_config, root.join("config/sonar.json"));
        assert_eq!(eff.output, "json");
        assert_eq!(eff.mode, ScopeMode::FILE_NEW_CODE);
        assert_eq!(eff.eslint_command, vec!["node_modules/.bin/eslint"]);
        assert_eq!(eff.extensions, vec!["ts", "vue"]);
        assert_eq!(eff.exclude, vec!["generated/**"]);
        // untouched keys keep their defaults
        assert_eq!(eff.exclude_dirs, vec!["node_modules", ".git"]);
    }

    #[test]
    fn test_load_yaml_and_cli_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("issuelens.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output: json
mode: file
watch:
  interval_ms: 250
            "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), Some("human"), Some(ScopeMode::ALL_NEW_CODE));
        assert_eq!(eff.output, "human");
        assert_eq!(eff.mode, ScopeMode::ALL_NEW_CODE);
        assert_eq!(eff.watch_interval_ms, 250);
    }

    #[test]
    fn test_defaults_without_settings() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();
        let eff = resolve_effective(nested.to_str(), None, None);
        assert_eq!(eff.repo_root, dir.path().canonicalize().unwrap());
        assert_eq!(eff.mode, ScopeMode::ALL_OVERALL);
        assert_eq!(eff.output, "human");
        assert_eq!(eff.eslint_command, vec!["npx", "eslint"]);
        assert!(eff.settings_file.is_none());
    }

    #[test]
    fn test_invalid_settings_are_ignored_and_not_reported_as_applied() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("issuelens.toml"), "output = [unclosed").unwrap();
        let eff = resolve_effective(dir.path().to_str(), None, None);
        assert!(eff.settings_file.is_none());
        assert_eq!(eff.output, "human");
        assert_eq!(eff.mode, ScopeMode::ALL_OVERALL);
    }
}
