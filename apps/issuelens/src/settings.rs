//! Workspace-scoped persisted settings: the severity selection.
//!
//! Stored as `.issuelens/settings.json` under the workspace root:
//! `{"selectedSeverities": ["BLOCKER", "CRITICAL"]}`. A missing or corrupt
//! file reads as the default selection.

use crate::error::SettingsError;
use crate::models::{SelectedSeverities, Severity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_DIR: &str = ".issuelens";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    selected_severities: Option<SelectedSeverities>,
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn for_workspace(root: &Path) -> Self {
        Self {
            path: root.join(SETTINGS_DIR).join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_severities(&self) -> SelectedSeverities {
        let Ok(s) = fs::read_to_string(&self.path) else {
            return SelectedSeverities::default();
        };
        match serde_json::from_str::<SettingsFile>(&s) {
            Ok(file) => file.selected_severities.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("ignoring corrupt settings {}: {e}", self.path.display());
                SelectedSeverities::default()
            }
        }
    }

    pub fn save_severities(&self, selected: &SelectedSeverities) -> Result<(), SettingsError> {
        let io = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io)?;
        }
        let body = serde_json::to_string_pretty(&SettingsFile {
            selected_severities: Some(selected.clone()),
        })?;
        fs::write(&self.path, body).map_err(io)
    }
}

/// Parse user-supplied labels, rejecting unknown ones.
pub fn parse_severity_labels<S: AsRef<str>>(
    labels: &[S],
) -> Result<SelectedSeverities, SettingsError> {
    let parsed = labels
        .iter()
        .map(|l| l.as_ref().parse::<Severity>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(SettingsError::UnknownSeverity)?;
    Ok(SelectedSeverities::new(parsed))
}
