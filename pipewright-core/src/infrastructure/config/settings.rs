// pipewright-core/src/infrastructure/config/settings.rs

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::infrastructure::error::InfrastructureError;

const SETTINGS_FILES: [&str; 2] = ["pipewright.yaml", "pipewright.yml"];

/// Where a project keeps its documents. All paths are absolute or relative
/// to the working directory, already joined onto the project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub project_dir: PathBuf,
    pub pipelines_dir: PathBuf,
    pub connections_dir: PathBuf,
    pub schedules_dir: PathBuf,
    pub runs_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default = "default_pipelines_dir")]
    pipelines_dir: String,
    #[serde(default = "default_connections_dir")]
    connections_dir: String,
    #[serde(default = "default_schedules_dir")]
    schedules_dir: String,
    #[serde(default)]
    runs_dir: Option<String>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            pipelines_dir: default_pipelines_dir(),
            connections_dir: default_connections_dir(),
            schedules_dir: default_schedules_dir(),
            runs_dir: None,
        }
    }
}

fn default_pipelines_dir() -> String {
    "Pipelines".to_string()
}
fn default_connections_dir() -> String {
    "Connections".to_string()
}
fn default_schedules_dir() -> String {
    "Schedules".to_string()
}

impl Settings {
    /// Default layout under `project_dir`, ignoring any settings file.
    pub fn defaults(project_dir: &Path) -> Self {
        Self::resolve(project_dir, SettingsFile::default())
    }

    fn resolve(project_dir: &Path, file: SettingsFile) -> Self {
        let join = |p: &str| project_dir.join(p);
        Self {
            project_dir: project_dir.to_path_buf(),
            pipelines_dir: join(&file.pipelines_dir),
            connections_dir: join(&file.connections_dir),
            schedules_dir: join(&file.schedules_dir),
            runs_dir: file.runs_dir.as_deref().map(join),
        }
    }
}

/// Reads `pipewright.yaml` from `project_dir` (optional), then applies
/// `PIPEWRIGHT_*_DIR` environment overrides.
#[instrument(skip(project_dir))]
pub fn load_settings(project_dir: &Path) -> Result<Settings, InfrastructureError> {
    let mut file = match find_settings_file(project_dir) {
        Some(path) => {
            info!(path = ?path, "Loading project settings");
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                SettingsFile::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        }
        None => SettingsFile::default(),
    };

    apply_env_overrides(&mut file);
    Ok(Settings::resolve(project_dir, file))
}

fn find_settings_file(root: &Path) -> Option<PathBuf> {
    SETTINGS_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.exists())
}

fn apply_env_overrides(file: &mut SettingsFile) {
    let overrides: [(&str, &mut String); 3] = [
        ("PIPEWRIGHT_PIPELINES_DIR", &mut file.pipelines_dir),
        ("PIPEWRIGHT_CONNECTIONS_DIR", &mut file.connections_dir),
        ("PIPEWRIGHT_SCHEDULES_DIR", &mut file.schedules_dir),
    ];
    for (var, slot) in overrides {
        if let Ok(val) = std::env::var(var) {
            info!(old = ?slot, new = ?val, "Overriding {} via ENV", var);
            *slot = val;
        }
    }
    if let Ok(val) = std::env::var("PIPEWRIGHT_RUNS_DIR") {
        info!(new = ?val, "Overriding runs_dir via ENV");
        file.runs_dir = Some(val);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_settings_file() {
        let settings = Settings::defaults(Path::new("/srv/etl"));
        assert_eq!(settings.pipelines_dir, PathBuf::from("/srv/etl/Pipelines"));
        assert_eq!(settings.connections_dir, PathBuf::from("/srv/etl/Connections"));
        assert_eq!(settings.schedules_dir, PathBuf::from("/srv/etl/Schedules"));
        assert_eq!(settings.runs_dir, None);
    }

    #[test]
    fn test_settings_file_is_partial() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("pipewright.yaml"),
            "pipelines_dir: jobs\nruns_dir: runs\n",
        )?;
        let file: SettingsFile =
            serde_yaml::from_str(&fs::read_to_string(dir.path().join("pipewright.yaml"))?)?;
        let settings = Settings::resolve(dir.path(), file);
        assert_eq!(settings.pipelines_dir, dir.path().join("jobs"));
        assert_eq!(settings.connections_dir, dir.path().join("Connections"));
        assert_eq!(settings.runs_dir, Some(dir.path().join("runs")));
        Ok(())
    }
}
