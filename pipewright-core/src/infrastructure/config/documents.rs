// pipewright-core/src/infrastructure/config/documents.rs

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::infrastructure::error::InfrastructureError;

/// Parses every `*.yaml` / `*.yml` file directly under `dir`, in file name
/// order. Unreadable or malformed documents are logged and skipped; a missing
/// directory yields nothing.
pub fn load_documents<T: DeserializeOwned>(dir: &Path) -> Vec<(PathBuf, T)> {
    if !dir.exists() {
        warn!(dir = ?dir, "Directory not found, no documents loaded");
        return Vec::new();
    }

    let mut docs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_yaml(e.path()))
    {
        let path = entry.into_path();
        match parse_document::<T>(&path) {
            Ok(doc) => {
                debug!(path = ?path, "Loaded document");
                docs.push((path, doc));
            }
            Err(e) => error!(path = ?path, "Skipping document: {}", e),
        }
    }
    docs
}

pub fn parse_document<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
