// pipewright-core/src/infrastructure/config/pipeline.rs

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use super::documents::load_documents;
use crate::domain::pipeline::PipelineConfig;

/// Enabled pipeline documents keyed by name.
#[instrument]
pub fn load_pipelines(dir: &Path) -> BTreeMap<String, PipelineConfig> {
    let mut pipelines = BTreeMap::new();
    for (path, config) in load_documents::<PipelineConfig>(dir) {
        if let Err(e) = config.validate() {
            error!(path = ?path, "Skipping invalid pipeline: {}", e);
            continue;
        }
        if !config.enabled {
            debug!("Pipeline '{}' is disabled", config.name);
            continue;
        }
        if let Some(previous) = pipelines.insert(config.name.clone(), config) {
            warn!(path = ?path, "Pipeline '{}' defined twice, keeping the last one", previous.name);
        }
    }
    info!("📦 Loaded {} pipeline(s)", pipelines.len());
    pipelines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    const DOC: &str = "
source: {connection_name: src}
target: {connection_name: dst, action: append, table_name: t}
";

    #[test]
    fn test_disabled_pipelines_are_filtered() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.yaml"), format!("name: active{}", DOC))?;
        fs::write(
            dir.path().join("b.yaml"),
            format!("name: paused\nenabled: false{}", DOC),
        )?;
        fs::write(dir.path().join("c.yaml"), DOC)?;

        let pipelines = load_pipelines(dir.path());
        assert_eq!(pipelines.keys().collect::<Vec<_>>(), vec!["active"]);
        Ok(())
    }
}
