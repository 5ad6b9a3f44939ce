// pipewright/src/commands/mod.rs

pub mod check;
pub mod list;
pub mod run;
pub mod schedule;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use pipewright_core::PipelineManager;
use pipewright_core::infrastructure::LogNotifier;
use pipewright_core::infrastructure::config::load_settings;
use tracing::debug;

/// Loads settings and every document of the project. Failures are alerted
/// through the log.
pub fn load_manager(project_dir: &Path) -> anyhow::Result<PipelineManager> {
    let settings = load_settings(project_dir).with_context(|| {
        format!(
            "Failed to load project settings from {}",
            project_dir.display()
        )
    })?;
    let manager = PipelineManager::load(&settings, Some(Arc::new(LogNotifier)));
    debug!(
        "Loaded {} pipelines, {} schedules, {} connections",
        manager.list_pipelines().len(),
        manager.list_schedules().len(),
        manager.registry().len()
    );
    Ok(manager)
}
