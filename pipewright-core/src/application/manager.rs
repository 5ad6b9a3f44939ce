// pipewright-core/src/application/manager.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::application::pipeline::Pipeline;
use crate::domain::pipeline::{PipelineConfig, RunStatus, ScheduleConfig};
use crate::domain::transform::columns::clean_name;
use crate::error::EtlError;
use crate::infrastructure::adapters::registry::ConnectorRegistry;
use crate::infrastructure::config::{Settings, load_connections, load_pipelines, load_schedules};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;
use crate::ports::notifier::Notifier;

/// Every pipeline, connection and schedule of one project, runnable by name.
pub struct PipelineManager {
    registry: ConnectorRegistry,
    pipelines: BTreeMap<String, PipelineConfig>,
    schedules: BTreeMap<String, ScheduleConfig>,
    runs_dir: Option<PathBuf>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl PipelineManager {
    /// Loads all documents named by `settings`. Unreadable documents are
    /// logged and skipped.
    #[instrument(skip_all, fields(project = ?settings.project_dir))]
    pub fn load(settings: &Settings, notifier: Option<Arc<dyn Notifier>>) -> Self {
        let registry = ConnectorRegistry::new(load_connections(&settings.connections_dir));
        let pipelines = load_pipelines(&settings.pipelines_dir);
        let schedules = load_schedules(&settings.schedules_dir);
        Self::from_parts(registry, pipelines, schedules, notifier)
            .with_runs_dir(settings.runs_dir.clone())
    }

    pub fn from_parts(
        registry: ConnectorRegistry,
        pipelines: BTreeMap<String, PipelineConfig>,
        schedules: BTreeMap<String, ScheduleConfig>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            registry,
            pipelines,
            schedules,
            runs_dir: None,
            notifier,
        }
    }

    /// Persists each run summary as JSON under `dir`.
    pub fn with_runs_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.runs_dir = dir;
        self
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    pub fn list_pipelines(&self) -> Vec<String> {
        self.pipelines.keys().cloned().collect()
    }

    pub fn list_schedules(&self) -> Vec<String> {
        self.schedules.keys().cloned().collect()
    }

    /// Builds the named pipeline without running it.
    pub fn pipeline(&self, name: &str) -> Result<Pipeline<'_>, EtlError> {
        let config = self.pipelines.get(name).ok_or_else(|| {
            let err = EtlError::not_found(format!("Pipeline '{}' not found", name));
            error!("❌ {}", err.tagged());
            err
        })?;
        let pipeline = Pipeline::new(config.clone(), &self.registry)?;
        Ok(match &self.notifier {
            Some(notifier) => pipeline.with_notifier(notifier.clone()),
            None => pipeline,
        })
    }

    /// Runs one pipeline. `Err` means it could not be set up; a run that
    /// started and failed is `Ok` with `success == false`.
    #[instrument(skip(self))]
    pub async fn run_pipeline(&self, name: &str) -> Result<RunStatus, EtlError> {
        let pipeline = self.pipeline(name)?;
        let status = pipeline.run().await;
        self.persist(&status);
        Ok(status)
    }

    /// Runs the pipelines of a schedule in order. Unknown pipelines are
    /// logged and skipped; a failing pipeline does not stop the others.
    #[instrument(skip(self))]
    pub async fn run_schedule(&self, name: &str) -> Result<Vec<RunStatus>, EtlError> {
        let schedule = self
            .schedules
            .get(name)
            .ok_or_else(|| EtlError::not_found(format!("Schedule '{}' not found", name)))?;
        info!(
            "🗓️  Running schedule '{}' ({} pipelines)",
            name,
            schedule.pipelines.len()
        );

        let mut statuses = Vec::with_capacity(schedule.pipelines.len());
        for pipeline in &schedule.pipelines {
            match self.run_pipeline(pipeline).await {
                Ok(status) => statuses.push(status),
                Err(e) => warn!("⚠️ Skipping '{}' in schedule '{}': {}", pipeline, name, e.tagged()),
            }
        }

        let failed = statuses.iter().filter(|s| !s.success).count();
        info!(
            "🏁 Schedule '{}' done: {} run, {} failed",
            name,
            statuses.len(),
            failed
        );
        Ok(statuses)
    }

    fn persist(&self, status: &RunStatus) {
        let Some(dir) = &self.runs_dir else {
            return;
        };
        if let Err(e) = write_run_summary(dir, status) {
            warn!("⚠️ Could not save run summary: {}", e);
        }
    }
}

fn write_run_summary(dir: &Path, status: &RunStatus) -> Result<PathBuf, InfrastructureError> {
    // Pipeline names may hold path separators
    let stem = match clean_name(&status.pipeline) {
        s if s.is_empty() => "pipeline".to_string(),
        s => s,
    };
    let file = dir.join(format!(
        "{}_{}.json",
        stem,
        status.started_at.format("%Y%m%dT%H%M%S%.3f")
    ));
    let json = serde_json::to_string_pretty(status)?;
    atomic_write(&file, json)?;
    Ok(file)
}
