// pipewright-core/src/application/pipeline.rs

use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::application::load::load;
use crate::application::notification::{Stage, failure_notification};
use crate::domain::dataset::{Dataset, Value};
use crate::domain::pipeline::{
    Backend, ConnectionConfig, LoadMode, PipelineConfig, RunStatus, TableRef,
};
use crate::domain::transform::{TransformStep, apply_all};
use crate::error::EtlError;
use crate::infrastructure::adapters::registry::ConnectorRegistry;
use crate::ports::notifier::Notifier;

/// A validated pipeline, ready to run against a registry.
pub struct Pipeline<'r> {
    config: PipelineConfig,
    mode: LoadMode,
    steps: Vec<TransformStep>,
    target: TableRef,
    registry: &'r ConnectorRegistry,
    notifier: Option<Arc<dyn Notifier>>,
}

impl<'r> Pipeline<'r> {
    /// Checks the descriptor without touching any backend. Every problem is a
    /// `ConfigError`.
    pub fn new(config: PipelineConfig, registry: &'r ConnectorRegistry) -> Result<Self, EtlError> {
        config
            .validate()
            .map_err(|e| EtlError::config(format!("Pipeline '{}': {}", config.name, e)))?;

        let mode = config.target.action.parse::<LoadMode>()?;
        let steps = config
            .transformations
            .iter()
            .map(TransformStep::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        let target = TableRef::from(&config.target);

        Ok(Self {
            config,
            mode,
            steps,
            target,
            registry,
            notifier: None,
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    /// Setup-level check: both connections resolve and their parameters are
    /// complete. No I/O.
    pub fn check(&self) -> Result<(), EtlError> {
        self.registry.validate(&self.config.source.connection_name)?;
        self.registry.validate(&self.config.target.connection_name)?;
        self.check_target()
    }

    /// SQL targets need a table name.
    fn check_target(&self) -> Result<(), EtlError> {
        let target = self.registry.get(&self.config.target.connection_name)?;
        if target.backend()?.is_sql() {
            self.target.table_name().map_err(|_| {
                EtlError::config(format!(
                    "Pipeline '{}': target connection '{}' is {} and needs a table_name",
                    self.config.name,
                    target.name,
                    target.kind
                ))
            })?;
        }
        Ok(())
    }

    /// Runs read → transform → load once. Failures are recorded in the
    /// returned status, never raised.
    #[instrument(skip(self), fields(pipeline = %self.config.name))]
    pub async fn run(&self) -> RunStatus {
        let mut status = RunStatus::start(&self.config.name);
        info!("🚀 Running pipeline '{}' ({})", self.config.name, self.mode);

        if let Err((stage, err)) = self.execute(&mut status).await {
            error!("❌ {} stage failed: {}", stage, err.tagged());
            status.fail(err.tagged());
            self.notify(stage, &err).await;
        }

        status.finish();
        info!(
            "🏁 Pipeline '{}' {}: {} rows read, {} rows written, {} ms (read {} / transform {} / write {})",
            status.pipeline,
            if status.success { "succeeded" } else { "failed" },
            status.source_rows.map_or("-".to_string(), |n| n.to_string()),
            status.target_rows.map_or("-".to_string(), |n| n.to_string()),
            status.duration_ms().unwrap_or_default(),
            status.timings.read_ms,
            status.timings.transform_ms,
            status.timings.write_ms,
        );
        status
    }

    async fn execute(&self, status: &mut RunStatus) -> Result<(), (Stage, EtlError)> {
        self.check_target().map_err(at(Stage::Setup))?;
        let mut source = self
            .registry
            .open(&self.config.source.connection_name)
            .map_err(at(Stage::Setup))?;
        let mut target = self
            .registry
            .open(&self.config.target.connection_name)
            .map_err(at(Stage::Setup))?;

        // 1. READ
        let clock = Instant::now();
        let data = source
            .read(self.config.source.query.as_deref())
            .await
            .map_err(at(Stage::Read))?;
        status.timings.read_ms = elapsed_ms(clock);
        status.source_rows = Some(data.row_count() as u64);
        drop(source);

        // 2. TRANSFORM
        let clock = Instant::now();
        let mut data = apply_all(&self.steps, data).map_err(|e| (Stage::Transform, e.into()))?;
        if self.config.add_metadata {
            data = self.add_metadata(data).map_err(at(Stage::Transform))?;
        }
        status.timings.transform_ms = elapsed_ms(clock);

        // 3. LOAD
        let clock = Instant::now();
        let written = load(target.as_mut(), self.mode, &data, &self.target)
            .await
            .map_err(at(Stage::Write))?;
        status.timings.write_ms = elapsed_ms(clock);
        status.target_rows = Some(written);
        Ok(())
    }

    /// Appends source description columns and the run timestamp.
    fn add_metadata(&self, mut data: Dataset) -> Result<Dataset, EtlError> {
        let source = self.registry.get(&self.config.source.connection_name)?;
        let backend = source.backend()?;

        data.fill_column("source_connector_name", Value::Text(source.name.clone()));
        data.fill_column("source_connector_type", Value::Text(backend.to_string()));
        for (column, value) in descriptive_columns(source, backend, &self.target) {
            data.fill_column(column, value);
        }
        data.fill_column(
            "pipeline_run_timestamp",
            Value::Timestamp(Local::now().naive_local()),
        );
        Ok(data)
    }

    async fn notify(&self, stage: Stage, err: &EtlError) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let notification = failure_notification(stage, &self.config.name, err);
        if let Err(e) = notifier.notify(&notification).await {
            warn!("⚠️ Could not deliver failure notification: {}", e);
        }
    }
}

fn descriptive_columns(
    source: &ConnectionConfig,
    backend: Backend,
    target: &TableRef,
) -> Vec<(&'static str, Value)> {
    let text = |v: &Option<String>| v.clone().map_or(Value::Null, Value::Text);
    match backend {
        Backend::Csv => vec![("table_name", text(&target.table))],
        Backend::Excel => vec![("sheet_name", text(&source.params.sheet_name))],
        b if b.is_server() => vec![
            ("database", text(&source.params.dbname)),
            ("schema", text(&source.params.schema)),
        ],
        _ => Vec::new(),
    }
}

fn at(stage: Stage) -> impl FnOnce(EtlError) -> (Stage, EtlError) {
    move |err| (stage, err)
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::connector::Connector;
    use crate::ports::notifier::Notification;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &Notification) -> Result<(), EtlError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn registry(dir: &Path) -> ConnectorRegistry {
        let docs = [
            format!("name: people_csv\ntype: CSV\nfile_path: '{}'\n", dir.join("people.csv").display()),
            format!("name: out_csv\ntype: CSV\nfile_path: '{}'\n", dir.join("out.csv").display()),
            format!("name: warehouse\ntype: SQLite\nfile_path: '{}'\n", dir.join("wh.db").display()),
        ];
        let connections: BTreeMap<String, ConnectionConfig> = docs
            .iter()
            .map(|doc| {
                let config: ConnectionConfig = serde_yaml::from_str(doc).unwrap();
                (config.name.clone(), config)
            })
            .collect();
        ConnectorRegistry::new(connections)
    }

    fn pipeline_config(yaml: &str) -> PipelineConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn seed(dir: &Path) {
        fs::write(
            dir.join("people.csv"),
            "First Name,phone\nAda,+1 (555) 010-0001\nGrace,555.010.0002\nAlan,\n",
        )
        .unwrap();
    }

    const CSV_TO_SQLITE: &str = "
name: people
source: {connection_name: people_csv}
target: {connection_name: warehouse, action: truncate_and_load, table_name: people}
transformations:
  - {type: clean_column_names}
  - {type: standardize_phone, column_name: phone}
  - {type: add_timestamp, column_name: loaded_at}
";

    #[tokio::test]
    async fn test_csv_to_sqlite_truncate_and_load() -> Result<()> {
        let dir = tempdir()?;
        seed(dir.path());
        let registry = registry(dir.path());

        let pipeline = Pipeline::new(pipeline_config(CSV_TO_SQLITE), &registry)?;
        let status = pipeline.run().await;
        assert!(status.success, "{:?}", status.errors);
        assert_eq!(status.source_rows, Some(3));
        assert_eq!(status.target_rows, Some(3));

        // Second run replaces the rows instead of doubling them
        let status = pipeline.run().await;
        assert!(status.success);

        let mut warehouse = registry.open("warehouse")?;
        let back = warehouse
            .read(Some("SELECT First_Name, phone, loaded_at FROM people ORDER BY First_Name"))
            .await?;
        assert_eq!(back.row_count(), 3);
        assert_eq!(back.row(0)[1], &Value::Text("15550100001".into()));
        assert_eq!(back.row(1)[1], &Value::Null);

        let stamps = &back.column("loaded_at").unwrap().values;
        assert!(matches!(stamps[0], Value::Timestamp(_)));
        assert!(stamps.iter().all(|v| v == &stamps[0]));
        Ok(())
    }

    #[tokio::test]
    async fn test_metadata_columns_come_last() -> Result<()> {
        let dir = tempdir()?;
        seed(dir.path());
        let registry = registry(dir.path());

        let config = pipeline_config(
            "
name: copy
add_metadata: true
source: {connection_name: people_csv}
target: {connection_name: out_csv, action: drop_and_load, table_name: people}
",
        );
        let status = Pipeline::new(config, &registry)?.run().await;
        assert!(status.success, "{:?}", status.errors);

        let mut out = registry.open("out_csv")?;
        let back = out.read(None).await?;
        assert_eq!(
            back.column_names(),
            vec![
                "First Name",
                "phone",
                "source_connector_name",
                "source_connector_type",
                "table_name",
                "pipeline_run_timestamp"
            ]
        );
        assert_eq!(back.row(0)[2], &Value::Text("people_csv".into()));
        assert_eq!(back.row(0)[3], &Value::Text("CSV".into()));
        assert_eq!(back.row(0)[4], &Value::Text("people".into()));
        Ok(())
    }

    #[tokio::test]
    async fn test_failures_are_recorded_and_notified() -> Result<()> {
        let dir = tempdir()?;
        let registry = registry(dir.path());
        let notifier = Arc::new(RecordingNotifier::default());

        // people.csv was never written
        let pipeline = Pipeline::new(pipeline_config(CSV_TO_SQLITE), &registry)?
            .with_notifier(notifier.clone());
        let status = pipeline.run().await;

        assert!(!status.success);
        assert!(status.errors[0].starts_with("ConnectionError: "));
        assert!(status.finished_at.is_some());

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Pipeline Failure Alert - Read");
        assert!(sent[0].body.starts_with("Read failed in pipeline people: ConnectionError"));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_connection_is_not_found() -> Result<()> {
        let dir = tempdir()?;
        let registry = registry(dir.path());
        let config = pipeline_config(
            "
name: lost
source: {connection_name: people_csv}
target: {connection_name: nowhere, action: append, table_name: t}
",
        );
        let pipeline = Pipeline::new(config, &registry)?;
        assert_eq!(pipeline.check().unwrap_err().tag(), "NotFoundError");

        let status = pipeline.run().await;
        assert!(!status.success);
        assert_eq!(status.errors, vec!["NotFoundError: Connection 'nowhere' not found"]);
        // Nothing was read: connectors are resolved first
        assert_eq!(status.source_rows, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_sql_target_without_table_fails_before_reading() -> Result<()> {
        let dir = tempdir()?;
        seed(dir.path());
        let registry = registry(dir.path());
        let config = pipeline_config(
            "
name: untitled
source: {connection_name: people_csv}
target: {connection_name: warehouse, action: truncate_and_load}
",
        );
        let pipeline = Pipeline::new(config, &registry)?;
        assert_eq!(pipeline.check().unwrap_err().tag(), "ConfigError");

        let status = pipeline.run().await;
        assert!(!status.success);
        assert!(status.errors[0].starts_with("ConfigError: "), "{:?}", status.errors);
        assert_eq!(status.source_rows, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_target_with_other_columns() -> Result<()> {
        let dir = tempdir()?;
        seed(dir.path());
        let registry = registry(dir.path());
        let out = dir.path().join("out.csv");
        fs::write(&out, "a,b,c\n1,2,3\n")?;

        let append = pipeline_config(
            "
name: add
source: {connection_name: people_csv}
target: {connection_name: out_csv, action: append}
",
        );
        let status = Pipeline::new(append, &registry)?.run().await;
        assert!(status.errors[0].starts_with("SchemaError: "), "{:?}", status.errors);
        assert_eq!(fs::read_to_string(&out)?, "a,b,c\n1,2,3\n");

        let reload = pipeline_config(
            "
name: reload
source: {connection_name: people_csv}
target: {connection_name: out_csv, action: truncate_and_load}
",
        );
        let status = Pipeline::new(reload, &registry)?.run().await;
        assert!(status.success, "{:?}", status.errors);

        let back = registry.open("out_csv")?.read(None).await?;
        assert_eq!(back.column_names(), vec!["First Name", "phone"]);
        assert_eq!(back.row_count(), 3);
        Ok(())
    }

    #[test]
    fn test_setup_errors_are_config_errors() {
        let dir = tempdir().unwrap();
        let registry = registry(dir.path());
        for yaml in [
            "name: p\nsource: {connection_name: a}\ntarget: {connection_name: b, action: upsert}\n",
            "name: p\nsource: {connection_name: a}\ntarget: {connection_name: b, action: append}\ntransformations: [{type: pivot}]\n",
            "name: p\nsource: {connection_name: a}\ntarget: {connection_name: b, action: append}\ntransformations: [{type: compute_column, new_column: x, formula: 'a +'}]\n",
            "name: ''\nsource: {connection_name: a}\ntarget: {connection_name: b, action: append}\n",
        ] {
            let err = Pipeline::new(pipeline_config(yaml), &registry).err().unwrap();
            assert_eq!(err.tag(), "ConfigError", "{}", yaml);
        }
    }
}
