// pipewright-core/src/domain/pipeline/status.rs

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub read_ms: u64,
    pub transform_ms: u64,
    pub write_ms: u64,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub pipeline: String,
    pub success: bool,
    pub source_rows: Option<u64>,
    pub target_rows: Option<u64>,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub timings: StageTimings,
    /// `"<Tag>: <message>"` entries, in the order they happened.
    pub errors: Vec<String>,
}

impl RunStatus {
    pub fn start(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            success: false,
            source_rows: None,
            target_rows: None,
            started_at: Local::now(),
            finished_at: None,
            timings: StageTimings::default(),
            errors: Vec::new(),
        }
    }

    pub fn fail(&mut self, message: String) {
        self.success = false;
        self.errors.push(message);
    }

    pub fn finish(&mut self) {
        self.success = self.errors.is_empty();
        self.finished_at = Some(Local::now());
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
