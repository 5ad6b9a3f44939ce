// pipewright-core/src/domain/pipeline/descriptor.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::transform::TransformationConfig;

/// One pipeline document.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    #[validate(length(min = 1, message = "pipeline name cannot be empty"))]
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Appends source and run metadata columns before the write.
    #[serde(default)]
    pub add_metadata: bool,

    #[validate(nested)]
    pub source: SourceConfig,

    #[validate(nested)]
    pub target: TargetConfig,

    #[serde(default)]
    pub transformations: Vec<TransformationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SourceConfig {
    #[validate(length(min = 1, message = "source connection_name cannot be empty"))]
    pub connection_name: String,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TargetConfig {
    #[validate(length(min = 1, message = "target connection_name cannot be empty"))]
    pub connection_name: String,

    /// `append`, `truncate_and_load` or `drop_and_load`.
    #[validate(length(min = 1, message = "target action cannot be empty"))]
    pub action: String,

    pub schema_name: Option<String>,
    pub table_name: Option<String>,

    // Spreadsheet placement
    pub sheet_name: Option<String>,
    pub start_row: Option<u32>,
    pub start_column: Option<u16>,
}

/// One schedule document: pipelines run in the listed order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub name: Option<String>,
    #[serde(default)]
    pub pipelines: Vec<String>,
}

fn default_enabled() -> bool {
    true
}
