// pipewright-core/src/domain/pipeline/mod.rs

pub mod connection;
pub mod descriptor;
pub mod load_mode;
pub mod status;

pub use connection::{Backend, ConnectionConfig, ConnectionParams};
pub use descriptor::{PipelineConfig, ScheduleConfig, SourceConfig, TargetConfig};
pub use load_mode::{LoadMode, TableRef, WriteMode};
pub use status::{RunStatus, StageTimings};
