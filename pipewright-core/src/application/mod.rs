// pipewright-core/src/application/mod.rs

pub mod load;
pub mod manager;
pub mod notification;
pub mod pipeline;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI write `use pipewright_core::application::{PipelineManager, Pipeline};`
// without knowing the file layout.

pub use load::load;
pub use manager::PipelineManager;
pub use notification::{Stage, failure_notification};
pub use pipeline::Pipeline;
