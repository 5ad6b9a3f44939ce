// pipewright-core/src/infrastructure/config/mod.rs

pub mod connection;
pub mod documents;
pub mod pipeline;
pub mod schedule;
pub mod settings;

pub use connection::load_connections;
pub use pipeline::load_pipelines;
pub use schedule::load_schedules;
pub use settings::{Settings, load_settings};
