// pipewright-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod config;
pub mod error;
pub mod fs;
pub mod notifier;

pub use adapters::registry::ConnectorRegistry;
pub use notifier::LogNotifier;
