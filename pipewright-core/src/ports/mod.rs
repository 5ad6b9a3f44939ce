// pipewright-core/src/ports/mod.rs

pub mod connector;
pub mod notifier;

pub use connector::Connector;
pub use notifier::{Notification, Notifier};
