// pipewright-core/src/ports/notifier.rs

use crate::error::EtlError;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// Receives failure alerts. Delivery (mail, chat, pager) is up to the
/// implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), EtlError>;
}
