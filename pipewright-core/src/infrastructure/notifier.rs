// pipewright-core/src/infrastructure/notifier.rs

use crate::error::EtlError;
use crate::ports::notifier::{Notification, Notifier};
use async_trait::async_trait;
use tracing::error;

/// Default notifier: writes the alert to the log at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), EtlError> {
        error!(
            subject = %notification.subject,
            "🔔 {}",
            notification.body
        );
        Ok(())
    }
}
