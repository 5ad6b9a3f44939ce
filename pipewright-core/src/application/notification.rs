// pipewright-core/src/application/notification.rs

use crate::error::EtlError;
use crate::ports::notifier::Notification;

/// Stage of a run, as named in failure alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Read,
    Transform,
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Setup => "Setup",
            Stage::Read => "Read",
            Stage::Transform => "Transform",
            Stage::Write => "Write",
        };
        write!(f, "{}", s)
    }
}

pub fn failure_notification(stage: Stage, pipeline: &str, err: &EtlError) -> Notification {
    Notification {
        subject: format!("Pipeline Failure Alert - {}", stage),
        body: format!("{} failed in pipeline {}: {}", stage, pipeline, err.tagged()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_notification_text() {
        let err = EtlError::config("no query");
        let n = failure_notification(Stage::Read, "orders", &err);
        assert_eq!(n.subject, "Pipeline Failure Alert - Read");
        assert_eq!(n.body, "Read failed in pipeline orders: ConfigError: no query");
    }
}
