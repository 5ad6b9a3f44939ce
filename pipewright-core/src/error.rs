// pipewright-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum EtlError {
    // --- DOMAIN ERRORS (schema, expressions, lookups) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (drivers, files, parsing) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    Internal(String),
}

impl EtlError {
    /// Taxonomy tag used to prefix messages recorded in a run summary.
    pub fn tag(&self) -> &'static str {
        match self {
            EtlError::Domain(e) => e.tag(),
            EtlError::Infrastructure(e) => e.tag(),
            EtlError::Internal(_) => "InternalError",
        }
    }

    /// `"<Tag>: <message>"`, the form stored in `RunStatus::errors`.
    pub fn tagged(&self) -> String {
        let message = match self {
            EtlError::Domain(e) => e.message().to_string(),
            EtlError::Infrastructure(e) => e.message(),
            EtlError::Internal(m) => m.clone(),
        };
        format!("{}: {}", self.tag(), message)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        EtlError::Domain(DomainError::Config(msg.into()))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        EtlError::Domain(DomainError::NotFound(msg.into()))
    }
}

// Manual implementation so `?` works directly on std::io calls
impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::Infrastructure(InfrastructureError::Io(err))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_follow_the_taxonomy() {
        assert_eq!(EtlError::config("x").tag(), "ConfigError");
        assert_eq!(EtlError::not_found("x").tag(), "NotFoundError");
        assert_eq!(
            EtlError::from(InfrastructureError::Query("bad".into())).tag(),
            "QueryError"
        );
        assert_eq!(
            EtlError::from(std::io::Error::other("disk")).tag(),
            "IoError"
        );
    }

    #[test]
    fn test_tagged_message() {
        let err = EtlError::not_found("Connection 'warehouse' not found");
        assert_eq!(
            err.tagged(),
            "NotFoundError: Connection 'warehouse' not found"
        );

        let err = EtlError::from(InfrastructureError::Query("no such table: t".into()));
        assert_eq!(err.tagged(), "QueryError: no such table: t");
    }
}
