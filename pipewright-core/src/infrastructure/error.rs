// pipewright-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- BACKENDS ---
    #[error("Connection Error: {0}")]
    #[diagnostic(
        code(pipewright::infra::connection),
        help("Check host, port, credentials and that the file or server is reachable.")
    )]
    Connection(String),

    #[error("Query Error: {0}")]
    #[diagnostic(
        code(pipewright::infra::query),
        help("The backend rejected the statement.")
    )]
    Query(String),

    #[error("Format Error: {0}")]
    #[diagnostic(
        code(pipewright::infra::format),
        help("Check the delimiter, encoding and sheet settings of the connection.")
    )]
    Format(String),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(pipewright::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(pipewright::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON Serialization Error: {0}")]
    #[diagnostic(code(pipewright::infra::json))]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(pipewright::infra::config))]
    Config(String),
}

impl InfrastructureError {
    pub fn tag(&self) -> &'static str {
        match self {
            InfrastructureError::Connection(_) => "ConnectionError",
            InfrastructureError::Query(_) => "QueryError",
            InfrastructureError::Format(_) => "FormatError",
            InfrastructureError::Io(_) => "IoError",
            InfrastructureError::Yaml(_) | InfrastructureError::Config(_) => "ConfigError",
            InfrastructureError::Json(_) => "FormatError",
        }
    }

    pub fn message(&self) -> String {
        match self {
            InfrastructureError::Connection(m)
            | InfrastructureError::Query(m)
            | InfrastructureError::Format(m)
            | InfrastructureError::Config(m) => m.clone(),
            InfrastructureError::Io(e) => e.to_string(),
            InfrastructureError::Yaml(e) => e.to_string(),
            InfrastructureError::Json(e) => e.to_string(),
        }
    }

    pub fn connection(err: impl std::fmt::Display) -> Self {
        InfrastructureError::Connection(err.to_string())
    }

    pub fn query(err: impl std::fmt::Display) -> Self {
        InfrastructureError::Query(err.to_string())
    }

    pub fn format(err: impl std::fmt::Display) -> Self {
        InfrastructureError::Format(err.to_string())
    }
}
