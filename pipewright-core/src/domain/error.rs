// pipewright-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Configuration Error: {0}")]
    #[diagnostic(
        code(pipewright::domain::config),
        help("Check the pipeline and connection YAML documents.")
    )]
    Config(String),

    #[error("{0}")]
    #[diagnostic(code(pipewright::domain::not_found))]
    NotFound(String),

    #[error("Schema Error: {0}")]
    #[diagnostic(
        code(pipewright::domain::schema),
        help("A transformation references a column the dataset does not have.")
    )]
    Schema(String),

    #[error("Expression Error: {0}")]
    #[diagnostic(
        code(pipewright::domain::expression),
        help("Formulas support numeric columns, + - * / // % **, comparisons, and/or/not.")
    )]
    Expression(String),

    #[error("Validation Error: {0}")]
    #[diagnostic(code(pipewright::domain::validation))]
    Validation(String),
}

impl DomainError {
    pub fn tag(&self) -> &'static str {
        match self {
            DomainError::Config(_) => "ConfigError",
            DomainError::NotFound(_) => "NotFoundError",
            DomainError::Schema(_) => "SchemaError",
            DomainError::Expression(_) => "ExpressionError",
            DomainError::Validation(_) => "ValidationError",
        }
    }

    /// The bare message, without the display prefix.
    pub fn message(&self) -> &str {
        match self {
            DomainError::Config(m)
            | DomainError::NotFound(m)
            | DomainError::Schema(m)
            | DomainError::Expression(m)
            | DomainError::Validation(m) => m,
        }
    }
}
