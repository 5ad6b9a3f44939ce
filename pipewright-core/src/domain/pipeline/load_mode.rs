// pipewright-core/src/domain/pipeline/load_mode.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::descriptor::TargetConfig;
use crate::domain::error::DomainError;

/// How a pipeline's target is prepared before rows are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    Append,
    TruncateAndLoad,
    DropAndLoad,
}

impl FromStr for LoadMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "append" => Ok(LoadMode::Append),
            "truncate_and_load" => Ok(LoadMode::TruncateAndLoad),
            "drop_and_load" => Ok(LoadMode::DropAndLoad),
            other => Err(DomainError::Config(format!(
                "Unsupported target action '{}' (expected append, truncate_and_load or drop_and_load)",
                other
            ))),
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadMode::Append => "append",
            LoadMode::TruncateAndLoad => "truncate_and_load",
            LoadMode::DropAndLoad => "drop_and_load",
        };
        write!(f, "{}", s)
    }
}

/// Write primitive offered by connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Add rows, creating the table (or file) if needed.
    Append,
    /// Discard existing content and its structure, then write.
    Replace,
}

/// Where a connector writes: a table for SQL backends, a sheet region for
/// spreadsheets. CSV targets only use it for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub sheet: Option<String>,
    pub start_row: u32,
    pub start_column: u16,
}

impl TableRef {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            table: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Table name, required by SQL backends.
    pub fn table_name(&self) -> Result<&str, DomainError> {
        self.table
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DomainError::Config("target table_name is required".to_string()))
    }
}

impl From<&TargetConfig> for TableRef {
    fn from(target: &TargetConfig) -> Self {
        Self {
            schema: target.schema_name.clone(),
            table: target.table_name.clone(),
            sheet: target.sheet_name.clone(),
            start_row: target.start_row.unwrap_or(0),
            start_column: target.start_column.unwrap_or(0),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.schema, &self.table, &self.sheet) {
            (Some(schema), Some(table), _) => write!(f, "{}.{}", schema, table),
            (None, Some(table), _) => write!(f, "{}", table),
            (_, None, Some(sheet)) => write!(f, "sheet '{}'", sheet),
            _ => write!(f, "<file>"),
        }
    }
}
