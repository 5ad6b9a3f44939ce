// pipewright-core/src/domain/transform/mod.rs

pub mod columns;
pub mod expression;

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::dataset::{Dataset, Value};
use crate::domain::error::DomainError;
use columns::{NameStyle, clean_name, digits_only, format_name};
use expression::Expression;

/// Raw `{type, ...params}` entry of a pipeline's `transformations` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

impl TransformationConfig {
    fn param(&self, keys: &[&str]) -> Result<String, DomainError> {
        for key in keys {
            match self.params.get(*key) {
                Some(serde_yaml::Value::String(s)) => return Ok(s.clone()),
                Some(serde_yaml::Value::Number(n)) => return Ok(n.to_string()),
                Some(serde_yaml::Value::Bool(b)) => return Ok(b.to_string()),
                Some(serde_yaml::Value::Null) | None => continue,
                Some(_) => {
                    return Err(DomainError::Config(format!(
                        "parameter '{}' of transformation '{}' must be a scalar",
                        key, self.kind
                    )));
                }
            }
        }
        Err(DomainError::Config(format!(
            "transformation '{}' is missing required parameter '{}'",
            self.kind, keys[0]
        )))
    }
}

/// One declarative mutation of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformStep {
    AddTimestamp { column: String },
    RenameColumn { old: String, new: String },
    NormalizePhone { column: String },
    ComputeColumn { column: String, expression: Expression },
    CleanColumnNames,
    ReformatColumnNames { style: NameStyle },
}

impl TransformStep {
    /// Builds a step from its YAML form. Every problem is a `Config` error,
    /// including formula syntax errors.
    pub fn from_config(config: &TransformationConfig) -> Result<Self, DomainError> {
        match config.kind.as_str() {
            "add_timestamp" => Ok(Self::AddTimestamp {
                column: config.param(&["column_name"])?,
            }),
            "rename_column" => Ok(Self::RenameColumn {
                old: config.param(&["old_name"])?,
                new: config.param(&["new_name"])?,
            }),
            "normalize_phone" | "standardize_phone" => Ok(Self::NormalizePhone {
                column: config.param(&["column_name"])?,
            }),
            "compute_column" | "calculate_value" => {
                let column = config.param(&["new_column"])?;
                let formula = config.param(&["formula", "expression"])?;
                let expression = Expression::parse(&formula).map_err(|e| {
                    DomainError::Config(format!(
                        "invalid formula for column '{}': {}",
                        column,
                        e.message()
                    ))
                })?;
                Ok(Self::ComputeColumn { column, expression })
            }
            "clean_column_names" => Ok(Self::CleanColumnNames),
            "format_column_names" => {
                let raw = config.param(&["format_type"])?;
                let style = raw.parse::<NameStyle>().map_err(DomainError::Config)?;
                Ok(Self::ReformatColumnNames { style })
            }
            other => Err(DomainError::Config(format!(
                "Unknown transformation type: '{}'",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AddTimestamp { .. } => "add_timestamp",
            Self::RenameColumn { .. } => "rename_column",
            Self::NormalizePhone { .. } => "normalize_phone",
            Self::ComputeColumn { .. } => "compute_column",
            Self::CleanColumnNames => "clean_column_names",
            Self::ReformatColumnNames { .. } => "format_column_names",
        }
    }

    pub fn apply(&self, data: Dataset) -> Result<Dataset, DomainError> {
        self.apply_at(data, Local::now().naive_local())
    }

    /// Same as [`apply`](Self::apply) with a fixed clock for `add_timestamp`.
    pub fn apply_at(&self, mut data: Dataset, now: NaiveDateTime) -> Result<Dataset, DomainError> {
        match self {
            Self::AddTimestamp { column } => {
                data.fill_column(column, Value::Timestamp(now));
            }
            Self::RenameColumn { old, new } => {
                data.rename_column(old, new)?;
            }
            Self::NormalizePhone { column } => {
                let target = data.column_mut(column).ok_or_else(|| {
                    DomainError::Schema(format!(
                        "column '{}' not found for phone normalization",
                        column
                    ))
                })?;
                for value in &mut target.values {
                    if !value.is_null() {
                        *value = Value::Text(digits_only(&value.to_string()));
                    }
                }
            }
            Self::ComputeColumn { column, expression } => {
                let values = expression.evaluate(&data)?;
                data.set_column(column, values)?;
            }
            Self::CleanColumnNames => data.rename_all(clean_name),
            Self::ReformatColumnNames { style } => {
                let style = *style;
                data.rename_all(|name| format_name(name, style));
            }
        }
        Ok(data)
    }
}

/// Applies `steps` in order, stopping at the first failure.
pub fn apply_all(steps: &[TransformStep], data: Dataset) -> Result<Dataset, DomainError> {
    steps.iter().try_fold(data, |data, step| step.apply(data))
}
