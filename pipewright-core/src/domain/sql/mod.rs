// pipewright-core/src/domain/sql/mod.rs

mod dialect;

pub use dialect::Dialect;

use chrono::NaiveDateTime;

use crate::domain::dataset::{DataType, Value, parse_timestamp};

/// A bound parameter. The type travels with the value so drivers can bind
/// `NULL` with the column's type.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    pub value: Value,
    pub ty: DataType,
}

impl SqlParam {
    pub fn new(value: Value, ty: DataType) -> Self {
        Self { value, ty }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::new(Value::Text(s.into()), DataType::Text)
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

// Coercions used by drivers that bind by declared type. A value that does not
// fit the column type falls back to its text form or to NULL.
impl SqlParam {
    pub fn to_text(&self) -> Option<String> {
        match &self.value {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        match &self.value {
            Value::Integer(i) => Some(*i),
            Value::Boolean(b) => Some(i64::from(*b)),
            Value::Float(x) if x.fract() == 0.0 => Some(*x as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match &self.value {
            Value::Text(s) => s.trim().parse().ok(),
            other => other.as_f64(),
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match &self.value {
            Value::Boolean(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn to_timestamp(&self) -> Option<NaiveDateTime> {
        match &self.value {
            Value::Timestamp(ts) => Some(*ts),
            Value::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercions_follow_declared_type() {
        let p = SqlParam::new(Value::Integer(3), DataType::Float);
        assert_eq!(p.to_f64(), Some(3.0));
        assert_eq!(p.to_text(), Some("3".to_string()));

        let null = SqlParam::new(Value::Null, DataType::Timestamp);
        assert_eq!(null.to_timestamp(), None);
        assert_eq!(null.to_text(), None);

        assert_eq!(SqlParam::text("2024-01-02").to_timestamp().map(|t| t.to_string()),
            Some("2024-01-02 00:00:00".to_string()));
    }
}
