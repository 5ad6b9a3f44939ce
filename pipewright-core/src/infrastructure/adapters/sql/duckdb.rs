// pipewright-core/src/infrastructure/adapters/sql/duckdb.rs

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::{Config, Connection, params_from_iter};
use std::path::PathBuf;

use super::{SqlConnector, SqlDriver, collect_rows};
use crate::domain::dataset::{DataType, Dataset, Value};
use crate::domain::pipeline::{Backend, ConnectionConfig};
use crate::domain::sql::SqlParam;
use crate::error::EtlError;
use crate::infrastructure::error::InfrastructureError;

pub type DuckDbConnector = SqlConnector<DuckDbDriver>;

#[derive(Debug, Clone)]
pub struct DuckDbSettings {
    /// Database file, or `:memory:`.
    pub path: PathBuf,
}

pub struct DuckDbDriver {
    conn: Connection,
}

#[async_trait]
impl SqlDriver for DuckDbDriver {
    type Settings = DuckDbSettings;

    fn settings(config: &ConnectionConfig, _backend: Backend) -> Result<DuckDbSettings, EtlError> {
        let path = config.require(&config.params.file_path, "file_path")?.clone();
        Ok(DuckDbSettings { path })
    }

    async fn connect(settings: &DuckDbSettings) -> Result<Self, EtlError> {
        let config = Config::default();
        let conn = if settings.path.as_os_str() == ":memory:" {
            Connection::open_in_memory_with_flags(config)
        } else {
            Connection::open_with_flags(&settings.path, config)
        }
        .map_err(|e| {
            InfrastructureError::connection(format!(
                "cannot open DuckDB database {:?}: {}",
                settings.path, e
            ))
        })?;
        Ok(Self { conn })
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Dataset, EtlError> {
        let mut stmt = self.conn.prepare(sql).map_err(InfrastructureError::query)?;
        let mut rows = stmt
            .query(params_from_iter(params.iter().map(bind)))
            .map_err(InfrastructureError::query)?;

        // Column metadata is only available once the statement has run
        let names: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();
        let width = names.len();

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(InfrastructureError::query)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let cell: DuckValue = row.get(i).map_err(InfrastructureError::query)?;
                values.push(decode(cell));
            }
            out.push(values);
        }
        collect_rows(names, out)
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, EtlError> {
        let changed = self
            .conn
            .execute(sql, params_from_iter(params.iter().map(bind)))
            .map_err(InfrastructureError::query)?;
        Ok(changed as u64)
    }
}

fn bind(param: &SqlParam) -> DuckValue {
    if param.value.is_null() {
        return DuckValue::Null;
    }
    let bound = match param.ty {
        DataType::Integer => param.to_i64().map(DuckValue::BigInt),
        DataType::Float => param.to_f64().map(DuckValue::Double),
        DataType::Boolean => param.to_bool().map(DuckValue::Boolean),
        DataType::Timestamp => param.to_timestamp().map(|ts| {
            DuckValue::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
        }),
        DataType::Text => None,
    };
    bound
        .or_else(|| param.to_text().map(DuckValue::Text))
        .unwrap_or(DuckValue::Null)
}

fn decode(cell: DuckValue) -> Value {
    match cell {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Boolean(b),
        DuckValue::TinyInt(i) => Value::Integer(i64::from(i)),
        DuckValue::SmallInt(i) => Value::Integer(i64::from(i)),
        DuckValue::Int(i) => Value::Integer(i64::from(i)),
        DuckValue::BigInt(i) => Value::Integer(i),
        DuckValue::UTinyInt(i) => Value::Integer(i64::from(i)),
        DuckValue::USmallInt(i) => Value::Integer(i64::from(i)),
        DuckValue::UInt(i) => Value::Integer(i64::from(i)),
        DuckValue::UBigInt(i) => i64::try_from(i).map_or(Value::Float(i as f64), Value::Integer),
        DuckValue::HugeInt(i) => i64::try_from(i).map_or(Value::Float(i as f64), Value::Integer),
        DuckValue::Float(x) => Value::Float(f64::from(x)),
        DuckValue::Double(x) => Value::Float(x),
        DuckValue::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map_or_else(|_| Value::Text(d.to_string()), Value::Float),
        DuckValue::Timestamp(unit, raw) => DateTime::from_timestamp_micros(unit.to_micros(raw))
            .map_or(Value::Null, |dt| Value::Timestamp(dt.naive_utc())),
        DuckValue::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| {
                if days >= 0 {
                    epoch.checked_add_days(Days::new(days.unsigned_abs().into()))
                } else {
                    epoch.checked_sub_days(Days::new(days.unsigned_abs().into()))
                }
            })
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(Value::Null, Value::Timestamp),
        DuckValue::Text(s) => Value::Text(s),
        DuckValue::Blob(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
        other => Value::Text(format!("{:?}", other)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::pipeline::{TableRef, WriteMode};
    use crate::ports::connector::Connector;
    use anyhow::Result;

    fn memory() -> DuckDbConnector {
        let config: ConnectionConfig =
            serde_yaml::from_str("name: mem\ntype: DuckDB\nfile_path: ':memory:'\n").unwrap();
        DuckDbConnector::from_config(&config).unwrap()
    }

    fn sample() -> Dataset {
        Dataset::from_rows(
            vec!["id".into(), "label".into(), "ok".into()],
            vec![
                vec![Value::Integer(1), "a".into(), Value::Boolean(true)],
                vec![Value::Integer(2), Value::Null, Value::Boolean(false)],
                vec![Value::Integer(3), "c".into(), Value::Null],
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_schema_qualified_round_trip() -> Result<()> {
        let mut conn = memory();
        let target = TableRef::table("events").with_schema("main");

        assert!(!conn.table_exists(&target).await?);
        conn.write(&sample(), &target, WriteMode::Append).await?;
        assert!(conn.table_exists(&target).await?);
        assert!(conn.table_exists(&TableRef::table("events")).await?);

        let back = conn.read(Some("SELECT * FROM main.events ORDER BY id")).await?;
        assert_eq!(back, sample());
        Ok(())
    }

    #[tokio::test]
    async fn test_truncate_uses_delete() -> Result<()> {
        let mut conn = memory();
        let target = TableRef::table("events");
        conn.write(&sample(), &target, WriteMode::Append).await?;
        conn.truncate(&target).await?;
        assert_eq!(conn.row_count(&target).await?, Some(0));
        assert!(conn.table_exists(&target).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_twice_leaves_one_copy() -> Result<()> {
        let mut conn = memory();
        let target = TableRef::table("events");
        conn.write(&sample(), &target, WriteMode::Replace).await?;
        conn.write(&sample(), &target, WriteMode::Replace).await?;
        assert_eq!(conn.row_count(&target).await?, Some(3));
        Ok(())
    }
}
