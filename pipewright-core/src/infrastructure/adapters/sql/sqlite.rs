// pipewright-core/src/infrastructure/adapters/sql/sqlite.rs

use async_trait::async_trait;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use std::path::PathBuf;

use super::{SqlConnector, SqlDriver, collect_rows};
use crate::domain::dataset::{DataType, Dataset, TIMESTAMP_FORMAT, Value, parse_timestamp};
use crate::domain::pipeline::{Backend, ConnectionConfig};
use crate::domain::sql::SqlParam;
use crate::error::EtlError;
use crate::infrastructure::error::InfrastructureError;

pub type SqliteConnector = SqlConnector<SqliteDriver>;

#[derive(Debug, Clone)]
pub struct SqliteSettings {
    /// Database file, or `:memory:`.
    pub path: PathBuf,
}

pub struct SqliteDriver {
    conn: Connection,
}

#[async_trait]
impl SqlDriver for SqliteDriver {
    type Settings = SqliteSettings;

    fn settings(config: &ConnectionConfig, _backend: Backend) -> Result<SqliteSettings, EtlError> {
        let path = config.require(&config.params.file_path, "file_path")?.clone();
        Ok(SqliteSettings { path })
    }

    async fn connect(settings: &SqliteSettings) -> Result<Self, EtlError> {
        let conn = if settings.path.as_os_str() == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(&settings.path)
        }
        .map_err(|e| {
            InfrastructureError::connection(format!(
                "cannot open SQLite database {:?}: {}",
                settings.path, e
            ))
        })?;
        Ok(Self { conn })
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Dataset, EtlError> {
        let mut stmt = self.conn.prepare(sql).map_err(InfrastructureError::query)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = names.len();

        let mut rows = stmt
            .query(params_from_iter(params.iter().map(bind)))
            .map_err(InfrastructureError::query)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(InfrastructureError::query)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let cell = row.get_ref(i).map_err(InfrastructureError::query)?;
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

fn bind(param: &SqlParam) -> SqliteValue {
    if param.value.is_null() {
        return SqliteValue::Null;
    }
    let bound = match param.ty {
        DataType::Integer => param.to_i64().map(SqliteValue::Integer),
        DataType::Float => param.to_f64().map(SqliteValue::Real),
        DataType::Boolean => param.to_bool().map(|b| SqliteValue::Integer(i64::from(b))),
        DataType::Timestamp => param
            .to_timestamp()
            .map(|ts| SqliteValue::Text(ts.format(TIMESTAMP_FORMAT).to_string())),
        DataType::Text => None,
    };
    bound
        .or_else(|| param.to_text().map(SqliteValue::Text))
        .unwrap_or(SqliteValue::Null)
}

fn decode(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(x) => Value::Float(x),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            // Timestamps are stored as text
            match parse_timestamp(&text) {
                Some(ts) => Value::Timestamp(ts),
                None => Value::Text(text),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::pipeline::{TableRef, WriteMode};
    use crate::ports::connector::Connector;
    use anyhow::Result;
    use chrono::NaiveDate;

    fn memory() -> SqliteConnector {
        let config: ConnectionConfig =
            serde_yaml::from_str("name: mem\ntype: SQLite\nfile_path: ':memory:'\n").unwrap();
        SqliteConnector::from_config(&config).unwrap()
    }

    fn sample() -> Dataset {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        Dataset::from_rows(
            vec!["id".into(), "name".into(), "score".into(), "at".into()],
            vec![
                vec![Value::Integer(1), "ada".into(), Value::Float(9.5), Value::Timestamp(ts)],
                vec![Value::Integer(2), Value::Null, Value::Float(7.0), Value::Timestamp(ts)],
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_append_creates_then_appends() -> Result<()> {
        let mut conn = memory();
        let target = TableRef::table("scores");

        assert!(!conn.table_exists(&target).await?);
        assert_eq!(conn.write(&sample(), &target, WriteMode::Append).await?, 2);
        assert!(conn.table_exists(&target).await?);
        conn.write(&sample(), &target, WriteMode::Append).await?;
        assert_eq!(conn.row_count(&target).await?, Some(4));

        let back = conn.read(Some("SELECT * FROM scores ORDER BY id")).await?;
        assert_eq!(back.column_names(), vec!["id", "name", "score", "at"]);
        assert_eq!(back.row(0), sample().row(0));
        assert_eq!(back.column("name").unwrap().values[1], Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn test_truncate_keeps_schema_and_tolerates_missing_table() -> Result<()> {
        let mut conn = memory();
        let target = TableRef::table("scores");

        // Missing table: warning only
        conn.truncate(&target).await?;

        conn.write(&sample(), &target, WriteMode::Append).await?;
        conn.truncate(&target).await?;
        assert!(conn.table_exists(&target).await?);
        assert_eq!(conn.row_count(&target).await?, Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_drop_is_idempotent() -> Result<()> {
        let mut conn = memory();
        let target = TableRef::table("scores");

        conn.drop_table(&target).await?;
        conn.write(&sample(), &target, WriteMode::Append).await?;
        conn.drop_table(&target).await?;
        conn.drop_table(&target).await?;
        assert!(!conn.table_exists(&target).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_rebuilds_with_new_columns() -> Result<()> {
        let mut conn = memory();
        let target = TableRef::table("scores");
        conn.write(&sample(), &target, WriteMode::Append).await?;

        let narrow = Dataset::from_rows(vec!["only".into()], vec![vec!["x".into()]])?;
        conn.write(&narrow, &target, WriteMode::Replace).await?;

        let back = conn.read(Some("SELECT * FROM scores")).await?;
        assert_eq!(back.column_names(), vec!["only"]);
        assert_eq!(back.row_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_requires_query_and_reports_bad_sql() -> Result<()> {
        let mut conn = memory();
        let missing = conn.read(None).await.unwrap_err();
        assert_eq!(missing.tag(), "ConfigError");

        let bad = conn.read(Some("SELECT * FROM nowhere")).await.unwrap_err();
        assert_eq!(bad.tag(), "QueryError");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_path_is_config_error() {
        let config: ConnectionConfig = serde_yaml::from_str("name: x\ntype: SQLite\n").unwrap();
        let err = SqliteConnector::from_config(&config).err().unwrap();
        assert_eq!(err.tag(), "ConfigError");
    }
}
