// pipewright-core/src/infrastructure/adapters/sql/oracle.rs

// The oracle crate is blocking; calls run inline on the runtime thread like
// the embedded SQLite and DuckDB drivers.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use oracle::sql_type::{OracleType, ToSql};
use oracle::{Connection, Row};

use super::{SqlConnector, SqlDriver, collect_rows};
use crate::domain::dataset::{DataType, Dataset, Value};
use crate::domain::pipeline::{Backend, ConnectionConfig};
use crate::domain::sql::SqlParam;
use crate::error::EtlError;
use crate::infrastructure::error::InfrastructureError;

pub type OracleConnector = SqlConnector<OracleDriver>;

#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub user: String,
    pub password: String,
    /// EZConnect string: `host:port/service_name`.
    pub connect_string: String,
}

pub struct OracleDriver {
    conn: Connection,
}

#[async_trait]
impl SqlDriver for OracleDriver {
    type Settings = OracleSettings;

    fn settings(config: &ConnectionConfig, _backend: Backend) -> Result<OracleSettings, EtlError> {
        let p = &config.params;
        let host = config.require(&p.host, "host")?;
        let service = config.require(&p.service_name, "service_name")?;
        Ok(OracleSettings {
            user: config.require(&p.user, "user")?.clone(),
            password: p.password.clone().unwrap_or_default(),
            connect_string: format!("{}:{}/{}", host, p.port.unwrap_or(1521), service),
        })
    }

    async fn connect(settings: &OracleSettings) -> Result<Self, EtlError> {
        let mut conn = Connection::connect(&settings.user, &settings.password, &settings.connect_string)
            .map_err(|e| {
                InfrastructureError::connection(format!("{}: {}", settings.connect_string, e))
            })?;
        conn.set_autocommit(true);
        Ok(Self { conn })
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Dataset, EtlError> {
        let bound: Vec<Box<dyn ToSql>> = params.iter().map(bind).collect();
        let refs: Vec<&dyn ToSql> = bound.iter().map(|b| b.as_ref()).collect();

        let rows = self
            .conn
            .query(sql, &refs)
            .map_err(InfrastructureError::query)?;
        let columns: Vec<(String, OracleType)> = rows
            .column_info()
            .iter()
            .map(|c| (c.name().to_string(), c.oracle_type().clone()))
            .collect();

        let mut out = Vec::new();
        for row in rows {
            let row = row.map_err(InfrastructureError::query)?;
            let values = columns
                .iter()
                .enumerate()
                .map(|(i, (_, ty))| decode(&row, i, ty))
                .collect::<Result<Vec<_>, _>>()
                .map_err(InfrastructureError::query)?;
            out.push(values);
        }
        let names = columns.into_iter().map(|(name, _)| name).collect();
        collect_rows(names, out)
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, EtlError> {
        let bound: Vec<Box<dyn ToSql>> = params.iter().map(bind).collect();
        let refs: Vec<&dyn ToSql> = bound.iter().map(|b| b.as_ref()).collect();
        let stmt = self
            .conn
            .execute(sql, &refs)
            .map_err(InfrastructureError::query)?;
        stmt.row_count().map_err(|e| InfrastructureError::query(e).into())
    }

    /// Array binding: one round trip per batch.
    async fn execute_many(&mut self, sql: &str, rows: &[Vec<SqlParam>]) -> Result<u64, EtlError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut batch = self
            .conn
            .batch(sql, rows.len())
            .build()
            .map_err(InfrastructureError::query)?;
        for params in rows {
            let bound: Vec<Box<dyn ToSql>> = params.iter().map(bind).collect();
            let refs: Vec<&dyn ToSql> = bound.iter().map(|b| b.as_ref()).collect();
            batch.append_row(&refs).map_err(InfrastructureError::query)?;
        }
        batch.execute().map_err(InfrastructureError::query)?;
        Ok(rows.len() as u64)
    }
}

// Booleans are stored as NUMBER(1).
fn bind(param: &SqlParam) -> Box<dyn ToSql> {
    match param.ty {
        DataType::Integer | DataType::Boolean => Box::new(param.to_i64()),
        DataType::Float => Box::new(param.to_f64()),
        DataType::Timestamp => Box::new(param.to_timestamp()),
        DataType::Text => Box::new(param.to_text()),
    }
}

fn decode(row: &Row, i: usize, ty: &OracleType) -> Result<Value, oracle::Error> {
    let value = match ty {
        OracleType::Number(_, 0) | OracleType::Int64 => {
            row.get::<_, Option<i64>>(i)?.map_or(Value::Null, Value::Integer)
        }
        OracleType::Number(_, _)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => row.get::<_, Option<f64>>(i)?.map_or(Value::Null, Value::Float),
        OracleType::Boolean => row.get::<_, Option<bool>>(i)?.map_or(Value::Null, Value::Boolean),
        OracleType::Date
        | OracleType::Timestamp(_)
        | OracleType::TimestampTZ(_)
        | OracleType::TimestampLTZ(_) => row
            .get::<_, Option<NaiveDateTime>>(i)?
            .map_or(Value::Null, Value::Timestamp),
        _ => row.get::<_, Option<String>>(i)?.map_or(Value::Null, Value::Text),
    };
    Ok(value)
}
