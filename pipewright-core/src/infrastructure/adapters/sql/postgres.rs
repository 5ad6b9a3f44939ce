// pipewright-core/src/infrastructure/adapters/sql/postgres.rs

// PostgreSQL and Redshift share the wire protocol and this driver; only the
// dialect and the default port differ.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{Column, ConnectOptions, Executor, Row, Statement, TypeInfo};

use super::{SqlConnector, SqlDriver, collect_rows, connect_within};
use crate::domain::dataset::{Dataset, Value};
use crate::domain::pipeline::{Backend, ConnectionConfig};
use crate::domain::sql::SqlParam;
use crate::error::EtlError;
use crate::infrastructure::error::InfrastructureError;

pub type PostgresConnector = SqlConnector<PostgresDriver>;

#[derive(Debug, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
    pub connect_timeout_secs: Option<u64>,
}

pub struct PostgresDriver {
    conn: PgConnection,
}

#[async_trait]
impl SqlDriver for PostgresDriver {
    type Settings = PostgresSettings;

    fn settings(config: &ConnectionConfig, backend: Backend) -> Result<PostgresSettings, EtlError> {
        let p = &config.params;
        let default_port = if backend == Backend::Redshift { 5439 } else { 5432 };
        Ok(PostgresSettings {
            host: config.require(&p.host, "host")?.clone(),
            port: p.port.unwrap_or(default_port),
            user: config.require(&p.user, "user")?.clone(),
            password: p.password.clone(),
            dbname: p.dbname.clone().unwrap_or_else(|| "postgres".to_string()),
            connect_timeout_secs: p.connect_timeout_secs,
        })
    }

    async fn connect(settings: &PostgresSettings) -> Result<Self, EtlError> {
        let mut options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .database(&settings.dbname);
        if let Some(password) = &settings.password {
            options = options.password(password);
        }

        let target = format!("{}:{}/{}", settings.host, settings.port, settings.dbname);
        let conn = connect_within(settings.connect_timeout_secs, &target, async {
            options
                .connect()
                .await
                .map_err(|e| EtlError::from(InfrastructureError::connection(format!("{}: {}", target, e))))
        })
        .await?;
        Ok(Self { conn })
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Dataset, EtlError> {
        let statement = (&mut self.conn)
            .prepare(sql)
            .await
            .map_err(InfrastructureError::query)?;
        let names: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let rows = bind_params!(statement.query(), params)
            .fetch_all(&mut self.conn)
            .await
            .map_err(InfrastructureError::query)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let values = (0..names.len())
                .map(|i| decode(row, i))
                .collect::<Result<Vec<_>, _>>()
                .map_err(InfrastructureError::query)?;
            out.push(values);
        }
        collect_rows(names, out)
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, EtlError> {
        let done = bind_params!(sqlx::query(sql), params)
            .execute(&mut self.conn)
            .await
            .map_err(InfrastructureError::query)?;
        Ok(done.rows_affected())
    }
}

/// How a column is decoded, from its Postgres type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PgColumn {
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Bool,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Uuid,
    Json,
    Bytes,
    /// Text-like or unknown: the raw value is read as UTF-8.
    Text,
}

fn classify(type_name: &str) -> PgColumn {
    match type_name.to_uppercase().as_str() {
        "INT2" | "SMALLINT" => PgColumn::Int2,
        "INT4" | "INT" | "INTEGER" => PgColumn::Int4,
        "INT8" | "BIGINT" => PgColumn::Int8,
        "FLOAT4" | "REAL" => PgColumn::Float4,
        "FLOAT8" | "DOUBLE PRECISION" => PgColumn::Float8,
        "NUMERIC" | "DECIMAL" => PgColumn::Numeric,
        "BOOL" | "BOOLEAN" => PgColumn::Bool,
        "TIMESTAMP" => PgColumn::Timestamp,
        "TIMESTAMPTZ" => PgColumn::TimestampTz,
        "DATE" => PgColumn::Date,
        "TIME" => PgColumn::Time,
        "UUID" => PgColumn::Uuid,
        "JSON" | "JSONB" => PgColumn::Json,
        "BYTEA" => PgColumn::Bytes,
        _ => PgColumn::Text,
    }
}

fn decode(row: &PgRow, i: usize) -> Result<Value, sqlx::Error> {
    let value = match classify(row.column(i).type_info().name()) {
        PgColumn::Int2 => row
            .try_get::<Option<i16>, _>(i)?
            .map_or(Value::Null, |v| Value::Integer(v.into())),
        PgColumn::Int4 => row
            .try_get::<Option<i32>, _>(i)?
            .map_or(Value::Null, |v| Value::Integer(v.into())),
        PgColumn::Int8 => row.try_get::<Option<i64>, _>(i)?.map_or(Value::Null, Value::Integer),
        PgColumn::Float4 => row
            .try_get::<Option<f32>, _>(i)?
            .map_or(Value::Null, |v| Value::Float(v.into())),
        PgColumn::Float8 => row.try_get::<Option<f64>, _>(i)?.map_or(Value::Null, Value::Float),
        PgColumn::Numeric => row
            .try_get::<Option<Decimal>, _>(i)?
            .map_or(Value::Null, |d| {
                let text = d.to_string();
                text.parse::<f64>().map_or(Value::Text(text), Value::Float)
            }),
        PgColumn::Bool => row.try_get::<Option<bool>, _>(i)?.map_or(Value::Null, Value::Boolean),
        PgColumn::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(i)?
            .map_or(Value::Null, Value::Timestamp),
        PgColumn::TimestampTz => row
            .try_get::<Option<DateTime<Utc>>, _>(i)?
            .map_or(Value::Null, |ts| Value::Timestamp(ts.naive_utc())),
        PgColumn::Date => row
            .try_get::<Option<NaiveDate>, _>(i)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(Value::Null, Value::Timestamp),
        PgColumn::Time => row
            .try_get::<Option<NaiveTime>, _>(i)?
            .map_or(Value::Null, |t| Value::Text(t.to_string())),
        PgColumn::Uuid => row
            .try_get::<Option<Uuid>, _>(i)?
            .map_or(Value::Null, |u| Value::Text(u.to_string())),
        PgColumn::Json => row
            .try_get::<Option<JsonValue>, _>(i)?
            .map_or(Value::Null, |j| Value::Text(j.to_string())),
        PgColumn::Bytes => row
            .try_get::<Option<Vec<u8>>, _>(i)?
            .map_or(Value::Null, |b| Value::Text(String::from_utf8_lossy(&b).into_owned())),
        // Enums, citext and other extension types arrive as UTF-8 text
        PgColumn::Text => row
            .try_get_unchecked::<Option<String>, _>(i)?
            .map_or(Value::Null, Value::Text),
    };
    Ok(value)
}
