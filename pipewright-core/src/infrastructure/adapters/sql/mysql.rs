// pipewright-core/src/infrastructure/adapters/sql/mysql.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::types::Decimal;
use sqlx::{Column, ConnectOptions, Executor, Row, Statement, TypeInfo};

use super::{SqlConnector, SqlDriver, collect_rows, connect_within};
use crate::domain::dataset::{Dataset, Value};
use crate::domain::pipeline::{Backend, ConnectionConfig};
use crate::domain::sql::SqlParam;
use crate::error::EtlError;
use crate::infrastructure::error::InfrastructureError;

pub type MySqlConnector = SqlConnector<MySqlDriver>;

#[derive(Debug, Clone)]
pub struct MySqlSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

pub struct MySqlDriver {
    conn: MySqlConnection,
}

#[async_trait]
impl SqlDriver for MySqlDriver {
    type Settings = MySqlSettings;

    fn settings(config: &ConnectionConfig, _backend: Backend) -> Result<MySqlSettings, EtlError> {
        let p = &config.params;
        Ok(MySqlSettings {
            host: config.require(&p.host, "host")?.clone(),
            port: p.port.unwrap_or(3306),
            user: config.require(&p.user, "user")?.clone(),
            password: p.password.clone(),
            dbname: p.dbname.clone(),
            connect_timeout_secs: p.connect_timeout_secs,
        })
    }

    async fn connect(settings: &MySqlSettings) -> Result<Self, EtlError> {
        let mut options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user);
        if let Some(password) = &settings.password {
            options = options.password(password);
        }
        if let Some(dbname) = &settings.dbname {
            options = options.database(dbname);
        }

        let target = format!("{}:{}", settings.host, settings.port);
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

fn decode(row: &MySqlRow, i: usize) -> Result<Value, sqlx::Error> {
    let type_name = row.column(i).type_info().name().to_uppercase();
    let value = match type_name.as_str() {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(i)?.map_or(Value::Null, Value::Boolean),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<Option<i64>, _>(i)?.map_or(Value::Null, Value::Integer)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<Option<u64>, _>(i)?.map_or(Value::Null, |v| {
            i64::try_from(v).map_or(Value::Float(v as f64), Value::Integer)
        }),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(i)?
            .map_or(Value::Null, |v| Value::Float(v.into())),
        "DOUBLE" => row.try_get::<Option<f64>, _>(i)?.map_or(Value::Null, Value::Float),
        "DECIMAL" => row
            .try_get::<Option<Decimal>, _>(i)?
            .map_or(Value::Null, |d| {
                let text = d.to_string();
                text.parse::<f64>().map_or(Value::Text(text), Value::Float)
            }),
        "DATETIME" => row
            .try_get::<Option<NaiveDateTime>, _>(i)?
            .map_or(Value::Null, Value::Timestamp),
        "TIMESTAMP" => row
            .try_get::<Option<DateTime<Utc>>, _>(i)?
            .map_or(Value::Null, |ts| Value::Timestamp(ts.naive_utc())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(i)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(Value::Null, Value::Timestamp),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => row
            .try_get::<Option<Vec<u8>>, _>(i)?
            .map_or(Value::Null, |b| Value::Text(String::from_utf8_lossy(&b).into_owned())),
        _ => row.try_get::<Option<String>, _>(i)?.map_or(Value::Null, Value::Text),
    };
    Ok(value)
}
