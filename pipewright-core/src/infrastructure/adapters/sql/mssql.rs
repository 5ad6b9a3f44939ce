// pipewright-core/src/infrastructure/adapters/sql/mssql.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::TryStreamExt;
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::{SqlConnector, SqlDriver, collect_rows, connect_within};
use crate::domain::dataset::{DataType, Dataset, Value};
use crate::domain::pipeline::{Backend, ConnectionConfig};
use crate::domain::sql::SqlParam;
use crate::error::EtlError;
use crate::infrastructure::error::InfrastructureError;

pub type MsSqlConnector = SqlConnector<MsSqlDriver>;

#[derive(Debug, Clone)]
pub struct MsSqlSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: Option<String>,
    pub trust_cert: bool,
    pub connect_timeout_secs: Option<u64>,
}

pub struct MsSqlDriver {
    client: Client<Compat<TcpStream>>,
}

#[async_trait]
impl SqlDriver for MsSqlDriver {
    type Settings = MsSqlSettings;

    fn settings(config: &ConnectionConfig, _backend: Backend) -> Result<MsSqlSettings, EtlError> {
        let p = &config.params;
        Ok(MsSqlSettings {
            host: config.require(&p.host, "host")?.clone(),
            port: p.port.unwrap_or(1433),
            user: config.require(&p.user, "user")?.clone(),
            password: p.password.clone().unwrap_or_default(),
            dbname: p.dbname.clone(),
            trust_cert: p.trust_cert.unwrap_or(false),
            connect_timeout_secs: p.connect_timeout_secs,
        })
    }

    async fn connect(settings: &MsSqlSettings) -> Result<Self, EtlError> {
        let mut config = Config::new();
        config.host(&settings.host);
        config.port(settings.port);
        config.authentication(AuthMethod::sql_server(&settings.user, &settings.password));
        if let Some(dbname) = &settings.dbname {
            config.database(dbname);
        }
        if settings.trust_cert {
            config.trust_cert();
        }

        let target = format!("{}:{}", settings.host, settings.port);
        let label = target.clone();
        let client = connect_within(settings.connect_timeout_secs, &target, async move {
            let fail = |e: &dyn std::fmt::Display| {
                EtlError::from(InfrastructureError::connection(format!("{}: {}", label, e)))
            };
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| fail(&e))?;
            tcp.set_nodelay(true).map_err(|e| fail(&e))?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| fail(&e))
        })
        .await?;
        Ok(Self { client })
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Dataset, EtlError> {
        let bound: Vec<Box<dyn ToSql>> = params.iter().map(bind).collect();
        let refs: Vec<&dyn ToSql> = bound.iter().map(|b| b.as_ref()).collect();

        let mut stream = self
            .client
            .query(sql, &refs)
            .await
            .map_err(InfrastructureError::query)?;
        let names: Vec<String> = stream
            .columns()
            .await
            .map_err(InfrastructureError::query)?
            .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows: Vec<tiberius::Row> = stream
            .into_row_stream()
            .try_collect()
            .await
            .map_err(InfrastructureError::query)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let values = row
                .into_iter()
                .map(decode)
                .collect::<Result<Vec<_>, _>>()
                .map_err(InfrastructureError::query)?;
            out.push(values);
        }
        collect_rows(names, out)
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, EtlError> {
        let bound: Vec<Box<dyn ToSql>> = params.iter().map(bind).collect();
        let refs: Vec<&dyn ToSql> = bound.iter().map(|b| b.as_ref()).collect();
        let result = self
            .client
            .execute(sql, &refs)
            .await
            .map_err(InfrastructureError::query)?;
        Ok(result.total())
    }
}

// Typed NULLs keep the column's SQL type on the wire.
fn bind(param: &SqlParam) -> Box<dyn ToSql> {
    match param.ty {
        DataType::Integer => Box::new(param.to_i64()),
        DataType::Float => Box::new(param.to_f64()),
        DataType::Boolean => Box::new(param.to_bool()),
        DataType::Timestamp => Box::new(param.to_timestamp()),
        DataType::Text => Box::new(param.to_text()),
    }
}

fn decode(cell: ColumnData<'static>) -> Result<Value, tiberius::error::Error> {
    let value = match &cell {
        ColumnData::U8(v) => v.map_or(Value::Null, |x| Value::Integer(x.into())),
        ColumnData::I16(v) => v.map_or(Value::Null, |x| Value::Integer(x.into())),
        ColumnData::I32(v) => v.map_or(Value::Null, |x| Value::Integer(x.into())),
        ColumnData::I64(v) => v.map_or(Value::Null, Value::Integer),
        ColumnData::F32(v) => v.map_or(Value::Null, |x| Value::Float(x.into())),
        ColumnData::F64(v) => v.map_or(Value::Null, Value::Float),
        ColumnData::Bit(v) => v.map_or(Value::Null, Value::Boolean),
        ColumnData::Numeric(v) => v.map_or(Value::Null, |n| Value::Float(f64::from(n))),
        ColumnData::String(v) => v.as_ref().map_or(Value::Null, |s| Value::Text(s.to_string())),
        ColumnData::Guid(v) => v.map_or(Value::Null, |g| Value::Text(g.to_string())),
        ColumnData::Binary(v) => v
            .as_ref()
            .map_or(Value::Null, |b| Value::Text(String::from_utf8_lossy(b).into_owned())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(&cell)?.map_or(Value::Null, Value::Timestamp)
        }
        ColumnData::DateTimeOffset(_) => DateTime::<Utc>::from_sql(&cell)?
            .map_or(Value::Null, |ts| Value::Timestamp(ts.naive_utc())),
        ColumnData::Date(_) => NaiveDate::from_sql(&cell)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(Value::Null, Value::Timestamp),
        other => Value::Text(format!("{:?}", other)),
    };
    Ok(value)
}
