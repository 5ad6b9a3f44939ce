// pipewright-core/src/infrastructure/adapters/sql/odbc.rs

// Generic ODBC access. Parameters are bound as text and result cells are read
// through text buffers, then typed with `Value::infer`.

use async_trait::async_trait;
use odbc_api::buffers::TextRowSet;
use odbc_api::parameter::VarCharBox;
use odbc_api::{Connection, ConnectionOptions, Cursor, Environment, IntoParameter, ResultSetMetadata};
use once_cell::sync::OnceCell;

use super::{SqlConnector, SqlDriver, collect_rows};
use crate::domain::dataset::{Dataset, Value};
use crate::domain::pipeline::{Backend, ConnectionConfig};
use crate::domain::sql::SqlParam;
use crate::error::EtlError;
use crate::infrastructure::error::InfrastructureError;

const FETCH_ROWS: usize = 1000;
const MAX_CELL_BYTES: usize = 4096;

static ENVIRONMENT: OnceCell<Environment> = OnceCell::new();

fn environment() -> Result<&'static Environment, InfrastructureError> {
    ENVIRONMENT
        .get_or_try_init(Environment::new)
        .map_err(|e| InfrastructureError::connection(format!("ODBC environment: {}", e)))
}

pub type OdbcConnector = SqlConnector<OdbcDriver>;

#[derive(Debug, Clone)]
pub enum OdbcSettings {
    Dsn {
        dsn: String,
        user: String,
        password: String,
    },
    ConnectionString(String),
}

pub struct OdbcDriver {
    conn: Connection<'static>,
}

#[async_trait]
impl SqlDriver for OdbcDriver {
    type Settings = OdbcSettings;

    fn settings(config: &ConnectionConfig, _backend: Backend) -> Result<OdbcSettings, EtlError> {
        let p = &config.params;
        if let Some(connection_string) = &p.connection_string {
            return Ok(OdbcSettings::ConnectionString(connection_string.clone()));
        }
        Ok(OdbcSettings::Dsn {
            dsn: config.require(&p.dsn, "dsn")?.clone(),
            user: p.user.clone().unwrap_or_default(),
            password: p.password.clone().unwrap_or_default(),
        })
    }

    async fn connect(settings: &OdbcSettings) -> Result<Self, EtlError> {
        let env = environment()?;
        let conn = match settings {
            OdbcSettings::Dsn {
                dsn,
                user,
                password,
            } => env.connect(dsn, user, password, ConnectionOptions::default()),
            OdbcSettings::ConnectionString(s) => {
                env.connect_with_connection_string(s, ConnectionOptions::default())
            }
        }
        .map_err(InfrastructureError::connection)?;
        Ok(Self { conn })
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Dataset, EtlError> {
        let bound = bind(params);
        let mut prepared = self.conn.prepare(sql).map_err(InfrastructureError::query)?;
        let Some(mut cursor) = prepared
            .execute(&bound[..])
            .map_err(InfrastructureError::query)?
        else {
            return Ok(Dataset::default());
        };

        let names: Vec<String> = cursor
            .column_names()
            .map_err(InfrastructureError::query)?
            .collect::<Result<_, _>>()
            .map_err(InfrastructureError::query)?;

        let mut buffers = TextRowSet::for_cursor(FETCH_ROWS, &mut cursor, Some(MAX_CELL_BYTES))
            .map_err(InfrastructureError::query)?;
        let mut rows_cursor = cursor
            .bind_buffer(&mut buffers)
            .map_err(InfrastructureError::query)?;

        let mut out = Vec::new();
        while let Some(batch) = rows_cursor.fetch().map_err(InfrastructureError::query)? {
            for r in 0..batch.num_rows() {
                let row = (0..batch.num_cols())
                    .map(|c| {
                        batch
                            .at(c, r)
                            .map_or(Value::Null, |bytes| Value::infer(&String::from_utf8_lossy(bytes)))
                    })
                    .collect();
                out.push(row);
            }
        }
        collect_rows(names, out)
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, EtlError> {
        let bound = bind(params);
        let mut prepared = self.conn.prepare(sql).map_err(InfrastructureError::query)?;
        prepared
            .execute(&bound[..])
            .map_err(InfrastructureError::query)?;
        let affected = prepared.row_count().map_err(InfrastructureError::query)?;
        Ok(affected.unwrap_or(0) as u64)
    }
}

fn bind(params: &[SqlParam]) -> Vec<VarCharBox> {
    params.iter().map(|p| p.to_text().into_parameter()).collect()
}
