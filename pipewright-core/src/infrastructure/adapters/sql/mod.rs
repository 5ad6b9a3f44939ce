// pipewright-core/src/infrastructure/adapters/sql/mod.rs

//! One `Connector` implementation for every SQL backend.
//!
//! All syntax differences live in [`Dialect`]; a [`SqlDriver`] only knows
//! how to open a session, run a query and execute a statement.

/// Binds `SqlParam`s onto a sqlx query according to their declared type.
#[cfg(any(feature = "postgres", feature = "mysql"))]
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        use $crate::domain::dataset::DataType;
        let mut query = $query;
        for param in $params {
            query = match param.ty {
                DataType::Integer => query.bind(param.to_i64()),
                DataType::Float => query.bind(param.to_f64()),
                DataType::Boolean => query.bind(param.to_bool()),
                DataType::Timestamp => query.bind(param.to_timestamp()),
                DataType::Text => query.bind(param.to_text()),
            };
        }
        query
    }};
}

pub mod duckdb;
#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "odbc")]
pub mod odbc;
#[cfg(feature = "oracle")]
pub mod oracle;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::domain::dataset::{DataType, Dataset, Value};
use crate::domain::pipeline::{Backend, ConnectionConfig, TableRef, WriteMode};
use crate::domain::sql::{Dialect, SqlParam};
use crate::error::EtlError;
use crate::ports::connector::Connector;

/// A session with one SQL backend.
#[async_trait]
pub trait SqlDriver: Send + Sized {
    /// Everything needed to open a session, validated up front.
    type Settings: Send + Sync;

    /// Extracts and checks the connection parameters. No I/O.
    fn settings(config: &ConnectionConfig, backend: Backend) -> Result<Self::Settings, EtlError>;

    async fn connect(settings: &Self::Settings) -> Result<Self, EtlError>;

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> Result<Dataset, EtlError>;

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, EtlError>;

    /// Runs a single-row statement once per parameter row.
    async fn execute_many(&mut self, sql: &str, rows: &[Vec<SqlParam>]) -> Result<u64, EtlError> {
        let mut total = 0;
        for params in rows {
            total += self.execute(sql, params).await?;
        }
        Ok(total)
    }
}

/// SQL connector over driver `D`. The session opens on first use and closes
/// when the connector is dropped.
pub struct SqlConnector<D: SqlDriver> {
    name: String,
    backend: Backend,
    dialect: Dialect,
    settings: D::Settings,
    driver: Option<D>,
}

impl<D: SqlDriver> SqlConnector<D> {
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, EtlError> {
        let backend = config.backend()?;
        let dialect = backend.dialect().ok_or_else(|| {
            EtlError::config(format!(
                "Connection '{}' of type {} is not a SQL backend",
                config.name, backend
            ))
        })?;
        Ok(Self {
            name: config.name.clone(),
            backend,
            dialect,
            settings: D::settings(config, backend)?,
            driver: None,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn session(&mut self) -> Result<&mut D, EtlError> {
        if self.driver.is_none() {
            debug!(connection = %self.name, backend = %self.backend, "Opening session");
            self.driver = Some(D::connect(&self.settings).await?);
        }
        self.driver
            .as_mut()
            .ok_or_else(|| EtlError::Internal("SQL session missing after connect".into()))
    }

    async fn scalar(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, EtlError> {
        let result = self.session().await?.query(sql, params).await?;
        let cell = result
            .columns()
            .first()
            .and_then(|c| c.values.first())
            .cloned()
            .unwrap_or(Value::Null);
        match cell {
            Value::Integer(i) => Ok(u64::try_from(i).unwrap_or(0)),
            Value::Float(x) if x >= 0.0 => Ok(x as u64),
            Value::Boolean(b) => Ok(u64::from(b)),
            Value::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| EtlError::Internal(format!("expected a number from '{}', got '{}'", sql, s))),
            _ => Ok(0),
        }
    }

    async fn create_table(&mut self, data: &Dataset, target: &TableRef) -> Result<(), EtlError> {
        let columns: Vec<(&str, DataType)> = data
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c.data_type()))
            .collect();
        let sql = self.dialect.create_table_sql(target, &columns)?;
        info!(table = %target, "Creating table");
        self.session().await?.execute(&sql, &[]).await?;
        Ok(())
    }
}

#[async_trait]
impl<D: SqlDriver> Connector for SqlConnector<D> {
    fn backend(&self) -> Backend {
        self.backend
    }

    #[instrument(skip(self), fields(connection = %self.name))]
    async fn read(&mut self, query: Option<&str>) -> Result<Dataset, EtlError> {
        let query = query.filter(|q| !q.trim().is_empty()).ok_or_else(|| {
            EtlError::config(format!(
                "Source connection '{}' ({}) requires a query",
                self.name, self.backend
            ))
        })?;
        let data = self.session().await?.query(query, &[]).await?;
        info!("Read {} rows from {}", data.row_count(), self.name);
        Ok(data)
    }

    #[instrument(skip(self, data), fields(connection = %self.name, table = %target))]
    async fn write(
        &mut self,
        data: &Dataset,
        target: &TableRef,
        mode: WriteMode,
    ) -> Result<u64, EtlError> {
        let dialect = self.dialect;
        if data.width() == 0 {
            warn!("Dataset has no columns, nothing written");
            return Ok(0);
        }

        match mode {
            WriteMode::Replace => {
                self.drop_table(target).await?;
                self.create_table(data, target).await?;
            }
            WriteMode::Append => {
                if !self.table_exists(target).await? {
                    self.create_table(data, target).await?;
                }
            }
        }

        let names = data.column_names();
        let types: Vec<DataType> = data.columns().iter().map(|c| c.data_type()).collect();
        let batch_rows = dialect.batch_size(names.len());
        let single_row_sql = dialect.insert_sql(target, &names, 1)?;

        let mut written: u64 = 0;
        let mut start = 0;
        while start < data.row_count() {
            let end = (start + batch_rows).min(data.row_count());
            let rows: Vec<Vec<SqlParam>> = (start..end)
                .map(|i| {
                    data.row(i)
                        .into_iter()
                        .zip(&types)
                        .map(|(value, ty)| SqlParam::new(value.clone(), *ty))
                        .collect()
                })
                .collect();

            let session = self.session().await?;
            if dialect.supports_multi_row_insert() {
                let sql = if rows.len() == 1 {
                    single_row_sql.clone()
                } else {
                    dialect.insert_sql(target, &names, rows.len())?
                };
                let params: Vec<SqlParam> = rows.into_iter().flatten().collect();
                session.execute(&sql, &params).await?;
            } else {
                session.execute_many(&single_row_sql, &rows).await?;
            }

            written += (end - start) as u64;
            debug!("Inserted rows {}..{}", start, end);
            start = end;
        }

        info!("Wrote {} rows", written);
        Ok(written)
    }

    async fn table_exists(&mut self, target: &TableRef) -> Result<bool, EtlError> {
        let statement = self.dialect.exists_query(target)?;
        Ok(self.scalar(&statement.sql, &statement.params).await? > 0)
    }

    #[instrument(skip(self), fields(connection = %self.name, table = %target))]
    async fn truncate(&mut self, target: &TableRef) -> Result<(), EtlError> {
        if !self.table_exists(target).await? {
            warn!("Table {} does not exist, nothing to truncate", target);
            return Ok(());
        }
        let sql = self.dialect.truncate_sql(target)?;
        self.session().await?.execute(&sql, &[]).await?;
        info!("Truncated {}", target);
        Ok(())
    }

    #[instrument(skip(self), fields(connection = %self.name, table = %target))]
    async fn drop_table(&mut self, target: &TableRef) -> Result<(), EtlError> {
        let sql = self.dialect.drop_sql(target)?;
        self.session().await?.execute(&sql, &[]).await?;
        info!("Dropped {} (if it existed)", target);
        Ok(())
    }

    async fn row_count(&mut self, target: &TableRef) -> Result<Option<u64>, EtlError> {
        let sql = self.dialect.count_sql(target)?;
        Ok(Some(self.scalar(&sql, &[]).await?))
    }
}

/// Row-major rows into a dataset, mapping the driver's error type.
pub(crate) fn collect_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Dataset, EtlError> {
    Ok(Dataset::from_rows(names, rows)?)
}

/// Applies `connect_timeout_secs` to a network connect, when configured.
#[cfg(any(feature = "postgres", feature = "mysql", feature = "mssql"))]
pub(crate) async fn connect_within<T, F>(timeout_secs: Option<u64>, target: &str, connect: F) -> Result<T, EtlError>
where
    F: std::future::Future<Output = Result<T, EtlError>> + Send,
{
    match timeout_secs {
        Some(secs) => tokio::time::timeout(std::time::Duration::from_secs(secs), connect)
            .await
            .map_err(|_| {
                crate::infrastructure::error::InfrastructureError::connection(format!(
                    "timed out after {}s connecting to {}",
                    secs, target
                ))
            })?,
        None => connect.await,
    }
}
