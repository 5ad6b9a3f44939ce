// pipewright-core/src/infrastructure/adapters/registry.rs

use std::collections::{BTreeMap, HashMap};

use crate::domain::pipeline::{Backend, ConnectionConfig};
use crate::error::EtlError;
use crate::infrastructure::adapters::csv::CsvConnector;
use crate::infrastructure::adapters::excel::ExcelConnector;
use crate::infrastructure::adapters::sql::duckdb::DuckDbConnector;
use crate::infrastructure::adapters::sql::sqlite::SqliteConnector;
use crate::ports::connector::Connector;

/// Builds a connector from its descriptor. Must not perform I/O.
pub type Constructor = fn(&ConnectionConfig) -> Result<Box<dyn Connector>, EtlError>;

fn boxed<C: Connector + 'static>(connector: C) -> Box<dyn Connector> {
    Box::new(connector)
}

/// All connection descriptors of a project, plus one constructor per
/// backend compiled into this build.
pub struct ConnectorRegistry {
    connections: BTreeMap<String, ConnectionConfig>,
    constructors: HashMap<Backend, Constructor>,
}

impl ConnectorRegistry {
    pub fn new(connections: BTreeMap<String, ConnectionConfig>) -> Self {
        let mut registry = Self {
            connections,
            constructors: HashMap::new(),
        };

        registry.register(Backend::Csv, |c| CsvConnector::from_config(c).map(boxed));
        registry.register(Backend::Excel, |c| ExcelConnector::from_config(c).map(boxed));
        registry.register(Backend::Sqlite, |c| SqliteConnector::from_config(c).map(boxed));
        registry.register(Backend::DuckDb, |c| DuckDbConnector::from_config(c).map(boxed));

        #[cfg(feature = "postgres")]
        {
            use crate::infrastructure::adapters::sql::postgres::PostgresConnector;
            registry.register(Backend::PostgreSql, |c| PostgresConnector::from_config(c).map(boxed));
            registry.register(Backend::Redshift, |c| PostgresConnector::from_config(c).map(boxed));
        }
        #[cfg(feature = "mysql")]
        {
            use crate::infrastructure::adapters::sql::mysql::MySqlConnector;
            registry.register(Backend::MySql, |c| MySqlConnector::from_config(c).map(boxed));
        }
        #[cfg(feature = "mssql")]
        {
            use crate::infrastructure::adapters::sql::mssql::MsSqlConnector;
            registry.register(Backend::MsSql, |c| MsSqlConnector::from_config(c).map(boxed));
        }
        #[cfg(feature = "oracle")]
        {
            use crate::infrastructure::adapters::sql::oracle::OracleConnector;
            registry.register(Backend::Oracle, |c| OracleConnector::from_config(c).map(boxed));
        }
        #[cfg(feature = "odbc")]
        {
            use crate::infrastructure::adapters::sql::odbc::OdbcConnector;
            registry.register(Backend::Odbc, |c| OdbcConnector::from_config(c).map(boxed));
        }

        registry
    }

    /// Replaces the constructor of `backend`.
    pub fn register(&mut self, backend: Backend, constructor: Constructor) {
        self.constructors.insert(backend, constructor);
    }

    pub fn get(&self, name: &str) -> Result<&ConnectionConfig, EtlError> {
        self.connections
            .get(name)
            .ok_or_else(|| EtlError::not_found(format!("Connection '{}' not found", name)))
    }

    /// Resolves `name` to a fresh connector. No session is opened yet.
    pub fn open(&self, name: &str) -> Result<Box<dyn Connector>, EtlError> {
        let config = self.get(name)?;
        let backend = config.backend()?;
        let constructor = self.constructors.get(&backend).ok_or_else(|| {
            EtlError::config(format!(
                "Connection '{}' needs the {} backend, which is not compiled in (enable the `{}` feature)",
                name,
                backend,
                feature_of(backend)
            ))
        })?;
        constructor(config)
    }

    /// Checks that `name` resolves and its parameters are complete.
    pub fn validate(&self, name: &str) -> Result<(), EtlError> {
        self.open(name).map(|_| ())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

fn feature_of(backend: Backend) -> &'static str {
    match backend {
        Backend::PostgreSql | Backend::Redshift => "postgres",
        Backend::MySql => "mysql",
        Backend::MsSql => "mssql",
        Backend::Oracle => "oracle",
        Backend::Odbc => "odbc",
        Backend::Csv | Backend::Excel | Backend::Sqlite | Backend::DuckDb => "default",
    }
}
