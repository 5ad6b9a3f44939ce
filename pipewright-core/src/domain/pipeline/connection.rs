// pipewright-core/src/domain/pipeline/connection.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::error::DomainError;
use crate::domain::sql::Dialect;

/// Storage backend a connection document points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Csv,
    Excel,
    PostgreSql,
    Redshift,
    MySql,
    MsSql,
    Oracle,
    Sqlite,
    DuckDb,
    Odbc,
}

impl Backend {
    pub const ALL: [Backend; 10] = [
        Backend::Csv,
        Backend::Excel,
        Backend::PostgreSql,
        Backend::Redshift,
        Backend::MySql,
        Backend::MsSql,
        Backend::Oracle,
        Backend::Sqlite,
        Backend::DuckDb,
        Backend::Odbc,
    ];

    /// SQL dialect of the backend, `None` for file backends.
    pub fn dialect(self) -> Option<Dialect> {
        match self {
            Backend::Csv | Backend::Excel => None,
            Backend::PostgreSql => Some(Dialect::Postgres),
            Backend::Redshift => Some(Dialect::Redshift),
            Backend::MySql => Some(Dialect::MySql),
            Backend::MsSql => Some(Dialect::MsSql),
            Backend::Oracle => Some(Dialect::Oracle),
            Backend::Sqlite => Some(Dialect::Sqlite),
            Backend::DuckDb => Some(Dialect::DuckDb),
            Backend::Odbc => Some(Dialect::Odbc),
        }
    }

    pub fn is_sql(self) -> bool {
        self.dialect().is_some()
    }

    /// Embedded engines have no server-side database/schema to report.
    pub fn is_server(self) -> bool {
        self.is_sql() && !matches!(self, Backend::Sqlite | Backend::DuckDb)
    }
}

impl FromStr for Backend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "csv" => Ok(Backend::Csv),
            "excel" | "xlsx" => Ok(Backend::Excel),
            "postgresql" | "postgres" => Ok(Backend::PostgreSql),
            "redshift" => Ok(Backend::Redshift),
            "mysql" => Ok(Backend::MySql),
            "mssql" | "mssqlserver" | "sqlserver" => Ok(Backend::MsSql),
            "oracle" => Ok(Backend::Oracle),
            "sqlite" => Ok(Backend::Sqlite),
            "duckdb" => Ok(Backend::DuckDb),
            "odbc" => Ok(Backend::Odbc),
            _ => Err(DomainError::Config(format!(
                "Unsupported connection type: '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Backend::Csv => "CSV",
            Backend::Excel => "Excel",
            Backend::PostgreSql => "PostgreSQL",
            Backend::Redshift => "Redshift",
            Backend::MySql => "MySQL",
            Backend::MsSql => "MSSQL",
            Backend::Oracle => "Oracle",
            Backend::Sqlite => "SQLite",
            Backend::DuckDb => "DuckDB",
            Backend::Odbc => "ODBC",
        };
        write!(f, "{}", s)
    }
}

/// One connection document.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConnectionConfig {
    #[validate(length(min = 1, message = "connection name cannot be empty"))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "connection type cannot be empty"))]
    pub kind: String,

    #[serde(flatten)]
    pub params: ConnectionParams,
}

/// Backend parameters. Each driver reads the subset it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub file_path: Option<PathBuf>,
    pub delimiter: Option<String>,
    pub encoding: Option<String>,
    pub sheet_name: Option<String>,
    pub header_start_row: Option<u32>,

    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(alias = "username")]
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "database")]
    pub dbname: Option<String>,
    pub schema: Option<String>,
    pub service_name: Option<String>,

    pub dsn: Option<String>,
    pub connection_string: Option<String>,

    pub connect_timeout_secs: Option<u64>,
    pub trust_cert: Option<bool>,
}

impl ConnectionConfig {
    pub fn backend(&self) -> Result<Backend, DomainError> {
        self.kind.parse::<Backend>().map_err(|_| {
            DomainError::Config(format!(
                "Connection '{}' has unsupported type '{}'",
                self.name, self.kind
            ))
        })
    }

    /// Returns a required parameter or a `Config` error naming it.
    pub fn require<'a, T>(&self, value: &'a Option<T>, key: &str) -> Result<&'a T, DomainError> {
        value.as_ref().ok_or_else(|| {
            DomainError::Config(format!(
                "Connection '{}' ({}) is missing required parameter '{}'",
                self.name, self.kind, key
            ))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names() {
        assert_eq!("PostgreSQL".parse::<Backend>().unwrap(), Backend::PostgreSql);
        assert_eq!("MS SQL Server".parse::<Backend>().unwrap(), Backend::MsSql);
        assert_eq!("duckdb".parse::<Backend>().unwrap(), Backend::DuckDb);
        assert!(matches!(
            "Cassandra".parse::<Backend>(),
            Err(DomainError::Config(_))
        ));
        for backend in Backend::ALL {
            assert_eq!(backend.to_string().parse::<Backend>().unwrap(), backend);
        }
    }

    #[test]
    fn test_param_aliases() {
        let yaml = "
name: warehouse
type: PostgreSQL
host: db.internal
port: 5433
username: etl
database: analytics
";
        let config: ConnectionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.params.user.as_deref(), Some("etl"));
        assert_eq!(config.params.dbname.as_deref(), Some("analytics"));
        assert_eq!(config.params.port, Some(5433));
        assert!(config.require(&config.params.password, "password").is_err());
    }
}
