// pipewright-core/src/domain/sql/dialect.rs

use sqlparser::ast::Ident;
use tracing::warn;

use super::{SqlParam, Statement};
use crate::domain::dataset::DataType;
use crate::domain::error::DomainError;
use crate::domain::pipeline::TableRef;

/// Syntax and catalog conventions of one SQL backend.
///
/// Pure: every method only builds strings. Drivers execute them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Redshift,
    MySql,
    MsSql,
    Oracle,
    Sqlite,
    DuckDb,
    Odbc,
}

/// Upper bound on rows per INSERT, whatever the parameter limit allows.
pub const MAX_BATCH_ROWS: usize = 1000;

impl Dialect {
    fn quote_style(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::MsSql => '[',
            _ => '"',
        }
    }

    pub fn quote(self, ident: &str) -> String {
        Ident::with_quote(self.quote_style(), ident).to_string()
    }

    pub fn supports_schema(self) -> bool {
        !matches!(self, Dialect::Sqlite)
    }

    /// Schema assumed when the target names none. `None` means the session
    /// default (MySQL database, Oracle user) or no schema at all.
    pub fn default_schema(self) -> Option<&'static str> {
        match self {
            Dialect::Postgres | Dialect::Redshift => Some("public"),
            Dialect::MsSql => Some("dbo"),
            Dialect::DuckDb => Some("main"),
            _ => None,
        }
    }

    /// Positional placeholder for parameter `n` (1-based).
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres | Dialect::Redshift => format!("${}", n),
            Dialect::MsSql => format!("@P{}", n),
            Dialect::Oracle => format!(":{}", n),
            _ => "?".to_string(),
        }
    }

    pub fn max_params(self) -> usize {
        match self {
            Dialect::MsSql => 2100,
            Dialect::Sqlite => 32766,
            Dialect::Odbc => 2000,
            _ => 65535,
        }
    }

    /// Oracle has no multi-row `VALUES`; its driver binds arrays instead.
    pub fn supports_multi_row_insert(self) -> bool {
        !matches!(self, Dialect::Oracle)
    }

    /// Rows per INSERT statement for a table of `columns` columns.
    pub fn batch_size(self, columns: usize) -> usize {
        if columns == 0 {
            return MAX_BATCH_ROWS;
        }
        // MSSQL counts every bound value against its 2100 limit, keep one spare.
        let budget = match self {
            Dialect::MsSql => self.max_params() - 1,
            _ => self.max_params(),
        };
        (budget / columns).clamp(1, MAX_BATCH_ROWS)
    }

    /// Quoted, optionally schema-qualified table name.
    pub fn qualified(self, target: &TableRef) -> Result<String, DomainError> {
        let table = self.quote(target.table_name()?);
        match (&target.schema, self.supports_schema()) {
            (Some(schema), true) if !schema.is_empty() => {
                Ok(format!("{}.{}", self.quote(schema), table))
            }
            (Some(schema), false) => {
                warn!(
                    "Schema '{}' ignored: {:?} has no schemas, using table {}",
                    schema, self, table
                );
                Ok(table)
            }
            _ => Ok(table),
        }
    }

    /// Query returning a single integer, non-zero when the table exists.
    pub fn exists_query(self, target: &TableRef) -> Result<Statement, DomainError> {
        let table = target.table_name()?.to_string();
        let schema = target
            .schema
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| self.default_schema().map(str::to_string));

        let statement = match self {
            Dialect::Postgres => {
                // Unqualified names resolve through search_path, like CREATE and INSERT
                let explicit = target.schema.as_deref().filter(|s| !s.is_empty());
                let qualified = match explicit {
                    Some(s) => format!("{}.{}", self.quote(s), self.quote(&table)),
                    None => self.quote(&table),
                };
                Statement::with_params(
                    "SELECT CASE WHEN to_regclass($1) IS NULL THEN 0 ELSE 1 END",
                    vec![SqlParam::text(qualified)],
                )
            }
            Dialect::Sqlite => Statement::with_params(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                vec![SqlParam::text(table)],
            ),
            Dialect::Oracle => match schema {
                Some(owner) => Statement::with_params(
                    "SELECT COUNT(*) FROM all_tables WHERE table_name = :1 AND owner = :2",
                    vec![SqlParam::text(table), SqlParam::text(owner)],
                ),
                None => Statement::with_params(
                    "SELECT COUNT(*) FROM all_tables WHERE table_name = :1 AND owner = USER",
                    vec![SqlParam::text(table)],
                ),
            },
            Dialect::Redshift | Dialect::MySql | Dialect::MsSql | Dialect::DuckDb | Dialect::Odbc => {
                let p1 = self.placeholder(1);
                let p2 = self.placeholder(2);
                match schema {
                    Some(schema) => Statement::with_params(
                        format!(
                            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = {} AND table_name = {}",
                            p1, p2
                        ),
                        vec![SqlParam::text(schema), SqlParam::text(table)],
                    ),
                    None if self == Dialect::MySql => Statement::with_params(
                        format!(
                            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = {}",
                            p1
                        ),
                        vec![SqlParam::text(table)],
                    ),
                    None => Statement::with_params(
                        format!(
                            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = {}",
                            p1
                        ),
                        vec![SqlParam::text(table)],
                    ),
                }
            }
        };
        Ok(statement)
    }

    pub fn truncate_sql(self, target: &TableRef) -> Result<String, DomainError> {
        let name = self.qualified(target)?;
        Ok(match self {
            Dialect::Sqlite | Dialect::DuckDb => format!("DELETE FROM {}", name),
            _ => format!("TRUNCATE TABLE {}", name),
        })
    }

    /// Statement that drops the table and succeeds when it is absent.
    pub fn drop_sql(self, target: &TableRef) -> Result<String, DomainError> {
        let name = self.qualified(target)?;
        Ok(match self {
            Dialect::MsSql => format!(
                "IF OBJECT_ID(N'{}', N'U') IS NOT NULL DROP TABLE {}",
                name.replace('\'', "''"),
                name
            ),
            // ORA-00942: table or view does not exist
            Dialect::Oracle => format!(
                "BEGIN EXECUTE IMMEDIATE 'DROP TABLE {}'; EXCEPTION WHEN OTHERS THEN IF SQLCODE != -942 THEN RAISE; END IF; END;",
                name.replace('\'', "''")
            ),
            _ => format!("DROP TABLE IF EXISTS {}", name),
        })
    }

    pub fn count_sql(self, target: &TableRef) -> Result<String, DomainError> {
        Ok(format!("SELECT COUNT(*) FROM {}", self.qualified(target)?))
    }

    pub fn column_type(self, ty: DataType) -> &'static str {
        match (self, ty) {
            (Dialect::Postgres, DataType::Text) => "TEXT",
            (Dialect::Redshift, DataType::Text) => "VARCHAR(65535)",
            (Dialect::Postgres | Dialect::Redshift, DataType::Float) => "DOUBLE PRECISION",
            (Dialect::MySql, DataType::Text) => "TEXT",
            (Dialect::MySql, DataType::Float) => "DOUBLE",
            (Dialect::MySql, DataType::Timestamp) => "DATETIME(6)",
            (Dialect::MsSql, DataType::Text) => "NVARCHAR(MAX)",
            (Dialect::MsSql, DataType::Float) => "FLOAT",
            (Dialect::MsSql, DataType::Boolean) => "BIT",
            (Dialect::MsSql, DataType::Timestamp) => "DATETIME2",
            (Dialect::Oracle, DataType::Text) => "VARCHAR2(4000)",
            (Dialect::Oracle, DataType::Integer) => "NUMBER(19)",
            (Dialect::Oracle, DataType::Float) => "BINARY_DOUBLE",
            (Dialect::Oracle, DataType::Boolean) => "NUMBER(1)",
            (Dialect::Sqlite, DataType::Text) => "TEXT",
            (Dialect::Sqlite, DataType::Integer) => "INTEGER",
            (Dialect::Sqlite, DataType::Float) => "REAL",
            (Dialect::DuckDb, DataType::Text) => "VARCHAR",
            (Dialect::DuckDb, DataType::Float) => "DOUBLE",
            (Dialect::Odbc, DataType::Text) => "VARCHAR(4000)",
            (Dialect::Odbc, DataType::Float) => "FLOAT",
            (Dialect::Odbc, DataType::Boolean) => "SMALLINT",
            (_, DataType::Integer) => "BIGINT",
            (_, DataType::Boolean) => "BOOLEAN",
            (_, DataType::Timestamp) => "TIMESTAMP",
        }
    }

    pub fn create_table_sql(
        self,
        target: &TableRef,
        columns: &[(&str, DataType)],
    ) -> Result<String, DomainError> {
        if columns.is_empty() {
            return Err(DomainError::Schema(format!(
                "cannot create table {} without columns",
                target
            )));
        }
        let defs = columns
            .iter()
            .map(|(name, ty)| format!("{} {}", self.quote(name), self.column_type(*ty)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("CREATE TABLE {} ({})", self.qualified(target)?, defs))
    }

    /// `INSERT ... VALUES` for `rows` rows, placeholders numbered row-major.
    pub fn insert_sql(
        self,
        target: &TableRef,
        columns: &[&str],
        rows: usize,
    ) -> Result<String, DomainError> {
        let names = columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut n = 0;
        let tuples = (0..rows.max(1))
            .map(|_| {
                let slots = columns
                    .iter()
                    .map(|_| {
                        n += 1;
                        self.placeholder(n)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", slots)
            })
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.qualified(target)?,
            names,
            tuples
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn orders() -> TableRef {
        TableRef::table("orders").with_schema("sales")
    }

    #[test]
    fn test_quote_styles() {
        assert_eq!(Dialect::Postgres.quote("a b"), "\"a b\"");
        assert_eq!(Dialect::MySql.quote("order"), "`order`");
        assert_eq!(Dialect::MsSql.quote("order"), "[order]");
        assert_eq!(Dialect::Postgres.quote("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_sqlite_ignores_schema() {
        let name = Dialect::Sqlite.qualified(&orders()).unwrap();
        assert_eq!(name, "\"orders\"");
        let name = Dialect::DuckDb.qualified(&orders()).unwrap();
        assert_eq!(name, "\"sales\".\"orders\"");
    }

    #[test]
    fn test_truncate_statements() {
        insta::assert_snapshot!(Dialect::Sqlite.truncate_sql(&orders()).unwrap(), @r#"DELETE FROM "orders""#);
        insta::assert_snapshot!(Dialect::DuckDb.truncate_sql(&orders()).unwrap(), @r#"DELETE FROM "sales"."orders""#);
        insta::assert_snapshot!(Dialect::MsSql.truncate_sql(&orders()).unwrap(), @"TRUNCATE TABLE [sales].[orders]");
    }

    #[test]
    fn test_drop_statements() {
        insta::assert_snapshot!(
            Dialect::Postgres.drop_sql(&orders()).unwrap(),
            @r#"DROP TABLE IF EXISTS "sales"."orders""#
        );
        insta::assert_snapshot!(
            Dialect::MsSql.drop_sql(&TableRef::table("orders")).unwrap(),
            @"IF OBJECT_ID(N'[orders]', N'U') IS NOT NULL DROP TABLE [orders]"
        );
        let oracle = Dialect::Oracle.drop_sql(&TableRef::table("orders")).unwrap();
        assert!(oracle.contains("DROP TABLE \"orders\""));
        assert!(oracle.contains("-942"));
    }

    #[test]
    fn test_exists_queries_follow_schema_resolution() {
        let stmt = Dialect::MsSql.exists_query(&TableRef::table("orders")).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = @P1 AND table_name = @P2"
        );
        assert_eq!(
            stmt.params,
            vec![SqlParam::text("dbo"), SqlParam::text("orders")]
        );

        let stmt = Dialect::Postgres.exists_query(&TableRef::table("orders")).unwrap();
        assert_eq!(stmt.params, vec![SqlParam::text("\"orders\"")]);
        let stmt = Dialect::Postgres
            .exists_query(&TableRef::table("orders").with_schema("sales"))
            .unwrap();
        assert_eq!(stmt.params, vec![SqlParam::text("\"sales\".\"orders\"")]);

        let stmt = Dialect::MySql.exists_query(&TableRef::table("orders")).unwrap();
        assert!(stmt.sql.contains("DATABASE()"));
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn test_insert_placeholders() {
        let target = TableRef::table("t");
        insta::assert_snapshot!(
            Dialect::Postgres.insert_sql(&target, &["a", "b"], 2).unwrap(),
            @r#"INSERT INTO "t" ("a", "b") VALUES ($1, $2), ($3, $4)"#
        );
        insta::assert_snapshot!(
            Dialect::MsSql.insert_sql(&target, &["a"], 2).unwrap(),
            @"INSERT INTO [t] ([a]) VALUES (@P1), (@P2)"
        );
        insta::assert_snapshot!(
            Dialect::Sqlite.insert_sql(&target, &["a", "b"], 1).unwrap(),
            @r#"INSERT INTO "t" ("a", "b") VALUES (?, ?)"#
        );
    }

    #[test]
    fn test_create_table() {
        let sql = Dialect::MySql
            .create_table_sql(
                &TableRef::table("t"),
                &[("id", DataType::Integer), ("at", DataType::Timestamp)],
            )
            .unwrap();
        assert_eq!(sql, "CREATE TABLE `t` (`id` BIGINT, `at` DATETIME(6))");
        assert!(Dialect::MySql.create_table_sql(&TableRef::table("t"), &[]).is_err());
    }

    #[test]
    fn test_batch_size_respects_parameter_limit() {
        assert_eq!(Dialect::MsSql.batch_size(10), 209);
        assert_eq!(Dialect::Postgres.batch_size(10), MAX_BATCH_ROWS);
        assert_eq!(Dialect::MsSql.batch_size(5000), 1);
        assert_eq!(Dialect::Sqlite.batch_size(0), MAX_BATCH_ROWS);
    }
}
