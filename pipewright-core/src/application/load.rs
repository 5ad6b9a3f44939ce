// pipewright-core/src/application/load.rs

use tracing::{debug, info, instrument, warn};

use crate::domain::dataset::Dataset;
use crate::domain::error::DomainError;
use crate::domain::pipeline::{LoadMode, TableRef, WriteMode};
use crate::error::EtlError;
use crate::ports::connector::Connector;

/// Writes `data` to `target` following `mode`, then checks the row count
/// when the backend can report one. Returns the number of rows written.
///
/// The clear and the insert are separate statements: a failure in between
/// leaves the target cleared.
#[instrument(skip(connector, data), fields(backend = %connector.backend(), table = %target, mode = %mode))]
pub async fn load(
    connector: &mut dyn Connector,
    mode: LoadMode,
    data: &Dataset,
    target: &TableRef,
) -> Result<u64, EtlError> {
    let before = match mode {
        LoadMode::Append => row_count_if_exists(connector, target).await?,
        LoadMode::TruncateAndLoad | LoadMode::DropAndLoad => None,
    };

    let written = match mode {
        LoadMode::Append => connector.write(data, target, WriteMode::Append).await?,
        LoadMode::TruncateAndLoad => {
            if connector.table_exists(target).await? {
                connector.truncate(target).await?;
            } else {
                warn!("⚠️ Target {} does not exist yet, skipping truncate", target);
            }
            connector.write(data, target, WriteMode::Append).await?
        }
        LoadMode::DropAndLoad => {
            connector.drop_table(target).await?;
            connector.write(data, target, WriteMode::Replace).await?
        }
    };

    verify(connector, target, mode, before, written).await?;
    info!("📥 Loaded {} rows into {} ({})", written, target, mode);
    Ok(written)
}

async fn verify(
    connector: &mut dyn Connector,
    target: &TableRef,
    mode: LoadMode,
    before: Option<u64>,
    written: u64,
) -> Result<(), EtlError> {
    // Nothing was created for a dataset without columns
    if written == 0 && !connector.table_exists(target).await? {
        return Ok(());
    }
    let Some(actual) = connector.row_count(target).await? else {
        debug!("Backend cannot count rows, skipping verification");
        return Ok(());
    };

    let expected = match mode {
        LoadMode::Append => before.unwrap_or(0) + written,
        LoadMode::TruncateAndLoad | LoadMode::DropAndLoad => written,
    };
    if actual != expected {
        return Err(DomainError::Validation(format!(
            "{} holds {} rows after {}, expected {}",
            target, actual, mode, expected
        ))
        .into());
    }
    debug!("Row count verified: {}", actual);
    Ok(())
}

async fn row_count_if_exists(
    connector: &mut dyn Connector,
    target: &TableRef,
) -> Result<Option<u64>, EtlError> {
    if connector.table_exists(target).await? {
        connector.row_count(target).await
    } else {
        Ok(Some(0))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::dataset::Value;
    use crate::domain::pipeline::Backend;
    use anyhow::Result;
    use async_trait::async_trait;

    /// In-memory table that records every call.
    #[derive(Default)]
    struct MockConnector {
        table: Option<u64>,
        calls: Vec<&'static str>,
        countable: bool,
        /// Rows the fake reports on top of what was written
        phantom_rows: u64,
    }

    #[async_trait]
    impl Connector for MockConnector {
        fn backend(&self) -> Backend {
            Backend::Sqlite
        }

        async fn read(&mut self, _query: Option<&str>) -> Result<Dataset, EtlError> {
            self.calls.push("read");
            Ok(Dataset::default())
        }

        async fn write(
            &mut self,
            data: &Dataset,
            _target: &TableRef,
            mode: WriteMode,
        ) -> Result<u64, EtlError> {
            self.calls.push(match mode {
                WriteMode::Append => "write_append",
                WriteMode::Replace => "write_replace",
            });
            let rows = data.row_count() as u64;
            self.table = Some(match mode {
                WriteMode::Append => self.table.unwrap_or(0) + rows,
                WriteMode::Replace => rows,
            });
            Ok(rows)
        }

        async fn table_exists(&mut self, _target: &TableRef) -> Result<bool, EtlError> {
            Ok(self.table.is_some())
        }

        async fn truncate(&mut self, _target: &TableRef) -> Result<(), EtlError> {
            self.calls.push("truncate");
            if self.table.is_some() {
                self.table = Some(0);
            }
            Ok(())
        }

        async fn drop_table(&mut self, _target: &TableRef) -> Result<(), EtlError> {
            self.calls.push("drop");
            self.table = None;
            Ok(())
        }

        async fn row_count(&mut self, _target: &TableRef) -> Result<Option<u64>, EtlError> {
            Ok(self
                .countable
                .then(|| self.table.unwrap_or(0) + self.phantom_rows))
        }
    }

    fn rows(n: i64) -> Dataset {
        Dataset::from_rows(
            vec!["id".into()],
            (0..n).map(|i| vec![Value::Integer(i)]).collect(),
        )
        .unwrap()
    }

    fn target() -> TableRef {
        TableRef::table("t")
    }

    #[tokio::test]
    async fn test_truncate_and_load_skips_truncate_when_missing() -> Result<()> {
        let mut mock = MockConnector {
            countable: true,
            ..Default::default()
        };
        let written = load(&mut mock, LoadMode::TruncateAndLoad, &rows(3), &target()).await?;
        assert_eq!(written, 3);
        assert_eq!(mock.calls, vec!["write_append"]);

        load(&mut mock, LoadMode::TruncateAndLoad, &rows(2), &target()).await?;
        assert_eq!(mock.calls, vec!["write_append", "truncate", "write_append"]);
        assert_eq!(mock.table, Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_drop_and_load_drops_unconditionally() -> Result<()> {
        let mut mock = MockConnector::default();
        load(&mut mock, LoadMode::DropAndLoad, &rows(1), &target()).await?;
        assert_eq!(mock.calls, vec!["drop", "write_replace"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_append_verifies_previous_plus_written() -> Result<()> {
        let mut mock = MockConnector {
            table: Some(5),
            countable: true,
            ..Default::default()
        };
        assert_eq!(load(&mut mock, LoadMode::Append, &rows(2), &target()).await?, 2);
        assert_eq!(mock.calls, vec!["write_append"]);
        assert_eq!(mock.table, Some(7));
        Ok(())
    }

    #[tokio::test]
    async fn test_count_mismatch_is_validation_error() {
        let mut mock = MockConnector {
            countable: true,
            phantom_rows: 1,
            ..Default::default()
        };
        let err = load(&mut mock, LoadMode::DropAndLoad, &rows(2), &target())
            .await
            .unwrap_err();
        assert_eq!(err.tag(), "ValidationError");
    }

    #[tokio::test]
    async fn test_zero_rows_is_success() -> Result<()> {
        let mut mock = MockConnector {
            countable: true,
            ..Default::default()
        };
        let written = load(&mut mock, LoadMode::TruncateAndLoad, &rows(0), &target()).await?;
        assert_eq!(written, 0);
        Ok(())
    }
}
