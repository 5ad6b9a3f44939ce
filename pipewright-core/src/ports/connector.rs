// pipewright-core/src/ports/connector.rs

// What a pipeline needs from a storage backend, without knowing whether rows
// end up in a CSV file, a workbook or a SQL table.

use crate::domain::dataset::Dataset;
use crate::domain::pipeline::{Backend, TableRef, WriteMode};
use crate::error::EtlError;
use async_trait::async_trait;

/// One storage medium. Each pipeline run owns its connectors exclusively;
/// any session is released when the connector is dropped.
#[async_trait]
pub trait Connector: Send {
    fn backend(&self) -> Backend;

    /// Loads a dataset. SQL backends run `query` verbatim and fail without
    /// one; file backends ignore it and load the whole file or sheet.
    async fn read(&mut self, query: Option<&str>) -> Result<Dataset, EtlError>;

    /// Writes every row of `data`, returning the number written.
    async fn write(
        &mut self,
        data: &Dataset,
        target: &TableRef,
        mode: WriteMode,
    ) -> Result<u64, EtlError>;

    /// Never fails just because the target is missing.
    async fn table_exists(&mut self, target: &TableRef) -> Result<bool, EtlError>;

    /// Removes all rows and keeps the structure. A missing target is a
    /// warning and a no-op.
    async fn truncate(&mut self, target: &TableRef) -> Result<(), EtlError>;

    /// Removes the target if present. Idempotent.
    async fn drop_table(&mut self, target: &TableRef) -> Result<(), EtlError>;

    /// Current row count, for backends that can verify a load.
    async fn row_count(&mut self, _target: &TableRef) -> Result<Option<u64>, EtlError> {
        Ok(None)
    }
}
