//! Dispatch of logical operations to the dialect adapter for a connection string.
//!
//! Dialects without an adapter get an `Unsupported` error before any I/O.

use crate::db::oracle::OracleStore;
use crate::db::postgres::PostgresStore;
use crate::db::store::{BatchAtomicity, ColumnStore, ReconcileReport, StoreSettings};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{ColumnRecord, DatabaseType, OracleConnectParams, mask_connection_string};
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Logical persistence operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    TestConnection,
    FetchColumns,
    InsertColumn,
    BatchInsertColumns,
    UpdateColumn,
    DeleteColumn,
    DeleteAllColumns,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TestConnection => "test_connection",
            Self::FetchColumns => "fetch_columns",
            Self::InsertColumn => "insert_column",
            Self::BatchInsertColumns => "batch_insert_columns",
            Self::UpdateColumn => "update_column",
            Self::DeleteColumn => "delete_column",
            Self::DeleteAllColumns => "delete_all_columns",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a batch insert.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BatchInsertReport {
    pub inserted: u64,
    pub atomicity: BatchAtomicity,
}

/// Outcome of a connection test.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ConnectionReport {
    pub db_type: DatabaseType,
    pub table: String,
    pub reconcile: ReconcileReport,
}

/// Routes each operation to the adapter matching the detected dialect.
#[derive(Debug, Clone, Default)]
pub struct PersistenceRouter {
    settings: StoreSettings,
}

impl PersistenceRouter {
    pub fn new(settings: StoreSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Build the adapter for `connection_string`.
    ///
    /// `db_type` overrides detection when the caller already knows the dialect.
    pub fn store_for(
        &self,
        operation: Operation,
        connection_string: &str,
        db_type: Option<DatabaseType>,
    ) -> CatalogResult<Box<dyn ColumnStore>> {
        let connection_string = connection_string.trim();
        if connection_string.is_empty() {
            return Err(CatalogError::invalid_input("Connection string is required"));
        }

        let db_type = db_type.unwrap_or_else(|| DatabaseType::detect(connection_string));
        debug!(
            operation = %operation,
            db_type = %db_type,
            target = %mask_connection_string(connection_string),
            "Routing operation"
        );

        match db_type {
            DatabaseType::Postgres => Ok(Box::new(PostgresStore::new(
                connection_string,
                self.settings.clone(),
            ))),
            DatabaseType::Oracle => {
                let params = OracleConnectParams::parse(connection_string)
                    .map_err(|e| CatalogError::invalid_input(e.to_string()))?;
                Ok(Box::new(OracleStore::new(params, self.settings.clone())))
            }
            DatabaseType::Hive | DatabaseType::Unknown => {
                Err(CatalogError::unsupported(operation.name(), db_type.tag()))
            }
        }
    }

    pub async fn test_connection(
        &self,
        connection_string: &str,
        db_type: Option<DatabaseType>,
    ) -> CatalogResult<ConnectionReport> {
        let store = self.store_for(Operation::TestConnection, connection_string, db_type)?;
        let reconcile = store.test_connection().await?;
        info!(
            db_type = %store.db_type(),
            table = %self.settings.table,
            summary = %reconcile.summary(),
            "Connection test succeeded"
        );
        Ok(ConnectionReport {
            db_type: store.db_type(),
            table: self.settings.table.clone(),
            reconcile,
        })
    }

    pub async fn fetch_columns(&self, connection_string: &str) -> CatalogResult<Vec<ColumnRecord>> {
        let store = self.store_for(Operation::FetchColumns, connection_string, None)?;
        store.fetch_all().await
    }

    pub async fn insert_column(
        &self,
        connection_string: &str,
        mut record: ColumnRecord,
    ) -> CatalogResult<ColumnRecord> {
        record.ensure_id();
        record.validate().map_err(CatalogError::invalid_input)?;
        let store = self.store_for(Operation::InsertColumn, connection_string, None)?;
        let stored = store.insert_one(&record).await?;
        info!(id = %stored.id, column = %stored.column_name, "Inserted column record");
        Ok(stored)
    }

    /// Insert every record as one unit. An empty batch succeeds without I/O.
    pub async fn batch_insert_columns(
        &self,
        connection_string: &str,
        mut records: Vec<ColumnRecord>,
    ) -> CatalogResult<BatchInsertReport> {
        let store = self.store_for(Operation::BatchInsertColumns, connection_string, None)?;
        if records.is_empty() {
            return Ok(BatchInsertReport {
                inserted: 0,
                atomicity: store.batch_atomicity(),
            });
        }

        let mut seen = HashSet::with_capacity(records.len());
        for (index, record) in records.iter_mut().enumerate() {
            record.ensure_id();
            record
                .validate()
                .map_err(|e| CatalogError::invalid_input(format!("Record {}: {}", index + 1, e)))?;
            if !seen.insert(record.id.clone()) {
                return Err(CatalogError::invalid_input(format!(
                    "Record {}: id '{}' appears more than once in the batch",
                    index + 1,
                    record.id
                )));
            }
        }

        let inserted = store.insert_many(&records).await?;
        info!(count = inserted, atomicity = ?store.batch_atomicity(), "Batch insert complete");
        Ok(BatchInsertReport {
            inserted,
            atomicity: store.batch_atomicity(),
        })
    }

    pub async fn update_column(
        &self,
        connection_string: &str,
        record: ColumnRecord,
    ) -> CatalogResult<ColumnRecord> {
        if record.id.trim().is_empty() {
            return Err(CatalogError::invalid_input("id is required for update"));
        }
        let store = self.store_for(Operation::UpdateColumn, connection_string, None)?;
        let updated = store.update_by_id(&record).await?;
        info!(id = %updated.id, "Updated column record");
        Ok(updated)
    }

    pub async fn delete_column(&self, connection_string: &str, id: &str) -> CatalogResult<()> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CatalogError::invalid_input("id is required for delete"));
        }
        let store = self.store_for(Operation::DeleteColumn, connection_string, None)?;
        store.delete_by_id(id).await?;
        info!(id = %id, "Deleted column record");
        Ok(())
    }

    pub async fn delete_all_columns(&self, connection_string: &str) -> CatalogResult<u64> {
        let store = self.store_for(Operation::DeleteAllColumns, connection_string, None)?;
        let removed = store.delete_all().await?;
        info!(removed, table = %self.settings.table, "Cleared classification table");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const HIVE: &str = "jdbc:hive2://localhost:10000/default";

    #[test]
    fn test_store_for_dialects() {
        let router = PersistenceRouter::default();
        let pg = router
            .store_for(Operation::FetchColumns, "postgres://u:p@localhost/db", None)
            .unwrap();
        assert_eq!(pg.db_type(), DatabaseType::Postgres);

        let ora = router
            .store_for(Operation::FetchColumns, "scott/tiger@db:1521/service_name", None)
            .unwrap();
        assert_eq!(ora.db_type(), DatabaseType::Oracle);
    }

    #[test]
    fn test_explicit_db_type_overrides_detection() {
        let router = PersistenceRouter::default();
        let err = router
            .store_for(
                Operation::TestConnection,
                "postgres://u:p@localhost/db",
                Some(DatabaseType::Hive),
            )
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_malformed_oracle_string_is_invalid_input() {
        let router = PersistenceRouter::default();
        let err = router
            .store_for(Operation::FetchColumns, "oracle:missing-credentials", None)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_unsupported_dialects_never_connect() {
        let router = PersistenceRouter::default();
        for target in [HIVE, "mysql://localhost/db", "something else"] {
            let err = router.fetch_columns(target).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unsupported);
            assert!(err.to_string().contains("not supported for database type"));

            let err = router.delete_all_columns(target).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unsupported);
        }
    }

    #[tokio::test]
    async fn test_empty_connection_string_is_invalid_input() {
        let router = PersistenceRouter::default();
        let err = router.fetch_columns("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_validation_precedes_io() {
        let router = PersistenceRouter::default();
        let err = router
            .insert_column("postgres://u:p@127.0.0.1:1/db", ColumnRecord::new("  "))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut record = ColumnRecord::new("email");
        record.id = String::new();
        let err = router
            .update_column("postgres://u:p@127.0.0.1:1/db", record)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = router
            .delete_column("postgres://u:p@127.0.0.1:1/db", "")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_batch_rejects_repeated_ids() {
        let router = PersistenceRouter::default();
        let first = ColumnRecord::new("email");
        let mut second = ColumnRecord::new("email");
        second.id = first.id.clone();
        let err = router
            .batch_insert_columns("postgres://u:p@127.0.0.1:1/db", vec![first, second])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("more than once"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_noop() {
        let router = PersistenceRouter::default();
        let report = router
            .batch_insert_columns("postgres://u:p@127.0.0.1:1/db", Vec::new())
            .await
            .unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.atomicity, BatchAtomicity::Transactional);
    }
}
