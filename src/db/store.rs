//! The persistence contract every dialect adapter implements.
//!
//! Each call is self-contained: the adapter opens its own connection, brings the
//! table to the expected shape, performs the operation and closes the
//! connection before returning. Nothing is shared between calls.

use crate::error::CatalogResult;
use crate::models::{ColumnRecord, DatabaseType};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use std::time::Duration;

/// Settings shared by all adapters.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Validated, lower-case table name
    pub table: String,
    /// Upper bound for opening a connection
    pub connect_timeout: Duration,
    /// Rows per array-DML round trip (Oracle)
    pub batch_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            table: crate::config::DEFAULT_TABLE_NAME.to_string(),
            connect_timeout: Duration::from_secs(crate::config::DEFAULT_CONNECT_TIMEOUT_SECS),
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
        }
    }
}

/// How a batch insert behaves when one row fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BatchAtomicity {
    /// One INSERT per row inside explicit BEGIN/COMMIT; any failure rolls back every row.
    Transactional,
    /// Array DML in one uncommitted session; a failure aborts the remaining
    /// array executions and the session is rolled back, without an explicit
    /// transaction scope around the batch.
    ArrayDml,
}

impl BatchAtomicity {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Transactional => "single transaction",
            Self::ArrayDml => "array DML, session rollback on failure",
        }
    }
}

/// What schema reconciliation changed on this run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ReconcileReport {
    pub created_table: bool,
    pub created_trigger: bool,
    /// Legacy uniqueness constraints removed from `column_name`
    pub dropped_constraints: Vec<String>,
    /// Columns added to an existing table
    pub added_columns: Vec<String>,
}

impl ReconcileReport {
    /// True when the table already had the expected shape.
    pub fn is_noop(&self) -> bool {
        !self.created_table
            && !self.created_trigger
            && self.dropped_constraints.is_empty()
            && self.added_columns.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.created_table {
            return "created".to_string();
        }
        let mut changes = Vec::new();
        if !self.dropped_constraints.is_empty() {
            changes.push(format!(
                "dropped constraint {}",
                self.dropped_constraints.join(", ")
            ));
        }
        if !self.added_columns.is_empty() {
            changes.push(format!("added column {}", self.added_columns.join(", ")));
        }
        if self.created_trigger {
            changes.push("created update trigger".to_string());
        }
        if changes.is_empty() {
            "up to date".to_string()
        } else {
            changes.join("; ")
        }
    }
}

/// Persistence operations on the classification table.
#[async_trait]
pub trait ColumnStore: Send + Sync {
    /// Dialect served by this adapter.
    fn db_type(&self) -> DatabaseType;

    /// Failure granularity of [`ColumnStore::insert_many`].
    fn batch_atomicity(&self) -> BatchAtomicity;

    /// Open a connection, reconcile the table and close the connection.
    async fn test_connection(&self) -> CatalogResult<ReconcileReport>;

    /// Every row ordered by `column_name` ascending. Empty table yields an empty vector.
    async fn fetch_all(&self) -> CatalogResult<Vec<ColumnRecord>>;

    /// Insert one record. The id must already be assigned.
    async fn insert_one(&self, record: &ColumnRecord) -> CatalogResult<ColumnRecord>;

    /// Insert all records as one unit. Returns the number of rows written.
    async fn insert_many(&self, records: &[ColumnRecord]) -> CatalogResult<u64>;

    /// Update every mutable field of the row with `record.id`.
    async fn update_by_id(&self, record: &ColumnRecord) -> CatalogResult<ColumnRecord>;

    /// Remove one row.
    async fn delete_by_id(&self, id: &str) -> CatalogResult<()>;

    /// Remove every row. Returns the number of rows removed.
    async fn delete_all(&self) -> CatalogResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_report_noop() {
        let report = ReconcileReport::default();
        assert!(report.is_noop());
        assert_eq!(report.summary(), "up to date");
    }

    #[test]
    fn test_reconcile_report_summary() {
        let report = ReconcileReport {
            dropped_constraints: vec!["t_column_name_key".to_string()],
            added_columns: vec!["pci".to_string()],
            ..Default::default()
        };
        assert!(!report.is_noop());
        assert_eq!(
            report.summary(),
            "dropped constraint t_column_name_key; added column pci"
        );

        let created = ReconcileReport {
            created_table: true,
            created_trigger: true,
            ..Default::default()
        };
        assert_eq!(created.summary(), "created");
    }

    #[test]
    fn test_batch_atomicity_serialization() {
        let json = serde_json::to_string(&BatchAtomicity::ArrayDml).unwrap();
        assert_eq!(json, "\"array_dml\"");
    }
}
