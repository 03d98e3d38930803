//! PostgreSQL adapter.
//!
//! Each operation opens a single-connection `PgPool`, reconciles the table,
//! runs, and closes the pool before returning. Flags are native `BOOLEAN`s.

use crate::db::schema::{self, RECORD_COLUMNS, render};
use crate::db::store::{BatchAtomicity, ColumnStore, ReconcileReport, StoreSettings};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{ColumnRecord, DatabaseType, NdmoClassification, SensitivityFlags};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::future::Future;
use tracing::{debug, info, warn};

mod queries {
    pub const SELECT_ALL: &str = "SELECT {columns} FROM {table} ORDER BY column_name ASC";

    pub const INSERT: &str = r#"
        INSERT INTO {table} ({columns})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {columns}
        "#;

    pub const UPDATE: &str = r#"
        UPDATE {table}
        SET description = $2,
            ndmo_classification = $3,
            reason_ndmo = $4,
            pii = $5,
            phi = $6,
            pfi = $7,
            psi = $8,
            pci = $9,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {columns}
        "#;

    pub const DELETE_BY_ID: &str = "DELETE FROM {table} WHERE id = $1";

    pub const DELETE_ALL: &str = "DELETE FROM {table}";
}

/// Row shape as stored in Postgres.
#[derive(Debug, sqlx::FromRow)]
struct ColumnRow {
    id: String,
    column_name: String,
    description: String,
    ndmo_classification: String,
    reason_ndmo: Option<String>,
    pii: bool,
    phi: bool,
    pfi: bool,
    psi: bool,
    pci: bool,
}

impl From<ColumnRow> for ColumnRecord {
    fn from(row: ColumnRow) -> Self {
        Self {
            id: row.id,
            column_name: row.column_name,
            description: row.description,
            ndmo_classification: NdmoClassification::from_str_or_default(&row.ndmo_classification),
            reason_ndmo: row.reason_ndmo,
            flags: SensitivityFlags {
                pii: row.pii,
                phi: row.phi,
                pfi: row.pfi,
                psi: row.psi,
                pci: row.pci,
            },
        }
    }
}

pub struct PostgresStore {
    /// Contains credentials - never log
    connection_string: String,
    settings: StoreSettings,
}

impl PostgresStore {
    pub fn new(connection_string: impl Into<String>, settings: StoreSettings) -> Self {
        Self {
            connection_string: connection_string.into(),
            settings,
        }
    }

    fn sql(&self, template: &str) -> String {
        render(template, &self.settings.table).replace("{columns}", RECORD_COLUMNS)
    }

    /// Open a one-connection pool and reconcile the table.
    async fn open(&self) -> CatalogResult<(PgPool, ReconcileReport)> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .acquire_timeout(self.settings.connect_timeout)
            .connect(&self.connection_string)
            .await
            .map_err(connect_error)?;

        match schema::postgres::reconcile(&pool, &self.settings.table).await {
            Ok(report) => Ok((pool, report)),
            Err(e) => {
                pool.close().await;
                Err(e.into_schema_setup(&self.settings.table))
            }
        }
    }

    /// Run `op` against a freshly opened pool, closing it afterwards.
    async fn with_pool<T, F, Fut>(&self, op: F) -> CatalogResult<T>
    where
        F: FnOnce(PgPool) -> Fut,
        Fut: Future<Output = CatalogResult<T>>,
    {
        let (pool, _) = self.open().await?;
        let result = op(pool.clone()).await;
        pool.close().await;
        result
    }
}

/// Anything failing before the pool is up is a connectivity problem,
/// including authentication rejected by the server.
fn connect_error(err: sqlx::Error) -> CatalogError {
    match CatalogError::from(err) {
        CatalogError::Database { message, .. } => CatalogError::connection(
            message,
            "Check the user name, password and database in the connection string",
        ),
        other => other,
    }
}

#[async_trait]
impl ColumnStore for PostgresStore {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn batch_atomicity(&self) -> BatchAtomicity {
        BatchAtomicity::Transactional
    }

    async fn test_connection(&self) -> CatalogResult<ReconcileReport> {
        let (pool, report) = self.open().await?;
        pool.close().await;
        Ok(report)
    }

    async fn fetch_all(&self) -> CatalogResult<Vec<ColumnRecord>> {
        let sql = self.sql(queries::SELECT_ALL);
        self.with_pool(|pool| async move {
            let rows = sqlx::query_as::<_, ColumnRow>(&sql)
                .fetch_all(&pool)
                .await?;
            debug!(count = rows.len(), "Fetched PostgreSQL column records");
            Ok(rows.into_iter().map(ColumnRecord::from).collect())
        })
        .await
    }

    async fn insert_one(&self, record: &ColumnRecord) -> CatalogResult<ColumnRecord> {
        let sql = self.sql(queries::INSERT);
        self.with_pool(|pool| async move {
            let row = bind_insert(sqlx::query_as::<_, ColumnRow>(&sql), record)
                .fetch_one(&pool)
                .await
                .map_err(|e| CatalogError::from(e).on_insert(&record.id))?;
            Ok(ColumnRecord::from(row))
        })
        .await
    }

    async fn insert_many(&self, records: &[ColumnRecord]) -> CatalogResult<u64> {
        let sql = self.sql(queries::INSERT);
        self.with_pool(|pool| async move {
            let mut tx = pool.begin().await?;
            for record in records {
                let result = bind_insert(sqlx::query_as::<_, ColumnRow>(&sql), record)
                    .fetch_one(&mut *tx)
                    .await;
                if let Err(e) = result {
                    warn!(id = %record.id, "Batch insert failed, rolling back");
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(error = %rollback_err, "Rollback failed");
                    }
                    return Err(CatalogError::from(e).on_insert(&record.id));
                }
            }
            tx.commit().await?;
            info!(count = records.len(), "Committed PostgreSQL batch insert");
            Ok(records.len() as u64)
        })
        .await
    }

    async fn update_by_id(&self, record: &ColumnRecord) -> CatalogResult<ColumnRecord> {
        let sql = self.sql(queries::UPDATE);
        self.with_pool(|pool| async move {
            let row = sqlx::query_as::<_, ColumnRow>(&sql)
                .bind(&record.id)
                .bind(&record.description)
                .bind(record.ndmo_classification.as_str())
                .bind(record.reason())
                .bind(record.flags.pii)
                .bind(record.flags.phi)
                .bind(record.flags.pfi)
                .bind(record.flags.psi)
                .bind(record.flags.pci)
                .fetch_optional(&pool)
                .await?;
            row.map(ColumnRecord::from)
                .ok_or_else(|| CatalogError::not_found(&record.id))
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> CatalogResult<()> {
        let sql = self.sql(queries::DELETE_BY_ID);
        self.with_pool(|pool| async move {
            let result = sqlx::query(&sql).bind(id).execute(&pool).await?;
            if result.rows_affected() == 0 {
                return Err(CatalogError::not_found(id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_all(&self) -> CatalogResult<u64> {
        let sql = self.sql(queries::DELETE_ALL);
        self.with_pool(|pool| async move {
            let result = sqlx::query(&sql).execute(&pool).await?;
            Ok(result.rows_affected())
        })
        .await
    }
}

type RowQuery<'q> = sqlx::query::QueryAs<'q, sqlx::Postgres, ColumnRow, sqlx::postgres::PgArguments>;

fn bind_insert<'q>(query: RowQuery<'q>, record: &'q ColumnRecord) -> RowQuery<'q> {
    query
        .bind(&record.id)
        .bind(&record.column_name)
        .bind(&record.description)
        .bind(record.ndmo_classification.as_str())
        .bind(record.reason())
        .bind(record.flags.pii)
        .bind(record.flags.phi)
        .bind(record.flags.pfi)
        .bind(record.flags.psi)
        .bind(record.flags.pci)
}
