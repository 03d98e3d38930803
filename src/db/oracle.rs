//! Oracle adapter.
//!
//! The `oracle` driver is synchronous, so every operation runs on the blocking
//! pool with its own connection. Flags are stored as `NUMBER(1)`.

use crate::db::schema::{self, RECORD_COLUMNS, render};
use crate::db::store::{BatchAtomicity, ColumnStore, ReconcileReport, StoreSettings};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    ColumnRecord, DatabaseType, NdmoClassification, OracleConnectParams, SensitivityFlags,
};
use async_trait::async_trait;
use ::oracle::sql_type::{OracleType, ToSql};
use ::oracle::{Connection, Row};
use tracing::{debug, info, warn};

mod queries {
    pub const SELECT_ALL: &str = "SELECT {columns} FROM {table} ORDER BY column_name ASC";

    pub const SELECT_BY_ID: &str = "SELECT {columns} FROM {table} WHERE id = :1";

    pub const INSERT: &str = r#"
        INSERT INTO {table} ({columns})
        VALUES (:1, :2, :3, :4, :5, :6, :7, :8, :9, :10)
        "#;

    pub const UPDATE: &str = r#"
        UPDATE {table}
        SET description = :2,
            ndmo_classification = :3,
            reason_ndmo = :4,
            pii = :5,
            phi = :6,
            pfi = :7,
            psi = :8,
            pci = :9
        WHERE id = :1
        "#;

    pub const DELETE_BY_ID: &str = "DELETE FROM {table} WHERE id = :1";

    pub const DELETE_ALL: &str = "DELETE FROM {table}";
}

/// Positions of the free-text columns that may be NULL in an INSERT.
const NULLABLE_TEXT_BINDS: [usize; 2] = [3, 5];
const TEXT_BIND_WIDTH: u32 = 4000;

pub struct OracleStore {
    params: OracleConnectParams,
    settings: StoreSettings,
}

impl OracleStore {
    pub fn new(params: OracleConnectParams, settings: StoreSettings) -> Self {
        Self { params, settings }
    }

    fn sql(&self, template: &str) -> String {
        render(template, &self.settings.table).replace("{columns}", RECORD_COLUMNS)
    }

    /// Run `op` on the blocking pool with a freshly reconciled connection.
    ///
    /// Uncommitted work is rolled back when `op` fails; the connection is
    /// closed either way.
    async fn run<T, F>(&self, op: F) -> CatalogResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &StoreSettings) -> CatalogResult<T> + Send + 'static,
    {
        let params = self.params.clone();
        let settings = self.settings.clone();
        tokio::task::spawn_blocking(move || {
            let (conn, _) = open(&params, &settings)?;
            let result = op(&conn, &settings);
            if result.is_err() {
                if let Err(e) = conn.rollback() {
                    warn!(error = %e, "Oracle rollback failed");
                }
            }
            close(conn);
            result
        })
        .await?
    }
}

fn open(
    params: &OracleConnectParams,
    settings: &StoreSettings,
) -> CatalogResult<(Connection, ReconcileReport)> {
    let conn = Connection::connect(&params.username, &params.password, &params.connect_string)
        .map_err(connect_error)?;
    match schema::oracle::reconcile(&conn, &settings.table) {
        Ok(report) => Ok((conn, report)),
        Err(e) => {
            close(conn);
            Err(e.into_schema_setup(&settings.table))
        }
    }
}

fn close(conn: Connection) {
    if let Err(e) = conn.close() {
        warn!(error = %e, "Failed to close Oracle connection");
    }
}

/// Every failure before a session exists is reported as a connectivity problem.
fn connect_error(err: ::oracle::Error) -> CatalogError {
    match CatalogError::from(err) {
        CatalogError::Database { message, .. } => CatalogError::connection(
            message,
            "Check the Oracle user name, password and connect descriptor",
        ),
        other => other,
    }
}

fn flag(value: bool) -> i32 {
    i32::from(value)
}

fn record_from_row(row: &Row) -> CatalogResult<ColumnRecord> {
    let text = |idx: usize| -> CatalogResult<String> {
        Ok(row.get::<usize, Option<String>>(idx)?.unwrap_or_default())
    };
    let boolean = |idx: usize| -> CatalogResult<bool> { Ok(row.get::<usize, i32>(idx)? != 0) };

    Ok(ColumnRecord {
        id: row.get::<usize, String>(0)?,
        column_name: text(1)?,
        description: text(2)?,
        ndmo_classification: NdmoClassification::from_str_or_default(&text(3)?),
        reason_ndmo: row.get::<usize, Option<String>>(4)?,
        flags: SensitivityFlags {
            pii: boolean(5)?,
            phi: boolean(6)?,
            pfi: boolean(7)?,
            psi: boolean(8)?,
            pci: boolean(9)?,
        },
    })
}

/// First row of the array execution that contains row `index`.
///
/// A batch executes each time it fills, so chunks start at multiples of
/// `batch_size`; the trailing execute covers the rows after the last full chunk.
fn chunk_start(index: usize, batch_size: usize) -> usize {
    (index / batch_size) * batch_size
}

/// Attribute an array-DML failure to the row the driver reports, so a
/// unique violation names the clashing id.
fn batch_error(err: ::oracle::Error, binds: &[InsertBinds], chunk_start: usize) -> CatalogError {
    let failed_row = err
        .db_error()
        .map(|db_err| chunk_start + db_err.offset() as usize);
    let mapped = CatalogError::from(err);
    match failed_row.and_then(|row| binds.get(row)) {
        Some(row) => mapped.on_insert(&row.id),
        None => mapped,
    }
}

/// Owned bind values for one INSERT row.
struct InsertBinds {
    id: String,
    column_name: String,
    description: Option<String>,
    ndmo: &'static str,
    reason: Option<String>,
    flags: [i32; 5],
}

impl InsertBinds {
    fn new(record: &ColumnRecord) -> Self {
        let flags = record.flags.as_array().map(flag);
        Self {
            id: record.id.clone(),
            column_name: record.column_name.clone(),
            description: Some(record.description.clone()).filter(|d| !d.is_empty()),
            ndmo: record.ndmo_classification.as_str(),
            reason: record.reason().map(String::from),
            flags,
        }
    }

    fn as_params(&self) -> [&dyn ToSql; 10] {
        [
            &self.id,
            &self.column_name,
            &self.description,
            &self.ndmo,
            &self.reason,
            &self.flags[0],
            &self.flags[1],
            &self.flags[2],
            &self.flags[3],
            &self.flags[4],
        ]
    }
}

#[async_trait]
impl ColumnStore for OracleStore {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::Oracle
    }

    fn batch_atomicity(&self) -> BatchAtomicity {
        BatchAtomicity::ArrayDml
    }

    async fn test_connection(&self) -> CatalogResult<ReconcileReport> {
        let params = self.params.clone();
        let settings = self.settings.clone();
        tokio::task::spawn_blocking(move || {
            let (conn, report) = open(&params, &settings)?;
            close(conn);
            Ok(report)
        })
        .await?
    }

    async fn fetch_all(&self) -> CatalogResult<Vec<ColumnRecord>> {
        let sql = self.sql(queries::SELECT_ALL);
        self.run(move |conn, _| {
            let rows = conn.query(&sql, &[])?;
            let mut records = Vec::new();
            for row in rows {
                records.push(record_from_row(&row?)?);
            }
            debug!(count = records.len(), "Fetched Oracle column records");
            Ok(records)
        })
        .await
    }

    async fn insert_one(&self, record: &ColumnRecord) -> CatalogResult<ColumnRecord> {
        let insert = self.sql(queries::INSERT);
        let select = self.sql(queries::SELECT_BY_ID);
        let binds = InsertBinds::new(record);
        self.run(move |conn, _| {
            conn.execute(&insert, &binds.as_params())
                .map_err(|e| CatalogError::from(e).on_insert(&binds.id))?;
            conn.commit()?;
            let row = conn.query_row(&select, &[&binds.id])?;
            record_from_row(&row)
        })
        .await
    }

    async fn insert_many(&self, records: &[ColumnRecord]) -> CatalogResult<u64> {
        let sql = self.sql(queries::INSERT);
        let binds: Vec<InsertBinds> = records.iter().map(InsertBinds::new).collect();
        self.run(move |conn, settings| {
            let batch_size = settings.batch_size.max(1);
            let mut batch = conn.batch(&sql, batch_size).build()?;
            // NULL in the first row would otherwise fix the bind type too narrow
            for position in NULLABLE_TEXT_BINDS {
                batch.set_type(position, &OracleType::Varchar2(TEXT_BIND_WIDTH))?;
            }
            for (index, row) in binds.iter().enumerate() {
                batch
                    .append_row(&row.as_params())
                    .map_err(|e| batch_error(e, &binds, chunk_start(index, batch_size)))?;
            }
            batch
                .execute()
                .map_err(|e| batch_error(e, &binds, chunk_start(binds.len(), batch_size)))?;
            conn.commit()?;
            info!(count = binds.len(), "Committed Oracle batch insert");
            Ok(binds.len() as u64)
        })
        .await
    }

    async fn update_by_id(&self, record: &ColumnRecord) -> CatalogResult<ColumnRecord> {
        let update = self.sql(queries::UPDATE);
        let select = self.sql(queries::SELECT_BY_ID);
        let record = record.clone();
        self.run(move |conn, _| {
            let description = Some(record.description.as_str()).filter(|d| !d.is_empty());
            let flags = record.flags.as_array().map(flag);
            let stmt = conn.execute(
                &update,
                &[
                    &record.id,
                    &description,
                    &record.ndmo_classification.as_str(),
                    &record.reason(),
                    &flags[0],
                    &flags[1],
                    &flags[2],
                    &flags[3],
                    &flags[4],
                ],
            )?;
            if stmt.row_count()? == 0 {
                return Err(CatalogError::not_found(&record.id));
            }
            conn.commit()?;
            let row = conn.query_row(&select, &[&record.id])?;
            record_from_row(&row)
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> CatalogResult<()> {
        let sql = self.sql(queries::DELETE_BY_ID);
        let id = id.to_string();
        self.run(move |conn, _| {
            let stmt = conn.execute(&sql, &[&id])?;
            if stmt.row_count()? == 0 {
                return Err(CatalogError::not_found(&id));
            }
            conn.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_all(&self) -> CatalogResult<u64> {
        let sql = self.sql(queries::DELETE_ALL);
        self.run(move |conn, _| {
            let stmt = conn.execute(&sql, &[])?;
            let removed = stmt.row_count()?;
            conn.commit()?;
            Ok(removed)
        })
        .await
    }
}
