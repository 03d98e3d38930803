//! Schema reconciliation.
//!
//! Brings the classification table to the expected shape before any data
//! operation runs. Every step is safe to repeat:
//! - missing table: create it with the full column set and an update trigger
//! - legacy unique constraint on `column_name`: drop it (duplicates are allowed)
//! - missing `pci` flag column from older versions: add it with a false default
//!
//! # Architecture
//!
//! SQL text lives in the `queries` submodule, one submodule per dialect, with a
//! `{table}` placeholder for the validated table name. The dialect submodules
//! apply them against a live connection.

use crate::db::store::ReconcileReport;
use crate::error::CatalogResult;
use tracing::{debug, info};

/// Substitute the table name into a query template.
pub(crate) fn render(template: &str, table: &str) -> String {
    template.replace("{table}", table)
}

/// Columns selected for a record, in `ColumnRecord` field order.
pub(crate) const RECORD_COLUMNS: &str =
    "id, column_name, description, ndmo_classification, reason_ndmo, pii, phi, pfi, psi, pci";

// =============================================================================
// SQL Query Templates
// =============================================================================

pub(crate) mod queries {
    pub mod postgres {
        pub const TABLE_EXISTS: &str = r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
            )
            "#;

        pub const CREATE_TABLE: &str = r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                column_name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                ndmo_classification TEXT NOT NULL DEFAULT 'Public',
                reason_ndmo TEXT,
                pii BOOLEAN NOT NULL DEFAULT FALSE,
                phi BOOLEAN NOT NULL DEFAULT FALSE,
                pfi BOOLEAN NOT NULL DEFAULT FALSE,
                psi BOOLEAN NOT NULL DEFAULT FALSE,
                pci BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#;

        pub const TOUCH_FUNCTION: &str = r#"
            CREATE OR REPLACE FUNCTION {table}_touch_updated_at()
            RETURNS TRIGGER AS $$
            BEGIN
                NEW.updated_at = NOW();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql
            "#;

        pub const TRIGGER_EXISTS: &str = r#"
            SELECT EXISTS (
                SELECT 1 FROM pg_trigger
                WHERE tgname = $1 AND tgrelid = $2::regclass
            )
            "#;

        pub const CREATE_TRIGGER: &str = r#"
            CREATE TRIGGER {table}_updated_at
            BEFORE UPDATE ON {table}
            FOR EACH ROW EXECUTE FUNCTION {table}_touch_updated_at()
            "#;

        pub const CONSTRAINT_EXISTS: &str = r#"
            SELECT EXISTS (
                SELECT 1 FROM pg_constraint
                WHERE conname = $1 AND conrelid = $2::regclass AND contype = 'u'
            )
            "#;

        pub const DROP_CONSTRAINT: &str =
            "ALTER TABLE {table} DROP CONSTRAINT IF EXISTS {table}_column_name_key";

        pub const COLUMN_EXISTS: &str = r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.columns
                WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
            )
            "#;

        pub const ADD_PCI_COLUMN: &str =
            "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS pci BOOLEAN NOT NULL DEFAULT FALSE";
    }

    pub mod oracle {
        pub const TABLE_EXISTS: &str = "SELECT COUNT(*) FROM user_tables WHERE table_name = :1";

        // Oracle stores '' as NULL, so free-text columns stay nullable.
        pub const CREATE_TABLE: &str = r#"
            CREATE TABLE {table} (
                id VARCHAR2(64) PRIMARY KEY,
                column_name VARCHAR2(255) NOT NULL,
                description VARCHAR2(4000),
                ndmo_classification VARCHAR2(20) DEFAULT 'Public' NOT NULL,
                reason_ndmo VARCHAR2(4000),
                pii NUMBER(1) DEFAULT 0 NOT NULL,
                phi NUMBER(1) DEFAULT 0 NOT NULL,
                pfi NUMBER(1) DEFAULT 0 NOT NULL,
                psi NUMBER(1) DEFAULT 0 NOT NULL,
                pci NUMBER(1) DEFAULT 0 NOT NULL,
                created_at TIMESTAMP DEFAULT SYSTIMESTAMP NOT NULL,
                updated_at TIMESTAMP DEFAULT SYSTIMESTAMP NOT NULL
            )
            "#;

        pub const CREATE_TRIGGER: &str = r#"
            CREATE OR REPLACE TRIGGER {table}_upd_trg
            BEFORE UPDATE ON {table}
            FOR EACH ROW
            BEGIN
                :NEW.updated_at := SYSTIMESTAMP;
            END;
            "#;

        pub const TRIGGER_EXISTS: &str =
            "SELECT COUNT(*) FROM user_triggers WHERE table_name = :1 AND trigger_name = :2";

        /// Unique constraints whose only column is COLUMN_NAME.
        pub const LEGACY_UNIQUE_CONSTRAINTS: &str = r#"
            SELECT uc.constraint_name
            FROM user_constraints uc
            JOIN user_cons_columns ucc
                ON ucc.constraint_name = uc.constraint_name AND ucc.table_name = uc.table_name
            WHERE uc.table_name = :1
              AND uc.constraint_type = 'U'
              AND ucc.column_name = 'COLUMN_NAME'
              AND (SELECT COUNT(*) FROM user_cons_columns c2
                   WHERE c2.constraint_name = uc.constraint_name) = 1
            "#;

        pub const DROP_CONSTRAINT: &str = "ALTER TABLE {table} DROP CONSTRAINT \"{constraint}\"";

        pub const COLUMN_EXISTS: &str =
            "SELECT COUNT(*) FROM user_tab_columns WHERE table_name = :1 AND column_name = :2";

        pub const ADD_PCI_COLUMN: &str = "ALTER TABLE {table} ADD (pci NUMBER(1) DEFAULT 0 NOT NULL)";
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

pub(crate) mod postgres {
    use super::*;
    use sqlx::{Executor, PgPool};

    pub async fn reconcile(pool: &PgPool, table: &str) -> CatalogResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        let exists: bool = sqlx::query_scalar(queries::postgres::TABLE_EXISTS)
            .bind(table)
            .fetch_one(pool)
            .await?;

        if !exists {
            pool.execute(render(queries::postgres::CREATE_TABLE, table).as_str()).await?;
            report.created_table = true;
            info!(table = %table, "Created classification table");
        } else {
            let legacy_constraint = format!("{}_column_name_key", table);
            let has_constraint: bool = sqlx::query_scalar(queries::postgres::CONSTRAINT_EXISTS)
                .bind(&legacy_constraint)
                .bind(table)
                .fetch_one(pool)
                .await?;
            if has_constraint {
                pool.execute(render(queries::postgres::DROP_CONSTRAINT, table).as_str()).await?;
                info!(table = %table, constraint = %legacy_constraint, "Dropped legacy unique constraint");
                report.dropped_constraints.push(legacy_constraint);
            }

            let has_pci: bool = sqlx::query_scalar(queries::postgres::COLUMN_EXISTS)
                .bind(table)
                .bind("pci")
                .fetch_one(pool)
                .await?;
            if !has_pci {
                pool.execute(render(queries::postgres::ADD_PCI_COLUMN, table).as_str()).await?;
                info!(table = %table, "Added missing pci column");
                report.added_columns.push("pci".to_string());
            }
        }

        let trigger = format!("{}_updated_at", table);
        let has_trigger: bool = sqlx::query_scalar(queries::postgres::TRIGGER_EXISTS)
            .bind(&trigger)
            .bind(table)
            .fetch_one(pool)
            .await?;
        if !has_trigger {
            pool.execute(render(queries::postgres::TOUCH_FUNCTION, table).as_str()).await?;
            pool.execute(render(queries::postgres::CREATE_TRIGGER, table).as_str()).await?;
            report.created_trigger = true;
        }

        debug!(table = %table, summary = %report.summary(), "Reconciled PostgreSQL table");
        Ok(report)
    }
}

pub(crate) mod oracle {
    use super::*;
    use ::oracle::Connection;

    pub fn reconcile(conn: &Connection, table: &str) -> CatalogResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let upper = table.to_uppercase();

        let exists = conn.query_row_as::<i64>(queries::oracle::TABLE_EXISTS, &[&upper])?;

        if exists == 0 {
            conn.execute(&render(queries::oracle::CREATE_TABLE, &upper), &[])?;
            report.created_table = true;
            info!(table = %upper, "Created classification table");
        } else {
            let constraints = conn
                .query_as::<String>(queries::oracle::LEGACY_UNIQUE_CONSTRAINTS, &[&upper])?
                .collect::<Result<Vec<_>, _>>()?;
            for constraint in constraints {
                let sql = render(queries::oracle::DROP_CONSTRAINT, &upper)
                    .replace("{constraint}", &constraint);
                conn.execute(&sql, &[])?;
                info!(table = %upper, constraint = %constraint, "Dropped legacy unique constraint");
                report.dropped_constraints.push(constraint);
            }

            let has_pci =
                conn.query_row_as::<i64>(queries::oracle::COLUMN_EXISTS, &[&upper, &"PCI"])?;
            if has_pci == 0 {
                conn.execute(&render(queries::oracle::ADD_PCI_COLUMN, &upper), &[])?;
                info!(table = %upper, "Added missing PCI column");
                report.added_columns.push("pci".to_string());
            }
        }

        let trigger = format!("{}_UPD_TRG", upper);
        let has_trigger =
            conn.query_row_as::<i64>(queries::oracle::TRIGGER_EXISTS, &[&upper, &trigger])?;
        if has_trigger == 0 {
            conn.execute(&render(queries::oracle::CREATE_TRIGGER, &upper), &[])?;
            report.created_trigger = true;
        }

        debug!(table = %upper, summary = %report.summary(), "Reconciled Oracle table");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_every_placeholder() {
        let sql = render(queries::postgres::CREATE_TRIGGER, "catalog");
        assert!(sql.contains("CREATE TRIGGER catalog_updated_at"));
        assert!(sql.contains("BEFORE UPDATE ON catalog"));
        assert!(sql.contains("catalog_touch_updated_at()"));
        assert!(!sql.contains("{table}"));
    }

    #[test]
    fn test_postgres_create_table_has_every_field() {
        let sql = render(queries::postgres::CREATE_TABLE, "catalog");
        for column in RECORD_COLUMNS.split(", ") {
            assert!(sql.contains(column), "missing {}", column);
        }
        assert!(sql.contains("created_at"));
        assert!(sql.contains("updated_at"));
        assert!(!sql.to_lowercase().contains("unique"));
    }

    #[test]
    fn test_oracle_create_table_uses_numeric_flags() {
        let sql = render(queries::oracle::CREATE_TABLE, "CATALOG");
        assert!(sql.contains("pci NUMBER(1) DEFAULT 0 NOT NULL"));
        assert!(sql.contains("description VARCHAR2(4000),"));
        assert!(!sql.to_lowercase().contains("unique"));
    }

    #[test]
    fn test_postgres_idempotent_ddl() {
        assert!(queries::postgres::CREATE_TABLE.contains("IF NOT EXISTS"));
        assert!(queries::postgres::DROP_CONSTRAINT.contains("IF EXISTS"));
        assert!(queries::postgres::ADD_PCI_COLUMN.contains("IF NOT EXISTS"));
        assert_eq!(
            render(queries::postgres::DROP_CONSTRAINT, "catalog"),
            "ALTER TABLE catalog DROP CONSTRAINT IF EXISTS catalog_column_name_key"
        );
    }
}
