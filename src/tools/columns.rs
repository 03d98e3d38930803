//! Column record tools.
//!
//! This module implements `detect_db_type`, `test_connection`, the CRUD tools
//! on the classification table and `find_duplicate_names`.

use crate::db::{BatchInsertReport, ConnectionReport};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{ColumnInput, ColumnRecord, DatabaseType, duplicate_names};
use crate::tools::ToolContext;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the detect_db_type tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DetectDbTypeInput {
    /// Connection string to classify. Defaults to the server's configured database.
    #[serde(default)]
    pub connection_string: Option<String>,
}

/// Output from the detect_db_type tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DetectDbTypeOutput {
    /// One of postgres, oracle, hive, unknown
    pub db_type: DatabaseType,
    pub display_name: String,
    /// Whether column records can be stored in this database
    pub supported: bool,
}

/// Input for the test_connection tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TestConnectionInput {
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Dialect tag from detect_db_type. Detected from the connection string when omitted.
    #[serde(default)]
    pub db_type: Option<DatabaseType>,
}

/// Input for the fetch_columns tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct FetchColumnsInput {
    #[serde(default)]
    pub connection_string: Option<String>,
}

/// Output from the fetch_columns tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FetchColumnsOutput {
    /// Records ordered by column name
    pub columns: Vec<ColumnRecord>,
    pub count: usize,
}

/// Input for the insert_column tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct InsertColumnInput {
    #[serde(default)]
    pub connection_string: Option<String>,
    /// The record to store. An id is generated when omitted.
    pub column: ColumnInput,
}

/// Input for the batch_insert_columns tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BatchInsertColumnsInput {
    #[serde(default)]
    pub connection_string: Option<String>,
    pub columns: Vec<ColumnInput>,
}

/// Input for the update_column tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateColumnInput {
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Full record including its id. The column name is not changed.
    pub column: ColumnInput,
}

/// Input for the delete_column tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteColumnInput {
    #[serde(default)]
    pub connection_string: Option<String>,
    pub id: String,
}

/// Output from the delete_column tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DeleteColumnOutput {
    pub id: String,
}

/// Input for the delete_all_columns tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct DeleteAllColumnsInput {
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Must be true. Deleting every record cannot be undone.
    #[serde(default)]
    pub confirm: bool,
}

/// Output from the delete_all_columns tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DeleteAllColumnsOutput {
    pub removed: u64,
}

/// Input for the find_duplicate_names tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct FindDuplicateNamesInput {
    #[serde(default)]
    pub connection_string: Option<String>,
}

/// A column name stored more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DuplicateName {
    pub column_name: String,
    pub count: usize,
    pub ids: Vec<String>,
}

/// Output from the find_duplicate_names tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FindDuplicateNamesOutput {
    pub duplicates: Vec<DuplicateName>,
    pub total_columns: usize,
}

pub struct ColumnToolHandler {
    ctx: Arc<ToolContext>,
}

impl ColumnToolHandler {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    /// Never fails. The configured default is used only when no string is given;
    /// an explicit empty string classifies as unknown.
    pub fn detect_db_type(&self, input: DetectDbTypeInput) -> DetectDbTypeOutput {
        let target = input
            .connection_string
            .as_deref()
            .or(self.ctx.default_connection())
            .unwrap_or_default();
        let db_type = DatabaseType::detect(target);
        DetectDbTypeOutput {
            db_type,
            display_name: db_type.display_name().to_string(),
            supported: db_type.has_adapter(),
        }
    }

    pub async fn test_connection(&self, input: TestConnectionInput) -> CatalogResult<ConnectionReport> {
        let target = self.ctx.resolve_connection(input.connection_string.as_deref())?;
        self.ctx.router().test_connection(&target, input.db_type).await
    }

    pub async fn fetch_columns(&self, input: FetchColumnsInput) -> CatalogResult<FetchColumnsOutput> {
        let target = self.ctx.resolve_connection(input.connection_string.as_deref())?;
        let columns = self.ctx.router().fetch_columns(&target).await?;
        Ok(FetchColumnsOutput {
            count: columns.len(),
            columns,
        })
    }

    pub async fn insert_column(&self, input: InsertColumnInput) -> CatalogResult<ColumnRecord> {
        let target = self.ctx.resolve_connection(input.connection_string.as_deref())?;
        self.ctx
            .router()
            .insert_column(&target, ColumnRecord::from(input.column))
            .await
    }

    pub async fn batch_insert_columns(
        &self,
        input: BatchInsertColumnsInput,
    ) -> CatalogResult<BatchInsertReport> {
        let target = self.ctx.resolve_connection(input.connection_string.as_deref())?;
        let records = input.columns.into_iter().map(ColumnRecord::from).collect();
        self.ctx.router().batch_insert_columns(&target, records).await
    }

    pub async fn update_column(&self, input: UpdateColumnInput) -> CatalogResult<ColumnRecord> {
        if input
            .column
            .id
            .as_deref()
            .is_none_or(|id| id.trim().is_empty())
        {
            return Err(CatalogError::invalid_input("column.id is required for update"));
        }
        let target = self.ctx.resolve_connection(input.connection_string.as_deref())?;
        self.ctx
            .router()
            .update_column(&target, ColumnRecord::from(input.column))
            .await
    }

    pub async fn delete_column(&self, input: DeleteColumnInput) -> CatalogResult<DeleteColumnOutput> {
        let target = self.ctx.resolve_connection(input.connection_string.as_deref())?;
        let id = input.id.trim().to_string();
        self.ctx.router().delete_column(&target, &id).await?;
        Ok(DeleteColumnOutput { id })
    }

    pub async fn delete_all_columns(
        &self,
        input: DeleteAllColumnsInput,
    ) -> CatalogResult<DeleteAllColumnsOutput> {
        if !input.confirm {
            return Err(CatalogError::invalid_input(
                "delete_all_columns removes every record and cannot be undone; pass confirm: true",
            ));
        }
        let target = self.ctx.resolve_connection(input.connection_string.as_deref())?;
        let removed = self.ctx.router().delete_all_columns(&target).await?;
        Ok(DeleteAllColumnsOutput { removed })
    }

    pub async fn find_duplicate_names(
        &self,
        input: FindDuplicateNamesInput,
    ) -> CatalogResult<FindDuplicateNamesOutput> {
        let target = self.ctx.resolve_connection(input.connection_string.as_deref())?;
        let columns = self.ctx.router().fetch_columns(&target).await?;
        let duplicates = group_duplicates(&columns);
        info!(
            duplicates = duplicates.len(),
            total = columns.len(),
            "Checked for duplicate column names"
        );
        Ok(FindDuplicateNamesOutput {
            duplicates,
            total_columns: columns.len(),
        })
    }
}

fn group_duplicates(columns: &[ColumnRecord]) -> Vec<DuplicateName> {
    duplicate_names(columns)
        .into_iter()
        .map(|(column_name, count)| {
            let ids = columns
                .iter()
                .filter(|c| c.column_name == column_name)
                .map(|c| c.id.clone())
                .collect();
            DuplicateName {
                column_name,
                count,
                ids,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tools::test_support::context;

    const HIVE: &str = "jdbc:hive2://warehouse:10000/default";

    fn handler(default_connection: Option<&str>) -> ColumnToolHandler {
        ColumnToolHandler::new(context("", default_connection))
    }

    fn column(name: &str, id: Option<&str>) -> ColumnInput {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "columnName": name,
        }))
        .unwrap()
    }

    #[test]
    fn test_detect_db_type() {
        let handler = handler(None);
        let output = handler.detect_db_type(DetectDbTypeInput {
            connection_string: Some("postgresql://u:p@localhost/db".to_string()),
        });
        assert_eq!(output.db_type, DatabaseType::Postgres);
        assert!(output.supported);

        let output = handler.detect_db_type(DetectDbTypeInput::default());
        assert_eq!(output.db_type, DatabaseType::Unknown);
        assert!(!output.supported);
    }

    #[test]
    fn test_detect_uses_default_connection() {
        let output = handler(Some(HIVE)).detect_db_type(DetectDbTypeInput::default());
        assert_eq!(output.db_type, DatabaseType::Hive);
        assert!(!output.supported);
    }

    #[test]
    fn test_detect_empty_string_ignores_default() {
        let output = handler(Some("postgres://u:p@h/db")).detect_db_type(DetectDbTypeInput {
            connection_string: Some(String::new()),
        });
        assert_eq!(output.db_type, DatabaseType::Unknown);
        assert!(!output.supported);
    }

    #[tokio::test]
    async fn test_delete_all_requires_confirm() {
        let err = handler(Some("postgres://u:p@127.0.0.1:1/db"))
            .delete_all_columns(DeleteAllColumnsInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("confirm"));
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let err = handler(Some("postgres://u:p@127.0.0.1:1/db"))
            .update_column(UpdateColumnInput {
                connection_string: None,
                column: column("email", None),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_hive_operations_are_unsupported() {
        let handler = handler(Some(HIVE));
        let err = handler
            .fetch_columns(FetchColumnsInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let err = handler
            .insert_column(InsertColumnInput {
                connection_string: None,
                column: column("email", None),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let err = handler
            .test_connection(TestConnectionInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_missing_connection_is_invalid_input() {
        let err = handler(None)
            .fetch_columns(FetchColumnsInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_group_duplicates() {
        let mut a = ColumnRecord::new("email");
        a.id = "a".to_string();
        let mut b = ColumnRecord::new("email");
        b.id = "b".to_string();
        let c = ColumnRecord::new("phone");
        let groups = group_duplicates(&[a, b, c]);
        assert_eq!(
            groups,
            vec![DuplicateName {
                column_name: "email".to_string(),
                count: 2,
                ids: vec!["a".to_string(), "b".to_string()],
            }]
        );
    }
}
