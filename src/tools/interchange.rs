//! CSV tools.
//!
//! This module implements `import_csv` and `export_csv`.

use crate::db::BatchInsertReport;
use crate::error::CatalogResult;
use crate::interchange::{SkippedRow, export_csv, import_csv};
use crate::models::ColumnRecord;
use crate::tools::ToolContext;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the import_csv tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ImportCsvInput {
    /// CSV text with a header row (e.g. "Column Name,Description,PII")
    pub csv: String,
    /// Store the parsed records with one batch insert
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub connection_string: Option<String>,
}

/// Output from the import_csv tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ImportCsvOutput {
    pub records: Vec<ColumnRecord>,
    /// Rows that were not imported, with their line numbers
    pub skipped: Vec<SkippedRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<BatchInsertReport>,
}

/// Input for the export_csv tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ExportCsvInput {
    #[serde(default)]
    pub connection_string: Option<String>,
}

/// Output from the export_csv tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExportCsvOutput {
    pub csv: String,
    pub count: usize,
}

pub struct CsvToolHandler {
    ctx: Arc<ToolContext>,
}

impl CsvToolHandler {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    pub async fn import_csv(&self, input: ImportCsvInput) -> CatalogResult<ImportCsvOutput> {
        let target = if input.persist {
            Some(self.ctx.resolve_connection(input.connection_string.as_deref())?)
        } else {
            None
        };

        let import = import_csv(&input.csv)?;
        info!(
            records = import.records.len(),
            skipped = import.skipped.len(),
            "Parsed CSV import"
        );

        let persisted = match target {
            Some(target) => Some(
                self.ctx
                    .router()
                    .batch_insert_columns(&target, import.records.clone())
                    .await?,
            ),
            None => None,
        };

        Ok(ImportCsvOutput {
            records: import.records,
            skipped: import.skipped,
            persisted,
        })
    }

    pub async fn export_csv(&self, input: ExportCsvInput) -> CatalogResult<ExportCsvOutput> {
        let target = self.ctx.resolve_connection(input.connection_string.as_deref())?;
        let columns = self.ctx.router().fetch_columns(&target).await?;
        let csv = export_csv(&columns)?;
        Ok(ExportCsvOutput {
            csv,
            count: columns.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::NdmoClassification;
    use crate::tools::test_support::context;

    #[tokio::test]
    async fn test_import_without_persist() {
        let handler = CsvToolHandler::new(context("", None));
        let output = handler
            .import_csv(ImportCsvInput {
                csv: "Column Name,PII\nemail,yes\n,no\n".to_string(),
                persist: false,
                connection_string: None,
            })
            .await
            .unwrap();
        assert_eq!(output.records.len(), 1);
        assert!(output.records[0].flags.pii);
        assert_eq!(output.records[0].ndmo_classification, NdmoClassification::Public);
        assert_eq!(output.skipped.len(), 1);
        assert!(output.persisted.is_none());
    }

    #[tokio::test]
    async fn test_import_bad_header_is_invalid_input() {
        let handler = CsvToolHandler::new(context("", None));
        let err = handler
            .import_csv(ImportCsvInput {
                csv: "Name,Flag\nx,y\n".to_string(),
                persist: false,
                connection_string: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_export_unsupported_dialect() {
        let handler = CsvToolHandler::new(context("", Some("mysql://localhost/db")));
        let err = handler
            .export_csv(ExportCsvInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
