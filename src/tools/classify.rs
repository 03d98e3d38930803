//! Classification tools.
//!
//! This module implements `classify_column` and `classify_columns`.

use crate::classify::{ClassificationFailure, ClassifiedColumn};
use crate::db::BatchInsertReport;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Classification, ColumnRecord};
use crate::tools::ToolContext;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the classify_column tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClassifyColumnInput {
    /// Name of the database column to classify, e.g. "card_number"
    pub column_name: String,
}

/// Output from the classify_column tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ClassifyColumnOutput {
    pub classification: Classification,
}

/// Input for the classify_columns tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClassifyColumnsInput {
    /// Column names to classify. Requests run concurrently.
    pub column_names: Vec<String>,
    /// Store the successful classifications as new column records
    #[serde(default)]
    pub persist: bool,
    /// Target database when persisting. Defaults to the server's configured database.
    #[serde(default)]
    pub connection_string: Option<String>,
}

/// Output from the classify_columns tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ClassifyColumnsOutput {
    pub classified: Vec<ClassifiedColumn>,
    pub failed: Vec<ClassificationFailure>,
    /// Present when `persist` was requested and the batch insert succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<BatchInsertReport>,
    /// Present when `persist` was requested and the batch insert failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

pub struct ClassifyToolHandler {
    ctx: Arc<ToolContext>,
}

impl ClassifyToolHandler {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    pub async fn classify_column(
        &self,
        input: ClassifyColumnInput,
    ) -> CatalogResult<ClassifyColumnOutput> {
        let classification = self.ctx.classifier().classify(&input.column_name).await?;
        info!(column = %input.column_name.trim(), level = %classification.ndmo_classification, "Classified column");
        Ok(ClassifyColumnOutput { classification })
    }

    /// Classify every name; individual failures never fail the call.
    pub async fn classify_columns(
        &self,
        input: ClassifyColumnsInput,
    ) -> CatalogResult<ClassifyColumnsOutput> {
        if input.column_names.is_empty() {
            return Err(CatalogError::invalid_input("column_names must not be empty"));
        }
        // Resolve before spending model calls on a request that cannot be stored
        let target = if input.persist {
            Some(self.ctx.resolve_connection(input.connection_string.as_deref())?)
        } else {
            None
        };

        let batch = self.ctx.classifier().classify_many(&input.column_names).await;

        let mut output = ClassifyColumnsOutput {
            classified: batch.classified,
            failed: batch.failed,
            persisted: None,
            persist_error: None,
        };

        if let Some(target) = target {
            if !output.classified.is_empty() {
                let records = output
                    .classified
                    .iter()
                    .map(|c| ColumnRecord::from_classification(&c.column_name, c.classification.clone()))
                    .collect();
                match self.ctx.router().batch_insert_columns(&target, records).await {
                    Ok(report) => output.persisted = Some(report),
                    Err(e) => {
                        warn!(error = %e, "Failed to persist classified columns");
                        output.persist_error = Some(e.to_string());
                    }
                }
            }
        }
        Ok(output)
    }
}
