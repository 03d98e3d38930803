//! MCP tool implementations.
//!
//! This module contains the data-governance tool handlers:
//! - `columns`: connection checks and CRUD on the classification table
//! - `classify`: AI classification of column names
//! - `interchange`: CSV import and export

pub mod classify;
pub mod columns;
pub mod interchange;

use crate::classify::{Classifier, OpenAiClient};
use crate::config::Config;
use crate::db::PersistenceRouter;
use crate::error::{CatalogError, CatalogResult};
use std::sync::Arc;
use tracing::warn;

pub use classify::{
    ClassifyColumnInput, ClassifyColumnOutput, ClassifyColumnsInput, ClassifyColumnsOutput,
    ClassifyToolHandler,
};
pub use columns::{
    BatchInsertColumnsInput, ColumnToolHandler, DeleteAllColumnsInput, DeleteAllColumnsOutput,
    DeleteColumnInput, DeleteColumnOutput, DetectDbTypeInput, DetectDbTypeOutput, DuplicateName,
    FetchColumnsInput, FetchColumnsOutput, FindDuplicateNamesInput, FindDuplicateNamesOutput,
    InsertColumnInput, TestConnectionInput, UpdateColumnInput,
};
pub use interchange::{
    CsvToolHandler, ExportCsvInput, ExportCsvOutput, ImportCsvInput, ImportCsvOutput,
};

/// State shared by every tool handler.
pub struct ToolContext {
    router: PersistenceRouter,
    classifier: Classifier,
    /// Contains credentials - never log unmasked
    default_connection: Option<String>,
}

impl ToolContext {
    pub fn new(
        router: PersistenceRouter,
        classifier: Classifier,
        default_connection: Option<String>,
    ) -> Self {
        Self {
            router,
            classifier,
            default_connection,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = OpenAiClient::new(config.classifier_config());
        if !client.is_configured() {
            warn!("No API key for the classification model; classify tools will fail until one is set");
        }
        Self::new(
            PersistenceRouter::new(config.store_settings()),
            Classifier::new(Arc::new(client)),
            config.default_connection(),
        )
    }

    pub fn router(&self) -> &PersistenceRouter {
        &self.router
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn default_connection(&self) -> Option<&str> {
        self.default_connection.as_deref()
    }

    /// Pick the caller's connection string, falling back to the configured default.
    pub fn resolve_connection(&self, provided: Option<&str>) -> CatalogResult<String> {
        provided
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or_else(|| self.default_connection.clone())
            .ok_or_else(|| {
                CatalogError::invalid_input(
                    "connection_string is required (no default database configured; start the server with --database)",
                )
            })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::classify::client::MockLlmClient;
    use crate::db::StoreSettings;

    pub fn context(response: &str, default_connection: Option<&str>) -> Arc<ToolContext> {
        Arc::new(ToolContext::new(
            PersistenceRouter::new(StoreSettings::default()),
            Classifier::new(Arc::new(MockLlmClient::new(response))),
            default_connection.map(String::from),
        ))
    }
}
