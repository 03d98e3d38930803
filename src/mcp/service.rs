//! MCP service implementation using rmcp.
//!
//! This module defines the DataGovService struct with all data-governance
//! tools exposed via the MCP protocol using the rmcp framework's macros.
//! Every tool answers with an [`Envelope`]; domain failures are reported in
//! the envelope, never as protocol errors.

use crate::db::{BatchInsertReport, ConnectionReport};
use crate::models::{ColumnRecord, Envelope};
use crate::tools::{
    BatchInsertColumnsInput, ClassifyColumnInput, ClassifyColumnOutput, ClassifyColumnsInput,
    ClassifyColumnsOutput, ClassifyToolHandler, ColumnToolHandler, CsvToolHandler,
    DeleteAllColumnsInput, DeleteAllColumnsOutput, DeleteColumnInput, DeleteColumnOutput,
    DetectDbTypeInput, DetectDbTypeOutput, ExportCsvInput, ExportCsvOutput, FetchColumnsInput,
    FetchColumnsOutput, FindDuplicateNamesInput, FindDuplicateNamesOutput, ImportCsvInput,
    ImportCsvOutput, InsertColumnInput, TestConnectionInput, ToolContext, UpdateColumnInput,
};
use rmcp::Json;
use rmcp::{
    ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct DataGovService {
    /// Shared router, classifier and default connection
    ctx: Arc<ToolContext>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DataGovService {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    fn columns(&self) -> ColumnToolHandler {
        ColumnToolHandler::new(self.ctx.clone())
    }

    fn classify_handler(&self) -> ClassifyToolHandler {
        ClassifyToolHandler::new(self.ctx.clone())
    }

    fn csv(&self) -> CsvToolHandler {
        CsvToolHandler::new(self.ctx.clone())
    }
}

/// Log failed tool calls once, at the boundary.
fn reported<T>(tool: &str, envelope: Envelope<T>) -> Json<Envelope<T>> {
    if let (false, Some(error)) = (envelope.success, envelope.error.as_deref()) {
        warn!(tool = %tool, error_kind = ?envelope.error_kind, error = %error, "Tool call failed");
    }
    Json(envelope)
}

#[tool_router]
impl DataGovService {
    #[tool(
        description = "Classify a connection string as postgres, oracle, hive or unknown.\nNever fails. Only postgres and oracle can store column records."
    )]
    async fn detect_db_type(
        &self,
        Parameters(input): Parameters<DetectDbTypeInput>,
    ) -> Json<Envelope<DetectDbTypeOutput>> {
        let output = self.columns().detect_db_type(input);
        let message = format!("Detected database type: {}", output.db_type);
        Json(Envelope::ok_with_message(output, message))
    }

    #[tool(
        description = "Connect to the database and create or upgrade the classification table.\nSafe to run repeatedly. Reports what was changed."
    )]
    async fn test_connection(
        &self,
        Parameters(input): Parameters<TestConnectionInput>,
    ) -> Json<Envelope<ConnectionReport>> {
        let result = self.columns().test_connection(input).await;
        reported(
            "test_connection",
            Envelope::from_result(result, |r| {
                format!(
                    "Connected to {}; table '{}' is ready ({})",
                    r.db_type.display_name(),
                    r.table,
                    r.reconcile.summary()
                )
            }),
        )
    }

    #[tool(description = "Fetch every column record, ordered by column name.")]
    async fn fetch_columns(
        &self,
        Parameters(input): Parameters<FetchColumnsInput>,
    ) -> Json<Envelope<FetchColumnsOutput>> {
        let result = self.columns().fetch_columns(input).await;
        reported(
            "fetch_columns",
            Envelope::from_result(result, |o| format!("Fetched {} column records", o.count)),
        )
    }

    #[tool(
        description = "Insert one column record. An id is generated when omitted.\nColumn names may repeat; ids may not."
    )]
    async fn insert_column(
        &self,
        Parameters(input): Parameters<InsertColumnInput>,
    ) -> Json<Envelope<ColumnRecord>> {
        let result = self.columns().insert_column(input).await;
        reported(
            "insert_column",
            Envelope::from_result(result, |r| format!("Inserted column '{}'", r.column_name)),
        )
    }

    #[tool(
        description = "Insert many column records as one unit.\nPostgreSQL rolls back the whole batch on any failure; Oracle uses array DML with session rollback."
    )]
    async fn batch_insert_columns(
        &self,
        Parameters(input): Parameters<BatchInsertColumnsInput>,
    ) -> Json<Envelope<BatchInsertReport>> {
        let result = self.columns().batch_insert_columns(input).await;
        reported(
            "batch_insert_columns",
            Envelope::from_result(result, |r| {
                format!(
                    "Inserted {} column records ({})",
                    r.inserted,
                    r.atomicity.describe()
                )
            }),
        )
    }

    #[tool(
        description = "Update description, NDMO classification, reason and the five flags of the record with the given id.\nReturns not_found when no row has that id."
    )]
    async fn update_column(
        &self,
        Parameters(input): Parameters<UpdateColumnInput>,
    ) -> Json<Envelope<ColumnRecord>> {
        let result = self.columns().update_column(input).await;
        reported(
            "update_column",
            Envelope::from_result(result, |r| format!("Updated column '{}'", r.column_name)),
        )
    }

    #[tool(description = "Delete one column record by id.\nReturns not_found when no row has that id.")]
    async fn delete_column(
        &self,
        Parameters(input): Parameters<DeleteColumnInput>,
    ) -> Json<Envelope<DeleteColumnOutput>> {
        let result = self.columns().delete_column(input).await;
        reported(
            "delete_column",
            Envelope::from_result(result, |o| format!("Deleted column record '{}'", o.id)),
        )
    }

    #[tool(
        description = "Delete every column record. Irreversible.\nRequires confirm: true."
    )]
    async fn delete_all_columns(
        &self,
        Parameters(input): Parameters<DeleteAllColumnsInput>,
    ) -> Json<Envelope<DeleteAllColumnsOutput>> {
        let result = self.columns().delete_all_columns(input).await;
        reported(
            "delete_all_columns",
            Envelope::from_result(result, |o| format!("Deleted {} column records", o.removed)),
        )
    }

    #[tool(
        description = "List column names stored more than once, with their record ids.\nDuplicates are allowed; this is for review."
    )]
    async fn find_duplicate_names(
        &self,
        Parameters(input): Parameters<FindDuplicateNamesInput>,
    ) -> Json<Envelope<FindDuplicateNamesOutput>> {
        let result = self.columns().find_duplicate_names(input).await;
        reported(
            "find_duplicate_names",
            Envelope::from_result(result, |o| {
                format!(
                    "{} duplicated column names among {} records",
                    o.duplicates.len(),
                    o.total_columns
                )
            }),
        )
    }

    #[tool(
        description = "Ask the hosted model to classify one column name.\nReturns description, NDMO classification, reason and the PII/PHI/PFI/PSI/PCI flags. Not stored."
    )]
    async fn classify_column(
        &self,
        Parameters(input): Parameters<ClassifyColumnInput>,
    ) -> Json<Envelope<ClassifyColumnOutput>> {
        let result = self.classify_handler().classify_column(input).await;
        reported(
            "classify_column",
            Envelope::from_result(result, |o| {
                format!(
                    "Classified as {}",
                    o.classification.ndmo_classification
                )
            }),
        )
    }

    #[tool(
        description = "Classify many column names concurrently.\nFailures are reported per name. With persist: true the successes are batch-inserted."
    )]
    async fn classify_columns(
        &self,
        Parameters(input): Parameters<ClassifyColumnsInput>,
    ) -> Json<Envelope<ClassifyColumnsOutput>> {
        let result = self.classify_handler().classify_columns(input).await;
        reported(
            "classify_columns",
            Envelope::from_result(result, |o| {
                let mut message = format!(
                    "Classified {} of {} column names",
                    o.classified.len(),
                    o.classified.len() + o.failed.len()
                );
                if let Some(report) = &o.persisted {
                    message.push_str(&format!("; stored {}", report.inserted));
                }
                if o.persist_error.is_some() {
                    message.push_str("; storing failed");
                }
                message
            }),
        )
    }

    #[tool(
        description = "Parse CSV text into column records.\nHeaders such as 'Column Name', 'column_name' or 'columnName' are accepted; yes/true/1 mark a flag. With persist: true the records are batch-inserted."
    )]
    async fn import_csv(
        &self,
        Parameters(input): Parameters<ImportCsvInput>,
    ) -> Json<Envelope<ImportCsvOutput>> {
        let result = self.csv().import_csv(input).await;
        reported(
            "import_csv",
            Envelope::from_result(result, |o| {
                let mut message = format!(
                    "Parsed {} records, skipped {} rows",
                    o.records.len(),
                    o.skipped.len()
                );
                if let Some(report) = &o.persisted {
                    message.push_str(&format!("; stored {}", report.inserted));
                }
                message
            }),
        )
    }

    #[tool(
        description = "Export every column record as CSV.\nColumns: ID, Column Name, Description, NDMO Classification, Reason NDMO, PII, PHI, PFI, PSI, PCI."
    )]
    async fn export_csv(
        &self,
        Parameters(input): Parameters<ExportCsvInput>,
    ) -> Json<Envelope<ExportCsvOutput>> {
        let result = self.csv().export_csv(input).await;
        reported(
            "export_csv",
            Envelope::from_result(result, |o| format!("Exported {} column records", o.count)),
        )
    }
}

#[tool_handler]
impl ServerHandler for DataGovService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "datagov-mcp-server".to_owned(),
                title: Some("Data Governance MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for tagging database columns with sensitivity labels.\n\
                \n\
                ## Column records\n\
                Each record has an id, a column name, a description, an NDMO classification\n\
                (Top Secret, Secret, Restricted, Public) with an optional reason, and five\n\
                independent flags: pii, phi, pfi, psi, pci. Column names may repeat.\n\
                \n\
                ## Workflow\n\
                1. `detect_db_type` and `test_connection` to check the target (PostgreSQL or Oracle)\n\
                2. `classify_column` / `classify_columns` to get AI suggestions\n\
                3. `insert_column`, `batch_insert_columns` or `import_csv` to store records\n\
                4. `fetch_columns`, `update_column`, `delete_column` to maintain them\n\
                \n\
                ## Connection strings\n\
                Every tool takes an optional `connection_string`; when omitted the server's\n\
                configured database is used. Hive is recognised but cannot store records.\n\
                \n\
                ## Results\n\
                Every tool returns {success, message, error, error_kind, data}. Check\n\
                `error_kind` (not_found, duplicate, unsupported, connection, ...) to decide what to do next.\n\
                `delete_all_columns` requires `confirm: true`."
                    .to_string(),
            ),
        }
    }
}
