//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::error::{CatalogError, CatalogResult};
use crate::mcp::DataGovService;
use crate::tools::ToolContext;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Reads JSON-RPC messages from stdin and writes responses to stdout.
pub struct StdioTransport {
    ctx: Arc<ToolContext>,
}

impl StdioTransport {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> CatalogResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = DataGovService::new(self.ctx.clone());
        let running_service = service.serve(stdio()).await.map_err(|e| {
            CatalogError::internal(format!("Failed to start stdio transport: {}", e))
        })?;

        tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => info!("Stdio transport completed normally"),
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        return Err(CatalogError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
            }
            _ = wait_for_signal() => {
                // Blocking stdin reads cannot be interrupted; database work is
                // per call, so nothing is left open.
                info!("Shutdown signal received, exiting");
                std::process::exit(0);
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
