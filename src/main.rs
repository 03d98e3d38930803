//! Data-governance MCP server - main entry point.
//!
//! Serves column classification and persistence tools over MCP
//! (stdio or Streamable HTTP) for PostgreSQL and Oracle targets.

use datagov_mcp_server::config::{Config, TransportMode};
use datagov_mcp_server::models::{DatabaseType, mask_connection_string};
use datagov_mcp_server::tools::ToolContext;
use datagov_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Logs go to stderr so stdout stays
/// reserved for the stdio transport.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    init_tracing(&config);

    info!(
        transport = %config.transport,
        table = %config.table,
        "Starting datagov MCP server v{}",
        env!("CARGO_PKG_VERSION")
    );

    match config.default_connection() {
        Some(target) => {
            let db_type = DatabaseType::detect(&target);
            info!(
                target = %mask_connection_string(&target),
                db_type = %db_type,
                "Default database configured"
            );
            if !db_type.has_adapter() {
                warn!(db_type = %db_type, "Default database type has no adapter; data tools will report it as unsupported");
            }
        }
        None => info!("No default database; tools must be given a connection_string"),
    }

    let ctx = Arc::new(ToolContext::from_config(&config));

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(ctx).run().await,
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                ctx,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
